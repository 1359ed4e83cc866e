//! Checks and lookups for the child-project field.

use crate::config::split_project_names;
use cascade_core::ports::ProjectResolver;
use cascade_core::{Error, Result};

/// Validate a comma-separated downstream list against the project group.
///
/// Every non-blank name must resolve to a buildable project, and at least one
/// project must be named.
pub fn validate_child_projects(value: &str, resolver: &dyn ProjectResolver) -> Result<()> {
    let names = split_project_names(value);
    if names.is_empty() {
        return Err(Error::NoProjectSpecified);
    }

    for name in names {
        match resolver.resolve(&name) {
            None => {
                let suggestion = nearest_name(&name, &resolver.project_names()).unwrap_or_default();
                return Err(Error::ProjectNotFound { name, suggestion });
            }
            Some(project) if !project.is_buildable() => return Err(Error::NotBuildable(name)),
            Some(_) => {}
        }
    }

    Ok(())
}

/// Project names starting with `prefix`, sorted.
pub fn complete_project_names(prefix: &str, resolver: &dyn ProjectResolver) -> Vec<String> {
    let mut names: Vec<String> = resolver
        .project_names()
        .into_iter()
        .filter(|name| name.starts_with(prefix))
        .collect();
    names.sort();
    names
}

/// The candidate with the smallest edit distance to `name`.
pub fn nearest_name(name: &str, candidates: &[String]) -> Option<String> {
    candidates
        .iter()
        .min_by_key(|candidate| strsim::levenshtein(name, candidate))
        .cloned()
}
