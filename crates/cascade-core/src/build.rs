//! Finished-build snapshots handed to the trigger core by the host.

use crate::ids::ProjectId;
use crate::result::BuildResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A completed build of one project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Build {
    pub project: ProjectId,
    pub number: u32,
    pub result: BuildResult,
    #[serde(default)]
    pub changes: ChangeSet,
    pub completed_at: DateTime<Utc>,
}

impl Build {
    pub fn new(project: impl Into<ProjectId>, number: u32, result: BuildResult) -> Self {
        Self {
            project: project.into(),
            number,
            result,
            changes: ChangeSet::default(),
            completed_at: Utc::now(),
        }
    }

    pub fn with_changes(mut self, changes: ChangeSet) -> Self {
        self.changes = changes;
        self
    }
}

/// SCM changes recorded by a build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet {
    pub entries: Vec<ChangeEntry>,
}

impl ChangeSet {
    pub fn new(entries: Vec<ChangeEntry>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub revision: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub paths: Vec<String>,
}

impl ChangeEntry {
    pub fn new(revision: impl Into<String>) -> Self {
        Self {
            revision: revision.into(),
            author: None,
            message: String::new(),
            paths: vec![],
        }
    }
}

/// Build-number bookkeeping for a project, as reported by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildHistory {
    pub last_build: Option<u32>,
    pub last_unsuccessful_build: Option<u32>,
}

impl BuildHistory {
    /// True when the last build directly follows an unsuccessful one.
    pub fn just_recovered(&self) -> bool {
        match (self.last_build, self.last_unsuccessful_build) {
            (Some(last), Some(unsuccessful)) => last.checked_sub(1) == Some(unsuccessful),
            _ => false,
        }
    }
}
