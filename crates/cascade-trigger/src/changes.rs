//! Change detection: local changesets and live downstream SCM polls.

use async_trait::async_trait;
use cascade_core::Result;
use cascade_core::build::Build;
use cascade_core::ports::{PollOutcome, Project, TaskListener};
use tracing::{debug, info};

/// Answers "are there changes?" for the trigger engine.
#[async_trait]
pub trait ChangeDetector: Send + Sync {
    /// Whether the triggering build recorded any SCM changes.
    fn has_local_changes(&self, build: &Build) -> bool {
        !build.changes.is_empty()
    }

    /// Whether the project's SCM reports pending changes.
    ///
    /// May need the project's workspace exclusively; callers must check
    /// [`Project::requires_exclusive_workspace`] before calling this inline.
    async fn poll(&self, project: &dyn Project, listener: &dyn TaskListener) -> Result<bool>;
}

/// Delegates to the project's own SCM poll.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScmChangeDetector;

impl ScmChangeDetector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ChangeDetector for ScmChangeDetector {
    async fn poll(&self, project: &dyn Project, listener: &dyn TaskListener) -> Result<bool> {
        info!(project = %project.id(), "Polling for SCM changes");
        let outcome = project.poll(listener).await?;
        debug!(project = %project.id(), changes = outcome.has_changes(), "Poll finished");
        Ok(outcome == PollOutcome::Changes)
    }
}
