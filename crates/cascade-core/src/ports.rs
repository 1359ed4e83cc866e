//! Port traits (hexagonal architecture).
//!
//! These traits define what the trigger core consumes from the host: project
//! handles, name resolution, and the per-build console.

use crate::Result;
use crate::build::BuildHistory;
use crate::cause::{ScheduleOutcome, ScheduleRequest};
use crate::ids::ProjectId;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Shared handle to a host project.
pub type ProjectHandle = Arc<dyn Project>;

/// Result of a live SCM check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Changes,
    NoChanges,
}

impl PollOutcome {
    pub fn has_changes(&self) -> bool {
        matches!(self, PollOutcome::Changes)
    }
}

/// A job known to the host.
#[async_trait]
pub trait Project: Send + Sync {
    /// Stable identity of the project.
    fn id(&self) -> &ProjectId;

    /// Whether polling the project's SCM needs sole access to its workspace.
    fn requires_exclusive_workspace(&self) -> bool;

    /// Host-owned disabled flag. Read only.
    fn is_disabled(&self) -> bool {
        false
    }

    /// Whether the item can be scheduled at all (folders and views cannot).
    fn is_buildable(&self) -> bool {
        true
    }

    /// Delay applied to builds scheduled for this project.
    fn quiet_period(&self) -> Duration;

    /// Last and last-unsuccessful build numbers.
    fn history(&self) -> BuildHistory;

    /// Active child configurations, or `None` when this is not a matrix job.
    fn matrix_configurations(&self) -> Option<Vec<ProjectHandle>> {
        None
    }

    /// Check the project's SCM for pending changes.
    ///
    /// Failures surface as [`crate::Error::PollFailed`].
    async fn poll(&self, listener: &dyn TaskListener) -> Result<PollOutcome>;

    /// Put a build on the host queue.
    async fn schedule_build(&self, request: ScheduleRequest) -> Result<ScheduleOutcome>;
}

/// Resolves configured project names against a project group.
pub trait ProjectResolver: Send + Sync {
    /// Look a project up by (full or relative) name.
    fn resolve(&self, name: &str) -> Option<ProjectHandle>;

    /// Every project name visible in this group.
    fn project_names(&self) -> Vec<String>;
}

/// Console of the build being processed.
pub trait TaskListener: Send + Sync {
    fn info(&self, message: &str);

    fn warn(&self, message: &str) {
        self.info(message);
    }
}

/// Listener that forwards console lines to `tracing`.
#[derive(Debug, Clone, Default)]
pub struct TracingListener {
    source: Option<ProjectId>,
}

impl TracingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_project(project: ProjectId) -> Self {
        Self {
            source: Some(project),
        }
    }
}

impl TaskListener for TracingListener {
    fn info(&self, message: &str) {
        match &self.source {
            Some(project) => tracing::info!(project = %project, "{}", message),
            None => tracing::info!("{}", message),
        }
    }

    fn warn(&self, message: &str) {
        match &self.source {
            Some(project) => tracing::warn!(project = %project, "{}", message),
            None => tracing::warn!("{}", message),
        }
    }
}
