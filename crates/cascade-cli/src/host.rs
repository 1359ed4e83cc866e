//! In-memory host backing the CLI.
//!
//! Projects come from the workspace file. Polls report the configured
//! `pending_changes` flag and scheduling only records the request, so a
//! simulation never touches a real SCM or build queue.

use crate::config::{ProjectSpec, WorkspaceFile};
use async_trait::async_trait;
use cascade_core::build::BuildHistory;
use cascade_core::cause::{ScheduleOutcome, ScheduleRequest};
use cascade_core::ports::{PollOutcome, Project, ProjectHandle, ProjectResolver, TaskListener};
use cascade_core::{ProjectId, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

pub struct StaticProject {
    id: ProjectId,
    exclusive: bool,
    disabled: bool,
    quiet_period: Duration,
    pending_changes: bool,
    history: BuildHistory,
    configurations: Option<Vec<Arc<StaticProject>>>,
    queue: Mutex<Vec<ScheduleRequest>>,
}

impl StaticProject {
    fn from_spec(spec: &ProjectSpec) -> Self {
        let configurations = (!spec.configurations.is_empty()).then(|| {
            spec.configurations
                .iter()
                .map(|name| {
                    Arc::new(Self {
                        id: ProjectId::new(format!("{}/{}", spec.name, name)),
                        exclusive: false,
                        disabled: spec.disabled,
                        quiet_period: spec.quiet_period(),
                        pending_changes: spec.pending_changes,
                        history: BuildHistory::default(),
                        configurations: None,
                        queue: Mutex::new(Vec::new()),
                    })
                })
                .collect()
        });

        Self {
            id: ProjectId::new(spec.name.clone()),
            exclusive: spec.exclusive_workspace,
            disabled: spec.disabled,
            quiet_period: spec.quiet_period(),
            pending_changes: spec.pending_changes,
            history: spec.history(),
            configurations,
            queue: Mutex::new(Vec::new()),
        }
    }

    /// Requests accepted onto this project's queue.
    pub async fn queued(&self) -> Vec<ScheduleRequest> {
        self.queue.lock().await.clone()
    }
}

#[async_trait]
impl Project for StaticProject {
    fn id(&self) -> &ProjectId {
        &self.id
    }

    fn requires_exclusive_workspace(&self) -> bool {
        self.exclusive
    }

    fn is_disabled(&self) -> bool {
        self.disabled
    }

    fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    fn history(&self) -> BuildHistory {
        self.history
    }

    fn matrix_configurations(&self) -> Option<Vec<ProjectHandle>> {
        self.configurations.as_ref().map(|configs| {
            configs
                .iter()
                .map(|c| {
                    let handle: ProjectHandle = c.clone();
                    handle
                })
                .collect()
        })
    }

    async fn poll(&self, listener: &dyn TaskListener) -> Result<PollOutcome> {
        listener.info(&format!("Polling {}", self.id));
        Ok(if self.pending_changes {
            PollOutcome::Changes
        } else {
            PollOutcome::NoChanges
        })
    }

    async fn schedule_build(&self, request: ScheduleRequest) -> Result<ScheduleOutcome> {
        let mut queue = self.queue.lock().await;
        if !queue.is_empty() {
            debug!(project = %self.id, "Build already queued");
            return Ok(ScheduleOutcome::AlreadyQueued);
        }
        queue.push(request);
        Ok(ScheduleOutcome::Accepted)
    }
}

/// Every project of a workspace file, matrix configurations included.
pub struct StaticHost {
    order: Vec<String>,
    projects: HashMap<String, Arc<StaticProject>>,
}

impl StaticHost {
    pub fn from_workspace(workspace: &WorkspaceFile) -> Self {
        let mut order = Vec::new();
        let mut projects = HashMap::new();

        for spec in &workspace.projects {
            let project = Arc::new(StaticProject::from_spec(spec));
            for config in project.configurations.iter().flatten() {
                projects.insert(config.id.to_string(), config.clone());
            }
            order.push(spec.name.clone());
            projects.insert(spec.name.clone(), project);
        }

        Self { order, projects }
    }

    pub fn project(&self, name: &str) -> Option<&Arc<StaticProject>> {
        self.projects.get(name)
    }

    /// Scheduled requests per project, in workspace order.
    pub async fn scheduled(&self) -> Vec<(ProjectId, ScheduleRequest)> {
        let mut scheduled = Vec::new();
        for name in &self.order {
            let Some(project) = self.projects.get(name) else {
                continue;
            };
            let configs = project.configurations.iter().flatten();
            for p in std::iter::once(project).chain(configs) {
                for request in p.queued().await {
                    scheduled.push((p.id.clone(), request));
                }
            }
        }
        scheduled
    }
}

impl ProjectResolver for StaticHost {
    fn resolve(&self, name: &str) -> Option<ProjectHandle> {
        self.projects.get(name).map(|p| {
            let handle: ProjectHandle = p.clone();
            handle
        })
    }

    fn project_names(&self) -> Vec<String> {
        self.order.clone()
    }
}
