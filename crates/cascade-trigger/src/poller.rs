//! Per-project serialized SCM polling.
//!
//! Every downstream project that needs an exclusive workspace for polling gets
//! one queue with a single worker task. Tasks for the same project run strictly
//! in submission order and never overlap; different projects are independent.

use crate::changes::ChangeDetector;
use cascade_core::cause::{Action, Cause, ScheduleOutcome, ScheduleRequest};
use cascade_core::ports::{ProjectHandle, TracingListener};
use cascade_core::{Error, PollTaskId, ProjectId, Result};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Configuration for the poll scheduler.
#[derive(Debug, Clone, Default)]
pub struct SchedulerConfig {
    /// Quiet period used instead of the project's own, when set.
    pub quiet_period_override: Option<Duration>,
}

impl SchedulerConfig {
    pub fn with_quiet_period(mut self, quiet_period: Duration) -> Self {
        self.quiet_period_override = Some(quiet_period);
        self
    }
}

/// Deferred "poll, then maybe schedule" work for one downstream project.
pub struct PollTask {
    pub id: PollTaskId,
    pub project: ProjectHandle,
    pub cause: Cause,
    pub actions: Vec<Action>,
    pub submitted_at: DateTime<Utc>,
}

impl PollTask {
    pub fn new(project: ProjectHandle, cause: Cause, actions: Vec<Action>) -> Self {
        Self {
            id: PollTaskId::new(),
            project,
            cause,
            actions,
            submitted_at: Utc::now(),
        }
    }
}

impl std::fmt::Debug for PollTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollTask")
            .field("id", &self.id)
            .field("project", self.project.id())
            .field("cause", &self.cause)
            .field("actions", &self.actions.len())
            .finish()
    }
}

enum QueueMessage {
    Poll(PollTask),
    Flush(oneshot::Sender<()>),
}

struct ProjectQueue {
    sender: mpsc::UnboundedSender<QueueMessage>,
    worker: JoinHandle<()>,
}

/// Registry of single-concurrency queues keyed by downstream project.
///
/// Queues are created on first use and live until the host reports the project
/// deleted. Must be used from within a Tokio runtime.
pub struct SerializedPollScheduler {
    queues: DashMap<ProjectId, ProjectQueue>,
    detector: Arc<dyn ChangeDetector>,
    config: SchedulerConfig,
}

impl SerializedPollScheduler {
    pub fn new(detector: Arc<dyn ChangeDetector>, config: SchedulerConfig) -> Self {
        Self {
            queues: DashMap::new(),
            detector,
            config,
        }
    }

    /// Enqueue a task on its project's queue, creating the queue if needed.
    pub fn submit(&self, task: PollTask) -> Result<()> {
        let project_id = task.project.id().clone();
        let task_id = task.id;

        // The entry guard holds the shard lock, so concurrent first submissions
        // for one project still spawn exactly one worker.
        let mut queue = self
            .queues
            .entry(project_id.clone())
            .or_insert_with(|| self.spawn_worker(project_id.clone()));
        if queue.sender.is_closed() {
            warn!(project = %project_id, "Poll worker gone, starting a new one");
            *queue = self.spawn_worker(project_id.clone());
        }

        queue
            .sender
            .send(QueueMessage::Poll(task))
            .map_err(|_| Error::Internal(format!("poll queue for {} is closed", project_id)))?;

        debug!(project = %project_id, task_id = %task_id, "Poll task queued");
        Ok(())
    }

    /// Wait until every task submitted for `project` before this call has run.
    pub async fn flush(&self, project: &ProjectId) {
        let sender = match self.queues.get(project) {
            Some(queue) => queue.sender.clone(),
            None => return,
        };

        let (tx, rx) = oneshot::channel();
        if sender.send(QueueMessage::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    /// Drop the queue of a deleted project.
    ///
    /// Tasks already queued still run; the worker exits once they are drained.
    pub fn deregister(&self, project: &ProjectId) -> bool {
        let removed = self.queues.remove(project).is_some();
        if removed {
            info!(project = %project, "Removed poll queue for deleted project");
        }
        removed
    }

    pub fn is_registered(&self, project: &ProjectId) -> bool {
        self.queues.contains_key(project)
    }

    pub fn queue_count(&self) -> usize {
        self.queues.len()
    }

    /// Close every queue and wait for the workers to drain.
    pub async fn shutdown(&self) {
        let keys: Vec<ProjectId> = self.queues.iter().map(|e| e.key().clone()).collect();
        let mut workers = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some((_, queue)) = self.queues.remove(&key) {
                drop(queue.sender);
                workers.push(queue.worker);
            }
        }

        for worker in workers {
            if let Err(e) = worker.await {
                warn!(error = %e, "Poll worker terminated abnormally");
            }
        }
    }

    fn spawn_worker(&self, project: ProjectId) -> ProjectQueue {
        let (sender, receiver) = mpsc::unbounded_channel();
        let detector = Arc::clone(&self.detector);
        let config = self.config.clone();

        debug!(project = %project, "Starting poll worker");
        let worker = tokio::spawn(run_worker(project, receiver, detector, config));

        ProjectQueue { sender, worker }
    }
}

async fn run_worker(
    project: ProjectId,
    mut receiver: mpsc::UnboundedReceiver<QueueMessage>,
    detector: Arc<dyn ChangeDetector>,
    config: SchedulerConfig,
) {
    while let Some(message) = receiver.recv().await {
        match message {
            QueueMessage::Poll(task) => {
                let task_id = task.id;
                // A panicking task must not take the queue down with it.
                let run = tokio::spawn(run_task(task, Arc::clone(&detector), config.clone()));
                if let Err(e) = run.await {
                    warn!(
                        project = %project,
                        task_id = %task_id,
                        panicked = e.is_panic(),
                        "Poll task aborted, continuing with the next one"
                    );
                }
            }
            QueueMessage::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!(project = %project, "Poll worker stopped");
}

async fn run_task(task: PollTask, detector: Arc<dyn ChangeDetector>, config: SchedulerConfig) {
    let project = task.project.id().clone();
    let listener = TracingListener::for_project(project.clone());
    debug!(project = %project, task_id = %task.id, cause_id = %task.cause.id(), "Running poll task");

    let has_changes = match detector.poll(task.project.as_ref(), &listener).await {
        Ok(has_changes) => has_changes,
        Err(e) => {
            warn!(project = %project, task_id = %task.id, error = %e, "Poll failed, treating as no changes");
            return;
        }
    };

    if !has_changes {
        info!(project = %project, "Downstream project had no SCM changes");
        return;
    }

    info!(project = %project, "SCM changes found, triggering build");
    let request = ScheduleRequest {
        quiet_period: config
            .quiet_period_override
            .unwrap_or_else(|| task.project.quiet_period()),
        cause: task.cause,
        actions: task.actions,
    };

    match task.project.schedule_build(request).await {
        Ok(ScheduleOutcome::Accepted) => {
            info!(project = %project, "Build scheduled successfully");
        }
        Ok(ScheduleOutcome::AlreadyQueued) => {
            info!(project = %project, "No build scheduled, another build is already in the queue");
        }
        Err(e) => {
            warn!(project = %project, task_id = %task.id, error = %e, "Dropping poll task");
        }
    }
}
