//! In-memory host used by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use cascade_core::build::BuildHistory;
use cascade_core::cause::{ScheduleOutcome, ScheduleRequest};
use cascade_core::ports::{PollOutcome, Project, ProjectHandle, ProjectResolver, TaskListener};
use cascade_core::{Error, ProjectId, Result};
use cascade_trigger::changes::ScmChangeDetector;
use cascade_trigger::{SchedulerConfig, SerializedPollScheduler, TriggerDecisionEngine};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Recording project stub.
pub struct FakeProject {
    id: ProjectId,
    exclusive: bool,
    disabled: bool,
    buildable: bool,
    history: BuildHistory,
    configurations: Option<Vec<ProjectHandle>>,
    pending_changes: AtomicBool,
    poll_fails: bool,
    panics_left: AtomicUsize,
    poll_delay: Duration,
    already_queued: bool,
    pub polls: AtomicUsize,
    active_polls: AtomicUsize,
    pub max_concurrent_polls: AtomicUsize,
    scheduled: Mutex<Vec<ScheduleRequest>>,
}

impl FakeProject {
    pub fn new(name: &str) -> Self {
        Self {
            id: ProjectId::from(name),
            exclusive: false,
            disabled: false,
            buildable: true,
            history: BuildHistory::default(),
            configurations: None,
            pending_changes: AtomicBool::new(false),
            poll_fails: false,
            panics_left: AtomicUsize::new(0),
            poll_delay: Duration::ZERO,
            already_queued: false,
            polls: AtomicUsize::new(0),
            active_polls: AtomicUsize::new(0),
            max_concurrent_polls: AtomicUsize::new(0),
            scheduled: Mutex::new(Vec::new()),
        }
    }

    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn not_buildable(mut self) -> Self {
        self.buildable = false;
        self
    }

    pub fn with_pending_changes(self, pending: bool) -> Self {
        self.pending_changes.store(pending, Ordering::SeqCst);
        self
    }

    pub fn with_history(mut self, last_build: u32, last_unsuccessful_build: Option<u32>) -> Self {
        self.history = BuildHistory {
            last_build: Some(last_build),
            last_unsuccessful_build,
        };
        self
    }

    pub fn with_configurations(mut self, configurations: Vec<ProjectHandle>) -> Self {
        self.configurations = Some(configurations);
        self
    }

    pub fn failing_poll(mut self) -> Self {
        self.poll_fails = true;
        self
    }

    /// The first `count` polls panic.
    pub fn panicking_polls(self, count: usize) -> Self {
        self.panics_left.store(count, Ordering::SeqCst);
        self
    }

    pub fn slow_poll(mut self, delay: Duration) -> Self {
        self.poll_delay = delay;
        self
    }

    pub fn already_queued(mut self) -> Self {
        self.already_queued = true;
        self
    }

    pub fn into_handle(self) -> Arc<FakeProject> {
        Arc::new(self)
    }

    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrent_polls.load(Ordering::SeqCst)
    }

    pub fn scheduled(&self) -> Vec<ScheduleRequest> {
        self.scheduled.lock().unwrap().clone()
    }
}

#[async_trait]
impl Project for FakeProject {
    fn id(&self) -> &ProjectId {
        &self.id
    }

    fn requires_exclusive_workspace(&self) -> bool {
        self.exclusive
    }

    fn is_disabled(&self) -> bool {
        self.disabled
    }

    fn is_buildable(&self) -> bool {
        self.buildable
    }

    fn quiet_period(&self) -> Duration {
        Duration::from_secs(5)
    }

    fn history(&self) -> BuildHistory {
        self.history
    }

    fn matrix_configurations(&self) -> Option<Vec<ProjectHandle>> {
        self.configurations.clone()
    }

    async fn poll(&self, _listener: &dyn TaskListener) -> Result<PollOutcome> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        if self
            .panics_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            panic!("SCM plugin crashed while polling {}", self.id);
        }
        let active = self.active_polls.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent_polls.fetch_max(active, Ordering::SeqCst);

        if !self.poll_delay.is_zero() {
            tokio::time::sleep(self.poll_delay).await;
        }

        self.active_polls.fetch_sub(1, Ordering::SeqCst);

        if self.poll_fails {
            return Err(Error::PollFailed {
                project: self.id.to_string(),
                reason: "repository unreachable".to_string(),
            });
        }

        Ok(if self.pending_changes.load(Ordering::SeqCst) {
            PollOutcome::Changes
        } else {
            PollOutcome::NoChanges
        })
    }

    async fn schedule_build(&self, request: ScheduleRequest) -> Result<ScheduleOutcome> {
        self.scheduled.lock().unwrap().push(request);
        Ok(ScheduleOutcome::from_accepted(!self.already_queued))
    }
}

/// Name → project lookup.
#[derive(Default)]
pub struct FakeResolver {
    projects: HashMap<String, ProjectHandle>,
}

impl FakeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, project: &Arc<FakeProject>) -> Self {
        let handle: ProjectHandle = project.clone();
        self.projects.insert(project.id().to_string(), handle);
        self
    }
}

impl ProjectResolver for FakeResolver {
    fn resolve(&self, name: &str) -> Option<ProjectHandle> {
        self.projects.get(name).cloned()
    }

    fn project_names(&self) -> Vec<String> {
        self.projects.keys().cloned().collect()
    }
}

/// Captures console lines.
#[derive(Default)]
pub struct RecordingListener {
    lines: Mutex<Vec<String>>,
}

impl RecordingListener {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }
}

impl TaskListener for RecordingListener {
    fn info(&self, message: &str) {
        self.lines.lock().unwrap().push(message.to_string());
    }
}

pub fn handle(project: &Arc<FakeProject>) -> ProjectHandle {
    project.clone()
}

pub fn engine() -> Arc<TriggerDecisionEngine> {
    let detector = Arc::new(ScmChangeDetector::new());
    let poller = Arc::new(SerializedPollScheduler::new(
        detector.clone(),
        SchedulerConfig::default(),
    ));
    Arc::new(TriggerDecisionEngine::new(detector, poller))
}

pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,cascade_trigger=debug")),
        )
        .with_test_writer()
        .try_init();
}
