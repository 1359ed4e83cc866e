//! Host-facing downstream trigger.
//!
//! One [`DownstreamTrigger`] exists per configured upstream project. The host
//! calls [`DownstreamTrigger::build_dependency_graph`] whenever it recomputes
//! its graph and [`DownstreamTrigger::should_trigger_build`] once per outgoing
//! edge when a build of the owner completes. For matrix owners the host routes
//! the parent build's completion through
//! [`DownstreamTrigger::on_matrix_build_end`] instead, which fires once after
//! the last configuration has finished.

use crate::config::TriggerConfig;
use crate::edge::DependencyEdge;
use crate::engine::{Decision, TriggerDecisionEngine};
use crate::graph::{DependencyGraph, DependencyGraphBuilder, ProjectGraph};
use crate::policy::TriggerPolicy;
use cascade_core::build::Build;
use cascade_core::cause::{Action, Cause, ScheduleOutcome, ScheduleRequest};
use cascade_core::ports::{ProjectHandle, ProjectResolver, TaskListener};
use cascade_core::{ProjectId, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What happened to one downstream project during a fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerReport {
    pub downstream: ProjectId,
    pub decision: Decision,
    pub scheduled: Option<ScheduleOutcome>,
}

pub struct DownstreamTrigger {
    config: TriggerConfig,
    policy: Arc<TriggerPolicy>,
    engine: Arc<TriggerDecisionEngine>,
    builder: DependencyGraphBuilder,
}

impl DownstreamTrigger {
    /// Build a trigger from configuration. Invalid configuration fails here.
    pub fn new(config: TriggerConfig, engine: Arc<TriggerDecisionEngine>) -> Result<Self> {
        let config = crate::config::migrate(config)?;
        let policy = Arc::new(TriggerPolicy::try_from(&config)?);
        Ok(Self {
            config,
            policy,
            engine,
            builder: DependencyGraphBuilder::new(),
        })
    }

    pub fn config(&self) -> &TriggerConfig {
        &self.config
    }

    pub fn policy(&self) -> &Arc<TriggerPolicy> {
        &self.policy
    }

    /// Register this trigger's edges for `owner`.
    pub fn build_dependency_graph(
        &self,
        owner: &ProjectHandle,
        resolver: &dyn ProjectResolver,
        graph: &mut dyn DependencyGraph,
    ) -> usize {
        self.builder
            .build_dependency_graph(owner, &self.policy, resolver, graph)
    }

    /// Synchronous entry point for one edge.
    ///
    /// Returns `true` only for [`Decision::Trigger`]. A deferred poll returns
    /// `false`; the queued task schedules the build itself if it finds changes.
    pub async fn should_trigger_build(
        &self,
        edge: &DependencyEdge,
        build: &Build,
        listener: &dyn TaskListener,
        actions: &[Action],
    ) -> bool {
        self.engine
            .should_trigger(edge, build, listener, actions)
            .await
            .should_schedule()
    }

    /// Matrix end-of-run hook.
    ///
    /// When the matrix mode triggers on matrix end (`ONLY_PARENT`, `BOTH`),
    /// evaluates the parent's outgoing edges once and schedules the triggered
    /// builds, returning `true`. Otherwise does nothing and returns `false`.
    pub async fn on_matrix_build_end(
        &self,
        build: &Build,
        graph: &ProjectGraph,
        listener: &dyn TaskListener,
        actions: &[Action],
    ) -> bool {
        if !self.policy.matrix_mode().triggers_on_matrix_end() {
            debug!(project = %build.project, mode = ?self.policy.matrix_mode(), "Matrix end hook not enabled");
            return false;
        }

        info!(project = %build.project, build = build.number, "Matrix build finished, triggering downstream once");
        let edges = graph.edges_from(&build.project);
        execute_downstream(&self.engine, build, edges, listener, actions).await;
        true
    }

    /// Apply a project rename to the configured names.
    ///
    /// Returns `true` when the configuration changed and must be persisted.
    pub fn on_project_renamed(&mut self, old_name: &str, new_name: &str) -> Result<bool> {
        if !self.config.on_project_renamed(old_name, new_name) {
            return Ok(false);
        }
        self.policy = Arc::new(TriggerPolicy::try_from(&self.config)?);
        info!(old = old_name, new = new_name, "Downstream project renamed");
        Ok(true)
    }

    /// Evict the poll queue of a deleted project.
    pub fn on_project_deleted(&self, project: &ProjectId) -> bool {
        self.engine.poller().deregister(project)
    }
}

/// Evaluate every edge leaving `build.project` and schedule the triggered
/// downstream builds. Disabled downstream projects are skipped.
///
/// Failures are contained per edge and only logged.
pub async fn execute_downstream<'a>(
    engine: &TriggerDecisionEngine,
    build: &Build,
    edges: impl IntoIterator<Item = &'a DependencyEdge>,
    listener: &dyn TaskListener,
    actions: &[Action],
) -> Vec<TriggerReport> {
    let mut reports = Vec::new();

    for edge in edges {
        if edge.upstream_id() != &build.project {
            continue;
        }

        let downstream = edge.downstream();
        if downstream.is_disabled() {
            debug!(edge = %edge, "Downstream project disabled, skipping");
            continue;
        }

        let decision = engine.should_trigger(edge, build, listener, actions).await;
        let scheduled = if decision.should_schedule() {
            let request = ScheduleRequest {
                quiet_period: downstream.quiet_period(),
                cause: Cause::upstream(build),
                actions: actions.to_vec(),
            };
            match downstream.schedule_build(request).await {
                Ok(outcome) => {
                    match outcome {
                        ScheduleOutcome::Accepted => {
                            listener.info(&format!("Triggering a new build of {}", downstream.id()))
                        }
                        ScheduleOutcome::AlreadyQueued => listener.info(&format!(
                            "A build of {} is already in the queue",
                            downstream.id()
                        )),
                    }
                    Some(outcome)
                }
                Err(e) => {
                    warn!(edge = %edge, error = %e, "Failed to schedule downstream build");
                    None
                }
            }
        } else {
            None
        };

        reports.push(TriggerReport {
            downstream: downstream.id().clone(),
            decision,
            scheduled,
        });
    }

    reports
}
