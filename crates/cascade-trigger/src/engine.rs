//! Per-edge trigger decisions.

use crate::changes::ChangeDetector;
use crate::edge::DependencyEdge;
use crate::poller::{PollTask, SerializedPollScheduler};
use cascade_core::build::Build;
use cascade_core::cause::{Action, Cause};
use cascade_core::ports::TaskListener;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of evaluating one edge for one finished build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Schedule the downstream build now.
    Trigger,
    /// Do not schedule.
    Skip,
    /// A poll task was queued; it schedules on its own if changes are found.
    /// Nothing is scheduled by the caller.
    DeferredAsync,
}

impl Decision {
    pub fn should_schedule(self) -> bool {
        matches!(self, Decision::Trigger)
    }
}

/// Decides whether a finished upstream build triggers a downstream project.
///
/// Thread-safe; edges are evaluated independently.
pub struct TriggerDecisionEngine {
    detector: Arc<dyn ChangeDetector>,
    poller: Arc<SerializedPollScheduler>,
}

impl TriggerDecisionEngine {
    pub fn new(detector: Arc<dyn ChangeDetector>, poller: Arc<SerializedPollScheduler>) -> Self {
        Self { detector, poller }
    }

    pub fn poller(&self) -> &Arc<SerializedPollScheduler> {
        &self.poller
    }

    /// Evaluate `edge` for `build`.
    ///
    /// Gates run in order and short-circuit: threshold, downstream recovery,
    /// local changes, downstream changes. When the downstream SCM needs an
    /// exclusive workspace the poll is handed to the project's serialized
    /// queue and this returns [`Decision::DeferredAsync`] without blocking.
    pub async fn should_trigger(
        &self,
        edge: &DependencyEdge,
        build: &Build,
        listener: &dyn TaskListener,
        actions: &[Action],
    ) -> Decision {
        let policy = edge.policy();
        let downstream = edge.downstream();

        if !policy.accepts(build.result) {
            listener.info(&format!(
                "Downstream trigger condition not met: result must be {} {}",
                policy.strategy().display_name(),
                policy.threshold()
            ));
            debug!(
                edge = %edge,
                result = %build.result,
                strategy = %policy.strategy(),
                threshold = %policy.threshold(),
                "Threshold not met"
            );
            return Decision::Skip;
        }

        // A downstream job that just recovered from a failure always re-runs,
        // whatever the change-detection settings say.
        if downstream.history().just_recovered() {
            info!(edge = %edge, "Downstream project just recovered, triggering");
            return Decision::Trigger;
        }

        if policy.only_if_local_changes() {
            if self.detector.has_local_changes(build) {
                return Decision::Trigger;
            }
            listener.info(&format!(
                "Build #{} of {} had no SCM changes, not triggering {}",
                build.number,
                build.project,
                downstream.id()
            ));
            return Decision::Skip;
        }

        if policy.only_if_downstream_changes() {
            if downstream.requires_exclusive_workspace() {
                listener.info(&format!(
                    "Polling for SCM changes in {} asynchronously",
                    downstream.id()
                ));
                let task = PollTask::new(downstream.clone(), Cause::upstream(build), actions.to_vec());
                if let Err(e) = self.poller.submit(task) {
                    warn!(edge = %edge, error = %e, "Failed to queue poll task");
                }
                return Decision::DeferredAsync;
            }

            return match self.detector.poll(downstream.as_ref(), listener).await {
                Ok(true) => Decision::Trigger,
                Ok(false) => {
                    listener.info(&format!(
                        "Downstream project {} had no SCM changes",
                        downstream.id()
                    ));
                    Decision::Skip
                }
                Err(e) => {
                    listener.warn(&format!(
                        "Polling {} failed, treating as no changes: {}",
                        downstream.id(),
                        e
                    ));
                    warn!(edge = %edge, error = %e, "Poll failed, treating as no changes");
                    Decision::Skip
                }
            };
        }

        Decision::Trigger
    }
}
