//! Matrix fan-out of configured downstream edges.

use crate::edge::DependencyEdge;
use crate::policy::TriggerPolicy;
use cascade_core::ports::ProjectHandle;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// When a matrix upstream should trigger its downstream projects.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatrixMode {
    #[default]
    None,
    OnlyParent,
    OnlyConfigurations,
    Both,
}

impl MatrixMode {
    pub const ALL: [MatrixMode; 4] = [
        MatrixMode::None,
        MatrixMode::OnlyParent,
        MatrixMode::OnlyConfigurations,
        MatrixMode::Both,
    ];

    pub fn description(self) -> &'static str {
        match self {
            MatrixMode::None => "No matrix-specific triggering",
            MatrixMode::OnlyParent => "Trigger only the parent job",
            MatrixMode::OnlyConfigurations => "Trigger for each configuration",
            MatrixMode::Both => "Trigger for parent and each configuration",
        }
    }

    /// Whether the parent (aggregate) build is an upstream.
    ///
    /// `ONLY_CONFIGURATIONS` deliberately registers no parent edge, so a matrix
    /// with N configurations yields exactly N edges per downstream.
    pub fn includes_parent(self) -> bool {
        !matches!(self, MatrixMode::OnlyConfigurations)
    }

    /// Whether every child configuration is an upstream.
    pub fn includes_configurations(self) -> bool {
        matches!(self, MatrixMode::OnlyConfigurations | MatrixMode::Both)
    }

    /// Whether the matrix end-of-run hook triggers downstream once.
    pub fn triggers_on_matrix_end(self) -> bool {
        matches!(self, MatrixMode::OnlyParent | MatrixMode::Both)
    }
}

/// Expands one configured trigger into concrete dependency edges.
pub struct MatrixFanoutPolicy;

impl MatrixFanoutPolicy {
    pub fn new() -> Self {
        Self
    }

    /// Produce the edges for `owner` and its resolved downstream projects.
    ///
    /// A plain owner gets one edge per downstream. A matrix owner gets parent
    /// edges unless the mode is `ONLY_CONFIGURATIONS`, plus one edge per active
    /// configuration and downstream when the mode includes configurations.
    pub fn expand(
        &self,
        owner: &ProjectHandle,
        downstream: &[ProjectHandle],
        policy: &Arc<TriggerPolicy>,
    ) -> Vec<DependencyEdge> {
        let Some(configurations) = owner.matrix_configurations() else {
            return self.edges_from(owner, downstream, policy);
        };

        let mode = policy.matrix_mode();
        let mut edges = Vec::new();

        if mode.includes_parent() {
            edges.extend(self.edges_from(owner, downstream, policy));
        }

        if mode.includes_configurations() {
            for configuration in &configurations {
                edges.extend(self.edges_from(configuration, downstream, policy));
            }
        }

        debug!(
            owner = %owner.id(),
            mode = ?mode,
            configurations = configurations.len(),
            edges = edges.len(),
            "Expanded matrix trigger"
        );

        edges
    }

    fn edges_from(
        &self,
        upstream: &ProjectHandle,
        downstream: &[ProjectHandle],
        policy: &Arc<TriggerPolicy>,
    ) -> Vec<DependencyEdge> {
        downstream
            .iter()
            .map(|d| DependencyEdge::new(upstream.clone(), d.clone(), Arc::clone(policy)))
            .collect()
    }
}

impl Default for MatrixFanoutPolicy {
    fn default() -> Self {
        Self::new()
    }
}
