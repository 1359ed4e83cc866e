//! Immutable trigger policy governing one or more dependency edges.

use crate::config::{CURRENT_CONFIG_VERSION, TriggerConfig, migrate, parse_threshold};
use crate::matrix::MatrixMode;
use crate::strategy::ThresholdStrategy;
use cascade_core::ports::{ProjectHandle, ProjectResolver};
use cascade_core::{BuildResult, Error};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerPolicy {
    child_projects: Vec<String>,
    threshold: BuildResult,
    strategy: ThresholdStrategy,
    only_if_downstream_changes: bool,
    only_if_local_changes: bool,
    matrix_mode: MatrixMode,
}

impl TriggerPolicy {
    pub fn new(child_projects: Vec<String>, threshold: BuildResult) -> Self {
        Self {
            child_projects,
            threshold,
            strategy: ThresholdStrategy::AndHigher,
            only_if_downstream_changes: false,
            only_if_local_changes: false,
            matrix_mode: MatrixMode::None,
        }
    }

    pub fn with_strategy(mut self, strategy: ThresholdStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_downstream_changes(mut self, enabled: bool) -> Self {
        self.only_if_downstream_changes = enabled;
        self
    }

    pub fn with_local_changes(mut self, enabled: bool) -> Self {
        self.only_if_local_changes = enabled;
        self
    }

    pub fn with_matrix_mode(mut self, mode: MatrixMode) -> Self {
        self.matrix_mode = mode;
        self
    }

    pub fn child_projects(&self) -> &[String] {
        &self.child_projects
    }

    pub fn threshold(&self) -> BuildResult {
        self.threshold
    }

    pub fn strategy(&self) -> ThresholdStrategy {
        self.strategy
    }

    pub fn only_if_downstream_changes(&self) -> bool {
        self.only_if_downstream_changes
    }

    pub fn only_if_local_changes(&self) -> bool {
        self.only_if_local_changes
    }

    pub fn matrix_mode(&self) -> MatrixMode {
        self.matrix_mode
    }

    /// Whether `actual` passes the threshold gate.
    pub fn accepts(&self, actual: BuildResult) -> bool {
        self.strategy.evaluate(self.threshold, actual)
    }

    /// Resolve downstream names lazily against a project group.
    ///
    /// Names that no longer resolve are skipped.
    pub fn resolve_children(&self, resolver: &dyn ProjectResolver) -> Vec<ProjectHandle> {
        self.child_projects
            .iter()
            .filter_map(|name| {
                let project = resolver.resolve(name);
                if project.is_none() {
                    debug!(project = %name, "Downstream project not found, skipping");
                }
                project
            })
            .collect()
    }

    /// Current-version configuration equivalent to this policy.
    pub fn to_config(&self) -> TriggerConfig {
        TriggerConfig {
            version: CURRENT_CONFIG_VERSION,
            child_projects: self.child_projects.join(","),
            threshold: Some(self.threshold.to_string()),
            strategy: Some(self.strategy),
            only_if_scm_changes: self.only_if_downstream_changes,
            only_if_local_scm_changes: self.only_if_local_changes,
            matrix_trigger: Some(self.matrix_mode),
            trigger_only_once_when_matrix_ends: None,
        }
    }
}

impl TryFrom<TriggerConfig> for TriggerPolicy {
    type Error = Error;

    fn try_from(config: TriggerConfig) -> Result<Self, Self::Error> {
        let config = migrate(config)?;
        let threshold = match config.threshold.as_deref() {
            Some(value) => parse_threshold(value)?,
            None => BuildResult::Success,
        };

        Ok(Self {
            child_projects: config.child_project_names(),
            threshold,
            strategy: config.strategy.unwrap_or_default(),
            only_if_downstream_changes: config.only_if_scm_changes,
            only_if_local_changes: config.only_if_local_scm_changes,
            matrix_mode: config.matrix_trigger.unwrap_or_default(),
        })
    }
}

impl TryFrom<&TriggerConfig> for TriggerPolicy {
    type Error = Error;

    fn try_from(config: &TriggerConfig) -> Result<Self, Self::Error> {
        Self::try_from(config.clone())
    }
}
