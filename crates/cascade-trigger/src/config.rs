//! Serialized trigger configuration and its load-time migration.
//!
//! Older configurations are upgraded once, when they are loaded:
//!
//! - version 1 had no `strategy`; it always compared "equal or over".
//! - version 2 expressed matrix behaviour as the boolean
//!   `trigger_only_once_when_matrix_ends`.
//! - version 3 is the current shape with `matrix_trigger`.

use crate::matrix::MatrixMode;
use crate::strategy::ThresholdStrategy;
use cascade_core::{BuildResult, Error, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CURRENT_CONFIG_VERSION: u32 = 3;

fn legacy_version() -> u32 {
    1
}

/// One downstream trigger as it appears in project configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TriggerConfig {
    /// Configuration shape version. Missing means version 1.
    #[serde(default = "legacy_version")]
    pub version: u32,
    /// Comma-separated list of downstream project names.
    pub child_projects: String,
    /// Threshold result name (SUCCESS, UNSTABLE, FAILURE, ABORTED).
    #[serde(default)]
    pub threshold: Option<String>,
    #[serde(default)]
    pub strategy: Option<ThresholdStrategy>,
    /// Only trigger when the downstream project has pending SCM changes.
    #[serde(default)]
    pub only_if_scm_changes: bool,
    /// Only trigger when the upstream build itself recorded SCM changes.
    #[serde(default)]
    pub only_if_local_scm_changes: bool,
    #[serde(default)]
    pub matrix_trigger: Option<MatrixMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_only_once_when_matrix_ends: Option<bool>,
}

impl TriggerConfig {
    /// A current-version configuration.
    pub fn new(child_projects: impl Into<String>, threshold: BuildResult) -> Self {
        Self {
            version: CURRENT_CONFIG_VERSION,
            child_projects: child_projects.into(),
            threshold: Some(threshold.to_string()),
            strategy: Some(ThresholdStrategy::AndHigher),
            only_if_scm_changes: false,
            only_if_local_scm_changes: false,
            matrix_trigger: Some(MatrixMode::None),
            trigger_only_once_when_matrix_ends: None,
        }
    }

    pub fn with_strategy(mut self, strategy: ThresholdStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn with_scm_changes(mut self, only_if_scm_changes: bool) -> Self {
        self.only_if_scm_changes = only_if_scm_changes;
        self
    }

    pub fn with_local_changes(mut self, only_if_local_scm_changes: bool) -> Self {
        self.only_if_local_scm_changes = only_if_local_scm_changes;
        self
    }

    pub fn with_matrix_trigger(mut self, mode: MatrixMode) -> Self {
        self.matrix_trigger = Some(mode);
        self
    }

    /// Parse a YAML document and upgrade it to the current version.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let raw: TriggerConfig =
            serde_yaml::from_str(yaml).map_err(|e| Error::Serialization(e.to_string()))?;
        migrate(raw)
    }

    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Downstream names in configured order, trimmed, blanks dropped.
    pub fn child_project_names(&self) -> Vec<String> {
        split_project_names(&self.child_projects)
    }

    /// Rewrite references to a renamed project.
    ///
    /// Returns `true` if the configuration changed and needs to be saved.
    pub fn on_project_renamed(&mut self, old_name: &str, new_name: &str) -> bool {
        if !self.child_projects.contains(old_name) {
            return false;
        }

        let mut changed = false;
        let projects: Vec<String> = self
            .child_projects
            .split(',')
            .map(|p| {
                if p.trim() == old_name {
                    changed = true;
                    new_name.to_string()
                } else {
                    p.to_string()
                }
            })
            .collect();

        if changed {
            self.child_projects = projects.join(",");
        }
        changed
    }
}

/// Split a comma-delimited project list.
pub fn split_project_names(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a configured threshold name. Unknown names are a configuration error.
pub fn parse_threshold(value: &str) -> Result<BuildResult> {
    value
        .parse()
        .map_err(|_| Error::InvalidConfiguration(format!("unknown threshold '{value}'")))
}

/// Upgrade a configuration of any supported version to the current shape.
pub fn migrate(mut config: TriggerConfig) -> Result<TriggerConfig> {
    if config.version > CURRENT_CONFIG_VERSION {
        return Err(Error::UnsupportedConfigVersion(config.version));
    }

    if config.strategy.is_none() {
        config.strategy = Some(ThresholdStrategy::AndHigher);
    }

    if let Some(only_once) = config.trigger_only_once_when_matrix_ends.take() {
        config.matrix_trigger = Some(if only_once {
            MatrixMode::OnlyParent
        } else {
            MatrixMode::OnlyConfigurations
        });
    }

    if config.matrix_trigger.is_none() {
        config.matrix_trigger = Some(MatrixMode::None);
    }

    let threshold = match config.threshold.as_deref() {
        None => BuildResult::Success,
        Some(value) => parse_threshold(value)?,
    };
    config.threshold = Some(threshold.to_string());

    config.version = CURRENT_CONFIG_VERSION;
    Ok(config)
}
