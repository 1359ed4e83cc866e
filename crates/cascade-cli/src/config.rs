//! Workspace description file.

use cascade_core::build::BuildHistory;
use cascade_trigger::TriggerConfig;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Projects plus the downstream triggers configured on them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WorkspaceFile {
    #[serde(default)]
    pub projects: Vec<ProjectSpec>,
    /// Owner project name → trigger configuration.
    #[serde(default)]
    pub triggers: BTreeMap<String, TriggerConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProjectSpec {
    pub name: String,
    #[serde(default)]
    pub exclusive_workspace: bool,
    #[serde(default)]
    pub disabled: bool,
    /// Matrix configuration names. Non-empty makes this a matrix project.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub configurations: Vec<String>,
    #[serde(default = "default_quiet_period")]
    pub quiet_period_secs: u64,
    /// Outcome a poll of this project reports.
    #[serde(default)]
    pub pending_changes: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_build: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_unsuccessful_build: Option<u32>,
}

fn default_quiet_period() -> u64 {
    5
}

impl ProjectSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exclusive_workspace: false,
            disabled: false,
            configurations: Vec::new(),
            quiet_period_secs: default_quiet_period(),
            pending_changes: false,
            last_build: None,
            last_unsuccessful_build: None,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        Duration::from_secs(self.quiet_period_secs)
    }

    pub fn history(&self) -> BuildHistory {
        BuildHistory {
            last_build: self.last_build,
            last_unsuccessful_build: self.last_unsuccessful_build,
        }
    }
}

impl WorkspaceFile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    /// Rename a project everywhere it is referenced.
    ///
    /// Returns the owners whose trigger configuration changed.
    pub fn rename_project(&mut self, old_name: &str, new_name: &str) -> Vec<String> {
        for project in &mut self.projects {
            if project.name == old_name {
                project.name = new_name.to_string();
            }
        }

        if let Some(config) = self.triggers.remove(old_name) {
            self.triggers.insert(new_name.to_string(), config);
        }

        self.triggers
            .iter_mut()
            .filter_map(|(owner, config)| {
                config
                    .on_project_renamed(old_name, new_name)
                    .then(|| owner.clone())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cascade_core::BuildResult;
    use cascade_trigger::MatrixMode;
    use pretty_assertions::assert_eq;

    const WORKSPACE: &str = r#"
projects:
  - name: lib
    last_build: 8
    last_unsuccessful_build: 7
  - name: matrix
    configurations: [linux, windows]
  - name: deploy
    exclusive_workspace: true
    pending_changes: true
    quiet_period_secs: 0
triggers:
  lib:
    child_projects: "matrix, deploy"
  matrix:
    version: 2
    child_projects: deploy
    threshold: UNSTABLE
    trigger_only_once_when_matrix_ends: true
"#;

    #[test]
    fn test_parse_workspace() {
        let workspace = WorkspaceFile::from_yaml(WORKSPACE).unwrap();

        assert_eq!(workspace.projects.len(), 3);
        assert!(workspace.projects[0].history().just_recovered());
        assert_eq!(workspace.projects[1].configurations, vec!["linux", "windows"]);
        assert_eq!(workspace.projects[1].quiet_period(), Duration::from_secs(5));
        assert!(workspace.projects[2].exclusive_workspace);
        assert_eq!(workspace.projects[2].quiet_period(), Duration::ZERO);

        let matrix = cascade_trigger::config::migrate(workspace.triggers["matrix"].clone()).unwrap();
        assert_eq!(matrix.matrix_trigger, Some(MatrixMode::OnlyParent));
        assert_eq!(matrix.threshold.as_deref(), Some(BuildResult::Unstable.as_str()));
    }

    #[test]
    fn test_rename_project_everywhere() {
        let mut workspace = WorkspaceFile::from_yaml(WORKSPACE).unwrap();

        let changed = workspace.rename_project("matrix", "grid");

        assert_eq!(changed, vec!["lib".to_string()]);
        assert_eq!(workspace.projects[1].name, "grid");
        assert!(workspace.triggers.contains_key("grid"));
        assert!(!workspace.triggers.contains_key("matrix"));
        assert_eq!(workspace.triggers["lib"].child_projects, "grid, deploy");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cascade.yaml");
        let workspace = WorkspaceFile::from_yaml(WORKSPACE).unwrap();

        workspace.save(&path).unwrap();
        let reloaded = WorkspaceFile::load(&path).unwrap();

        assert_eq!(reloaded, workspace);
    }
}
