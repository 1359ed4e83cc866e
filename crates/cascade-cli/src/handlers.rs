//! Command handlers.

use crate::commands::SchemaTarget;
use crate::config::WorkspaceFile;
use crate::host::StaticHost;
use cascade_core::build::{Build, ChangeEntry, ChangeSet};
use cascade_core::cause::ScheduleRequest;
use cascade_core::ports::{ProjectHandle, ProjectResolver, TaskListener};
use cascade_core::{BuildResult, Error, ProjectId};
use cascade_trigger::changes::ScmChangeDetector;
use cascade_trigger::trigger::execute_downstream;
use cascade_trigger::validation::{complete_project_names, nearest_name, validate_child_projects};
use cascade_trigger::{
    DownstreamTrigger, ProjectGraph, SchedulerConfig, SerializedPollScheduler, TriggerConfig,
    TriggerDecisionEngine,
};
use console::style;
use std::path::Path;
use std::sync::Arc;

/// Writes build console lines to stdout.
struct ConsoleListener;

impl TaskListener for ConsoleListener {
    fn info(&self, message: &str) {
        println!("  {} {}", style("│").dim(), message);
    }

    fn warn(&self, message: &str) {
        println!("  {} {}", style("│").yellow(), message);
    }
}

fn new_engine() -> Arc<TriggerDecisionEngine> {
    let detector = Arc::new(ScmChangeDetector::new());
    let poller = Arc::new(SerializedPollScheduler::new(
        detector.clone(),
        SchedulerConfig::default(),
    ));
    Arc::new(TriggerDecisionEngine::new(detector, poller))
}

fn resolve_owner(host: &StaticHost, owner: &str) -> cascade_core::Result<ProjectHandle> {
    host.resolve(owner).ok_or_else(|| Error::ProjectNotFound {
        name: owner.to_string(),
        suggestion: nearest_name(owner, &host.project_names()).unwrap_or_default(),
    })
}

/// Every trigger of the workspace with its owner, plus the graph they build.
fn load_triggers(
    workspace: &WorkspaceFile,
    host: &StaticHost,
    engine: &Arc<TriggerDecisionEngine>,
) -> anyhow::Result<(Vec<(ProjectHandle, DownstreamTrigger)>, ProjectGraph)> {
    let mut triggers = Vec::with_capacity(workspace.triggers.len());
    let mut graph = ProjectGraph::new();

    for (owner, config) in &workspace.triggers {
        let owner = resolve_owner(host, owner)?;
        let trigger = DownstreamTrigger::new(config.clone(), engine.clone())?;
        trigger.build_dependency_graph(&owner, host, &mut graph);
        triggers.push((owner, trigger));
    }

    Ok((triggers, graph))
}

/// Validate every trigger configuration of a workspace file.
pub fn validate(path: &Path) -> anyhow::Result<()> {
    let workspace = WorkspaceFile::load(path)?;
    let host = StaticHost::from_workspace(&workspace);
    let failures = validation_failures(&workspace, &host);

    for owner in workspace.triggers.keys() {
        match failures.iter().find(|(o, _)| o == owner) {
            Some((_, err)) => println!("{} {}: {}", style("✗").red(), style(owner).bold(), err),
            None => println!("{} {}", style("✓").green(), style(owner).bold()),
        }
    }

    if !failures.is_empty() {
        anyhow::bail!("{} invalid trigger configuration(s)", failures.len());
    }
    println!("  Projects: {}", workspace.projects.len());
    println!("  Triggers: {}", workspace.triggers.len());
    Ok(())
}

fn validation_failures(workspace: &WorkspaceFile, host: &StaticHost) -> Vec<(String, Error)> {
    workspace
        .triggers
        .iter()
        .filter_map(|(owner, config)| {
            let checked = resolve_owner(host, owner)
                .and_then(|_| cascade_trigger::config::migrate(config.clone()))
                .and_then(|config| validate_child_projects(&config.child_projects, host));
            checked.err().map(|err| (owner.clone(), err))
        })
        .collect()
}

/// Print the dependency edges and a topological build order.
pub fn graph(path: &Path) -> anyhow::Result<()> {
    let workspace = WorkspaceFile::load(path)?;
    let host = StaticHost::from_workspace(&workspace);
    let (_, graph) = load_triggers(&workspace, &host, &new_engine())?;

    println!("{} {} edge(s)", style("▶").cyan(), graph.edge_count());
    for edge in graph.all_edges() {
        let policy = edge.policy();
        println!(
            "  {}  {} {} {}",
            edge,
            style(policy.strategy().display_name()).dim(),
            style(policy.threshold()).dim(),
            style(policy.matrix_mode().description()).dim(),
        );
    }

    let order: Vec<String> = graph
        .topological_order()?
        .into_iter()
        .map(ProjectId::to_string)
        .collect();
    println!("{} Build order: {}", style("✓").green(), order.join(", "));
    Ok(())
}

/// Replay a completed build against the workspace.
pub async fn simulate(
    path: &Path,
    project: &str,
    number: u32,
    result: &str,
    changes: Vec<String>,
    matrix_end: bool,
) -> anyhow::Result<()> {
    let workspace = WorkspaceFile::load(path)?;
    let result: BuildResult = result.parse()?;
    let build = Build::new(project, number, result)
        .with_changes(ChangeSet::new(changes.into_iter().map(ChangeEntry::new).collect()));

    println!(
        "{} {} #{} finished: {}",
        style("▶").cyan(),
        style(project).bold(),
        number,
        result
    );

    let scheduled = run_simulation(&workspace, &build, matrix_end, &ConsoleListener).await?;

    if scheduled.is_empty() {
        println!("{} Nothing scheduled", style("i").blue());
    }
    for (project, request) in scheduled {
        println!(
            "{} {} ({}, quiet period {}s)",
            style("✓").green(),
            style(&project).bold(),
            request.cause.short_description(),
            request.quiet_period.as_secs()
        );
    }
    Ok(())
}

/// Run one build completion through the triggers and wait for every
/// deferred poll to finish. Returns what each project got scheduled.
pub async fn run_simulation(
    workspace: &WorkspaceFile,
    build: &Build,
    matrix_end: bool,
    listener: &dyn TaskListener,
) -> anyhow::Result<Vec<(ProjectId, ScheduleRequest)>> {
    let host = StaticHost::from_workspace(workspace);
    let engine = new_engine();
    let (triggers, graph) = load_triggers(workspace, &host, &engine)?;

    if matrix_end {
        let (_, trigger) = triggers
            .iter()
            .find(|(owner, _)| owner.id() == &build.project)
            .ok_or_else(|| anyhow::anyhow!("no trigger configured on {}", build.project))?;
        if !trigger.on_matrix_build_end(build, &graph, listener, &[]).await {
            listener.info(&format!(
                "{} does not trigger on matrix end",
                trigger.policy().matrix_mode().description()
            ));
        }
    } else {
        execute_downstream(&engine, build, graph.edges_from(&build.project), listener, &[]).await;
    }

    engine.poller().shutdown().await;
    Ok(host.scheduled().await)
}

/// Print project names starting with `prefix`.
pub fn complete(path: &Path, prefix: &str) -> anyhow::Result<()> {
    let workspace = WorkspaceFile::load(path)?;
    let host = StaticHost::from_workspace(&workspace);
    for name in complete_project_names(prefix, &host) {
        println!("{name}");
    }
    Ok(())
}

/// Apply a project rename to the workspace file.
pub fn rename(path: &Path, old_name: &str, new_name: &str, write: bool) -> anyhow::Result<()> {
    let mut workspace = WorkspaceFile::load(path)?;
    let changed = workspace.rename_project(old_name, new_name);

    if changed.is_empty() {
        println!("{} No trigger references {}", style("i").blue(), old_name);
    }
    for owner in &changed {
        println!("{} Updated trigger on {}", style("✓").green(), style(owner).bold());
    }

    if write {
        workspace.save(path)?;
        println!("{} Saved {}", style("✓").green(), path.display());
    } else {
        print!("{}", serde_yaml::to_string(&workspace)?);
    }
    Ok(())
}

/// Print a JSON schema for configuration files.
pub fn schema(target: SchemaTarget) -> anyhow::Result<()> {
    let schema = match target {
        SchemaTarget::Trigger => schemars::schema_for!(TriggerConfig),
        SchemaTarget::Workspace => schemars::schema_for!(WorkspaceFile),
    };
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
