//! Dependency graph assembly.

use crate::edge::DependencyEdge;
use crate::matrix::MatrixFanoutPolicy;
use crate::policy::TriggerPolicy;
use cascade_core::ports::{ProjectHandle, ProjectResolver};
use cascade_core::{Error, ProjectId, Result};
use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Host dependency graph, as seen by the trigger core.
pub trait DependencyGraph {
    /// Register an edge. Returns `false` when the (upstream, downstream) pair
    /// is already governed by another edge.
    fn add_edge(&mut self, edge: DependencyEdge) -> bool;
}

/// In-memory project graph, rebuilt from configuration on every change.
#[derive(Debug, Default)]
pub struct ProjectGraph {
    graph: DiGraph<ProjectId, DependencyEdge>,
    name_to_index: HashMap<ProjectId, NodeIndex>,
}

impl ProjectGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&mut self, id: &ProjectId) -> NodeIndex {
        if let Some(&idx) = self.name_to_index.get(id) {
            return idx;
        }
        let idx = self.graph.add_node(id.clone());
        self.name_to_index.insert(id.clone(), idx);
        idx
    }

    /// Edges whose upstream is `project`.
    pub fn edges_from(&self, project: &ProjectId) -> Vec<&DependencyEdge> {
        self.edges(project, Direction::Outgoing)
    }

    /// Edges whose downstream is `project`.
    pub fn edges_into(&self, project: &ProjectId) -> Vec<&DependencyEdge> {
        self.edges(project, Direction::Incoming)
    }

    fn edges(&self, project: &ProjectId, direction: Direction) -> Vec<&DependencyEdge> {
        self.name_to_index
            .get(project)
            .map(|&idx| {
                self.graph
                    .edges_directed(idx, direction)
                    .map(|e| e.weight())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn contains_edge(&self, upstream: &ProjectId, downstream: &ProjectId) -> bool {
        match (self.name_to_index.get(upstream), self.name_to_index.get(downstream)) {
            (Some(&u), Some(&d)) => self.graph.contains_edge(u, d),
            _ => false,
        }
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn all_edges(&self) -> Vec<&DependencyEdge> {
        self.graph.edge_weights().collect()
    }

    /// Projects in trigger order. Fails when the configuration forms a cycle.
    pub fn topological_order(&self) -> Result<Vec<&ProjectId>> {
        toposort(&self.graph, None)
            .map(|indices| {
                indices
                    .iter()
                    .filter_map(|&idx| self.graph.node_weight(idx))
                    .collect()
            })
            .map_err(|cycle| {
                let at = self
                    .graph
                    .node_weight(cycle.node_id())
                    .map(|id| id.to_string())
                    .unwrap_or_default();
                Error::InvalidConfiguration(format!("dependency cycle through '{}'", at))
            })
    }
}

impl DependencyGraph for ProjectGraph {
    fn add_edge(&mut self, edge: DependencyEdge) -> bool {
        let upstream = self.node(edge.upstream_id());
        let downstream = self.node(edge.downstream_id());
        if self.graph.contains_edge(upstream, downstream) {
            debug!(edge = %edge, "Edge already registered, keeping the first");
            return false;
        }
        self.graph.add_edge(upstream, downstream, edge);
        true
    }
}

/// Registers the edges of one trigger configuration with the host graph.
pub struct DependencyGraphBuilder {
    fanout: MatrixFanoutPolicy,
}

impl DependencyGraphBuilder {
    pub fn new() -> Self {
        Self {
            fanout: MatrixFanoutPolicy::new(),
        }
    }

    /// Expand and register the edges owned by `owner`. Returns how many edges
    /// were newly added.
    pub fn build_dependency_graph(
        &self,
        owner: &ProjectHandle,
        policy: &Arc<TriggerPolicy>,
        resolver: &dyn ProjectResolver,
        graph: &mut dyn DependencyGraph,
    ) -> usize {
        let downstream = policy.resolve_children(resolver);
        let added = self
            .fanout
            .expand(owner, &downstream, policy)
            .into_iter()
            .filter(|edge| graph.add_edge(edge.clone()))
            .count();

        debug!(owner = %owner.id(), downstream = downstream.len(), added, "Registered trigger edges");
        added
    }
}

impl Default for DependencyGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
