//! Upstream → downstream dependency edges.

use crate::policy::TriggerPolicy;
use cascade_core::ProjectId;
use cascade_core::ports::ProjectHandle;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// One edge of the host's dependency graph, governed by a trigger policy.
///
/// Equality and hashing only look at the (upstream, downstream) pair: at most
/// one policy may govern a given pair, so the host graph de-duplicates edges
/// coming from different configuration sources.
#[derive(Clone)]
pub struct DependencyEdge {
    upstream: ProjectHandle,
    downstream: ProjectHandle,
    policy: Arc<TriggerPolicy>,
}

impl DependencyEdge {
    pub fn new(upstream: ProjectHandle, downstream: ProjectHandle, policy: Arc<TriggerPolicy>) -> Self {
        Self {
            upstream,
            downstream,
            policy,
        }
    }

    pub fn upstream(&self) -> &ProjectHandle {
        &self.upstream
    }

    pub fn downstream(&self) -> &ProjectHandle {
        &self.downstream
    }

    pub fn upstream_id(&self) -> &ProjectId {
        self.upstream.id()
    }

    pub fn downstream_id(&self) -> &ProjectId {
        self.downstream.id()
    }

    pub fn policy(&self) -> &TriggerPolicy {
        &self.policy
    }
}

impl PartialEq for DependencyEdge {
    fn eq(&self, other: &Self) -> bool {
        self.upstream_id() == other.upstream_id() && self.downstream_id() == other.downstream_id()
    }
}

impl Eq for DependencyEdge {}

impl Hash for DependencyEdge {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.upstream_id().hash(state);
        self.downstream_id().hash(state);
    }
}

impl fmt::Debug for DependencyEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyEdge")
            .field("upstream", self.upstream_id())
            .field("downstream", self.downstream_id())
            .field("policy", &self.policy)
            .finish()
    }
}

impl fmt::Display for DependencyEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.upstream_id(), self.downstream_id())
    }
}
