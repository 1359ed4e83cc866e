//! Downstream triggering for Cascade.
//!
//! When an upstream build finishes, every statically declared downstream edge
//! is evaluated by the [`engine::TriggerDecisionEngine`]. Edges are produced
//! by [`matrix::MatrixFanoutPolicy`] whenever the host rebuilds its dependency
//! graph, and SCM polls that need an exclusive workspace are serialized per
//! project by [`poller::SerializedPollScheduler`].

pub mod changes;
pub mod config;
pub mod edge;
pub mod engine;
pub mod graph;
pub mod matrix;
pub mod poller;
pub mod policy;
pub mod strategy;
pub mod trigger;
pub mod validation;

pub use config::TriggerConfig;
pub use edge::DependencyEdge;
pub use engine::{Decision, TriggerDecisionEngine};
pub use graph::{DependencyGraph, DependencyGraphBuilder, ProjectGraph};
pub use matrix::{MatrixFanoutPolicy, MatrixMode};
pub use poller::{PollTask, SchedulerConfig, SerializedPollScheduler};
pub use policy::TriggerPolicy;
pub use strategy::ThresholdStrategy;
pub use trigger::DownstreamTrigger;
