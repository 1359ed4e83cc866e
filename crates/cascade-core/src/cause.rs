//! Build provenance and the schedule request handed to the host queue.

use crate::build::Build;
use crate::ids::{CauseId, ProjectId};
use crate::result::BuildResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Why a downstream build was started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Cause {
    Upstream(UpstreamCause),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamCause {
    pub id: CauseId,
    pub upstream_project: ProjectId,
    pub upstream_build: u32,
    pub upstream_result: BuildResult,
    pub created_at: DateTime<Utc>,
}

impl Cause {
    /// Provenance pointing at the given upstream build.
    pub fn upstream(build: &Build) -> Self {
        Cause::Upstream(UpstreamCause {
            id: CauseId::new(),
            upstream_project: build.project.clone(),
            upstream_build: build.number,
            upstream_result: build.result,
            created_at: Utc::now(),
        })
    }

    pub fn id(&self) -> CauseId {
        match self {
            Cause::Upstream(cause) => cause.id,
        }
    }

    /// Whether this cause was produced by the given upstream build.
    pub fn is_from(&self, project: &ProjectId, build_number: u32) -> bool {
        match self {
            Cause::Upstream(cause) => {
                &cause.upstream_project == project && cause.upstream_build == build_number
            }
        }
    }

    pub fn short_description(&self) -> String {
        match self {
            Cause::Upstream(cause) => format!(
                "Started by upstream project \"{}\" build number {}",
                cause.upstream_project, cause.upstream_build
            ),
        }
    }
}

/// Opaque host action carried from the upstream build to the scheduled one
/// (parameters, labels, and the like).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Action {
    pub fn new(kind: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }
}

/// A request to put a build of a project on the host queue.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleRequest {
    pub quiet_period: Duration,
    pub cause: Cause,
    pub actions: Vec<Action>,
}

/// Outcome reported by the host queue. Both variants are non-errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    Accepted,
    AlreadyQueued,
}

impl ScheduleOutcome {
    pub fn from_accepted(accepted: bool) -> Self {
        if accepted {
            ScheduleOutcome::Accepted
        } else {
            ScheduleOutcome::AlreadyQueued
        }
    }
}
