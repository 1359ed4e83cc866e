//! Result threshold comparison.

use cascade_core::BuildResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a build result is compared against the configured threshold.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThresholdStrategy {
    /// The result is the threshold or better.
    #[default]
    AndHigher,
    /// The result is exactly the threshold.
    Exact,
    /// The result is the threshold or worse.
    AndLower,
}

type Comparator = fn(BuildResult, BuildResult) -> bool;

fn and_higher(threshold: BuildResult, actual: BuildResult) -> bool {
    actual.is_better_or_equal_to(threshold)
}

fn exact(threshold: BuildResult, actual: BuildResult) -> bool {
    actual == threshold
}

fn and_lower(threshold: BuildResult, actual: BuildResult) -> bool {
    actual.is_worse_or_equal_to(threshold)
}

impl ThresholdStrategy {
    pub const ALL: [ThresholdStrategy; 3] = [
        ThresholdStrategy::AndHigher,
        ThresholdStrategy::Exact,
        ThresholdStrategy::AndLower,
    ];

    const fn comparator(self) -> Comparator {
        match self {
            ThresholdStrategy::AndHigher => and_higher,
            ThresholdStrategy::Exact => exact,
            ThresholdStrategy::AndLower => and_lower,
        }
    }

    /// Whether `actual` satisfies `threshold` under this strategy.
    pub fn evaluate(self, threshold: BuildResult, actual: BuildResult) -> bool {
        (self.comparator())(threshold, actual)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ThresholdStrategy::AndHigher => "equal or over",
            ThresholdStrategy::Exact => "equal",
            ThresholdStrategy::AndLower => "equal or under",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ThresholdStrategy::AndHigher => "AND_HIGHER",
            ThresholdStrategy::Exact => "EXACT",
            ThresholdStrategy::AndLower => "AND_LOWER",
        }
    }
}

impl fmt::Display for ThresholdStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
