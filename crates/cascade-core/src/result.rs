//! Build outcomes and their severity ordering.

use crate::Error;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome of a finished build.
///
/// Variants are declared from best to worst; the derived ordering is the
/// severity ordering, so a "better" result compares lower.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildResult {
    Success,
    Unstable,
    Failure,
    Aborted,
}

impl BuildResult {
    /// All results in severity order.
    pub const ALL: [BuildResult; 4] = [
        BuildResult::Success,
        BuildResult::Unstable,
        BuildResult::Failure,
        BuildResult::Aborted,
    ];

    pub fn is_better_or_equal_to(self, other: BuildResult) -> bool {
        self <= other
    }

    pub fn is_worse_or_equal_to(self, other: BuildResult) -> bool {
        self >= other
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BuildResult::Success => "SUCCESS",
            BuildResult::Unstable => "UNSTABLE",
            BuildResult::Failure => "FAILURE",
            BuildResult::Aborted => "ABORTED",
        }
    }
}

impl fmt::Display for BuildResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parse: unknown strings are rejected rather than mapped to a default.
impl FromStr for BuildResult {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BuildResult::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| Error::UnknownResult(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order() {
        assert!(BuildResult::Success < BuildResult::Unstable);
        assert!(BuildResult::Unstable < BuildResult::Failure);
        assert!(BuildResult::Failure < BuildResult::Aborted);
    }

    #[test]
    fn test_better_and_worse() {
        assert!(BuildResult::Success.is_better_or_equal_to(BuildResult::Unstable));
        assert!(BuildResult::Unstable.is_better_or_equal_to(BuildResult::Unstable));
        assert!(!BuildResult::Failure.is_better_or_equal_to(BuildResult::Unstable));
        assert!(BuildResult::Aborted.is_worse_or_equal_to(BuildResult::Failure));
    }

    #[test]
    fn test_parse_is_strict() {
        assert_eq!("UNSTABLE".parse::<BuildResult>().unwrap(), BuildResult::Unstable);
        assert!(matches!(
            "unstable".parse::<BuildResult>(),
            Err(Error::UnknownResult(_))
        ));
        assert!("BROKEN".parse::<BuildResult>().is_err());
    }
}
