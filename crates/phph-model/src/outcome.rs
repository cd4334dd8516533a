//! Classification outcomes for observed states.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The classification a test's `check` assigns to an observed state.
///
/// Outcomes are ordered so that `max` over a set of them yields the correct
/// aggregate: all accepted ⇒ accepted; any rejected (and none unknown) ⇒
/// rejected; any unknown ⇒ unknown.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    /// `check` returned true for the state.
    Accepted,
    /// `check` returned false for the state.
    Rejected,
    /// The test declined to classify the state.
    ///
    /// Currently produced only as the placeholder when checking is disabled;
    /// the classification stays representable for future test APIs.
    Unknown,
}

impl Outcome {
    /// Convert a `check` return value into an outcome.
    #[must_use]
    pub const fn from_check(accepted: bool) -> Self {
        if accepted {
            Self::Accepted
        } else {
            Self::Rejected
        }
    }

    /// Static string form, matching the CLI's `exit-on-*` suffixes.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "pass",
            Self::Rejected => "fail",
            Self::Unknown => "unknown",
        }
    }

    /// All outcomes, in aggregation order.
    pub fn all() -> impl Iterator<Item = Self> {
        [Self::Accepted, Self::Rejected, Self::Unknown].into_iter()
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pass" => Ok(Self::Accepted),
            "fail" => Ok(Self::Rejected),
            "unknown" => Ok(Self::Unknown),
            other => Err(other.to_owned()),
        }
    }
}
