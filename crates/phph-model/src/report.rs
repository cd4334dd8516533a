//! The histogram accumulated during a run and the final report built from it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Manifest, Outcome, State, StateInfo};

/// The per-state aggregate for a run: a mapping from [`State`] to
/// [`StateInfo`], plus the running total.
///
/// `record` is the only mutator; the total count therefore always equals the
/// number of successful `record` calls, which the engine keeps equal to the
/// number of observed iterations.
#[derive(Debug, Default, Clone)]
pub struct Histogram {
    buckets: BTreeMap<State, StateInfo>,
    total: u64,
}

impl Histogram {
    /// An empty histogram.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observation.
    ///
    /// `iteration` is the zero-based index of the observed iteration; it is
    /// retained only for states seen for the first time. Returns the stored
    /// info for the state.
    ///
    /// # Errors
    ///
    /// Returns [`OutcomeMismatch`] if `outcome` disagrees with the outcome
    /// already stored for the same state. The histogram is left unchanged in
    /// that case; the caller treats this as a fatal test-contract violation.
    pub fn record(
        &mut self,
        values: &[i32],
        outcome: Outcome,
        iteration: u64,
    ) -> Result<StateInfo, OutcomeMismatch> {
        if let Some(info) = self.buckets.get_mut(values) {
            if info.outcome != outcome {
                return Err(OutcomeMismatch {
                    state: State::from_values(values),
                    stored: info.outcome,
                    latest: outcome,
                });
            }
            info.bump();
            self.total = self.total.saturating_add(1);
            return Ok(*info);
        }

        let info = StateInfo::first(outcome, iteration);
        self.buckets.insert(State::from_values(values), info);
        self.total = self.total.saturating_add(1);
        Ok(info)
    }

    /// Total number of recorded observations.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Number of distinct states observed.
    #[must_use]
    pub fn distinct_states(&self) -> usize {
        self.buckets.len()
    }

    /// Whether nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Iterate over the buckets in state order.
    pub fn iter(&self) -> impl Iterator<Item = (&State, &StateInfo)> {
        self.buckets.iter()
    }

    /// The aggregate outcome over every bucket (`max` ordering; `None` when
    /// empty).
    #[must_use]
    pub fn outcome(&self) -> Option<Outcome> {
        self.buckets.values().map(|info| info.outcome).max()
    }

    /// Consume the histogram into a [`Report`], naming cells via `manifest`.
    #[must_use]
    pub fn into_report(self, manifest: &Manifest, finish: FinishReason) -> Report {
        let Self { buckets, total } = self;
        let outcome = buckets.values().map(|info| info.outcome).max();
        let states = buckets
            .into_iter()
            .map(|(state, info)| StateReport {
                values: state
                    .named(manifest)
                    .map(|(name, value)| (name.to_owned(), value))
                    .collect(),
                info,
            })
            .collect();
        Report {
            finish,
            outcome,
            total,
            states,
        }
    }
}

/// Error returned when a state is re-observed with a different outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeMismatch {
    /// The state that was classified inconsistently.
    pub state: State,
    /// The outcome stored when the state was first seen.
    pub stored: Outcome,
    /// The conflicting outcome from the latest observation.
    pub latest: Outcome,
}

impl fmt::Display for OutcomeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "state [{}] classified {} after being stored as {}",
            self.state, self.latest, self.stored
        )
    }
}

impl std::error::Error for OutcomeMismatch {}

/// Why the run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "reason")]
pub enum FinishReason {
    /// The iteration cap was reached.
    Completed,
    /// An `exit-on-*` check policy fired.
    PolicyStop { on: Outcome },
    /// An external cancellation drained the run.
    Cancelled,
    /// A fatal mid-run failure; the report holds whatever was collected.
    Fatal { diagnostic: String, code: i32 },
}

impl FinishReason {
    /// Whether this finish should map to a non-zero process exit.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }
}

/// The final report of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Why the run ended.
    pub finish: FinishReason,
    /// Aggregate outcome over all states (`None` when no state was observed).
    pub outcome: Option<Outcome>,
    /// Total observation count; equals the sum of per-state `occurs`.
    pub total: u64,
    /// Per-state reports, keyed by cell name.
    pub states: Vec<StateReport>,
}

/// One state's entry in the final report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateReport {
    /// The state valuation, keyed by cell name.
    pub values: BTreeMap<String, i32>,
    /// Aggregated bookkeeping for the state.
    #[serde(flatten)]
    pub info: StateInfo,
}
