//! The observer: per-iteration classification fed into the run's histogram.

use phph_model::{Histogram, Outcome, OutcomeMismatch};

/// Aggregates (state, outcome) observations across a run.
///
/// Only the per-iteration leader calls [`Observer::observe`], and leaders
/// are serialised by the post-barrier, so the observer needs no locking of
/// its own; the engine still keeps it behind the shared-state mutex so a
/// crashed worker cannot strand a partially updated histogram.
#[derive(Default)]
pub struct Observer {
    histogram: Histogram,
    iterations: u64,
}

/// What the observer knew immediately after an observation; input to the
/// halt rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObsSummary {
    /// Completed iterations so far, this one included.
    pub iterations: u64,
    /// This observation's classification.
    pub outcome: Outcome,
}

impl Observer {
    /// An observer with an empty histogram.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observed state.
    ///
    /// # Errors
    ///
    /// Returns [`OutcomeMismatch`] if the state was previously classified
    /// differently; the iteration is not counted in that case and the caller
    /// must treat the run as fatally flawed.
    pub fn observe(
        &mut self,
        values: &[i32],
        outcome: Outcome,
    ) -> Result<ObsSummary, OutcomeMismatch> {
        let info = self.histogram.record(values, outcome, self.iterations)?;
        self.iterations = self.iterations.saturating_add(1);
        Ok(ObsSummary {
            iterations: self.iterations,
            outcome: info.outcome,
        })
    }

    /// Completed iterations so far.
    #[must_use]
    pub const fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Consume the observer into its histogram.
    #[must_use]
    pub fn into_histogram(self) -> Histogram {
        self.histogram
    }

    /// Borrow the histogram accumulated so far.
    #[must_use]
    pub const fn histogram(&self) -> &Histogram {
        &self.histogram
    }
}
