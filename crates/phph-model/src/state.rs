//! Observed states and their per-state bookkeeping.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Manifest, Outcome};

/// An observed final state: the values of every cell in the environment at
/// the post-barrier, atomic cells first, then non-atomic, each in slot order.
///
/// States compare by value and serve as histogram keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct State(Box<[i32]>);

impl State {
    /// Capture a state from a snapshot of cell values.
    #[must_use]
    pub fn from_values(values: &[i32]) -> Self {
        Self(values.into())
    }

    /// The cell values, in state order.
    #[must_use]
    pub fn values(&self) -> &[i32] {
        &self.0
    }

    /// Number of cells in the state.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the state has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Pair each value with its cell name from the manifest.
    ///
    /// Cells beyond the manifest's width (or vice versa) are truncated; the
    /// engine guarantees the two always agree.
    pub fn named<'a>(&'a self, manifest: &'a Manifest) -> impl Iterator<Item = (&'a str, i32)> {
        manifest.cell_names().zip(self.0.iter().copied())
    }

    /// Render the state as `name=value` pairs for diagnostics.
    #[must_use]
    pub fn describe(&self, manifest: &Manifest) -> String {
        use std::fmt::Write as _;

        let mut out = String::new();
        for (i, (name, value)) in self.named(manifest).enumerate() {
            if i > 0 {
                out.push(' ');
            }
            let _ = write!(out, "{name}={value}");
        }
        out
    }
}

/// Lookup by raw value slice without materialising a `State`.
impl Borrow<[i32]> for State {
    fn borrow(&self) -> &[i32] {
        &self.0
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

/// Aggregated bookkeeping for one observed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateInfo {
    /// How many iterations ended in this state.
    pub occurs: u64,
    /// The classification `check` assigned on first sight.
    pub outcome: Outcome,
    /// The iteration number at which the state was first observed.
    pub first_iteration: u64,
}

impl StateInfo {
    /// Bookkeeping for a state seen for the first time.
    #[must_use]
    pub const fn first(outcome: Outcome, iteration: u64) -> Self {
        Self {
            occurs: 1,
            outcome,
            first_iteration: iteration,
        }
    }

    /// Record another occurrence.
    pub fn bump(&mut self) {
        self.occurs = self.occurs.saturating_add(1);
    }
}
