//! Ways a running test halts: rotating its threads or exiting.

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU8, Ordering};

use phph_model::Outcome;

use crate::obs::ObsSummary;

/// What the test's threads should do once a halt fires.
///
/// Ordered so that `max` over fired rules picks the stronger action:
/// exiting beats rotating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HaltAction {
    /// Tear down the worker threads and respawn them over a fresh
    /// environment.
    Rotate,
    /// End the run.
    Exit,
}

/// When a halt rule fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltCondition {
    /// Fire on every multiple of `n` completed iterations.
    EveryN(NonZeroU64),
    /// Fire whenever an observation classifies as `outcome`.
    OnOutcome(Outcome),
}

/// A halt condition paired with the action it triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HaltRule {
    pub condition: HaltCondition,
    pub action: HaltAction,
}

impl HaltCondition {
    /// Pair this condition with an exit action.
    #[must_use]
    pub const fn exit(self) -> HaltRule {
        HaltRule {
            condition: self,
            action: HaltAction::Exit,
        }
    }

    /// Pair this condition with a rotate action.
    #[must_use]
    pub const fn rotate(self) -> HaltRule {
        HaltRule {
            condition: self,
            action: HaltAction::Rotate,
        }
    }
}

impl HaltRule {
    /// The action to take given the latest observation, if this rule fires.
    #[must_use]
    pub fn fires(&self, summary: &ObsSummary) -> Option<HaltAction> {
        let fired = match self.condition {
            HaltCondition::EveryN(n) => summary.iterations % n.get() == 0,
            HaltCondition::OnOutcome(outcome) => summary.outcome == outcome,
        };
        fired.then_some(self.action)
    }
}

// ---------------------------------------------------------------------------
// HaltFlag
// ---------------------------------------------------------------------------

const FLAG_RUN: u8 = 0;
const FLAG_ROTATE: u8 = 1;
const FLAG_EXIT: u8 = 2;

/// The worker-visible halt state for one epoch.
///
/// Set only inside the serialised observation window (or before workers are
/// armed), read by every worker at its pre-barrier wake-up; the barrier
/// passage orders the set before every read that matters.
#[derive(Default)]
pub struct HaltFlag {
    state: AtomicU8,
}

impl HaltFlag {
    /// A flag in the running state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise a halt action.
    pub fn set(&self, action: HaltAction) {
        let bits = match action {
            HaltAction::Rotate => FLAG_ROTATE,
            HaltAction::Exit => FLAG_EXIT,
        };
        self.state.store(bits, Ordering::Release);
    }

    /// The pending halt action, if any.
    #[must_use]
    pub fn get(&self) -> Option<HaltAction> {
        match self.state.load(Ordering::Acquire) {
            FLAG_ROTATE => Some(HaltAction::Rotate),
            FLAG_EXIT => Some(HaltAction::Exit),
            _ => None,
        }
    }
}
