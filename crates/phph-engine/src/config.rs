//! Engine configuration: the knobs the CLI surface maps onto.

use std::fmt;
use std::num::NonZeroU64;
use std::str::FromStr;
use std::sync::Arc;

use phph_error::{Result, RunnerError};
use phph_model::Outcome;

use crate::halt::{HaltCondition, HaltRule};
use crate::permute::{Permuter, RandomPermuter, StaticPermuter};
use crate::sync::{KernelBarrier, Spinner, Synchroniser};

/// Default iteration cap when none is given.
pub const DEFAULT_ITERATIONS: u64 = 100_000;

/// Default seed for the permuter PRNG.
pub const DEFAULT_SEED: u64 = 0;

/// The full configuration of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    /// Iteration cap; 0 means unbounded.
    pub iterations: u64,
    /// Thread-rotation period; 0 means never rotate.
    pub period: u64,
    /// Synchroniser choice.
    pub sync: SyncChoice,
    /// Permuter choice.
    pub permute: PermuteChoice,
    /// Check policy.
    pub check: CheckPolicy,
    /// Seed for the permuter PRNG.
    pub seed: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            period: 0,
            sync: SyncChoice::Spinner,
            permute: PermuteChoice::Random,
            check: CheckPolicy::Report,
            seed: DEFAULT_SEED,
        }
    }
}

impl RunConfig {
    /// The halt rules this configuration implies.
    #[must_use]
    pub fn halt_rules(&self) -> Vec<HaltRule> {
        let mut rules = Vec::with_capacity(3);
        if let Some(n) = NonZeroU64::new(self.iterations) {
            rules.push(HaltCondition::EveryN(n).exit());
        }
        if let Some(n) = NonZeroU64::new(self.period) {
            rules.push(HaltCondition::EveryN(n).rotate());
        }
        if let CheckPolicy::ExitOn(outcome) = self.check {
            rules.push(HaltCondition::OnOutcome(outcome).exit());
        }
        rules
    }
}

// ---------------------------------------------------------------------------
// SyncChoice
// ---------------------------------------------------------------------------

/// Which synchroniser backs the iteration barriers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncChoice {
    /// Busy-waiting spinner (default; lowest release latency).
    Spinner,
    /// Kernel-assisted blocking barrier.
    Barrier,
}

impl SyncChoice {
    /// Build a synchroniser for `nthreads` participants.
    ///
    /// # Errors
    ///
    /// Propagates the spinner's capacity check.
    pub fn build(self, nthreads: usize) -> Result<Arc<dyn Synchroniser>> {
        Ok(match self {
            Self::Spinner => Arc::new(Spinner::new(nthreads)?),
            Self::Barrier => Arc::new(KernelBarrier::new(nthreads)),
        })
    }

    /// All choices, in CLI order.
    pub fn all() -> impl Iterator<Item = Self> {
        [Self::Spinner, Self::Barrier].into_iter()
    }
}

impl fmt::Display for SyncChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Spinner => "spinner",
            Self::Barrier => "barrier",
        })
    }
}

impl FromStr for SyncChoice {
    type Err = RunnerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "spinner" => Ok(Self::Spinner),
            "barrier" => Ok(Self::Barrier),
            other => Err(RunnerError::bad_flag("sync", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// PermuteChoice
// ---------------------------------------------------------------------------

/// Which permuter orders thread releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermuteChoice {
    /// Identity order, every iteration.
    Static,
    /// Uniform shuffle, re-drawn every iteration.
    Random,
}

impl PermuteChoice {
    /// Build the permuter, seeding the random variant with `seed`.
    #[must_use]
    pub fn build(self, seed: u64) -> Box<dyn Permuter> {
        match self {
            Self::Static => Box::new(StaticPermuter),
            Self::Random => Box::new(RandomPermuter::seeded(seed)),
        }
    }

    /// All choices, in CLI order.
    pub fn all() -> impl Iterator<Item = Self> {
        [Self::Static, Self::Random].into_iter()
    }
}

impl fmt::Display for PermuteChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Static => "static",
            Self::Random => "random",
        })
    }
}

impl FromStr for PermuteChoice {
    type Err = RunnerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "static" => Ok(Self::Static),
            "random" => Ok(Self::Random),
            other => Err(RunnerError::bad_flag("permute", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// CheckPolicy
// ---------------------------------------------------------------------------

/// What the engine does with `check` classifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckPolicy {
    /// Never invoke `check`; record a placeholder outcome.
    Disable,
    /// Record every classification; never stop because of one.
    Report,
    /// Record classifications and stop on the first matching one.
    ExitOn(Outcome),
}

impl CheckPolicy {
    /// Whether `check` invocation is skipped entirely.
    #[must_use]
    pub const fn is_disabled(self) -> bool {
        matches!(self, Self::Disable)
    }

    /// All policies, in CLI order.
    pub fn all() -> impl Iterator<Item = Self> {
        [Self::Disable, Self::Report]
            .into_iter()
            .chain(Outcome::all().map(Self::ExitOn))
    }
}

impl fmt::Display for CheckPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disable => f.write_str("disable"),
            Self::Report => f.write_str("report"),
            Self::ExitOn(outcome) => write!(f, "exit-on-{outcome}"),
        }
    }
}

impl FromStr for CheckPolicy {
    type Err = RunnerError;

    fn from_str(s: &str) -> Result<Self> {
        if let Some(suffix) = s.strip_prefix("exit-on-") {
            return suffix
                .parse::<Outcome>()
                .map(Self::ExitOn)
                .map_err(|_| RunnerError::bad_flag("check", s));
        }
        match s {
            "disable" => Ok(Self::Disable),
            "report" => Ok(Self::Report),
            other => Err(RunnerError::bad_flag("check", other)),
        }
    }
}
