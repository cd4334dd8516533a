//! Iteration synchronisers: the rendezvous points workers cross at the start
//! and end of every iteration.
//!
//! Both implementations honour the same contract: `wait` blocks until all
//! participants arrive, then releases them with exactly one caller marked as
//! the phase's leader. The spinner trades burned cores for release latency —
//! it is a different experiment, not just an optimisation, because the tight
//! release window surfaces more weak behaviours.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Barrier;

use phph_error::{Result, RunnerError};

/// What a participant is after being released from a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The one participant elected for this phase's bookkeeping.
    Leader,
    /// Everyone else.
    Follower,
}

impl Role {
    /// Whether this participant leads the phase.
    #[must_use]
    pub const fn is_leader(self) -> bool {
        matches!(self, Self::Leader)
    }
}

/// A phase rendezvous for `n_threads` participants.
///
/// Workers call `wait` once per phase; phases alternate pre / post for the
/// lifetime of the worker. Exactly one caller per phase observes
/// [`Role::Leader`].
pub trait Synchroniser: Send + Sync {
    /// Block until all participants have arrived, then release them.
    fn wait(&self) -> Role;
}

// ---------------------------------------------------------------------------
// Spinner
// ---------------------------------------------------------------------------

/// Bit position where the phase generation begins in the spinner word.
const GEN_SHIFT: u32 = 32;

/// Mask isolating the arrival count in the spinner word.
const COUNT_MASK: u64 = (1_u64 << GEN_SHIFT) - 1;

/// A busy-waiting synchroniser on a single packed atomic word.
///
/// The word holds `(generation << 32) | arrivals`. Arrivals increment the low
/// half; the last arriver opens the next phase by storing a word with the
/// generation bumped and the count cleared in one atomic write, so a reset
/// can never be confused with a stale phase. Followers spin on the
/// generation half.
///
/// The last arriver is the elected leader.
pub struct Spinner {
    total: u64,
    word: AtomicU64,
}

impl Spinner {
    /// Create a spinner for `nthreads` participants.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::TooManyThreads`] if the arrival count cannot be
    /// tracked in the packed word's low half.
    pub fn new(nthreads: usize) -> Result<Self> {
        let total = u64::try_from(nthreads)
            .ok()
            .filter(|&n| 0 < n && n <= COUNT_MASK)
            .ok_or(RunnerError::TooManyThreads {
                requested: nthreads,
            })?;
        Ok(Self {
            total,
            word: AtomicU64::new(0),
        })
    }
}

impl Synchroniser for Spinner {
    fn wait(&self) -> Role {
        let prev = self.word.fetch_add(1, Ordering::AcqRel);
        let gen = prev >> GEN_SHIFT;
        let arrived = (prev & COUNT_MASK) + 1;
        debug_assert!(arrived <= self.total, "spinner over-subscribed");

        if arrived == self.total {
            // Last arriver: clear the count and open the next generation in
            // one store.
            self.word
                .store(gen.wrapping_add(1) << GEN_SHIFT, Ordering::Release);
            Role::Leader
        } else {
            while self.word.load(Ordering::Acquire) >> GEN_SHIFT == gen {
                std::hint::spin_loop();
            }
            Role::Follower
        }
    }
}

// ---------------------------------------------------------------------------
// Kernel barrier
// ---------------------------------------------------------------------------

/// A blocking synchroniser backed by [`std::sync::Barrier`].
///
/// Higher release latency than the spinner, but waiting threads sleep
/// instead of burning cores.
pub struct KernelBarrier {
    inner: Barrier,
}

impl KernelBarrier {
    /// Create a barrier for `nthreads` participants.
    #[must_use]
    pub fn new(nthreads: usize) -> Self {
        Self {
            inner: Barrier::new(nthreads),
        }
    }
}

impl Synchroniser for KernelBarrier {
    fn wait(&self) -> Role {
        if self.inner.wait().is_leader() {
            Role::Leader
        } else {
            Role::Follower
        }
    }
}
