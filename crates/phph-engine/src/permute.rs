//! Thread release-order permutation.
//!
//! The permuter decides, per iteration, the order in which workers pass the
//! pre-barrier's release point. On a perfect barrier this would not matter;
//! real barriers have staggered wake-up, and controlling the stagger changes
//! which weak behaviours surface. The [`ReleaseGate`] is what turns a drawn
//! permutation into an actual release order.

use std::sync::atomic::{AtomicUsize, Ordering};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Draws the next iteration's release permutation.
pub trait Permuter: Send {
    /// Fill `order` with a permutation of `[0, order.len())`; `order[k]` is
    /// the thread id released `k`-th.
    fn draw(&mut self, order: &mut [usize]);
}

/// The identity permutation, every iteration.
pub struct StaticPermuter;

impl Permuter for StaticPermuter {
    fn draw(&mut self, order: &mut [usize]) {
        for (tid, slot) in order.iter_mut().enumerate() {
            *slot = tid;
        }
    }
}

/// A uniform shuffle, re-drawn every iteration from a seeded PRNG.
pub struct RandomPermuter {
    rng: StdRng,
}

impl RandomPermuter {
    /// Create a permuter with a deterministic seed.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Permuter for RandomPermuter {
    fn draw(&mut self, order: &mut [usize]) {
        for (tid, slot) in order.iter_mut().enumerate() {
            *slot = tid;
        }
        order.shuffle(&mut self.rng);
    }
}

// ---------------------------------------------------------------------------
// ReleaseGate
// ---------------------------------------------------------------------------

/// Staggers workers out of the pre-barrier in a scheduled order.
///
/// Each worker has a rank for the upcoming iteration; after the pre-barrier
/// opens, a worker spins until the release cursor reaches its rank, then
/// advances the cursor for the next-ranked worker. The schedule is written
/// only while every worker is blocked at (or exiting through) the
/// pre-barrier, so ranks never change under a spinning worker.
pub struct ReleaseGate {
    /// `ranks[tid]` = position at which thread `tid` passes the gate.
    ranks: Box<[AtomicUsize]>,
    cursor: AtomicUsize,
}

impl ReleaseGate {
    /// A gate for `nthreads` workers, initially scheduled in identity order.
    #[must_use]
    pub fn new(nthreads: usize) -> Self {
        Self {
            ranks: (0..nthreads).map(AtomicUsize::new).collect(),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Publish the next iteration's release order and rewind the cursor.
    ///
    /// `order[k]` is the thread id released `k`-th. Entries outside
    /// `[0, nthreads)` are ignored; the engine never produces them.
    pub fn schedule(&self, order: &[usize]) {
        for (rank, &tid) in order.iter().enumerate() {
            if let Some(slot) = self.ranks.get(tid) {
                slot.store(rank, Ordering::Release);
            }
        }
        self.cursor.store(0, Ordering::Release);
    }

    /// Pass the gate: busy-wait until `tid`'s rank is up, then release the
    /// next rank.
    pub fn pass(&self, tid: usize) {
        let Some(rank) = self.ranks.get(tid) else {
            return;
        };
        let rank = rank.load(Ordering::Acquire);
        while self.cursor.load(Ordering::Acquire) != rank {
            std::hint::spin_loop();
        }
        self.cursor.store(rank + 1, Ordering::Release);
    }
}
