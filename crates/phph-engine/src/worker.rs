//! Worker threads: one per test thread, looping over iterations.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use phph_api::TestModule;
use phph_error::RunnerError;
use phph_model::{Manifest, Outcome};

use crate::env::Environment;
use crate::halt::{HaltAction, HaltCondition, HaltFlag, HaltRule};
use crate::obs::{ObsSummary, Observer};
use crate::permute::{Permuter, ReleaseGate};
use crate::runner::CancelToken;
use crate::sync::Synchroniser;

/// Why the run stopped, before it is rendered into a report.
pub(crate) enum FinishKind {
    Completed,
    PolicyStop(Outcome),
    Cancelled,
}

/// State shared by all workers, touched only by the serialised
/// per-iteration leader (and by panic bookkeeping).
///
/// The mutex is uncontended in steady state — the post-barrier already
/// serialises leaders — and, being a `parking_lot` mutex, it does not
/// poison, so the histogram stays recoverable after a worker panic.
pub(crate) struct SharedState {
    pub observer: Observer,
    pub halt_rules: Vec<HaltRule>,
    pub permuter: Box<dyn Permuter>,
    /// Snapshot buffer, reused every iteration.
    pub scratch: Vec<i32>,
    /// Release-order buffer, reused every iteration.
    pub order: Vec<usize>,
    pub check_disabled: bool,
    pub finish: Option<FinishKind>,
    pub fatal: Option<RunnerError>,
}

/// Start gate for an epoch's workers.
///
/// Workers park here until the runner has spawned the full complement;
/// if any spawn fails the runner aborts the epoch instead of letting a
/// partial set of workers deadlock on the iteration barrier.
#[derive(Default)]
pub(crate) struct Arming {
    armed: AtomicBool,
    aborted: AtomicBool,
}

impl Arming {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Release the workers into their iteration loops.
    pub(crate) fn arm(&self) {
        self.armed.store(true, Ordering::Release);
    }

    /// Release the workers straight into a clean exit.
    pub(crate) fn abort(&self) {
        self.aborted.store(true, Ordering::Release);
        self.armed.store(true, Ordering::Release);
    }

    /// Park until armed; returns false if the epoch was aborted.
    fn wait(&self) -> bool {
        while !self.armed.load(Ordering::Acquire) {
            std::thread::yield_now();
        }
        !self.aborted.load(Ordering::Acquire)
    }
}

/// One worker thread's handles for an epoch.
pub(crate) struct Worker {
    pub tid: usize,
    pub module: Arc<dyn TestModule>,
    pub manifest: Arc<Manifest>,
    pub env: Arc<Environment>,
    pub sync: Arc<dyn Synchroniser>,
    pub gate: Arc<ReleaseGate>,
    pub halt: Arc<HaltFlag>,
    pub arming: Arc<Arming>,
    pub cancel: CancelToken,
    pub shared: Arc<Mutex<SharedState>>,
}

impl Worker {
    /// The iteration loop; returns the halt action that ended the epoch.
    pub(crate) fn run(self) -> HaltAction {
        if !self.arming.wait() {
            return HaltAction::Exit;
        }
        loop {
            self.sync.wait(); // pre-barrier
            if let Some(action) = self.halt.get() {
                return action;
            }
            self.gate.pass(self.tid);

            // Hot path: nothing between here and the post-barrier but the
            // test body itself.
            let body = catch_unwind(AssertUnwindSafe(|| {
                self.module.run(self.tid, self.env.raw());
            }));
            if body.is_err() {
                self.record_panic();
            }

            if self.sync.wait().is_leader() {
                // post-barrier
                self.lead();
            }
        }
    }

    /// Record a panic in module code; the next pre-barrier wake-up exits
    /// every worker.
    fn record_panic(&self) {
        let mut shared = self.shared.lock();
        if shared.fatal.is_none() {
            shared.fatal = Some(RunnerError::WorkerPanic { tid: self.tid });
        }
        self.halt.set(HaltAction::Exit);
    }

    /// Leader duties for one post-phase: snapshot, classify, aggregate,
    /// decide halting, reseed, publish the next release order.
    fn lead(&self) {
        let mut guard = self.shared.lock();
        let shared = &mut *guard;

        if shared.fatal.is_some() {
            // A body panic was recorded this iteration; nothing to observe.
            self.halt.set(HaltAction::Exit);
            return;
        }

        let mut scratch = std::mem::take(&mut shared.scratch);
        self.env.snapshot_into(&mut scratch);

        let outcome = if shared.check_disabled {
            Some(Outcome::Unknown)
        } else {
            catch_unwind(AssertUnwindSafe(|| {
                self.module.check(self.env.raw().cast_const())
            }))
            .ok()
            .map(Outcome::from_check)
        };
        let Some(outcome) = outcome else {
            shared.scratch = scratch;
            shared.fatal = Some(RunnerError::WorkerPanic { tid: self.tid });
            self.halt.set(HaltAction::Exit);
            return;
        };

        let summary = match shared.observer.observe(&scratch, outcome) {
            Ok(summary) => summary,
            Err(mismatch) => {
                shared.fatal = Some(RunnerError::inconsistent_check(
                    mismatch.state.describe(&self.manifest),
                    mismatch.stored.as_str(),
                    mismatch.latest.as_str(),
                ));
                shared.scratch = scratch;
                self.halt.set(HaltAction::Exit);
                return;
            }
        };
        shared.scratch = scratch;

        let mut action = shared
            .halt_rules
            .iter()
            .filter_map(|rule| rule.fires(&summary))
            .max();
        if action == Some(HaltAction::Exit) {
            shared.finish = Some(exit_kind(&shared.halt_rules, &summary));
        } else if self.cancel.is_cancelled() {
            action = Some(HaltAction::Exit);
            shared.finish = Some(FinishKind::Cancelled);
        }

        if action.is_none() {
            // Next iteration happens: restore initial values and publish its
            // release order while every other worker is parked at the
            // pre-barrier.
            self.env.reseed(&self.manifest);
            shared.permuter.draw(&mut shared.order);
            self.gate.schedule(&shared.order);
        }
        if let Some(action) = action {
            tracing::debug!(
                target: "phph.halt",
                ?action,
                iterations = summary.iterations,
                outcome = %summary.outcome,
                "halt decision"
            );
            self.halt.set(action);
        }
    }
}

/// Which finish an exit decision reports. Policy stops take precedence over
/// the iteration cap.
fn exit_kind(rules: &[HaltRule], summary: &ObsSummary) -> FinishKind {
    for rule in rules {
        if rule.action != HaltAction::Exit {
            continue;
        }
        if let HaltCondition::OnOutcome(outcome) = rule.condition {
            if summary.outcome == outcome {
                return FinishKind::PolicyStop(outcome);
            }
        }
    }
    FinishKind::Completed
}
