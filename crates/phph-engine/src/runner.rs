//! The top-level runner: epoch lifecycle, cancellation, and reporting.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use phph_api::TestModule;
use phph_error::{Result, RunnerError};
use phph_model::{FinishReason, Manifest, Report};

use crate::config::RunConfig;
use crate::env::Environment;
use crate::halt::{HaltAction, HaltFlag};
use crate::obs::Observer;
use crate::permute::ReleaseGate;
use crate::worker::{Arming, FinishKind, SharedState, Worker};

/// A cancellation flag for a running engine.
///
/// Clone it, hand one copy to the runner, and call [`CancelToken::cancel`]
/// from anywhere (a signal handler, a watchdog thread). Workers observe the
/// flag at their pre-barrier wake-up and drain cleanly, so a cancelled run
/// still yields its partial histogram.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<AtomicBool>,
}

impl CancelToken {
    /// A fresh, unset token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.inner.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.load(Ordering::Acquire)
    }
}

/// Builds a [`Runner`] from a test module and a configuration.
pub struct RunnerBuilder {
    module: Arc<dyn TestModule>,
    config: RunConfig,
    cancel: CancelToken,
}

impl RunnerBuilder {
    /// Start building a runner for `module` with the default configuration.
    #[must_use]
    pub fn new(module: Arc<dyn TestModule>) -> Self {
        Self {
            module,
            config: RunConfig::default(),
            cancel: CancelToken::new(),
        }
    }

    /// Replace the run configuration.
    #[must_use]
    pub fn config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach an externally held cancellation token.
    #[must_use]
    pub fn cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Validate the module's manifest and assemble the runner.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the manifest is inconsistent.
    pub fn build(self) -> Result<Runner> {
        let manifest = Arc::new(self.module.manifest()?);
        let n_threads = manifest.n_threads();

        let shared = SharedState {
            observer: Observer::new(),
            halt_rules: self.config.halt_rules(),
            permuter: self.config.permute.build(self.config.seed),
            scratch: Vec::with_capacity(manifest.n_cells()),
            order: vec![0; n_threads],
            check_disabled: self.config.check.is_disabled(),
            finish: None,
            fatal: None,
        };

        Ok(Runner {
            module: self.module,
            manifest,
            config: self.config,
            cancel: self.cancel,
            shared: Arc::new(Mutex::new(shared)),
        })
    }
}

/// Owns the engine for one run: spawns worker epochs, accounts iterations
/// through the shared observer, and renders the final report.
pub struct Runner {
    module: Arc<dyn TestModule>,
    manifest: Arc<Manifest>,
    config: RunConfig,
    cancel: CancelToken,
    shared: Arc<Mutex<SharedState>>,
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("manifest", &self.manifest)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Runner {
    /// The manifest the runner validated at build time.
    #[must_use]
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Drive the test to completion and return the accumulated report.
    ///
    /// Mid-run fatal failures (a worker panic, an inconsistent `check`) are
    /// reported through [`FinishReason::Fatal`] on the returned report, with
    /// whatever histogram was collected; the error path is reserved for
    /// failures that leave nothing to report (bad manifest, allocation or
    /// spawn failure).
    ///
    /// # Errors
    ///
    /// Returns resource errors raised while setting up an epoch.
    pub fn run(self) -> Result<Report> {
        tracing::info!(
            target: "phph.run",
            threads = self.manifest.n_threads(),
            iterations = self.config.iterations,
            period = self.config.period,
            sync = %self.config.sync,
            permute = %self.config.permute,
            check = %self.config.check,
            "run starting"
        );

        let mut epoch: u64 = 0;
        loop {
            match self.run_epoch()? {
                HaltAction::Rotate => {
                    epoch += 1;
                    tracing::debug!(target: "phph.run", epoch, "rotating worker threads");
                }
                HaltAction::Exit => break,
            }
        }
        self.into_report()
    }

    /// Run one epoch: fresh environment, synchroniser, and workers; returns
    /// the halt action that ended it.
    fn run_epoch(&self) -> Result<HaltAction> {
        let n_threads = self.manifest.n_threads();
        let env = Arc::new(Environment::new(&self.manifest)?);
        let sync = self.config.sync.build(n_threads)?;
        let gate = Arc::new(ReleaseGate::new(n_threads));
        let halt = Arc::new(HaltFlag::new());
        let arming = Arc::new(Arming::new());

        // Release order for the epoch's first iteration.
        {
            let mut guard = self.shared.lock();
            let shared = &mut *guard;
            shared.permuter.draw(&mut shared.order);
            gate.schedule(&shared.order);
        }

        let mut handles = Vec::with_capacity(n_threads);
        for tid in 0..n_threads {
            let worker = Worker {
                tid,
                module: Arc::clone(&self.module),
                manifest: Arc::clone(&self.manifest),
                env: Arc::clone(&env),
                sync: Arc::clone(&sync),
                gate: Arc::clone(&gate),
                halt: Arc::clone(&halt),
                arming: Arc::clone(&arming),
                cancel: self.cancel.clone(),
                shared: Arc::clone(&self.shared),
            };
            let spawned = std::thread::Builder::new()
                .name(format!("phph-worker-{tid}"))
                .spawn(move || worker.run());
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(source) => {
                    // Workers spawned so far are parked at the arming gate;
                    // send them straight to a clean exit.
                    arming.abort();
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(RunnerError::ThreadSpawn { tid, source });
                }
            }
        }
        arming.arm();

        let mut action = HaltAction::Rotate;
        for (tid, handle) in handles.into_iter().enumerate() {
            match handle.join() {
                Ok(worker_action) => action = action.max(worker_action),
                Err(_) => {
                    action = HaltAction::Exit;
                    let mut shared = self.shared.lock();
                    if shared.fatal.is_none() {
                        shared.fatal = Some(RunnerError::WorkerPanic { tid });
                    }
                }
            }
        }
        Ok(action)
    }

    /// Render the accumulated shared state into the final report.
    fn into_report(self) -> Result<Report> {
        let (observer, finish_kind, fatal) = {
            let mut guard = self.shared.lock();
            let shared = &mut *guard;
            (
                std::mem::take(&mut shared.observer),
                shared.finish.take(),
                shared.fatal.take(),
            )
        };

        let finish = if let Some(error) = fatal {
            tracing::error!(target: "phph.run", %error, "run ended fatally");
            FinishReason::Fatal {
                code: error.exit_code(),
                diagnostic: error.to_string(),
            }
        } else {
            match finish_kind {
                Some(FinishKind::PolicyStop(outcome)) => FinishReason::PolicyStop { on: outcome },
                Some(FinishKind::Cancelled) => FinishReason::Cancelled,
                Some(FinishKind::Completed) | None => FinishReason::Completed,
            }
        };

        let histogram = observer.into_histogram();
        tracing::info!(
            target: "phph.run",
            total = histogram.total(),
            distinct = histogram.distinct_states(),
            "run finished"
        );
        Ok(histogram.into_report(&self.manifest, finish))
    }
}
