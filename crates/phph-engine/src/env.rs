//! The shared environment: one contiguous cell array per cell type.
//!
//! The environment is handed to workers as `Arc<Environment>`; the `Arc`
//! strong count is the environment's reference count, held in the `Arc`
//! control block and therefore never visible through the [`RawEnv`] view the
//! test sees. When the last holder drops its reference the backing arrays
//! are freed.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicI32, Ordering};

use phph_api::RawEnv;
use phph_error::{Result, RunnerError};
use phph_model::{Manifest, State};

/// The shared mutable state of a single iteration.
///
/// Mutation is disciplined by the engine's barrier protocol rather than by
/// Rust-level locking: between the pre- and post-barrier only test bodies
/// touch cells; between the post- and next pre-barrier only the reseeding
/// leader does.
pub struct Environment {
    atomic: Box<[AtomicI32]>,
    plain: Box<[UnsafeCell<i32>]>,
    raw: UnsafeCell<RawEnv>,
}

/// Cell access is serialised by the barrier protocol described on the type;
/// the `UnsafeCell`s are what let the non-atomic cells race *inside* a test
/// body, which is the behaviour under observation.
unsafe impl Send for Environment {}
unsafe impl Sync for Environment {}

impl Environment {
    /// Allocate an environment sized and seeded by `manifest`.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::EnvAlloc`] if either cell array cannot be
    /// reserved.
    pub fn new(manifest: &Manifest) -> Result<Self> {
        let n_atomic = manifest.atomic_int32().len();
        let n_plain = manifest.int32().len();
        let alloc_err = || RunnerError::EnvAlloc {
            atomic: n_atomic,
            plain: n_plain,
        };

        let mut atomic = Vec::new();
        atomic.try_reserve_exact(n_atomic).map_err(|_| alloc_err())?;
        atomic.extend(
            manifest
                .atomic_int32()
                .initials()
                .iter()
                .map(|&v| AtomicI32::new(v)),
        );
        let atomic = atomic.into_boxed_slice();

        let mut plain = Vec::new();
        plain.try_reserve_exact(n_plain).map_err(|_| alloc_err())?;
        plain.extend(manifest.int32().initials().iter().map(|&v| UnsafeCell::new(v)));
        let plain = plain.into_boxed_slice();

        // The raw view points into the boxed slices; their heap addresses are
        // stable for the life of the environment.
        let raw = UnsafeCell::new(RawEnv {
            n_atomic_int32: n_atomic,
            atomic_int32: atomic.as_ptr().cast_mut(),
            n_int32: n_plain,
            int32: plain.as_ptr().cast::<i32>().cast_mut(),
            reserved: std::ptr::null_mut(),
        });

        Ok(Self { atomic, plain, raw })
    }

    /// The `repr(C)` view test code receives.
    #[must_use]
    pub fn raw(&self) -> *mut RawEnv {
        self.raw.get()
    }

    /// Number of atomic cells.
    #[must_use]
    pub fn n_atomic(&self) -> usize {
        self.atomic.len()
    }

    /// Number of non-atomic cells.
    #[must_use]
    pub fn n_nonatomic(&self) -> usize {
        self.plain.len()
    }

    /// Read atomic cell `i`; out-of-range reads return 0.
    ///
    /// For use outside a running iteration.
    #[must_use]
    pub fn get_atomic(&self, i: usize) -> i32 {
        self.atomic.get(i).map_or(0, |c| c.load(Ordering::Relaxed))
    }

    /// Write atomic cell `i`; out-of-range writes are ignored.
    ///
    /// For use outside a running iteration.
    pub fn set_atomic(&self, i: usize, v: i32) {
        if let Some(cell) = self.atomic.get(i) {
            cell.store(v, Ordering::Relaxed);
        }
    }

    /// Read non-atomic cell `i`; out-of-range reads return 0.
    ///
    /// For use outside a running iteration.
    #[must_use]
    pub fn get_nonatomic(&self, i: usize) -> i32 {
        // No test body is running when this is called, so the plain read
        // cannot race (barrier protocol).
        self.plain.get(i).map_or(0, |c| unsafe { *c.get() })
    }

    /// Write non-atomic cell `i`; out-of-range writes are ignored.
    ///
    /// For use outside a running iteration.
    pub fn set_nonatomic(&self, i: usize, v: i32) {
        if let Some(cell) = self.plain.get(i) {
            unsafe { *cell.get() = v };
        }
    }

    /// Reset every cell to its manifest initial value.
    ///
    /// Called by the per-iteration leader between the post-barrier and the
    /// next pre-barrier, when no other thread touches the environment.
    pub fn reseed(&self, manifest: &Manifest) {
        for (cell, &v) in self.atomic.iter().zip(manifest.atomic_int32().initials()) {
            cell.store(v, Ordering::Relaxed);
        }
        for (cell, &v) in self.plain.iter().zip(manifest.int32().initials()) {
            unsafe { *cell.get() = v };
        }
    }

    /// Capture every cell value into `buf` (atomic cells first, then
    /// non-atomic, each in slot order).
    ///
    /// `buf` is a reusable scratch buffer; with adequate capacity this does
    /// not allocate.
    pub fn snapshot_into(&self, buf: &mut Vec<i32>) {
        buf.clear();
        buf.extend(self.atomic.iter().map(|c| c.load(Ordering::Relaxed)));
        buf.extend(self.plain.iter().map(|c| unsafe { *c.get() }));
    }

    /// Capture the current state as an owned value.
    ///
    /// The engine's hot path uses [`Environment::snapshot_into`] with a
    /// preallocated buffer instead.
    #[must_use]
    pub fn snapshot(&self) -> State {
        let mut buf = Vec::with_capacity(self.atomic.len() + self.plain.len());
        self.snapshot_into(&mut buf);
        State::from_values(&buf)
    }
}
