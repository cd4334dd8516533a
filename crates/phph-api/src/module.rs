//! The resolved test module the engine consumes.

use phph_error::{Result, RunnerError};
use phph_model::{Manifest, VarSet};

use crate::raw::{decode_initials, decode_names, CheckFn, RawEnv, RawManifest, TestFn};

/// Contract the engine requires from a loaded test module.
///
/// The engine never interprets test code; it only calls these three entry
/// points. `run` and `check` receive raw environment pointers because the
/// test side of the boundary is C-shaped even for tests written in Rust.
pub trait TestModule: Send + Sync {
    /// Decode the module's manifest.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the manifest is internally
    /// inconsistent (for instance, zero threads).
    fn manifest(&self) -> Result<Manifest>;

    /// Run thread `tid`'s body against `env`.
    fn run(&self, tid: usize, env: *mut RawEnv);

    /// Classify the post-iteration state of `env`.
    fn check(&self, env: *const RawEnv) -> bool;
}

/// An already-resolved symbol triple for a C-ABI test module.
///
/// Whoever resolves the symbols (a dynamic loader, or the built-in registry)
/// vouches for them via the unsafe constructor; from then on the engine
/// treats the module as an opaque [`TestModule`].
#[derive(Clone, Copy, Debug)]
pub struct TestSymbols {
    manifest: *const RawManifest,
    test: TestFn,
    check: CheckFn,
}

/// The manifest pointer references immutable static data and the entry
/// points are required to be callable from any thread; that is exactly the
/// contract `new` makes callers promise.
unsafe impl Send for TestSymbols {}
unsafe impl Sync for TestSymbols {}

impl TestSymbols {
    /// Bundle resolved symbols into a module handle.
    ///
    /// # Safety
    ///
    /// The caller must guarantee that `manifest` points to a valid
    /// [`RawManifest`] that outlives the handle (including the name and
    /// initial arrays it references), and that `test` and `check` follow the
    /// ABI contract: `test(tid, env)` touches only the cells of `env` and is
    /// callable concurrently from distinct threads with distinct `tid`s;
    /// `check(env)` only reads cells.
    #[must_use]
    pub const unsafe fn new(
        manifest: *const RawManifest,
        test: TestFn,
        check: CheckFn,
    ) -> Self {
        Self {
            manifest,
            test,
            check,
        }
    }
}

impl TestModule for TestSymbols {
    fn manifest(&self) -> Result<Manifest> {
        // Validity of the raw manifest was asserted at construction.
        let raw = unsafe { &*self.manifest };

        if raw.n_threads == 0 {
            return Err(RunnerError::bad_manifest("manifest declares zero threads"));
        }

        let atomic = VarSet::new(
            unsafe { decode_names(raw.atomic_int32_names, raw.n_atomic_int32) },
            unsafe { decode_initials(raw.atomic_int32_initials, raw.n_atomic_int32) },
        )
        .map_err(|e| RunnerError::bad_manifest(e.to_string()))?;

        let plain = VarSet::new(
            unsafe { decode_names(raw.int32_names, raw.n_int32) },
            unsafe { decode_initials(raw.int32_initials, raw.n_int32) },
        )
        .map_err(|e| RunnerError::bad_manifest(e.to_string()))?;

        Manifest::new(raw.n_threads, atomic, plain)
            .map_err(|e| RunnerError::bad_manifest(e.to_string()))
    }

    fn run(&self, tid: usize, env: *mut RawEnv) {
        unsafe { (self.test)(tid, env) }
    }

    fn check(&self, env: *const RawEnv) -> bool {
        unsafe { (self.check)(env) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    // A minimal single-thread module: one atomic cell `x`, body adds one,
    // check accepts when x is odd.

    static X_INITIALS: [i32; 1] = [41];

    // Statics holding raw pointers to immutable static data.
    struct NameArray([*const libc::c_char; 1]);
    unsafe impl Sync for NameArray {}
    struct ManifestCell(RawManifest);
    unsafe impl Sync for ManifestCell {}

    static X_NAMES: NameArray = NameArray([c"x".as_ptr()]);

    static MANIFEST: ManifestCell = ManifestCell(RawManifest {
        n_threads: 1,
        n_atomic_int32: 1,
        atomic_int32_initials: X_INITIALS.as_ptr(),
        atomic_int32_names: X_NAMES.0.as_ptr(),
        n_int32: 0,
        int32_initials: std::ptr::null(),
        int32_names: std::ptr::null(),
    });

    unsafe extern "C" fn body(_tid: usize, env: *mut RawEnv) {
        let env = &*env;
        let cells = std::slice::from_raw_parts(env.atomic_int32, env.n_atomic_int32);
        let v = cells[0].load(Ordering::Relaxed);
        cells[0].store(v + 1, Ordering::Relaxed);
    }

    unsafe extern "C" fn accept_odd(env: *const RawEnv) -> bool {
        let env = &*env;
        let cells = std::slice::from_raw_parts(env.atomic_int32, env.n_atomic_int32);
        cells[0].load(Ordering::Relaxed) % 2 != 0
    }

    fn module() -> TestSymbols {
        unsafe { TestSymbols::new(&MANIFEST.0, body, accept_odd) }
    }

    #[test]
    fn manifest_decodes() {
        let m = module().manifest().unwrap();
        assert_eq!(m.n_threads(), 1);
        assert_eq!(m.atomic_int32().names(), &["x".to_owned()]);
        assert_eq!(m.atomic_int32().initials(), &[41]);
        assert!(m.int32().is_empty());
    }

    #[test]
    fn run_and_check_dispatch() {
        let module = module();
        let mut cells = [AtomicI32::new(41)];
        let mut env = RawEnv {
            n_atomic_int32: 1,
            atomic_int32: cells.as_mut_ptr(),
            n_int32: 0,
            int32: std::ptr::null_mut(),
            reserved: std::ptr::null_mut(),
        };

        assert!(module.check(&env));
        module.run(0, &mut env);
        assert_eq!(cells[0].load(Ordering::Relaxed), 42);
        assert!(!module.check(&env));
        module.run(0, &mut env);
        assert!(module.check(&env));
    }

    #[test]
    fn zero_thread_manifest_rejected() {
        static EMPTY: ManifestCell = ManifestCell(RawManifest {
            n_threads: 0,
            n_atomic_int32: 0,
            atomic_int32_initials: std::ptr::null(),
            atomic_int32_names: std::ptr::null(),
            n_int32: 0,
            int32_initials: std::ptr::null(),
            int32_names: std::ptr::null(),
        });
        let module = unsafe { TestSymbols::new(&EMPTY.0, body, accept_odd) };
        let err = module.manifest().unwrap_err();
        assert!(matches!(err, RunnerError::BadManifest { .. }));
    }
}
