//! Built-in litmus tests, exposed through the same resolved-symbol path an
//! externally loaded module would take.
//!
//! Each test's `check` accepts the sequentially consistent final states and
//! rejects the weak ones, so a surfaced weak behaviour shows up as a
//! rejected line in the histogram.

use std::sync::atomic::{AtomicI32, Ordering};

use phph_api::{RawEnv, RawManifest, TestSymbols};
use phph_error::{Result, RunnerError};

/// Names of every built-in test, in listing order.
pub const NAMES: &[&str] = &["sb", "mp", "lb", "corr"];

/// Resolve a built-in test by name.
///
/// # Errors
///
/// Returns [`RunnerError::UnknownTest`] for names outside [`NAMES`].
pub fn find(name: &str) -> Result<TestSymbols> {
    match name {
        "sb" => Ok(unsafe { TestSymbols::new(&SB_MANIFEST.0, sb_test, sb_check) }),
        "mp" => Ok(unsafe { TestSymbols::new(&MP_MANIFEST.0, mp_test, mp_check) }),
        "lb" => Ok(unsafe { TestSymbols::new(&LB_MANIFEST.0, lb_test, lb_check) }),
        "corr" => Ok(unsafe { TestSymbols::new(&CORR_MANIFEST.0, corr_test, corr_check) }),
        other => Err(RunnerError::UnknownTest {
            name: other.to_owned(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Raw-manifest plumbing
// ---------------------------------------------------------------------------

struct NameArray<const N: usize>([*const libc::c_char; N]);
unsafe impl<const N: usize> Sync for NameArray<N> {}

struct ManifestCell(RawManifest);
unsafe impl Sync for ManifestCell {}

unsafe fn atomics<'a>(env: *const RawEnv) -> &'a [AtomicI32] {
    let env = &*env;
    std::slice::from_raw_parts(env.atomic_int32, env.n_atomic_int32)
}

unsafe fn ints<'a>(env: *const RawEnv) -> &'a mut [i32] {
    let env = &*env;
    std::slice::from_raw_parts_mut(env.int32, env.n_int32)
}

// ---------------------------------------------------------------------------
// sb: store buffering
//
//   T0: x :=rlx 1; r0 := y.rlx     T1: y :=rlx 1; r1 := x.rlx
//
// Weak behaviour: r0 = r1 = 0 (both stores still buffered).
// ---------------------------------------------------------------------------

static SB_ATOMIC_INITIALS: [i32; 2] = [0, 0];
static SB_ATOMIC_NAMES: NameArray<2> = NameArray([c"x".as_ptr(), c"y".as_ptr()]);
static SB_INT_INITIALS: [i32; 2] = [0, 0];
static SB_INT_NAMES: NameArray<2> = NameArray([c"0:r0".as_ptr(), c"1:r0".as_ptr()]);

static SB_MANIFEST: ManifestCell = ManifestCell(RawManifest {
    n_threads: 2,
    n_atomic_int32: 2,
    atomic_int32_initials: SB_ATOMIC_INITIALS.as_ptr(),
    atomic_int32_names: SB_ATOMIC_NAMES.0.as_ptr(),
    n_int32: 2,
    int32_initials: SB_INT_INITIALS.as_ptr(),
    int32_names: SB_INT_NAMES.0.as_ptr(),
});

unsafe extern "C" fn sb_test(tid: usize, env: *mut RawEnv) {
    let atomics = atomics(env);
    let ints = ints(env);
    match tid {
        0 => {
            atomics[0].store(1, Ordering::Relaxed);
            ints[0] = atomics[1].load(Ordering::Relaxed);
        }
        1 => {
            atomics[1].store(1, Ordering::Relaxed);
            ints[1] = atomics[0].load(Ordering::Relaxed);
        }
        _ => {}
    }
}

unsafe extern "C" fn sb_check(env: *const RawEnv) -> bool {
    let ints = ints(env);
    !(ints[0] == 0 && ints[1] == 0)
}

// ---------------------------------------------------------------------------
// mp: message passing, all relaxed
//
//   T0: data :=rlx 1; flag :=rlx 1     T1: r0 := flag.rlx; r1 := data.rlx
//
// Weak behaviour: r0 = 1 but r1 = 0 (flag overtook the data).
// ---------------------------------------------------------------------------

static MP_ATOMIC_INITIALS: [i32; 2] = [0, 0];
static MP_ATOMIC_NAMES: NameArray<2> = NameArray([c"data".as_ptr(), c"flag".as_ptr()]);
static MP_INT_INITIALS: [i32; 2] = [0, 0];
static MP_INT_NAMES: NameArray<2> = NameArray([c"1:r0".as_ptr(), c"1:r1".as_ptr()]);

static MP_MANIFEST: ManifestCell = ManifestCell(RawManifest {
    n_threads: 2,
    n_atomic_int32: 2,
    atomic_int32_initials: MP_ATOMIC_INITIALS.as_ptr(),
    atomic_int32_names: MP_ATOMIC_NAMES.0.as_ptr(),
    n_int32: 2,
    int32_initials: MP_INT_INITIALS.as_ptr(),
    int32_names: MP_INT_NAMES.0.as_ptr(),
});

unsafe extern "C" fn mp_test(tid: usize, env: *mut RawEnv) {
    let atomics = atomics(env);
    let ints = ints(env);
    match tid {
        0 => {
            atomics[0].store(1, Ordering::Relaxed);
            atomics[1].store(1, Ordering::Relaxed);
        }
        1 => {
            ints[0] = atomics[1].load(Ordering::Relaxed);
            ints[1] = atomics[0].load(Ordering::Relaxed);
        }
        _ => {}
    }
}

unsafe extern "C" fn mp_check(env: *const RawEnv) -> bool {
    let ints = ints(env);
    !(ints[0] == 1 && ints[1] == 0)
}

// ---------------------------------------------------------------------------
// lb: load buffering
//
//   T0: r0 := x.rlx; y :=rlx 1     T1: r1 := y.rlx; x :=rlx 1
//
// Weak behaviour: r0 = r1 = 1 (each load saw the other thread's later
// store).
// ---------------------------------------------------------------------------

static LB_ATOMIC_INITIALS: [i32; 2] = [0, 0];
static LB_ATOMIC_NAMES: NameArray<2> = NameArray([c"x".as_ptr(), c"y".as_ptr()]);
static LB_INT_INITIALS: [i32; 2] = [0, 0];
static LB_INT_NAMES: NameArray<2> = NameArray([c"0:r0".as_ptr(), c"1:r0".as_ptr()]);

static LB_MANIFEST: ManifestCell = ManifestCell(RawManifest {
    n_threads: 2,
    n_atomic_int32: 2,
    atomic_int32_initials: LB_ATOMIC_INITIALS.as_ptr(),
    atomic_int32_names: LB_ATOMIC_NAMES.0.as_ptr(),
    n_int32: 2,
    int32_initials: LB_INT_INITIALS.as_ptr(),
    int32_names: LB_INT_NAMES.0.as_ptr(),
});

unsafe extern "C" fn lb_test(tid: usize, env: *mut RawEnv) {
    let atomics = atomics(env);
    let ints = ints(env);
    match tid {
        0 => {
            ints[0] = atomics[0].load(Ordering::Relaxed);
            atomics[1].store(1, Ordering::Relaxed);
        }
        1 => {
            ints[1] = atomics[1].load(Ordering::Relaxed);
            atomics[0].store(1, Ordering::Relaxed);
        }
        _ => {}
    }
}

unsafe extern "C" fn lb_check(env: *const RawEnv) -> bool {
    let ints = ints(env);
    !(ints[0] == 1 && ints[1] == 1)
}

// ---------------------------------------------------------------------------
// corr: coherence of read-read
//
//   T0: x :=rlx 1; x :=rlx 2     T1: r0 := x.rlx; r1 := x.rlx
//
// Rejected behaviour: r0 = 2 then r1 = 1, which no coherent machine may
// produce; this test should always pass.
// ---------------------------------------------------------------------------

static CORR_ATOMIC_INITIALS: [i32; 1] = [0];
static CORR_ATOMIC_NAMES: NameArray<1> = NameArray([c"x".as_ptr()]);
static CORR_INT_INITIALS: [i32; 2] = [0, 0];
static CORR_INT_NAMES: NameArray<2> = NameArray([c"1:r0".as_ptr(), c"1:r1".as_ptr()]);

static CORR_MANIFEST: ManifestCell = ManifestCell(RawManifest {
    n_threads: 2,
    n_atomic_int32: 1,
    atomic_int32_initials: CORR_ATOMIC_INITIALS.as_ptr(),
    atomic_int32_names: CORR_ATOMIC_NAMES.0.as_ptr(),
    n_int32: 2,
    int32_initials: CORR_INT_INITIALS.as_ptr(),
    int32_names: CORR_INT_NAMES.0.as_ptr(),
});

unsafe extern "C" fn corr_test(tid: usize, env: *mut RawEnv) {
    let atomics = atomics(env);
    let ints = ints(env);
    match tid {
        0 => {
            atomics[0].store(1, Ordering::Relaxed);
            atomics[0].store(2, Ordering::Relaxed);
        }
        1 => {
            ints[0] = atomics[0].load(Ordering::Relaxed);
            ints[1] = atomics[0].load(Ordering::Relaxed);
        }
        _ => {}
    }
}

unsafe extern "C" fn corr_check(env: *const RawEnv) -> bool {
    let ints = ints(env);
    !(ints[0] == 2 && ints[1] == 1)
}
