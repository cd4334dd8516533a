//! Cross-configuration equivalences:
//!   1. With one thread, static and random permuters are indistinguishable.
//!   2. Spinner and kernel barrier agree on the reachable-state sets of a
//!      racy test (set overlap, not distribution equality).

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use phph_api::{RawEnv, RawManifest, TestSymbols};
use phph_engine::{PermuteChoice, RunConfig, RunnerBuilder, SyncChoice};
use phph_model::Report;

struct NameArray<const N: usize>([*const libc::c_char; N]);
unsafe impl<const N: usize> Sync for NameArray<N> {}

struct ManifestCell(RawManifest);
unsafe impl Sync for ManifestCell {}

unsafe fn atomics<'a>(env: *const RawEnv) -> &'a [std::sync::atomic::AtomicI32] {
    let env = &*env;
    std::slice::from_raw_parts(env.atomic_int32, env.n_atomic_int32)
}

fn run(module: TestSymbols, config: RunConfig) -> Report {
    RunnerBuilder::new(Arc::new(module))
        .config(config)
        .build()
        .expect("module manifest must be valid")
        .run()
        .expect("engine must not fail to start")
}

fn state_set(report: &Report) -> BTreeSet<BTreeMap<String, i32>> {
    report.states.iter().map(|s| s.values.clone()).collect()
}

// ---------------------------------------------------------------------------
// Single-thread module for the permuter equivalence
// ---------------------------------------------------------------------------

static ONE_ATOMIC_INITIALS: [i32; 1] = [5];
static ONE_ATOMIC_NAMES: NameArray<1> = NameArray([c"x".as_ptr()]);

static ONE_MANIFEST: ManifestCell = ManifestCell(RawManifest {
    n_threads: 1,
    n_atomic_int32: 1,
    atomic_int32_initials: ONE_ATOMIC_INITIALS.as_ptr(),
    atomic_int32_names: ONE_ATOMIC_NAMES.0.as_ptr(),
    n_int32: 0,
    int32_initials: std::ptr::null(),
    int32_names: std::ptr::null(),
});

unsafe extern "C" fn one_test(_tid: usize, env: *mut RawEnv) {
    let atomics = atomics(env);
    let v = atomics[0].load(Ordering::Relaxed);
    atomics[0].store(v * 2, Ordering::Relaxed);
}

unsafe extern "C" fn one_check(env: *const RawEnv) -> bool {
    atomics(env)[0].load(Ordering::Relaxed) == 10
}

#[test]
fn permuters_agree_on_single_thread_tests() {
    let config = |permute| RunConfig {
        iterations: 2_000,
        permute,
        ..RunConfig::default()
    };

    let static_report = run(
        unsafe { TestSymbols::new(&ONE_MANIFEST.0, one_test, one_check) },
        config(PermuteChoice::Static),
    );
    let random_report = run(
        unsafe { TestSymbols::new(&ONE_MANIFEST.0, one_test, one_check) },
        config(PermuteChoice::Random),
    );

    assert_eq!(static_report.total, random_report.total);
    assert_eq!(static_report.outcome, random_report.outcome);
    assert_eq!(state_set(&static_report), state_set(&random_report));
    assert_eq!(
        static_report.states[0].info.occurs,
        random_report.states[0].info.occurs
    );
}

// ---------------------------------------------------------------------------
// Racy two-thread module for the synchroniser comparison
// ---------------------------------------------------------------------------

static RACE_ATOMIC_INITIALS: [i32; 2] = [0, 0];
static RACE_ATOMIC_NAMES: NameArray<2> = NameArray([c"x".as_ptr(), c"y".as_ptr()]);

static RACE_MANIFEST: ManifestCell = ManifestCell(RawManifest {
    n_threads: 2,
    n_atomic_int32: 2,
    atomic_int32_initials: RACE_ATOMIC_INITIALS.as_ptr(),
    atomic_int32_names: RACE_ATOMIC_NAMES.0.as_ptr(),
    n_int32: 0,
    int32_initials: std::ptr::null(),
    int32_names: std::ptr::null(),
});

unsafe extern "C" fn race_test(tid: usize, env: *mut RawEnv) {
    let atomics = atomics(env);
    match tid {
        0 => {
            atomics[0].store(1, Ordering::Relaxed);
            let seen = atomics[1].load(Ordering::Relaxed);
            atomics[0].store(1 + seen, Ordering::Relaxed);
        }
        1 => {
            atomics[1].store(1, Ordering::Relaxed);
            let seen = atomics[0].load(Ordering::Relaxed);
            atomics[1].store(1 + seen, Ordering::Relaxed);
        }
        _ => {}
    }
}

unsafe extern "C" fn race_check(env: *const RawEnv) -> bool {
    let atomics = atomics(env);
    atomics[0].load(Ordering::Relaxed) >= 1 && atomics[1].load(Ordering::Relaxed) >= 1
}

#[test]
fn synchronisers_observe_overlapping_state_sets() {
    let config = |sync| RunConfig {
        iterations: 10_000,
        sync,
        ..RunConfig::default()
    };

    let spinner_report = run(
        unsafe { TestSymbols::new(&RACE_MANIFEST.0, race_test, race_check) },
        config(SyncChoice::Spinner),
    );
    let barrier_report = run(
        unsafe { TestSymbols::new(&RACE_MANIFEST.0, race_test, race_check) },
        config(SyncChoice::Barrier),
    );

    assert_eq!(spinner_report.total, 10_000);
    assert_eq!(barrier_report.total, 10_000);

    let spinner_states = state_set(&spinner_report);
    let barrier_states = state_set(&barrier_report);

    // Identical distributions are not guaranteed, but the reachable sets
    // must overlap: both run the same test on the same hardware.
    assert!(
        spinner_states.intersection(&barrier_states).next().is_some(),
        "spinner and barrier observed disjoint state sets"
    );

    // Every state is a legal final state of the test.
    for states in [&spinner_states, &barrier_states] {
        for state in states.iter() {
            assert!(state.get("x").is_some_and(|&v| (1..=2).contains(&v)));
            assert!(state.get("y").is_some_and(|&v| (1..=2).contains(&v)));
        }
    }
}
