//! `repr(C)` mirrors of the structures that cross the test ABI.
//!
//! Field order and types here are a compatibility boundary with externally
//! compiled tests; changing either is an ABI break. The environment's
//! reference count deliberately does NOT appear in [`RawEnv`] — earlier
//! designs that packed it into the public struct exposed it to test code,
//! where it could be mistaken for test state.

use std::sync::atomic::AtomicI32;

use libc::{c_char, c_void};

/// The environment view handed to test code.
///
/// `atomic_int32` points at an array of cells whose in-memory representation
/// is the platform's native 32-bit atomic integer (`AtomicI32` is guaranteed
/// to have the same representation as `i32`). Test code addresses cells
/// directly through these pointers and chooses its own memory orderings.
#[repr(C)]
pub struct RawEnv {
    /// Number of atomic 32-bit cells.
    pub n_atomic_int32: usize,
    /// The atomic cell array; length `n_atomic_int32`.
    pub atomic_int32: *mut AtomicI32,
    /// Number of non-atomic 32-bit cells.
    pub n_int32: usize,
    /// The non-atomic cell array; length `n_int32`.
    pub int32: *mut i32,
    /// Reserved for the runner (the `priv` field of the C ABI).
    /// Tests MUST NOT read or write it.
    pub reserved: *mut c_void,
}

/// The manifest record a test module publishes.
///
/// All pointers reference storage owned by the module and alive for the
/// module's lifetime; the runner copies what it needs at start-up.
#[repr(C)]
pub struct RawManifest {
    /// Number of threads in this test.
    pub n_threads: usize,
    /// Number of atomic 32-bit cells.
    pub n_atomic_int32: usize,
    /// Initial value for each atomic cell; length `n_atomic_int32`.
    pub atomic_int32_initials: *const i32,
    /// NUL-terminated name for each atomic cell; length `n_atomic_int32`.
    pub atomic_int32_names: *const *const c_char,
    /// Number of non-atomic 32-bit cells.
    pub n_int32: usize,
    /// Initial value for each non-atomic cell; length `n_int32`.
    pub int32_initials: *const i32,
    /// NUL-terminated name for each non-atomic cell; length `n_int32`.
    pub int32_names: *const *const c_char,
}

/// The `test(tid, env)` entry point: runs thread `tid`'s body.
pub type TestFn = unsafe extern "C" fn(tid: usize, env: *mut RawEnv);

/// The `check(env)` entry point: classifies the post-iteration state.
pub type CheckFn = unsafe extern "C" fn(env: *const RawEnv) -> bool;

/// Decode a C name array into owned strings.
///
/// # Safety
///
/// `src` must point to `n` valid NUL-terminated strings (or be anything at
/// all when `n == 0`).
pub(crate) unsafe fn decode_names(src: *const *const c_char, n: usize) -> Vec<String> {
    if n == 0 {
        return Vec::new();
    }
    std::slice::from_raw_parts(src, n)
        .iter()
        .map(|&ptr| {
            std::ffi::CStr::from_ptr(ptr)
                .to_string_lossy()
                .into_owned()
        })
        .collect()
}

/// Decode a C initial-value array.
///
/// # Safety
///
/// `src` must point to `n` valid `i32`s (or be anything at all when
/// `n == 0`).
pub(crate) unsafe fn decode_initials(src: *const i32, n: usize) -> Vec<i32> {
    if n == 0 {
        return Vec::new();
    }
    std::slice::from_raw_parts(src, n).to_vec()
}
