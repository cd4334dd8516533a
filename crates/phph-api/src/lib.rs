//! The test-module ABI boundary.
//!
//! This crate pins down the bit-exact interface between the runner and an
//! externally compiled litmus test: the [`RawEnv`] environment view a test
//! body receives, the [`RawManifest`] a module publishes, and the
//! [`TestModule`] contract the engine consumes. Symbol resolution itself
//! (dlopen and friends) is someone else's job — the engine is handed an
//! already-resolved [`TestSymbols`] triple.

pub mod module;
pub mod raw;

pub use module::{TestModule, TestSymbols};
pub use raw::{CheckFn, RawEnv, RawManifest, TestFn};
