//! Data model for the phenolphthalein litmus-test runner.
//!
//! This crate defines the vocabulary shared between the engine, the test ABI,
//! and the front end: test [`Manifest`]s, observed [`State`]s, check
//! [`Outcome`]s, and the [`Histogram`] / [`Report`] aggregation types.
//! Nothing here is concurrency-aware; the engine owns all synchronisation.

pub mod manifest;
pub mod outcome;
pub mod report;
pub mod state;

pub use manifest::{InvalidManifest, Manifest, VarSet};
pub use outcome::Outcome;
pub use report::{FinishReason, Histogram, OutcomeMismatch, Report, StateReport};
pub use state::{State, StateInfo};
