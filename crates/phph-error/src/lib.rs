use std::num::ParseIntError;

use thiserror::Error;

/// Primary error type for the phenolphthalein runner.
///
/// Variants are grouped by the failure classes the engine distinguishes:
/// configuration errors (reported before any worker starts), resource errors,
/// test-contract violations, and run-time failures. Every variant maps to a
/// stable process exit code via [`RunnerError::exit_code`].
#[derive(Error, Debug)]
pub enum RunnerError {
    // === Configuration Errors ===
    /// An argument flag the front end does not recognise.
    #[error("unrecognised flag: '{flag}'")]
    UnknownFlag { flag: String },

    /// A flag was given a value outside its accepted set.
    #[error("bad value for --{flag}: '{value}'")]
    BadFlagValue { flag: &'static str, value: String },

    /// A numeric flag failed to parse.
    #[error("bad count for --{flag}")]
    BadCount {
        flag: &'static str,
        source: ParseIntError,
    },

    /// The requested test is not in the built-in registry.
    #[error("no such test: '{name}'")]
    UnknownTest { name: String },

    /// No test was named on the command line.
    #[error("no test named; expected a test name argument")]
    NoTestNamed,

    /// The test's manifest is internally inconsistent.
    #[error("bad test manifest: {detail}")]
    BadManifest { detail: String },

    // === Resource Errors ===
    /// The environment's cell arrays could not be allocated.
    #[error("failed to allocate environment ({atomic} atomic, {plain} plain cells)")]
    EnvAlloc { atomic: usize, plain: usize },

    /// An OS thread for a worker could not be spawned.
    #[error("failed to spawn worker thread {tid}")]
    ThreadSpawn {
        tid: usize,
        source: std::io::Error,
    },

    /// The requested thread count exceeds what the spinner can track.
    #[error("too many threads for spinner: {requested}")]
    TooManyThreads { requested: usize },

    // === Test-Contract Violations ===
    /// `check` classified a previously seen state differently.
    ///
    /// Same state must always yield the same classification; anything else is
    /// a bug in the test's `check` and the run cannot be trusted.
    #[error("inconsistent check for state [{state}]: stored {stored}, now {latest}")]
    InconsistentCheck {
        state: String,
        stored: &'static str,
        latest: &'static str,
    },

    /// A worker was handed a thread id outside `[0, n_threads)`.
    #[error("thread id {tid} out of range for {n_threads} threads")]
    ThreadIdRange { tid: usize, n_threads: usize },

    // === Run-Time Failures ===
    /// A worker panicked inside the test body or its bookkeeping.
    #[error("worker thread {tid} panicked")]
    WorkerPanic { tid: usize },

    /// Miscellaneous I/O error (report output, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RunnerError {
    /// Whether this error was raised before any worker thread started.
    ///
    /// Pre-run errors carry no partial histogram; everything else may.
    pub const fn is_config(&self) -> bool {
        matches!(
            self,
            Self::UnknownFlag { .. }
                | Self::BadFlagValue { .. }
                | Self::BadCount { .. }
                | Self::UnknownTest { .. }
                | Self::NoTestNamed
                | Self::BadManifest { .. }
        )
    }

    /// Get the process exit code for this error (for CLI use).
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::UnknownFlag { .. }
            | Self::BadFlagValue { .. }
            | Self::BadCount { .. }
            | Self::UnknownTest { .. }
            | Self::NoTestNamed
            | Self::BadManifest { .. } => 2,
            Self::EnvAlloc { .. } | Self::ThreadSpawn { .. } | Self::TooManyThreads { .. } => 3,
            Self::InconsistentCheck { .. } | Self::ThreadIdRange { .. } => 4,
            Self::WorkerPanic { .. } => 5,
            Self::Io(_) => 6,
        }
    }

    /// Create a bad-flag-value error.
    pub fn bad_flag(flag: &'static str, value: impl Into<String>) -> Self {
        Self::BadFlagValue {
            flag,
            value: value.into(),
        }
    }

    /// Create a bad-manifest error.
    pub fn bad_manifest(detail: impl Into<String>) -> Self {
        Self::BadManifest {
            detail: detail.into(),
        }
    }

    /// Create an inconsistent-check error.
    pub fn inconsistent_check(
        state: impl Into<String>,
        stored: &'static str,
        latest: &'static str,
    ) -> Self {
        Self::InconsistentCheck {
            state: state.into(),
            stored,
            latest,
        }
    }
}

/// Result type alias using [`RunnerError`].
pub type Result<T> = std::result::Result<T, RunnerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = RunnerError::bad_flag("sync", "mutex");
        assert_eq!(err.to_string(), "bad value for --sync: 'mutex'");
    }

    #[test]
    fn error_display_inconsistent_check() {
        let err = RunnerError::inconsistent_check("x=1 y=0", "accepted", "rejected");
        assert_eq!(
            err.to_string(),
            "inconsistent check for state [x=1 y=0]: stored accepted, now rejected"
        );
    }

    #[test]
    fn error_display_env_alloc() {
        let err = RunnerError::EnvAlloc { atomic: 2, plain: 3 };
        assert_eq!(
            err.to_string(),
            "failed to allocate environment (2 atomic, 3 plain cells)"
        );
    }

    #[test]
    fn config_classification() {
        assert!(RunnerError::NoTestNamed.is_config());
        assert!(RunnerError::bad_manifest("zero threads").is_config());
        assert!(!RunnerError::WorkerPanic { tid: 1 }.is_config());
        assert!(!RunnerError::EnvAlloc { atomic: 0, plain: 0 }.is_config());
    }

    #[test]
    fn exit_codes() {
        assert_eq!(RunnerError::NoTestNamed.exit_code(), 2);
        assert_eq!(RunnerError::TooManyThreads { requested: 1 }.exit_code(), 3);
        assert_eq!(
            RunnerError::ThreadIdRange { tid: 9, n_threads: 2 }.exit_code(),
            4
        );
        assert_eq!(RunnerError::WorkerPanic { tid: 0 }.exit_code(), 5);
    }

    #[test]
    fn io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe gone");
        let err: RunnerError = io_err.into();
        assert!(matches!(err, RunnerError::Io(_)));
        assert_eq!(err.exit_code(), 6);
    }

    #[test]
    fn bad_count_carries_source() {
        let parse_err = "x".parse::<usize>().unwrap_err();
        let err = RunnerError::BadCount {
            flag: "iterations",
            source: parse_err,
        };
        assert_eq!(err.to_string(), "bad count for --iterations");
        assert!(std::error::Error::source(&err).is_some());
    }
}
