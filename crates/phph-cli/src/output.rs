//! Final-report rendering: litmus-style histogram or JSON.

use std::io::Write;
use std::str::FromStr;

use phph_error::{Result, RunnerError};
use phph_model::{FinishReason, Outcome, Report};

/// Which renderer the `--output-type` flag selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputChoice {
    /// Litmus-style histogram lines.
    #[default]
    Histogram,
    /// The full report as pretty-printed JSON.
    Json,
}

impl FromStr for OutputChoice {
    type Err = RunnerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "histogram" => Ok(Self::Histogram),
            "json" => Ok(Self::Json),
            other => Err(RunnerError::bad_flag("output-type", other)),
        }
    }
}

impl OutputChoice {
    /// Render `report` into `w`.
    ///
    /// # Errors
    ///
    /// Propagates I/O and serialisation failures.
    pub fn render(self, w: &mut impl Write, report: &Report) -> Result<()> {
        match self {
            Self::Histogram => render_histogram(w, report),
            Self::Json => {
                serde_json::to_writer_pretty(&mut *w, report)
                    .map_err(|e| RunnerError::Io(e.into()))?;
                writeln!(w)?;
                Ok(())
            }
        }
    }
}

/// One histogram line per state:
///
/// ```text
///   9942 *> x=1 y=1 0:r0=0 1:r0=1 (iter 0)
///     58 :> x=1 y=1 0:r0=1 1:r0=1 (iter 102)
/// ```
///
/// `*` marks accepted states, `:` rejected, `?` unknown.
fn render_histogram(w: &mut impl Write, report: &Report) -> Result<()> {
    let occ_width = report
        .states
        .iter()
        .map(|s| s.info.occurs.to_string().len())
        .max()
        .unwrap_or(1);

    for state in &report.states {
        let valuation = state
            .values
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(
            w,
            "{occ:>occ_width$} {sigil}> {valuation} (iter {iter})",
            occ = state.info.occurs,
            sigil = sigil(state.info.outcome),
            iter = state.info.first_iteration,
        )?;
    }

    writeln!(w, "total: {}", report.total)?;
    match &report.finish {
        FinishReason::Completed => {}
        FinishReason::PolicyStop { on } => writeln!(w, "halted on first {on} state")?,
        FinishReason::Cancelled => writeln!(w, "cancelled; partial histogram")?,
        FinishReason::Fatal { diagnostic, .. } => writeln!(w, "fatal: {diagnostic}")?,
    }
    Ok(())
}

const fn sigil(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Accepted => "*",
        Outcome::Rejected => ":",
        Outcome::Unknown => "?",
    }
}
