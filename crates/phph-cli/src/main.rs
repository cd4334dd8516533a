//! `phph`: run a built-in litmus test and report the observed states.

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use phph_engine::{CancelToken, RunConfig, RunnerBuilder};
use phph_error::{Result, RunnerError};
use phph_model::FinishReason;

mod output;
mod registry;

use output::OutputChoice;

const USAGE: &str = "\
usage: phph [OPTIONS] TEST

Runs the named built-in litmus test and prints the distribution of
observed final states.

options:
  --iterations=N     iteration cap (0 = unbounded; default 100000)
  --period=N         rotate worker threads every N iterations (0 = never)
  --sync=CHOICE      spinner | barrier
  --permute=CHOICE   static | random
  --check=POLICY     disable | report | exit-on-pass | exit-on-fail |
                     exit-on-unknown
  --output-type=FMT  histogram | json
  --seed=N           seed for the random permuter
  --help             print this help
";

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("phph: {err}");
            if err.is_config() {
                eprintln!("{USAGE}");
            }
            exit_code(err.exit_code())
        }
    }
}

fn run(args: &[String]) -> Result<ExitCode> {
    let Some(parsed) = Args::parse(args)? else {
        print!("{USAGE}");
        println!("\ntests: {}", registry::NAMES.join(" "));
        return Ok(ExitCode::SUCCESS);
    };

    let module = registry::find(&parsed.test)?;
    let report = RunnerBuilder::new(Arc::new(module))
        .config(parsed.config)
        .cancel_token(CancelToken::new())
        .build()?
        .run()?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    parsed.output.render(&mut out, &report)?;
    out.flush()?;

    match &report.finish {
        FinishReason::Fatal { diagnostic, code } => {
            eprintln!("phph: {diagnostic}");
            Ok(exit_code(*code))
        }
        _ => Ok(ExitCode::SUCCESS),
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

/// Parsed command line: the test to run, the engine configuration, and the
/// output format.
#[derive(Debug)]
struct Args {
    test: String,
    config: RunConfig,
    output: OutputChoice,
}

/// The recognised option flags.
#[derive(Clone, Copy)]
enum Flag {
    Iterations,
    Period,
    Seed,
    Sync,
    Permute,
    Check,
    OutputType,
}

impl Flag {
    const fn name(self) -> &'static str {
        match self {
            Self::Iterations => "iterations",
            Self::Period => "period",
            Self::Seed => "seed",
            Self::Sync => "sync",
            Self::Permute => "permute",
            Self::Check => "check",
            Self::OutputType => "output-type",
        }
    }
}

impl Args {
    /// Parse the argument list; `Ok(None)` means `--help` was requested.
    fn parse(args: &[String]) -> Result<Option<Self>> {
        let mut config = RunConfig::default();
        let mut output = OutputChoice::default();
        let mut test: Option<String> = None;

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            let Some(flag_body) = arg.strip_prefix("--") else {
                if test.replace(arg.clone()).is_some() {
                    return Err(RunnerError::UnknownFlag { flag: arg.clone() });
                }
                continue;
            };
            if flag_body == "help" {
                return Ok(None);
            }

            let (name, inline) = match flag_body.split_once('=') {
                Some((name, value)) => (name, Some(value.to_owned())),
                None => (flag_body, None),
            };
            let flag = match name {
                "iterations" => Flag::Iterations,
                "period" => Flag::Period,
                "seed" => Flag::Seed,
                "sync" => Flag::Sync,
                "permute" => Flag::Permute,
                "check" => Flag::Check,
                "output-type" => Flag::OutputType,
                _ => {
                    return Err(RunnerError::UnknownFlag { flag: arg.clone() });
                }
            };
            let value = match inline {
                Some(value) => value,
                None => iter
                    .next()
                    .cloned()
                    .ok_or_else(|| RunnerError::bad_flag(flag.name(), "missing value"))?,
            };

            match flag {
                Flag::Iterations => config.iterations = parse_count("iterations", &value)?,
                Flag::Period => config.period = parse_count("period", &value)?,
                Flag::Seed => config.seed = parse_count("seed", &value)?,
                Flag::Sync => config.sync = value.parse()?,
                Flag::Permute => config.permute = value.parse()?,
                Flag::Check => config.check = value.parse()?,
                Flag::OutputType => output = value.parse()?,
            }
        }

        let test = test.ok_or(RunnerError::NoTestNamed)?;
        Ok(Some(Self {
            test,
            config,
            output,
        }))
    }
}

fn parse_count(flag: &'static str, value: &str) -> Result<u64> {
    value
        .parse()
        .map_err(|source| RunnerError::BadCount { flag, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use phph_engine::{CheckPolicy, PermuteChoice, SyncChoice};
    use phph_model::Outcome;

    fn parse(args: &[&str]) -> Result<Option<Args>> {
        let owned: Vec<String> = args.iter().map(|s| (*s).to_owned()).collect();
        Args::parse(&owned)
    }

    #[test]
    fn defaults_with_test_name() {
        let args = parse(&["sb"]).unwrap().unwrap();
        assert_eq!(args.test, "sb");
        assert_eq!(args.config, RunConfig::default());
        assert_eq!(args.output, OutputChoice::Histogram);
    }

    #[test]
    fn equals_and_space_forms_agree() {
        let a = parse(&["--iterations=500", "--sync=barrier", "sb"])
            .unwrap()
            .unwrap();
        let b = parse(&["--iterations", "500", "--sync", "barrier", "sb"])
            .unwrap()
            .unwrap();
        assert_eq!(a.config, b.config);
        assert_eq!(a.config.iterations, 500);
        assert_eq!(a.config.sync, SyncChoice::Barrier);
    }

    #[test]
    fn full_flag_set_parses() {
        let args = parse(&[
            "--iterations=1000",
            "--period=100",
            "--sync=spinner",
            "--permute=static",
            "--check=exit-on-fail",
            "--output-type=json",
            "--seed=9",
            "mp",
        ])
        .unwrap()
        .unwrap();
        assert_eq!(args.config.iterations, 1000);
        assert_eq!(args.config.period, 100);
        assert_eq!(args.config.permute, PermuteChoice::Static);
        assert_eq!(args.config.check, CheckPolicy::ExitOn(Outcome::Rejected));
        assert_eq!(args.config.seed, 9);
        assert_eq!(args.output, OutputChoice::Json);
        assert_eq!(args.test, "mp");
    }

    #[test]
    fn help_short_circuits() {
        assert!(parse(&["--help"]).unwrap().is_none());
        assert!(parse(&["--help", "sb"]).unwrap().is_none());
    }

    #[test]
    fn missing_test_name_is_an_error() {
        let err = parse(&["--iterations=5"]).unwrap_err();
        assert!(matches!(err, RunnerError::NoTestNamed));
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(matches!(
            parse(&["--iterations=many", "sb"]).unwrap_err(),
            RunnerError::BadCount { .. }
        ));
        assert!(matches!(
            parse(&["--sync=mutex", "sb"]).unwrap_err(),
            RunnerError::BadFlagValue { .. }
        ));
        assert!(matches!(
            parse(&["--frobnicate=1", "sb"]).unwrap_err(),
            RunnerError::UnknownFlag { .. }
        ));
    }

    #[test]
    fn second_positional_is_rejected() {
        let err = parse(&["sb", "mp"]).unwrap_err();
        assert!(matches!(err, RunnerError::UnknownFlag { .. }));
    }

    #[test]
    fn end_to_end_histogram_run() {
        let module = registry::find("sb").unwrap();
        let report = RunnerBuilder::new(Arc::new(module))
            .config(RunConfig {
                iterations: 300,
                ..RunConfig::default()
            })
            .build()
            .unwrap()
            .run()
            .unwrap();

        let mut buf = Vec::new();
        OutputChoice::Histogram.render(&mut buf, &report).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("total: 300"), "got:\n{text}");
    }
}
