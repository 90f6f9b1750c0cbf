use std::panic;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::{HarnessConfig, JudgeConfig};
use crate::constants::{DEFAULT_INPUT_EXTENSION, DEFAULT_OUTPUT_EXTENSION, DEFAULT_TIME_LIMIT_MS};
use crate::core::domain::JudgeVerdict;
use crate::core::judge::Judge;
use crate::core::session::Session;
use crate::native::harness::Harness;

mod cases;
mod config;
mod constants;
mod core;
mod native;


/// Judges a program against local test cases.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Test case file, or a directory of them
    #[arg(env = "LOCALJUDGE_TESTS")]
    tests: PathBuf,
    /// Executable to judge
    #[arg(env = "LOCALJUDGE_PROGRAM")]
    program: PathBuf,
    /// Time limit per case in milliseconds (rounded up to 100 ms)
    #[arg(
        long = "time-limit",
        env = "LOCALJUDGE_TIME_LIMIT_MS",
        default_value_t = DEFAULT_TIME_LIMIT_MS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    time_limit_ms: u64,
    #[arg(long, env = "LOCALJUDGE_INPUT_EXT", default_value = DEFAULT_INPUT_EXTENSION)]
    input_ext: String,
    #[arg(long, env = "LOCALJUDGE_OUTPUT_EXT", default_value = DEFAULT_OUTPUT_EXTENSION)]
    output_ext: String,
    /// Treat trailing spaces as significant
    #[arg(long, env = "LOCALJUDGE_STRICT")]
    strict: bool,
    /// Do not append the 0x04 byte to non-empty input
    #[arg(long, env = "LOCALJUDGE_NO_EOF_MARKER")]
    no_eof_marker: bool,
    /// Print the full diagnostic of every case that was not accepted
    #[arg(long)]
    details: bool,
}

impl Cli {
    fn judge_config(&self) -> JudgeConfig {
        let mut harness = HarnessConfig::default();
        if self.no_eof_marker {
            harness.eof_marker = None;
        }
        JudgeConfig {
            time_limit_ms: self.time_limit_ms,
            strict: self.strict,
            input_extension: self.input_ext.clone(),
            output_extension: self.output_ext.clone(),
            harness,
        }
    }
}

#[tokio::main]
#[tracing::instrument]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    set_panic_hook();

    let cli = Cli::parse();
    let config = cli.judge_config();

    let cases = cases::discover(&cli.tests, &config.input_extension, &config.output_extension)?;
    if cases.is_empty() {
        tracing::warn!(path = %cli.tests.display(), "no test cases found");
        return Ok(());
    }

    let judge = Judge::new(config);
    let time_limit_ms = judge.config().time_limit_ms;
    tracing::info!(program = %cli.program.display(), cases = cases.len(), "judging");

    let session = if cli.tests.is_file() {
        // A lone case gets a harness of its own; Ctrl-C simply ends the process.
        let mut session = Session::default();
        for case in cases {
            let verdict = judge
                .evaluate(&case.input, &case.expected, &cli.program, time_limit_ms)
                .await;
            session.push(case, verdict);
        }
        session
    } else {
        let harness = Arc::new(Harness::new(&cli.program, judge.config().harness.clone()));
        {
            let harness = harness.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    harness.shutdown();
                }
            });
        }
        Session::run(&judge, harness.as_ref(), &cases).await
    };

    for (idx, result) in session.results().iter().enumerate() {
        let summary = match &result.verdict {
            verdict @ JudgeVerdict::Accepted(_) => verdict.to_string(),
            verdict => verdict.label().to_string(),
        };
        println!("{:>3}. {}: {}", idx + 1, result.case.name, summary);
    }
    println!("accepted {}/{}", session.accepted(), session.results().len());

    if cli.details {
        for index in 1..=session.results().len() {
            let Some(result) = session.detail(index) else {
                continue;
            };
            if !result.verdict.is_accepted() {
                println!("\n#{index} {}\n{}", result.case.name, result.verdict);
            }
        }
    }

    Ok(())
}

fn set_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        tracing::error!(
            message = "panic occurred",
            panic = %panic_info
        );
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_time_limit_is_rejected() {
        let parsed = Cli::try_parse_from(["localjudge", "tests", "prog", "--time-limit", "0"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_time_limit_reaches_judge_config() {
        let cli = Cli::try_parse_from(["localjudge", "tests", "prog", "--time-limit", "250"])
            .expect("Failed to parse arguments");
        assert_eq!(cli.judge_config().time_limit_ms, 250);
    }
}
