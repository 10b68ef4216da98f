//! CLI entry point for evaluator adapters
//!
//! The workspace ships no expression-language runtime, so there is no
//! standalone binary here; an adapter crate that owns a real [`Evaluator`]
//! builds its tool binary by calling [`run`] with it:
//!
//! ```rust,ignore
//! fn main() -> anyhow::Result<()> {
//!     xfn_harness::cli::run(MyEvaluator::new())
//! }
//! ```

use crate::runner::{TestConfig, TestHarness};
use anyhow::Context as _;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use xfn_eval::Evaluator;

/// Developer tools for composition packages
#[derive(Debug, Parser)]
#[command(name = "xfn-tools", version)]
struct Cli {
    /// Emit debug logs in addition to info logs
    #[arg(short = 'd', long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: ToolCommand,
}

#[derive(Debug, Subcommand)]
enum ToolCommand {
    /// Run fixture tests for a package
    Test {
        /// The package under test
        #[arg(long)]
        package: PathBuf,

        /// Fixture directory; defaults to `<package>/tests`
        #[arg(long)]
        test_package: Option<PathBuf>,

        /// Tags to run; discovered from fixture file names when omitted
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,

        /// Request variable override
        #[arg(long)]
        request_var: Option<String>,

        /// Response selector override (`.` selects the document root)
        #[arg(long)]
        response_var: Option<String>,

        /// The package produces a bare desired-state document
        #[arg(long)]
        legacy_desired_only: bool,

        /// Fixture file extension
        #[arg(long)]
        script_extension: Option<String>,
    },

    /// Print the workspace version
    Version,
}

/// Parse process arguments and run the selected tool over `evaluator`
///
/// # Errors
/// Harness construction and run failures, with context attached; the caller
/// turns the error into a non-zero exit.
pub fn run<E: Evaluator>(evaluator: E) -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match cli.command {
        ToolCommand::Test {
            package,
            test_package,
            tags,
            request_var,
            response_var,
            legacy_desired_only,
            script_extension,
        } => {
            let config = TestConfig {
                package,
                test_package,
                tags,
                request_var,
                response_var,
                legacy_desired_only,
                script_extension,
                debug: cli.debug,
            };
            let harness = TestHarness::new(config, evaluator).context("create test harness")?;
            harness
                .run(&mut std::io::stderr())
                .context("run fixture tests")
        }
        ToolCommand::Version => {
            println!("{}", crate::VERSION);
            Ok(())
        }
    }
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_test_command() {
        let cli = Cli::try_parse_from([
            "xfn-tools",
            "test",
            "--package",
            "/pkg",
            "--tags",
            "a,b",
            "--legacy-desired-only",
        ])
        .unwrap();
        match cli.command {
            ToolCommand::Test {
                package,
                tags,
                legacy_desired_only,
                ..
            } => {
                assert_eq!(package, PathBuf::from("/pkg"));
                assert_eq!(tags, ["a", "b"]);
                assert!(legacy_desired_only);
            }
            ToolCommand::Version => panic!("expected test command"),
        }
    }

    #[test]
    fn cli_requires_package() {
        assert!(Cli::try_parse_from(["xfn-tools", "test"]).is_err());
    }
}
