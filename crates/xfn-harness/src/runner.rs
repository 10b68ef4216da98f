//! Fixture-driven test runner
//!
//! Discovers test tags from fixture file names, then drives one
//! evaluate-expected / evaluate-request / compute-actual / compare cycle per
//! tag. Tags are independent; a failing tag is recorded and the run
//! continues, ending in one consolidated error.

use crate::oracle::{AssertionMode, Oracle, OracleError, ASSERTION_MODE_ATTRIBUTE};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use xfn_core::{EvalOptions, Function, FunctionError, FunctionOptions};
use xfn_eval::{Evaluator, ScriptSource};
use xfn_proto::{RunFunctionRequest, RunFunctionResponse};

/// Default fixture file extension
pub const DEFAULT_SCRIPT_EXTENSION: &str = "cue";

/// Harness configuration
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// The package under test
    pub package: PathBuf,

    /// Where test fixtures live; defaults to `<package>/tests`
    pub test_package: Option<PathBuf>,

    /// Tags to run; discovered from fixture file names when empty
    pub tags: Vec<String>,

    /// Request variable override for the package under test
    pub request_var: Option<String>,

    /// Response selector override for the package under test
    pub response_var: Option<String>,

    /// The package produces a bare desired-state document
    pub legacy_desired_only: bool,

    /// Fixture file extension; defaults to [`DEFAULT_SCRIPT_EXTENSION`]
    pub script_extension: Option<String>,

    /// Dump scripts, requests, and responses while running
    pub debug: bool,
}

/// Harness lifecycle and aggregate failures
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// No package configured
    #[error("package was not specified")]
    MissingPackage,

    /// Could not scan the test package for fixtures
    #[error("discover tags in {dir}: {detail}")]
    Discovery {
        /// The directory that failed to scan
        dir: PathBuf,
        /// I/O diagnostic
        detail: String,
    },

    /// Nothing to run
    #[error("no test tags found even after auto-discovery")]
    NoTags,

    /// Consolidated failure after a full run
    #[error("{failed} of {total} tests had errors")]
    TestsFailed {
        /// How many tags failed
        failed: usize,
        /// How many tags ran
        total: usize,
    },

    /// Progress output could not be written
    #[error("write test output: {0}")]
    Output(#[from] std::io::Error),
}

/// One tag's failure
#[derive(Debug, thiserror::Error)]
pub enum TestError {
    /// The expected-response fixture failed to evaluate or decode
    #[error("evaluate expected: {0}")]
    Expected(#[source] FunctionError),

    /// The request fixture failed to evaluate or decode
    #[error("evaluate request: {0}")]
    Request(#[source] FunctionError),

    /// The package under test failed against the fixture request
    #[error("evaluate package with test request: {0}")]
    Actual(#[source] FunctionError),

    /// Assertion-mode configuration or comparison failure
    #[error(transparent)]
    Assertion(#[from] OracleError),
}

/// Fixture test harness for one package
#[derive(Debug)]
pub struct TestHarness<E> {
    package: PathBuf,
    test_package: PathBuf,
    tags: Vec<String>,
    opts: EvalOptions,
    function: Function<E>,
}

impl<E: Evaluator> TestHarness<E> {
    /// Build a harness, auto-discovering tags when none are configured
    ///
    /// # Errors
    /// [`HarnessError::MissingPackage`] without a package,
    /// [`HarnessError::Discovery`] when the test package cannot be scanned,
    /// [`HarnessError::NoTags`] when discovery finds nothing to run.
    pub fn new(config: TestConfig, evaluator: E) -> Result<Self, HarnessError> {
        if config.package.as_os_str().is_empty() {
            return Err(HarnessError::MissingPackage);
        }
        let test_package = config
            .test_package
            .clone()
            .unwrap_or_else(|| config.package.join("tests"));

        let mut tags = config.tags.clone();
        if tags.is_empty() {
            let extension = config
                .script_extension
                .as_deref()
                .unwrap_or(DEFAULT_SCRIPT_EXTENSION);
            tags = discover_tags(&test_package, extension)?;
        } else {
            tags.sort();
        }
        if tags.is_empty() {
            return Err(HarnessError::NoTags);
        }

        let opts = EvalOptions {
            request_var: config.request_var.clone(),
            response_var: config.response_var.clone(),
            legacy_desired_only: config.legacy_desired_only,
            debug: config.debug,
        };
        Ok(Self {
            package: config.package,
            test_package,
            tags,
            opts,
            function: Function::new(evaluator, FunctionOptions { debug: config.debug }),
        })
    }

    /// Tags this harness will run, in order
    #[inline]
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Run every tag, writing progress lines to `out`
    ///
    /// Does not fail fast: every tag runs, failures are recorded, and the
    /// run ends with one consolidated error.
    ///
    /// # Errors
    /// [`HarnessError::TestsFailed`] when any tag failed;
    /// [`HarnessError::Output`] when progress lines cannot be written.
    pub fn run(&self, out: &mut dyn Write) -> Result<(), HarnessError> {
        writeln!(out, "running test tags: {}", self.tags.join(", "))?;
        let mut failed = 0;
        for tag in &self.tags {
            writeln!(out, "> run test {tag:?}")?;
            match self.run_tag(tag) {
                Ok(()) => {
                    tracing::info!(tag, "test passed");
                    writeln!(out, "PASS {tag}")?;
                }
                Err(err) => {
                    tracing::error!(tag, error = %err, "test failed");
                    writeln!(out, "FAIL {tag}: {err}")?;
                    failed += 1;
                }
            }
        }
        if failed > 0 {
            return Err(HarnessError::TestsFailed {
                failed,
                total: self.tags.len(),
            });
        }
        Ok(())
    }

    /// Run one tag's expected/request/actual/compare cycle
    fn run_tag(&self, tag: &str) -> Result<(), TestError> {
        let fixture = ScriptSource::package_tag(&self.test_package, tag);

        let evaluated = self
            .function
            .evaluator()
            .evaluate(&fixture, &[], self.opts.selector())
            .map_err(|e| TestError::Expected(e.into()))?;
        let mut raw = evaluated.value;
        let expected =
            xfn_core::decode_response(&mut raw, self.opts.legacy_desired_only)
                .map_err(TestError::Expected)?;

        // The assertion mode is configuration; an unknown mode fails before
        // any further evaluation work.
        let mode = match evaluated.attributes.get(ASSERTION_MODE_ATTRIBUTE) {
            Some(attr) => attr.parse::<AssertionMode>()?,
            None => AssertionMode::default(),
        };

        let request = self.evaluate_request(&fixture)?;
        let actual = self
            .function
            .eval(&request, &ScriptSource::package(&self.package), &self.opts)
            .map_err(TestError::Actual)?;

        Oracle::new(self.function.evaluator())
            .assert_equivalent(mode, &expected, &actual)
            .map_err(TestError::from)
    }

    fn evaluate_request(
        &self,
        fixture: &ScriptSource,
    ) -> Result<RunFunctionRequest, TestError> {
        let evaluated = self
            .function
            .evaluator()
            .evaluate(fixture, &[], Some(self.opts.request_var()))
            .map_err(|e| TestError::Request(e.into()))?;
        serde_json::from_value(evaluated.value).map_err(|e| {
            TestError::Request(FunctionError::InvalidOutput {
                detail: e.to_string(),
            })
        })
    }
}

/// Compare an expected and actual response outside a harness run
///
/// Convenience for callers that already hold both responses.
///
/// # Errors
/// Same failure modes as [`Oracle::assert_equivalent`].
pub fn assert_responses_equivalent<E: Evaluator>(
    evaluator: &E,
    mode: AssertionMode,
    expected: &RunFunctionResponse,
    actual: &RunFunctionResponse,
) -> Result<(), OracleError> {
    Oracle::new(evaluator).assert_equivalent(mode, expected, actual)
}

/// Discover distinct test tags from fixture file names
///
/// A fixture's tag is the leading dot-delimited segment of its file name
/// (`basic.cue` → `basic`, `a.req.cue` → `a`). Tags are returned sorted so
/// runs are deterministic regardless of directory listing order.
fn discover_tags(dir: &Path, extension: &str) -> Result<Vec<String>, HarnessError> {
    let suffix = format!(".{extension}");
    let entries = std::fs::read_dir(dir).map_err(|e| HarnessError::Discovery {
        dir: dir.to_path_buf(),
        detail: e.to_string(),
    })?;

    let mut tags = BTreeSet::new();
    for entry in entries {
        let entry = entry.map_err(|e| HarnessError::Discovery {
            dir: dir.to_path_buf(),
            detail: e.to_string(),
        })?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !name.ends_with(&suffix) || name.starts_with('.') {
            continue;
        }
        if let Some(tag) = name.split('.').next() {
            tags.insert(tag.to_string());
        }
    }
    Ok(tags.into_iter().collect())
}
