//! xfn Test Harness
//!
//! Fixture-driven testing for composition packages.
//!
//! # Core Concepts
//!
//! - [`TestHarness`]: discovers tags, drives one expected/request/actual
//!   cycle per tag, aggregates failures into one consolidated error
//! - [`Oracle`]: decides equivalence of expected vs. actual responses under
//!   an [`AssertionMode`] — exact canonical-text `diff`, or evaluator-
//!   delegated `unification` compatibility
//! - [`cli::run`]: ready-made CLI entry point for evaluator adapters
//!
//! Fixtures and the package under test evaluate through the same injected
//! [`Evaluator`](xfn_eval::Evaluator) the production pipeline uses, so a
//! passing tag exercises the real evaluate → coerce → merge → extract path.

// Core modules
pub mod cli;
mod oracle;
mod runner;

// Re-exports
pub use oracle::{
    canonical_yaml, AssertionMode, Oracle, OracleError, ASSERTION_MODE_ATTRIBUTE,
};
pub use runner::{
    assert_responses_equivalent, HarnessError, TestConfig, TestError, TestHarness,
    DEFAULT_SCRIPT_EXTENSION,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
