//! xfn Evaluator Seam
//!
//! The composition pipeline treats its declarative expression language as an
//! injected capability: compile + evaluate + select, nothing more. This crate
//! defines that seam.
//!
//! # Core Concepts
//!
//! - [`Evaluator`]: the capability trait the pipeline and test harness consume
//! - [`ScriptSource`]: inline script text or a fixture package with a tag
//! - [`Evaluated`]: structured result value plus attributes attached to it
//! - [`EvalError`]: compile/evaluate/selection failures with script context
//!
//! Any language with unification semantics can sit behind [`Evaluator`]; the
//! rest of the workspace never assumes evaluator internals.

// Core modules
mod error;
mod evaluator;

// Re-exports
pub use error::EvalError;
pub use evaluator::{Binding, Evaluated, Evaluator, ScriptSource};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
