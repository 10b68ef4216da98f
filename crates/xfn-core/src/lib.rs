//! xfn Composition Core
//!
//! The expression-language-independent heart of the composition function:
//! deterministic response merging, readiness normalization, field-path
//! resolution, and connection-secret extraction, orchestrated by a
//! per-request pipeline.
//!
//! # Core Concepts
//!
//! - [`Function`]: evaluate → coerce → merge → extract, once per request
//! - [`merge_into`]/[`merge_raw`]: the response merge engine
//! - [`extract_connection_details`]: declared secret rules → flat secret map
//! - [`FieldPath`]: recursive-descent accessor over schema-free bodies
//! - [`FieldError`]: field-path-qualified validation failures
//!
//! Every operation is a synchronous pure function over its explicit inputs;
//! nothing is shared across invocations and nothing here performs I/O.

// Core modules
mod connection;
mod error;
mod fieldpath;
mod function;
mod merge;
mod ready;

// Re-exports
pub use connection::{
    extract_connection_details, take_outputs, ComposedOutput, ConnectionDetail,
    ConnectionDetailType,
};
pub use error::{FieldError, FieldErrorKind, FunctionError};
pub use fieldpath::{render_scalar, FieldPath, PathError, Segment};
pub use function::{
    EvalOptions, Function, FunctionInput, FunctionOptions, DEBUG_ANNOTATION,
    DEFAULT_REQUEST_VAR, DEFAULT_RESPONSE_VAR,
};
pub use merge::{decode_response, merge_into, merge_raw};
pub use ready::coerce_state;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
