//! Error types for the composition core
//!
//! Provides typed failures for:
//! - Evaluator/compile errors (propagated with script context)
//! - Schema-conformance failures in script output
//! - Connection-detail validation and resolution failures
//!
//! None of these are retried internally: every failure is deterministic
//! given its inputs, so each is surfaced to the immediate caller.

use std::fmt;
use xfn_eval::EvalError;

/// Main composition pipeline error
#[derive(Debug, thiserror::Error)]
pub enum FunctionError {
    /// The evaluator failed to compile or evaluate the script
    #[error("evaluate script: {0}")]
    Eval(#[from] EvalError),

    /// Script output does not map onto the expected protocol shape
    #[error("unmarshal script output: {detail}")]
    InvalidOutput {
        /// Decoder diagnostic, naming the offending field
        detail: String,
    },

    /// A readiness field carried a value outside {absent, 0, 1}
    #[error("invalid readiness value at {location}: {found}")]
    ReadyOutOfRange {
        /// Which entry carried the bad value
        location: String,
        /// The raw value encountered
        found: String,
    },

    /// The request's script input is missing or malformed
    #[error("invalid function input: {detail}")]
    InvalidInput {
        /// What was wrong with the input
        detail: String,
    },

    /// A connection-detail rule failed validation or resolution
    #[error("extract connection details: {0}")]
    Connection(#[from] FieldError),
}

/// Structured, field-path-qualified validation error
///
/// Connection-detail failures always name the offending field; a generic
/// string would lose the path callers key on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {kind}: {detail}")]
pub struct FieldError {
    /// What went wrong
    pub kind: FieldErrorKind,

    /// The offending field path
    pub field: String,

    /// Human-readable detail
    pub detail: String,
}

impl FieldError {
    /// A required field was missing or empty
    #[inline]
    #[must_use]
    pub fn required(field: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind: FieldErrorKind::Required,
            field: field.into(),
            detail: detail.into(),
        }
    }

    /// A referenced key or path was not found
    #[inline]
    #[must_use]
    pub fn not_found(field: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind: FieldErrorKind::NotFound,
            field: field.into(),
            detail: detail.into(),
        }
    }

    /// A field carried an unusable value
    #[inline]
    #[must_use]
    pub fn invalid(field: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind: FieldErrorKind::Invalid,
            field: field.into(),
            detail: detail.into(),
        }
    }
}

/// Kind of field validation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldErrorKind {
    /// Required field missing or empty
    Required,

    /// Referenced key or path not found
    NotFound,

    /// Value present but unusable
    Invalid,
}

impl fmt::Display for FieldErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Required => "Required value",
            Self::NotFound => "Not found",
            Self::Invalid => "Invalid value",
        };
        f.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_error_display() {
        let err = FieldError::required("name", "name is required");
        assert_eq!(err.to_string(), "name: Required value: name is required");
    }

    #[test]
    fn function_error_wraps_field_error() {
        let err = FunctionError::from(FieldError::not_found(
            "fromConnectionSecretKey",
            "observed resource \"db\" not found",
        ));
        assert!(err.to_string().contains("extract connection details"));
        assert!(err.to_string().contains("\"db\""));
    }

    #[test]
    fn function_error_wraps_eval_error() {
        let err = FunctionError::from(EvalError::compile("inline script", "boom"));
        assert!(err.to_string().starts_with("evaluate script"));
    }
}
