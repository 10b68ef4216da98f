//! Dual-mode test oracle
//!
//! Decides whether an actual computed response is equivalent to an expected
//! one. Two assertion modes exist:
//!
//! - `diff` (default): both responses serialize to canonical YAML and must
//!   match exactly; a mismatch renders a line-oriented unified diff.
//! - `unification`: the actual value must be compatible with the expected
//!   value under the expression language's unification semantics — equal, or
//!   a refinement of constraints the expected value leaves open. Strictly
//!   weaker than `diff`. The check is delegated to the evaluator, whose
//!   language owns unification.
//!
//! An unrecognized mode string is a configuration error and fails before any
//! comparison work. Evaluator failures while building a comparison surface
//! as setup failures, distinct from assertion failures.

use similar::TextDiff;
use std::str::FromStr;
use xfn_eval::{EvalError, Evaluator};
use xfn_proto::RunFunctionResponse;

/// Attribute name fixtures use to declare the assertion mode
pub const ASSERTION_MODE_ATTRIBUTE: &str = "assertionMode";

/// How expected and actual responses are compared
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AssertionMode {
    /// Exact canonical-text equality
    #[default]
    Diff,

    /// Compatibility under unification semantics
    Unification,
}

impl FromStr for AssertionMode {
    type Err = OracleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "diff" => Ok(Self::Diff),
            "unification" => Ok(Self::Unification),
            other => Err(OracleError::UnknownAssertionMode {
                mode: other.to_string(),
            }),
        }
    }
}

/// Oracle failures
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// The declared assertion mode is not one the oracle knows
    #[error("unknown assertion mode: {mode}")]
    UnknownAssertionMode {
        /// The unrecognized mode string
        mode: String,
    },

    /// Diff mode: the canonical forms differ
    #[error("expected did not match actual:\n{diff}")]
    Mismatch {
        /// Unified diff of the two canonical texts
        diff: String,
    },

    /// Unification mode: the values conflict
    #[error("actual is not compatible with expected: {detail}")]
    Incompatible {
        /// Conflict detail from the evaluator
        detail: String,
    },

    /// Failed to build the comparison at all
    #[error("prepare comparison: {detail}")]
    Setup {
        /// What went wrong before comparing
        detail: String,
    },
}

/// Serialize a response to its canonical whitespace-stable text form
///
/// Key order is stable because every map in the protocol model is ordered;
/// scalar formatting is the serializer's canonical one. Two equal responses
/// always yield byte-identical text.
///
/// # Errors
/// [`OracleError::Setup`] when the response cannot be serialized.
pub fn canonical_yaml(response: &RunFunctionResponse) -> Result<String, OracleError> {
    let value = serde_json::to_value(response).map_err(|e| OracleError::Setup {
        detail: format!("serialize response: {e}"),
    })?;
    serde_yaml::to_string(&value).map_err(|e| OracleError::Setup {
        detail: format!("serialize response: {e}"),
    })
}

/// The test oracle
///
/// Holds a borrow of the evaluator so unification-mode checks can delegate
/// to the expression language's own semantics.
#[derive(Debug)]
pub struct Oracle<'a, E> {
    evaluator: &'a E,
}

impl<'a, E: Evaluator> Oracle<'a, E> {
    /// Create an oracle over an evaluator
    #[inline]
    #[must_use]
    pub fn new(evaluator: &'a E) -> Self {
        Self { evaluator }
    }

    /// Decide equivalence under the given assertion mode
    ///
    /// # Errors
    /// [`OracleError::Mismatch`] or [`OracleError::Incompatible`] when the
    /// responses are not equivalent; [`OracleError::Setup`] when the
    /// comparison itself could not be built.
    pub fn assert_equivalent(
        &self,
        mode: AssertionMode,
        expected: &RunFunctionResponse,
        actual: &RunFunctionResponse,
    ) -> Result<(), OracleError> {
        match mode {
            AssertionMode::Diff => {
                let expected_text = canonical_yaml(expected)?;
                let actual_text = canonical_yaml(actual)?;
                if expected_text == actual_text {
                    return Ok(());
                }
                let diff = TextDiff::from_lines(&expected_text, &actual_text)
                    .unified_diff()
                    .context_radius(3)
                    .header("expected", "actual")
                    .to_string();
                Err(OracleError::Mismatch { diff })
            }
            AssertionMode::Unification => {
                let expected_value =
                    serde_json::to_value(expected).map_err(|e| OracleError::Setup {
                        detail: format!("serialize expected: {e}"),
                    })?;
                let actual_value =
                    serde_json::to_value(actual).map_err(|e| OracleError::Setup {
                        detail: format!("serialize actual: {e}"),
                    })?;
                self.evaluator
                    .unify(&expected_value, &actual_value)
                    .map_err(|e| match e {
                        EvalError::UnificationConflict { detail } => {
                            OracleError::Incompatible { detail }
                        }
                        other => OracleError::Setup {
                            detail: other.to_string(),
                        },
                    })
            }
        }
    }
}
