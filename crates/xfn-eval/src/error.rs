//! Evaluator error types

/// Failures surfaced by an [`Evaluator`](crate::Evaluator)
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// Source did not compile
    #[error("compile {source_desc}: {detail}")]
    Compile {
        /// Which source failed
        source_desc: String,
        /// Compiler diagnostic
        detail: String,
    },

    /// Evaluation produced a conflict or other runtime failure
    #[error("evaluate {source_desc}: {detail}")]
    Evaluate {
        /// Which source failed
        source_desc: String,
        /// Evaluator diagnostic
        detail: String,
    },

    /// The output selector did not resolve to a value
    #[error("selector {selector:?} not found in {source_desc}")]
    SelectorNotFound {
        /// Which source was evaluated
        source_desc: String,
        /// The missing selector
        selector: String,
    },

    /// Two values failed to unify
    #[error("values do not unify: {detail}")]
    UnificationConflict {
        /// Conflict diagnostic, naming the offending path
        detail: String,
    },
}

impl EvalError {
    /// Create a compile error
    #[inline]
    #[must_use]
    pub fn compile(source_desc: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Compile {
            source_desc: source_desc.into(),
            detail: detail.into(),
        }
    }

    /// Create an evaluation error
    #[inline]
    #[must_use]
    pub fn evaluate(source_desc: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Evaluate {
            source_desc: source_desc.into(),
            detail: detail.into(),
        }
    }

    /// Create a unification conflict
    #[inline]
    #[must_use]
    pub fn conflict(detail: impl Into<String>) -> Self {
        Self::UnificationConflict {
            detail: detail.into(),
        }
    }
}
