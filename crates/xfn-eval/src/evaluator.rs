//! Evaluator capability trait and its input/output types

use crate::error::EvalError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A named value bound into the evaluation scope
pub type Binding = (String, Value);

/// What to evaluate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSource {
    /// Inline script text, as carried in a function request's input
    Inline {
        /// The script source code
        code: String,
    },

    /// A fixture package on disk, optionally narrowed to one test tag
    Package {
        /// Package directory
        dir: PathBuf,
        /// Tag selecting one fixture data set within the package
        tag: Option<String>,
    },
}

impl ScriptSource {
    /// Inline source from script text
    #[inline]
    #[must_use]
    pub fn inline(code: impl Into<String>) -> Self {
        Self::Inline { code: code.into() }
    }

    /// Package source without a tag
    #[inline]
    #[must_use]
    pub fn package(dir: impl Into<PathBuf>) -> Self {
        Self::Package {
            dir: dir.into(),
            tag: None,
        }
    }

    /// Package source narrowed to one tag
    #[inline]
    #[must_use]
    pub fn package_tag(dir: impl Into<PathBuf>, tag: impl Into<String>) -> Self {
        Self::Package {
            dir: dir.into(),
            tag: Some(tag.into()),
        }
    }

    /// Short description for error context
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Inline { .. } => "inline script".to_string(),
            Self::Package { dir, tag: None } => format!("package {}", dir.display()),
            Self::Package { dir, tag: Some(tag) } => {
                format!("package {} (tag {tag})", dir.display())
            }
        }
    }
}

/// Result of one evaluation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluated {
    /// The structured value at the output selector
    pub value: Value,

    /// String attributes attached to the selected value
    ///
    /// Fixtures use these to declare per-test settings, e.g. the
    /// `assertionMode` attribute on an expected response.
    pub attributes: BTreeMap<String, String>,
}

impl Evaluated {
    /// Wrap a bare value with no attributes
    #[inline]
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self {
            value,
            attributes: BTreeMap::new(),
        }
    }

    /// Attach an attribute
    #[inline]
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// The expression-language evaluator capability
///
/// Implementations compile `source` with `bindings` injected as named
/// variables and return the structured value at `selector` (`None` selects
/// the document root). Evaluation is a synchronous, fallible call with no
/// implicit timeout; cancellation is the caller's concern.
pub trait Evaluator {
    /// Evaluate a source at a selector with the given bindings
    ///
    /// # Errors
    /// Compile failures, evaluation conflicts, missing selectors, and values
    /// that cannot be rendered to a concrete structure all surface as
    /// [`EvalError`].
    fn evaluate(
        &self,
        source: &ScriptSource,
        bindings: &[Binding],
        selector: Option<&str>,
    ) -> Result<Evaluated, EvalError>;

    /// Check that `actual` is compatible with `expected` under the
    /// language's unification semantics
    ///
    /// Compatible means: unifying the two values yields no conflict, i.e.
    /// `actual` equals `expected` or refines constraints `expected` leaves
    /// open. Production adapters implement this by compiling a small
    /// unification script; stand-ins may use a structural partial-order
    /// check.
    ///
    /// # Errors
    /// A conflict between the two values, or any compile/evaluate failure
    /// encountered while checking.
    fn unify(&self, expected: &Value, actual: &Value) -> Result<(), EvalError>;
}
