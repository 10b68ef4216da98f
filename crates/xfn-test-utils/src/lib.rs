//! Testing utilities for the xfn workspace
//!
//! Shared fixtures and a scripted stand-in evaluator. The stand-in answers
//! evaluations from canned results keyed by source and selector, and backs
//! unification-mode assertions with a structural partial-order check, so
//! the pipeline and harness can be exercised without a real
//! expression-language runtime.

#![allow(missing_docs)]

use serde_json::{json, Value};
use xfn_eval::{Binding, EvalError, Evaluated, Evaluator, ScriptSource};
use xfn_proto::RunFunctionRequest;

/// Canned evaluator: responds to (source, selector) pairs with fixed results.
#[derive(Debug, Default)]
pub struct ScriptedEvaluator {
    entries: Vec<Entry>,
}

#[derive(Debug)]
struct Entry {
    source: ScriptSource,
    selector: Option<String>,
    result: Result<Evaluated, String>,
}

impl ScriptedEvaluator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `selector` on `source` with a successful result.
    #[must_use]
    pub fn on(
        mut self,
        source: ScriptSource,
        selector: Option<&str>,
        result: Evaluated,
    ) -> Self {
        self.entries.push(Entry {
            source,
            selector: selector.map(String::from),
            result: Ok(result),
        });
        self
    }

    /// Answer `selector` on `source` with an evaluation failure.
    #[must_use]
    pub fn on_error(
        mut self,
        source: ScriptSource,
        selector: Option<&str>,
        detail: impl Into<String>,
    ) -> Self {
        self.entries.push(Entry {
            source,
            selector: selector.map(String::from),
            result: Err(detail.into()),
        });
        self
    }
}

impl Evaluator for ScriptedEvaluator {
    fn evaluate(
        &self,
        source: &ScriptSource,
        _bindings: &[Binding],
        selector: Option<&str>,
    ) -> Result<Evaluated, EvalError> {
        let entry = self
            .entries
            .iter()
            .find(|e| &e.source == source && e.selector.as_deref() == selector);
        match entry {
            Some(entry) => match &entry.result {
                Ok(evaluated) => Ok(evaluated.clone()),
                Err(detail) => Err(EvalError::evaluate(source.describe(), detail.clone())),
            },
            None => Err(EvalError::SelectorNotFound {
                source_desc: source.describe(),
                selector: selector.unwrap_or(".").to_string(),
            }),
        }
    }

    fn unify(&self, expected: &Value, actual: &Value) -> Result<(), EvalError> {
        check_compatible(expected, actual, "")
    }
}

/// Structural partial-order compatibility check.
///
/// `actual` is compatible with `expected` when unifying them produces no
/// conflict: fields present on only one side merge freely (extra concrete
/// detail refines open constraints), fields present on both sides must
/// themselves be compatible, and scalar values must be equal. Lists unify
/// elementwise and must have equal length.
pub fn check_compatible(expected: &Value, actual: &Value, path: &str) -> Result<(), EvalError> {
    match (expected, actual) {
        (Value::Object(exp), Value::Object(act)) => {
            for (key, exp_value) in exp {
                if let Some(act_value) = act.get(key) {
                    let child = if path.is_empty() {
                        key.clone()
                    } else {
                        format!("{path}.{key}")
                    };
                    check_compatible(exp_value, act_value, &child)?;
                }
            }
            Ok(())
        }
        (Value::Array(exp), Value::Array(act)) => {
            if exp.len() != act.len() {
                return Err(EvalError::conflict(format!(
                    "{path}: list length {} != {}",
                    act.len(),
                    exp.len()
                )));
            }
            for (idx, (exp_value, act_value)) in exp.iter().zip(act).enumerate() {
                check_compatible(exp_value, act_value, &format!("{path}[{idx}]"))?;
            }
            Ok(())
        }
        (exp, act) if exp == act => Ok(()),
        (exp, act) => Err(EvalError::conflict(format!("{path}: {act} != {exp}"))),
    }
}

/// The standard test request: tagged `v1`, one observed composite with a
/// `foo: bar` field.
#[must_use]
pub fn make_request() -> RunFunctionRequest {
    serde_json::from_value(json!({
        "meta": {"tag": "v1"},
        "observed": {
            "composite": {
                "resource": {
                    "apiVersion": "v1",
                    "kind": "MyKind",
                    "foo": "bar"
                },
                "ready": "READY_FALSE"
            }
        }
    }))
    .expect("static request fixture")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_evaluator_answers_by_source_and_selector() {
        let source = ScriptSource::inline("a: 1");
        let evaluator = ScriptedEvaluator::new().on(
            source.clone(),
            Some("response"),
            Evaluated::new(json!({"a": 1})),
        );

        let evaluated = evaluator.evaluate(&source, &[], Some("response")).unwrap();
        assert_eq!(evaluated.value, json!({"a": 1}));

        let err = evaluator.evaluate(&source, &[], Some("other")).unwrap_err();
        assert!(matches!(err, EvalError::SelectorNotFound { .. }));
    }

    #[test]
    fn scripted_evaluator_replays_errors() {
        let source = ScriptSource::inline("broken");
        let evaluator =
            ScriptedEvaluator::new().on_error(source.clone(), None, "undefined field: nope");
        let err = evaluator.evaluate(&source, &[], None).unwrap_err();
        assert!(err.to_string().contains("undefined field: nope"));
    }

    #[test]
    fn refinement_is_compatible() {
        // Actual adds concrete detail expected leaves open.
        let expected = json!({"spec": {"size": 3}});
        let actual = json!({"spec": {"size": 3, "region": "eu"}});
        assert!(check_compatible(&expected, &actual, "").is_ok());
    }

    #[test]
    fn scalar_conflict_is_incompatible() {
        let expected = json!({"spec": {"size": 3}});
        let actual = json!({"spec": {"size": 4}});
        let err = check_compatible(&expected, &actual, "").unwrap_err();
        assert!(err.to_string().contains("spec.size"));
    }

    #[test]
    fn list_length_mismatch_is_incompatible() {
        let expected = json!({"items": [1, 2]});
        let actual = json!({"items": [1]});
        assert!(check_compatible(&expected, &actual, "").is_err());
    }
}
