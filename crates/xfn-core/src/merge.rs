//! Response merge engine
//!
//! Folds a freshly evaluated response into the response accumulated from
//! earlier pipeline stages. Used exactly once per pipeline step and
//! idempotent when the accumulator is empty.
//!
//! Merge rules:
//! - composed resources: keyed wholesale replacement, accumulator-only
//!   entries survive, nothing is ever removed
//! - composite: wholesale replacement when the new response sets one
//! - context: key-by-key override, new value wins
//! - `meta`/`results`: owned by the surrounding pipeline, never touched here

use crate::error::FunctionError;
use crate::ready;
use serde_json::Value;
use xfn_proto::{RunFunctionResponse, State};

/// Merge a canonical fresh response into the accumulator
///
/// Both sides must already be in canonical form (readiness coerced). The
/// fresh response's `meta` and `results` are ignored; the accumulator's pass
/// through untouched.
pub fn merge_into(acc: &mut RunFunctionResponse, fresh: RunFunctionResponse) {
    for (name, entry) in fresh.desired.resources {
        acc.desired.resources.insert(name, entry);
    }
    if let Some(composite) = fresh.desired.composite {
        acc.desired.composite = Some(composite);
    }
    for (key, value) in fresh.context {
        acc.context.insert(key, value);
    }
}

/// Coerce, strictly decode, and merge a raw evaluated response
///
/// `raw` is the value the evaluator produced at the response selector. In
/// legacy mode the document is a bare desired-state tree; otherwise it is a
/// full response document. Readiness coercion applies only to the fresh
/// document, never to the accumulator's carried-forward entries.
///
/// # Errors
/// [`FunctionError::ReadyOutOfRange`] for raw readiness outside {absent, 0,
/// 1}; [`FunctionError::InvalidOutput`] when the document does not map onto
/// the protocol shape (unknown fields, wrong types) — malformed output is
/// rejected wholesale, never best-effort coerced.
pub fn merge_raw(
    acc: &mut RunFunctionResponse,
    mut raw: Value,
    legacy_desired_only: bool,
) -> Result<(), FunctionError> {
    let fresh = decode_response(&mut raw, legacy_desired_only)?;
    merge_into(acc, fresh);
    Ok(())
}

/// Coerce readiness and strictly decode a raw response document
///
/// Shared by the pipeline and the test harness so expected fixtures and
/// actual output pass through one normalization path.
///
/// # Errors
/// Same failure modes as [`merge_raw`].
pub fn decode_response(
    raw: &mut Value,
    legacy_desired_only: bool,
) -> Result<RunFunctionResponse, FunctionError> {
    if legacy_desired_only {
        ready::coerce_state(raw)?;
        let desired: State = serde_json::from_value(raw.take())
            .map_err(|e| FunctionError::InvalidOutput { detail: e.to_string() })?;
        Ok(RunFunctionResponse {
            desired,
            ..RunFunctionResponse::default()
        })
    } else {
        if let Some(desired) = raw.get_mut("desired") {
            ready::coerce_state(desired)?;
        }
        serde_json::from_value(raw.take())
            .map_err(|e| FunctionError::InvalidOutput { detail: e.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn response(value: Value) -> RunFunctionResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn merge_into_empty_accumulator_is_identity() {
        let mut acc = RunFunctionResponse::default();
        let raw = json!({
            "desired": {
                "resources": {"main": {"resource": {"foo": "bar"}, "ready": 1}},
                "composite": {"resource": {"foo": "bar"}, "ready": 1}
            },
            "context": {"foo": "bar"}
        });
        merge_raw(&mut acc, raw, false).unwrap();

        let expected = response(json!({
            "desired": {
                "resources": {"main": {"resource": {"foo": "bar"}, "ready": "READY_TRUE"}},
                "composite": {"resource": {"foo": "bar"}, "ready": "READY_TRUE"}
            },
            "context": {"foo": "bar"}
        }));
        assert_eq!(acc, expected);
    }

    #[test]
    fn merge_preserves_accumulator_only_entries() {
        let mut acc = response(json!({
            "desired": {
                "resources": {"supplementary": {"resource": {"foo": "bar"}, "ready": "READY_TRUE"}}
            },
            "context": {"foo": "foo2", "bar": "baz"}
        }));
        let raw = json!({
            "desired": {
                "resources": {"main": {"resource": {"foo": "bar"}, "ready": 1}},
                "composite": {"resource": {"foo": "bar"}, "ready": 1}
            },
            "context": {"foo": "bar"}
        });
        merge_raw(&mut acc, raw, false).unwrap();

        let expected = response(json!({
            "desired": {
                "composite": {"resource": {"foo": "bar"}, "ready": "READY_TRUE"},
                "resources": {
                    "main": {"resource": {"foo": "bar"}, "ready": "READY_TRUE"},
                    "supplementary": {"resource": {"foo": "bar"}, "ready": "READY_TRUE"}
                }
            },
            "context": {"foo": "bar", "bar": "baz"}
        }));
        assert_eq!(acc, expected);
    }

    #[test]
    fn resources_replace_wholesale_not_deep_merge() {
        let mut acc = response(json!({
            "desired": {
                "resources": {"main": {"resource": {"foo": "bar", "extra": true}, "ready": "READY_TRUE"}}
            }
        }));
        // The new entry is missing fields the old one had; it still wins.
        let fresh = response(json!({
            "desired": {"resources": {"main": {"resource": {"foo": "baz"}}}}
        }));
        merge_into(&mut acc, fresh);

        let expected = response(json!({
            "desired": {"resources": {"main": {"resource": {"foo": "baz"}}}}
        }));
        assert_eq!(acc, expected);
    }

    #[test]
    fn composite_kept_when_fresh_has_none() {
        let mut acc = response(json!({
            "desired": {"composite": {"resource": {"kept": true}}}
        }));
        let fresh = response(json!({
            "desired": {"resources": {"main": {"resource": {}}}}
        }));
        merge_into(&mut acc, fresh);
        assert_eq!(
            acc.desired.composite.unwrap().resource,
            json!({"kept": true})
        );
    }

    #[test]
    fn meta_and_results_pass_through_untouched() {
        let mut acc = response(json!({
            "meta": {"tag": "v1", "ttl": "60s"},
            "results": [{"severity": "SEVERITY_NORMAL", "message": "earlier"}]
        }));
        let fresh = response(json!({
            "meta": {"tag": "other"},
            "desired": {"resources": {"main": {"resource": {}}}},
            "results": [{"severity": "SEVERITY_FATAL", "message": "ignored"}]
        }));
        merge_into(&mut acc, fresh);
        assert_eq!(acc.meta.as_ref().unwrap().tag, "v1");
        assert_eq!(acc.results.len(), 1);
        assert_eq!(acc.results[0].message, "earlier");
    }

    #[test]
    fn legacy_mode_decodes_bare_desired_state() {
        let mut acc = RunFunctionResponse::default();
        let raw = json!({
            "resources": {"main": {"resource": {"foo": "bar"}, "ready": 0}}
        });
        merge_raw(&mut acc, raw, true).unwrap();
        assert_eq!(
            acc.desired.resources["main"].ready,
            xfn_proto::Ready::False
        );
    }

    #[test]
    fn malformed_output_fails_with_field_name() {
        let mut acc = RunFunctionResponse::default();
        let raw = json!({"desired": {"foo": "bar"}});
        let err = merge_raw(&mut acc, raw, false).unwrap_err();
        match err {
            FunctionError::InvalidOutput { detail } => assert!(detail.contains("foo")),
            other => panic!("expected InvalidOutput, got {other}"),
        }
    }

    #[test]
    fn malformed_output_does_not_partially_merge() {
        let mut acc = RunFunctionResponse::default();
        let raw = json!({
            "desired": {"resources": {"main": {"resource": {}}}},
            "unknown": true
        });
        assert!(merge_raw(&mut acc, raw, false).is_err());
        assert_eq!(acc, RunFunctionResponse::default());
    }

    proptest! {
        /// Context merge override law: merged = acc with every key of fresh
        /// overwritten; acc-only keys survive, fresh-only keys are added.
        #[test]
        fn context_override_law(
            acc_ctx in proptest::collection::btree_map("[a-d]", "[a-z]{1,4}", 0..5),
            new_ctx in proptest::collection::btree_map("[a-d]", "[a-z]{1,4}", 0..5),
        ) {
            let mut acc = RunFunctionResponse {
                context: acc_ctx
                    .iter()
                    .map(|(k, v)| (k.clone(), json!(v)))
                    .collect::<BTreeMap<_, _>>(),
                ..RunFunctionResponse::default()
            };
            let fresh = RunFunctionResponse {
                context: new_ctx
                    .iter()
                    .map(|(k, v)| (k.clone(), json!(v)))
                    .collect::<BTreeMap<_, _>>(),
                ..RunFunctionResponse::default()
            };

            merge_into(&mut acc, fresh);

            let mut want = acc_ctx;
            want.extend(new_ctx);
            let want: BTreeMap<String, Value> =
                want.into_iter().map(|(k, v)| (k, json!(v))).collect();
            prop_assert_eq!(acc.context, want);
        }
    }
}
