//! Readiness coercion over raw script output
//!
//! Scripts express readiness as an absent field, `0`, or `1`. Before any
//! merge, those raw values are rewritten to the canonical tri-state tags so
//! the rest of the pipeline only ever sees canonical form:
//!
//! - `0` → `READY_FALSE`
//! - `1` → `READY_TRUE`
//! - absent → field stays omitted
//!
//! Already-canonical tags pass through unchanged. Anything else is an
//! evaluator-output error, never silently clamped. Coercion applies to the
//! composite entry and every named resource entry of the state tree.

use crate::error::FunctionError;
use serde_json::Value;
use xfn_proto::Ready;

const READY_FIELD: &str = "ready";

/// Coerce readiness fields throughout a raw desired-state tree
///
/// `state` is the raw state document as produced by the evaluator: an object
/// with optional `composite` and `resources` entries. Non-object values are
/// left for the strict decoder to reject with a shape error.
///
/// # Errors
/// [`FunctionError::ReadyOutOfRange`] when a readiness field carries a value
/// outside the raw form.
pub fn coerce_state(state: &mut Value) -> Result<(), FunctionError> {
    let Some(map) = state.as_object_mut() else {
        return Ok(());
    };

    if let Some(composite) = map.get_mut("composite") {
        coerce_entry(composite, "composite")?;
    }

    if let Some(Value::Object(resources)) = map.get_mut("resources") {
        for (name, entry) in resources.iter_mut() {
            coerce_entry(entry, &format!("resources[{name}]"))?;
        }
    }

    Ok(())
}

/// Coerce the readiness field of one resource entry
fn coerce_entry(entry: &mut Value, location: &str) -> Result<(), FunctionError> {
    let Some(map) = entry.as_object_mut() else {
        return Ok(());
    };
    let Some(raw) = map.get(READY_FIELD) else {
        return Ok(());
    };

    let tag = match raw {
        Value::Number(n) => match n.as_u64() {
            Some(0) => Ready::False,
            Some(1) => Ready::True,
            _ => return Err(out_of_range(location, raw)),
        },
        Value::String(s)
            if s == Ready::Unspecified.as_str()
                || s == Ready::True.as_str()
                || s == Ready::False.as_str() =>
        {
            return Ok(());
        }
        _ => return Err(out_of_range(location, raw)),
    };

    map.insert(READY_FIELD.to_string(), Value::String(tag.as_str().to_string()));
    Ok(())
}

fn out_of_range(location: &str, found: &Value) -> FunctionError {
    FunctionError::ReadyOutOfRange {
        location: location.to_string(),
        found: found.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn coercion_table() {
        let mut state = json!({
            "composite": {"resource": {}, "ready": 1},
            "resources": {
                "main": {"resource": {}, "ready": 0},
                "other": {"resource": {}}
            }
        });
        coerce_state(&mut state).unwrap();
        assert_eq!(state["composite"]["ready"], json!("READY_TRUE"));
        assert_eq!(state["resources"]["main"]["ready"], json!("READY_FALSE"));
        // Absent readiness stays absent, never READY_UNSPECIFIED.
        assert_eq!(state["resources"]["other"], json!({"resource": {}}));
    }

    #[test]
    fn canonical_tags_pass_through() {
        let mut state = json!({
            "resources": {"main": {"resource": {}, "ready": "READY_TRUE"}}
        });
        coerce_state(&mut state).unwrap();
        assert_eq!(state["resources"]["main"]["ready"], json!("READY_TRUE"));
    }

    #[test]
    fn out_of_range_values_error() {
        for bad in [json!(2), json!(-1), json!(1.5), json!(true), json!("yes")] {
            let mut state = json!({
                "resources": {"main": {"resource": {}, "ready": bad}}
            });
            let err = coerce_state(&mut state).unwrap_err();
            match err {
                FunctionError::ReadyOutOfRange { location, .. } => {
                    assert_eq!(location, "resources[main]");
                }
                other => panic!("expected ReadyOutOfRange, got {other}"),
            }
        }
    }

    #[test]
    fn composite_out_of_range_names_composite() {
        let mut state = json!({"composite": {"resource": {}, "ready": 3}});
        let err = coerce_state(&mut state).unwrap_err();
        assert!(err.to_string().contains("composite"));
    }

    #[test]
    fn non_object_state_is_left_for_decoder() {
        let mut state = json!("not a state");
        coerce_state(&mut state).unwrap();
        assert_eq!(state, json!("not a state"));
    }
}
