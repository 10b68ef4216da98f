//! Connection-detail extraction engine
//!
//! Scripts declare, per composed resource, an ordered list of named rules
//! describing how each connection secret is produced: a fixed value, a copy
//! of an observed secret key, or the textual form of a field-path lookup.
//! Extraction resolves those rules against the observed resource graph into
//! one flat name→bytes map, or fails with a field-qualified validation
//! error.
//!
//! Pure function of its two inputs; no I/O. Given deterministic input
//! ordering the output is deterministic. Name collisions are last-write-wins
//! across composites and rules.

use crate::error::{FieldError, FunctionError};
use crate::fieldpath::{render_scalar, FieldPath};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use xfn_proto::{ConnectionDetails, Resource, ResourceName, Secret};

/// Wire key under which a composed-resource entry declares its rules
const CONNECTION_DETAILS_FIELD: &str = "connectionDetails";

/// How one connection secret is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionDetailType {
    /// Copy a literal value
    FromValue,

    /// Copy a key from the observed resource's connection secrets
    FromConnectionSecretKey,

    /// Render the value at a field path of the resource body
    FromFieldPath,
}

/// One declared connection-detail rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ConnectionDetail {
    /// Secret name in the output map; required, non-empty
    #[serde(default)]
    pub name: String,

    /// Which source this rule draws from
    #[serde(rename = "type")]
    pub kind: ConnectionDetailType,

    /// Literal value for [`ConnectionDetailType::FromValue`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Observed secret key for [`ConnectionDetailType::FromConnectionSecretKey`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_connection_secret_key: Option<String>,

    /// Field path for [`ConnectionDetailType::FromFieldPath`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_field_path: Option<String>,
}

/// Per-composite extraction request
///
/// Carries the composed-resource name the rules are associated with, a
/// snapshot of the resource body (the lookup target for field-path rules),
/// and the declared rules in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposedOutput {
    /// Composed-resource name, assigned by the script
    #[serde(default)]
    pub name: ResourceName,

    /// Resource body snapshot from the script output
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub resource: Value,

    /// Declared rules, in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connection_details: Vec<ConnectionDetail>,
}

/// Split declared connection-detail rules out of a raw desired-state tree
///
/// The protocol's resource entries carry resolved secrets (a name→bytes
/// map), while script output declares rules (an array) under the same key,
/// so the rule arrays must leave the tree before strict decoding. Entries
/// without rules are untouched.
///
/// # Errors
/// [`FunctionError::InvalidOutput`] when a declared rule list does not
/// decode as a rule array.
pub fn take_outputs(state: &mut Value) -> Result<Vec<ComposedOutput>, FunctionError> {
    let mut outputs = Vec::new();
    let Some(Value::Object(resources)) = state.get_mut("resources") else {
        return Ok(outputs);
    };

    for (name, entry) in resources.iter_mut() {
        let Some(map) = entry.as_object_mut() else {
            continue;
        };
        let Some(declared) = map.remove(CONNECTION_DETAILS_FIELD) else {
            continue;
        };
        let details: Vec<ConnectionDetail> =
            serde_json::from_value(declared).map_err(|e| FunctionError::InvalidOutput {
                detail: format!("resources[{name}].connectionDetails: {e}"),
            })?;
        outputs.push(ComposedOutput {
            name: name.clone(),
            resource: map.get("resource").cloned().unwrap_or(Value::Null),
            connection_details: details,
        });
    }

    Ok(outputs)
}

/// Resolve all declared rules against the observed resource graph
///
/// Rules are processed in declaration order per composite, composites in the
/// order given; a later rule with an already-present name overwrites the
/// earlier value.
///
/// # Errors
/// A [`FieldError`] for the first rule that fails validation (empty `name`,
/// missing type-specific field) or resolution (unknown composite, secret
/// key, or field path). Validation runs before any value resolution for
/// each rule.
pub fn extract_connection_details(
    observed: &BTreeMap<ResourceName, Resource>,
    outputs: &[ComposedOutput],
) -> Result<ConnectionDetails, FieldError> {
    let mut details = ConnectionDetails::new();
    for output in outputs {
        for rule in &output.connection_details {
            if rule.name.is_empty() {
                return Err(FieldError::required("name", "name is required"));
            }
            let secret = resolve_rule(observed, output, rule)?;
            details.insert(rule.name.clone(), secret);
        }
    }
    Ok(details)
}

fn resolve_rule(
    observed: &BTreeMap<ResourceName, Resource>,
    output: &ComposedOutput,
    rule: &ConnectionDetail,
) -> Result<Secret, FieldError> {
    match rule.kind {
        ConnectionDetailType::FromValue => {
            let value = rule
                .value
                .as_deref()
                .ok_or_else(|| FieldError::required("value", "value is required"))?;
            Ok(Secret::from(value))
        }
        ConnectionDetailType::FromConnectionSecretKey => {
            let key = rule.from_connection_secret_key.as_deref().ok_or_else(|| {
                FieldError::required(
                    "fromConnectionSecretKey",
                    "fromConnectionSecretKey is required",
                )
            })?;
            let resource = observed.get(&output.name).ok_or_else(|| {
                FieldError::not_found(
                    "fromConnectionSecretKey",
                    format!("observed resource {:?} not found", output.name),
                )
            })?;
            let secret = resource.connection_details.get(key).ok_or_else(|| {
                FieldError::not_found(
                    "fromConnectionSecretKey",
                    format!(
                        "observed resource {:?} has no connection secret key {key:?}",
                        output.name
                    ),
                )
            })?;
            Ok(secret.clone())
        }
        ConnectionDetailType::FromFieldPath => {
            let raw_path = rule
                .from_field_path
                .as_deref()
                .ok_or_else(|| FieldError::required("fromFieldPath", "fromFieldPath is required"))?;
            let path: FieldPath = raw_path
                .parse()
                .map_err(|e| FieldError::invalid("fromFieldPath", format!("{e}")))?;
            let value = path.resolve(&output.resource).filter(|v| !v.is_null());
            let Some(value) = value else {
                return Err(FieldError::not_found(
                    "fromFieldPath",
                    format!("no value at path {raw_path:?}"),
                ));
            };
            let text = render_scalar(value).ok_or_else(|| {
                FieldError::invalid(
                    "fromFieldPath",
                    format!("value at path {raw_path:?} is not a scalar"),
                )
            })?;
            Ok(Secret::from(text))
        }
    }
}
