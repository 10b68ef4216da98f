//! Function invocation requests

use crate::state::State;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Inbound request for one composition pass
///
/// Carries the observed resource graph, the desired state accumulated by
/// earlier pipeline stages, the open context mapping, and the raw script
/// input document. Constructed fresh per invocation; nothing here outlives
/// the request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct RunFunctionRequest {
    /// Request metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<RequestMeta>,

    /// Observed snapshot of the composite and its composed resources
    #[serde(default, skip_serializing_if = "State::is_empty")]
    pub observed: State,

    /// Desired state carried forward from earlier pipeline stages
    #[serde(default, skip_serializing_if = "State::is_empty")]
    pub desired: State,

    /// Raw script input document, opaque at this layer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,

    /// Open context mapping carried forward from earlier pipeline stages
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, Value>,
}

/// Request metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct RequestMeta {
    /// Opaque tag echoed back in the response meta
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tag: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn request_decodes_observed_graph() {
        let req: RunFunctionRequest = serde_json::from_value(json!({
            "meta": {"tag": "v1"},
            "observed": {
                "composite": {"resource": {"apiVersion": "v1", "kind": "MyKind"}}
            },
            "input": {"foo": "bar"}
        }))
        .unwrap();
        assert_eq!(req.meta.unwrap().tag, "v1");
        assert_eq!(
            req.observed.composite.unwrap().resource["kind"],
            json!("MyKind")
        );
    }

    #[test]
    fn empty_request_serializes_empty() {
        let req = RunFunctionRequest::default();
        assert_eq!(serde_json::to_value(&req).unwrap(), json!({}));
    }
}
