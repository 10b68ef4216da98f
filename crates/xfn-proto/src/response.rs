//! Function invocation responses

use crate::request::RunFunctionRequest;
use crate::state::State;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Default validity window stamped on responses
pub const DEFAULT_TTL: Ttl = Ttl::from_secs(60);

/// Outbound response for one composition pass
///
/// `desired` and `context` are owned by the merge engine; `meta` and
/// `results` belong to the surrounding pipeline and pass through merges
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct RunFunctionResponse {
    /// Response metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,

    /// Computed desired state
    #[serde(default, skip_serializing_if = "State::is_empty")]
    pub desired: State,

    /// Open context mapping
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, Value>,

    /// Diagnostic results
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<ResultEntry>,
}

impl RunFunctionResponse {
    /// Bootstrap the accumulator for a request
    ///
    /// Carries the request's prior desired state and context forward so a
    /// fresh evaluation merges into them. Meta and results are left to the
    /// pipeline.
    #[must_use]
    pub fn from_request(request: &RunFunctionRequest) -> Self {
        Self {
            meta: None,
            desired: request.desired.clone(),
            context: request.context.clone(),
            results: Vec::new(),
        }
    }
}

/// Response metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ResponseMeta {
    /// Tag copied from the request meta
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tag: String,

    /// Validity window for the response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<Ttl>,
}

/// Response validity window, rendered as duration text (`"60s"`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ttl(u64);

impl Ttl {
    /// Create from whole seconds
    #[inline]
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Whole seconds
    #[inline]
    #[must_use]
    pub const fn as_secs(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

impl Serialize for Ttl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Ttl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        let secs = text
            .strip_suffix('s')
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| D::Error::custom(format!("invalid duration: {text:?}")))?;
        Ok(Self(secs))
    }
}

/// One diagnostic result entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ResultEntry {
    /// How severe the result is
    #[serde(default, skip_serializing_if = "Severity::is_unspecified")]
    pub severity: Severity,

    /// Human-readable message
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    /// Where the result should surface
    #[serde(default, skip_serializing_if = "Target::is_unspecified")]
    pub target: Target,
}

impl ResultEntry {
    /// Create a normal-severity result
    #[inline]
    #[must_use]
    pub fn normal(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Normal,
            message: message.into(),
            target: Target::Unspecified,
        }
    }

    /// Create a fatal-severity result
    #[inline]
    #[must_use]
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Fatal,
            message: message.into(),
            target: Target::Unspecified,
        }
    }

    /// Set the result target
    #[inline]
    #[must_use]
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }
}

/// Severity of a diagnostic result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// Not set
    #[default]
    #[serde(rename = "SEVERITY_UNSPECIFIED")]
    Unspecified,

    /// The composition pass cannot continue
    #[serde(rename = "SEVERITY_FATAL")]
    Fatal,

    /// Something looks wrong but the pass continued
    #[serde(rename = "SEVERITY_WARNING")]
    Warning,

    /// Informational
    #[serde(rename = "SEVERITY_NORMAL")]
    Normal,
}

impl Severity {
    /// Check for the unset state
    #[inline]
    #[must_use]
    pub fn is_unspecified(&self) -> bool {
        matches!(self, Self::Unspecified)
    }
}

/// Where a diagnostic result should surface
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    /// Not set
    #[default]
    #[serde(rename = "TARGET_UNSPECIFIED")]
    Unspecified,

    /// Surface on the composite only
    #[serde(rename = "TARGET_COMPOSITE")]
    Composite,

    /// Surface on the composite and its claim
    #[serde(rename = "TARGET_COMPOSITE_AND_CLAIM")]
    CompositeAndClaim,
}

impl Target {
    /// Check for the unset state
    #[inline]
    #[must_use]
    pub fn is_unspecified(&self) -> bool {
        matches!(self, Self::Unspecified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn ttl_renders_duration_text() {
        let meta = ResponseMeta {
            tag: "v1".to_string(),
            ttl: Some(DEFAULT_TTL),
        };
        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(value, json!({"tag": "v1", "ttl": "60s"}));
    }

    #[test]
    fn ttl_parses_duration_text() {
        let ttl: Ttl = serde_json::from_value(json!("90s")).unwrap();
        assert_eq!(ttl.as_secs(), 90);

        assert!(serde_json::from_value::<Ttl>(json!("90")).is_err());
        assert!(serde_json::from_value::<Ttl>(json!("s")).is_err());
    }

    #[test]
    fn from_request_carries_desired_and_context() {
        let req: RunFunctionRequest = serde_json::from_value(json!({
            "desired": {
                "resources": {"supplementary": {"resource": {"foo": "bar"}}}
            },
            "context": {"foo": "foo2"}
        }))
        .unwrap();

        let res = RunFunctionResponse::from_request(&req);
        assert!(res.desired.resources.contains_key("supplementary"));
        assert_eq!(res.context["foo"], json!("foo2"));
        assert!(res.meta.is_none());
        assert!(res.results.is_empty());
    }

    #[test]
    fn result_entry_builder() {
        let entry = ResultEntry::normal("script executed successfully")
            .with_target(Target::Composite);
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            value,
            json!({
                "severity": "SEVERITY_NORMAL",
                "message": "script executed successfully",
                "target": "TARGET_COMPOSITE"
            })
        );
    }

    #[test]
    fn response_rejects_unknown_fields() {
        let err =
            serde_json::from_value::<RunFunctionResponse>(json!({"desired": {}, "foo": 1}))
                .unwrap_err();
        assert!(err.to_string().contains("foo"));
    }
}
