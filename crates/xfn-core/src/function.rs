//! Composition pipeline orchestration
//!
//! Drives one evaluate → coerce → merge → extract pass per request:
//! the inbound request is bound as a named variable, the script's output is
//! normalized and folded into the carried-forward response, and declared
//! connection-detail rules are resolved into the desired composite's
//! secrets. Fail-fast: any error aborts the request with no partial
//! response.

use crate::connection;
use crate::error::FunctionError;
use crate::merge;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use xfn_eval::{Evaluator, ScriptSource};
use xfn_proto::{
    RequestMeta, ResponseMeta, ResultEntry, RunFunctionRequest, RunFunctionResponse, Target,
    DEFAULT_TTL,
};

/// Default variable name the request is bound under
pub const DEFAULT_REQUEST_VAR: &str = "#request";

/// Default selector for the response document
pub const DEFAULT_RESPONSE_VAR: &str = "response";

/// Observed-composite annotation that turns on debug dumps for one request
pub const DEBUG_ANNOTATION: &str = "xfn.dev/debug";

/// Process-level options for a [`Function`]
#[derive(Debug, Clone, Copy, Default)]
pub struct FunctionOptions {
    /// Dump scripts, requests, and responses at debug level for every request
    pub debug: bool,
}

/// Per-evaluation options
#[derive(Debug, Clone, Default)]
pub struct EvalOptions {
    /// Variable name the request is bound under; empty means the default
    pub request_var: Option<String>,

    /// Response selector; `"."` selects the document root, empty means the
    /// default
    pub response_var: Option<String>,

    /// Expect a bare desired-state document instead of a full response
    pub legacy_desired_only: bool,

    /// Dump script, request, and response for this evaluation
    pub debug: bool,
}

impl EvalOptions {
    /// The request variable name with defaults applied
    #[must_use]
    pub fn request_var(&self) -> &str {
        match self.request_var.as_deref() {
            None | Some("") => DEFAULT_REQUEST_VAR,
            Some(var) => var,
        }
    }

    /// The response selector with defaults applied
    ///
    /// `None` selects the document root: explicitly via `"."`, or by
    /// default in legacy desired-only mode.
    #[must_use]
    pub fn selector(&self) -> Option<&str> {
        match self.response_var.as_deref() {
            Some(".") => None,
            None | Some("") => {
                if self.legacy_desired_only {
                    None
                } else {
                    Some(DEFAULT_RESPONSE_VAR)
                }
            }
            Some(var) => Some(var),
        }
    }
}

/// Typed script input carried in a request's `input` document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct FunctionInput {
    /// Input document API version
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,

    /// Input document kind
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,

    /// Input document object metadata, opaque here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,

    /// The script to evaluate
    pub script: String,

    /// Override for the request variable name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_var: Option<String>,

    /// Override for the response selector
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_var: Option<String>,

    /// Expect a bare desired-state document
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub legacy_desired_only: bool,

    /// Debug dumps for requests using this input
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub debug: bool,
}

/// The composition function
///
/// Owns the injected evaluator and process-level options. Every operation is
/// a synchronous pure function of the request; no state is shared across
/// invocations, so one instance may serve concurrent callers.
#[derive(Debug)]
pub struct Function<E> {
    evaluator: E,
    options: FunctionOptions,
}

impl<E: Evaluator> Function<E> {
    /// Create a function around an evaluator
    #[inline]
    #[must_use]
    pub fn new(evaluator: E, options: FunctionOptions) -> Self {
        Self { evaluator, options }
    }

    /// Borrow the injected evaluator
    #[inline]
    #[must_use]
    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    /// Evaluate a script source against a request and fold the result into
    /// the carried-forward response
    ///
    /// # Errors
    /// Evaluator failures, readiness values outside the raw form, output
    /// that does not map onto the protocol shape, and connection-detail
    /// validation or resolution failures.
    pub fn eval(
        &self,
        request: &RunFunctionRequest,
        source: &ScriptSource,
        opts: &EvalOptions,
    ) -> Result<RunFunctionResponse, FunctionError> {
        let debug = opts.debug || self.options.debug;
        let request_value =
            serde_json::to_value(request).map_err(|e| FunctionError::InvalidInput {
                detail: format!("serialize request: {e}"),
            })?;
        if debug {
            tracing::debug!(
                source = %source.describe(),
                request = %request_value,
                "evaluating script"
            );
        }

        let bindings = vec![(opts.request_var().to_string(), request_value)];
        let evaluated = self.evaluator.evaluate(source, &bindings, opts.selector())?;
        let mut raw = evaluated.value;

        // Declared connection-detail rules leave the raw tree before the
        // strict decode; the wire shape carries resolved secrets only.
        let outputs = match desired_subtree(&mut raw, opts.legacy_desired_only) {
            Some(state) => connection::take_outputs(state)?,
            None => Vec::new(),
        };

        let fresh = merge::decode_response(&mut raw, opts.legacy_desired_only)?;
        let mut response = RunFunctionResponse::from_request(request);
        merge::merge_into(&mut response, fresh);

        if !outputs.is_empty() {
            let details =
                connection::extract_connection_details(&request.observed.resources, &outputs)?;
            if !details.is_empty() {
                response
                    .desired
                    .composite
                    .get_or_insert_with(Default::default)
                    .connection_details
                    .extend(details);
            }
        }

        if debug {
            tracing::debug!(
                response = %serde_json::to_value(&response).unwrap_or_default(),
                "evaluated script"
            );
        }
        Ok(response)
    }

    /// Run one full production request
    ///
    /// Parses the typed script input from the request, evaluates it, then
    /// stamps response meta (request tag, default TTL) and appends the
    /// normal-severity success result.
    ///
    /// # Errors
    /// [`FunctionError::InvalidInput`] when the request carries no usable
    /// script input, plus everything [`Function::eval`] can fail with.
    pub fn run_function(
        &self,
        request: &RunFunctionRequest,
    ) -> Result<RunFunctionResponse, FunctionError> {
        let input_value = request
            .input
            .clone()
            .ok_or_else(|| FunctionError::InvalidInput {
                detail: "request has no script input".to_string(),
            })?;
        let input: FunctionInput =
            serde_json::from_value(input_value).map_err(|e| FunctionError::InvalidInput {
                detail: e.to_string(),
            })?;

        let opts = EvalOptions {
            request_var: input.request_var.clone(),
            response_var: input.response_var.clone(),
            legacy_desired_only: input.legacy_desired_only,
            debug: input.debug || debug_annotated(request),
        };
        let source = ScriptSource::inline(input.script);

        let mut response = self.eval(request, &source, &opts)?;
        response.meta = Some(ResponseMeta {
            tag: request
                .meta
                .as_ref()
                .map(|meta: &RequestMeta| meta.tag.clone())
                .unwrap_or_default(),
            ttl: Some(DEFAULT_TTL),
        });
        response.results.push(
            ResultEntry::normal("script executed successfully").with_target(Target::Composite),
        );
        Ok(response)
    }
}

/// Locate the raw desired-state subtree for the given output mode
fn desired_subtree(raw: &mut Value, legacy_desired_only: bool) -> Option<&mut Value> {
    if legacy_desired_only {
        Some(raw)
    } else {
        raw.get_mut("desired")
    }
}

/// Check whether the observed composite requests debug dumps by annotation
fn debug_annotated(request: &RunFunctionRequest) -> bool {
    request
        .observed
        .composite
        .as_ref()
        .and_then(|composite| composite.resource.get("metadata"))
        .and_then(|metadata| metadata.get("annotations"))
        .and_then(|annotations| annotations.get(DEBUG_ANNOTATION))
        .and_then(Value::as_str)
        == Some("true")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn request_var_defaults() {
        let opts = EvalOptions::default();
        assert_eq!(opts.request_var(), "#request");

        let opts = EvalOptions {
            request_var: Some("_request".to_string()),
            ..EvalOptions::default()
        };
        assert_eq!(opts.request_var(), "_request");
    }

    #[test]
    fn selector_resolution() {
        let opts = EvalOptions::default();
        assert_eq!(opts.selector(), Some("response"));

        let opts = EvalOptions {
            response_var: Some(".".to_string()),
            ..EvalOptions::default()
        };
        assert_eq!(opts.selector(), None);

        let opts = EvalOptions {
            legacy_desired_only: true,
            ..EvalOptions::default()
        };
        assert_eq!(opts.selector(), None);

        let opts = EvalOptions {
            response_var: Some("output".to_string()),
            legacy_desired_only: true,
            ..EvalOptions::default()
        };
        assert_eq!(opts.selector(), Some("output"));
    }

    #[test]
    fn function_input_decodes_object_form() {
        let input: FunctionInput = serde_json::from_value(json!({
            "apiVersion": "v1alpha1",
            "kind": "Function",
            "metadata": {"name": "foobar"},
            "script": "response: desired: resources: {}",
            "debug": true
        }))
        .unwrap();
        assert_eq!(input.kind, "Function");
        assert!(input.debug);
        assert!(!input.legacy_desired_only);
    }

    #[test]
    fn function_input_requires_script() {
        let err = serde_json::from_value::<FunctionInput>(json!({"kind": "Function"}))
            .unwrap_err();
        assert!(err.to_string().contains("script"));
    }

    #[test]
    fn debug_annotation_detection() {
        let request: RunFunctionRequest = serde_json::from_value(json!({
            "observed": {
                "composite": {
                    "resource": {
                        "metadata": {"annotations": {"xfn.dev/debug": "true"}}
                    }
                }
            }
        }))
        .unwrap();
        assert!(debug_annotated(&request));
        assert!(!debug_annotated(&RunFunctionRequest::default()));
    }
}
