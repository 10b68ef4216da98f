//! Desired/observed state trees
//!
//! A [`State`] holds the composite resource entry plus a keyed mapping of
//! composed resources. Keys are unique identifiers chosen by the script (for
//! desired state) or assigned by the orchestrating pipeline (for observed
//! state); merges over them are keyed, never positional.

use crate::secret::ConnectionDetails;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Identifier for a composed resource within a state tree
pub type ResourceName = String;

/// One composite or composed resource entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct Resource {
    /// Structured resource body (schema-free at this layer)
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub resource: Value,

    /// Connection secrets exposed by this resource
    #[serde(default, skip_serializing_if = "ConnectionDetails::is_empty")]
    pub connection_details: ConnectionDetails,

    /// Readiness signal; omitted from the wire when unspecified
    #[serde(default, skip_serializing_if = "Ready::is_unspecified")]
    pub ready: Ready,
}

impl Resource {
    /// Create an entry from a resource body
    #[inline]
    #[must_use]
    pub fn new(resource: Value) -> Self {
        Self {
            resource,
            connection_details: ConnectionDetails::new(),
            ready: Ready::Unspecified,
        }
    }

    /// Set readiness
    #[inline]
    #[must_use]
    pub fn with_ready(mut self, ready: Ready) -> Self {
        self.ready = ready;
        self
    }

    /// Set connection secrets
    #[inline]
    #[must_use]
    pub fn with_connection_details(mut self, details: ConnectionDetails) -> Self {
        self.connection_details = details;
        self
    }
}

/// Composite entry plus keyed composed-resource entries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct State {
    /// The composite resource entry, if set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composite: Option<Resource>,

    /// Composed resources keyed by name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resources: BTreeMap<ResourceName, Resource>,
}

impl State {
    /// Check whether the state carries no entries at all
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.composite.is_none() && self.resources.is_empty()
    }
}

/// Tri-state readiness signal
///
/// Scripts express readiness as an absent field, `0`, or `1`; the canonical
/// form is an explicit tag. `Unspecified` means "no opinion" and is never
/// written to the wire — the field is omitted instead. Readiness is not a
/// boolean: losing the no-opinion state would make a carried-forward entry
/// indistinguishable from an explicitly not-ready one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ready {
    /// No opinion
    #[default]
    #[serde(rename = "READY_UNSPECIFIED")]
    Unspecified,

    /// Resource is ready
    #[serde(rename = "READY_TRUE")]
    True,

    /// Resource is not ready
    #[serde(rename = "READY_FALSE")]
    False,
}

impl Ready {
    /// Check for the no-opinion state
    #[inline]
    #[must_use]
    pub fn is_unspecified(&self) -> bool {
        matches!(self, Self::Unspecified)
    }

    /// Canonical wire tag
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unspecified => "READY_UNSPECIFIED",
            Self::True => "READY_TRUE",
            Self::False => "READY_FALSE",
        }
    }
}

impl fmt::Display for Ready {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
