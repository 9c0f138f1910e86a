//! Output documents and field-path extraction

use crate::scalar::ScalarValue;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Everything a provisioned resource has published about itself
///
/// A read-only nested key/value tree (status + outputs). Written by the
/// provisioning pipeline; the resolver only reads it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputDocument(serde_json::Value);

impl OutputDocument {
    /// Wrap a JSON value
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// Parse a JSON document
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text).map(Self)
    }

    /// Serialize back to compact JSON
    pub fn to_json(&self) -> String {
        self.0.to_string()
    }

    /// Borrow the underlying tree
    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    /// Extract the scalar at `path`
    pub fn extract(&self, path: &str) -> Result<ScalarValue, ExtractError> {
        extract(self, path)
    }
}

impl From<serde_json::Value> for OutputDocument {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// Reasons a field path does not resolve to a scalar
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// The path was empty
    #[error("field path is empty")]
    PathEmpty,

    /// A segment of the path is absent (or null)
    #[error("field '{segment}' not found (path '{path}')")]
    FieldNotFound { path: String, segment: String },

    /// The path ends at a map or a list
    #[error("field '{path}' is a {found}, not a scalar")]
    NotScalar { path: String, found: &'static str },
}

/// Walk `path` (dot-delimited, no indices) through `doc`
///
/// Pure: no I/O, no allocation beyond the error case.
pub fn extract(doc: &OutputDocument, path: &str) -> Result<ScalarValue, ExtractError> {
    if path.is_empty() {
        return Err(ExtractError::PathEmpty);
    }

    let mut current = &doc.0;
    for segment in path.split('.') {
        let next = match current {
            serde_json::Value::Object(map) if !segment.is_empty() => map.get(segment),
            _ => None,
        };
        current = match next {
            Some(v) if !v.is_null() => v,
            _ => {
                return Err(ExtractError::FieldNotFound {
                    path: path.to_string(),
                    segment: segment.to_string(),
                });
            }
        };
    }

    match current {
        serde_json::Value::Object(_) => Err(ExtractError::NotScalar {
            path: path.to_string(),
            found: "map",
        }),
        serde_json::Value::Array(_) => Err(ExtractError::NotScalar {
            path: path.to_string(),
            found: "list",
        }),
        other => ScalarValue::from_json(other).ok_or_else(|| ExtractError::FieldNotFound {
            path: path.to_string(),
            segment: path.rsplit('.').next().unwrap_or(path).to_string(),
        }),
    }
}
