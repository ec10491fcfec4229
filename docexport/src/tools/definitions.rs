//! Tool definitions and the result envelope.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::{ErrorKind, PageContentError};

/// Description of a tool entry point for a registration layer.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    /// The tool name.
    pub name: &'static str,
    /// Description of what the tool does.
    pub description: &'static str,
    /// JSON Schema of the arguments.
    pub input_schema: serde_json::Value,
}

impl ToolDefinition {
    /// Creates a definition with an empty object schema.
    #[must_use]
    pub fn new(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            input_schema: serde_json::json!({"type": "object", "properties": {}}),
        }
    }

    /// Sets the input schema.
    #[must_use]
    pub fn with_input_schema(mut self, schema: serde_json::Value) -> Self {
        self.input_schema = schema;
        self
    }

    /// Names of the required arguments.
    #[must_use]
    pub fn required_args(&self) -> Vec<&str> {
        self.input_schema
            .get("required")
            .and_then(serde_json::Value::as_array)
            .map(|names| names.iter().filter_map(serde_json::Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// Result envelope returned by every tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Whether the call succeeded.
    pub success: bool,
    /// The output data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Error message if failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Error classification if failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl ToolOutput {
    /// Creates a successful output.
    #[must_use]
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_kind: None,
        }
    }

    /// Creates a failure output.
    #[must_use]
    pub fn fail(kind: ErrorKind, error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            error_kind: Some(kind),
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("success".to_string(), serde_json::json!(self.success));

        if let Some(ref data) = self.data {
            map.insert("data".to_string(), data.clone());
        }
        if let Some(ref error) = self.error {
            map.insert("error".to_string(), serde_json::json!(error));
        }
        if let Some(kind) = self.error_kind {
            map.insert("error_kind".to_string(), serde_json::json!(kind.as_str()));
        }

        map
    }
}

impl From<&PageContentError> for ToolOutput {
    fn from(err: &PageContentError) -> Self {
        Self::fail(err.kind(), err.to_string())
    }
}
