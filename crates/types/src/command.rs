//! Declarative command model.
//!
//! A [`Command`] is loaded from one JSON document. Parsing is permissive:
//! every field except `name` may be omitted and falls back to an empty value.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Concrete argument values supplied for one invocation, keyed by parameter name.
pub type InvocationArguments = IndexMap<String, Value>;

/// The kind of value a [`Parameter`] accepts.
///
/// Unknown kinds are kept as [`ParameterType::Unrecognized`] so that a
/// catalog still loads; the compiler rejects them when building the native
/// command.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ParameterType {
    #[default]
    String,
    Integer,
    Boolean,
    Unrecognized(String),
}

impl ParameterType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Unrecognized(kind) => kind.as_str(),
        }
    }
}

impl From<String> for ParameterType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "string" => Self::String,
            "integer" => Self::Integer,
            "boolean" => Self::Boolean,
            _ => Self::Unrecognized(value),
        }
    }
}

impl From<&str> for ParameterType {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<ParameterType> for String {
    fn from(value: ParameterType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One typed, named input of a command.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Parameter {
    /// Name of the input, unique within its list
    pub name: String,
    /// Help text shown by the chat client
    #[serde(default)]
    pub description: String,
    /// Value kind (string, integer or boolean)
    #[serde(default, rename = "type")]
    pub r#type: ParameterType,
    /// Whether the chat client must collect a value
    #[serde(default)]
    pub required: bool,
    /// Fixed choices offered to the user, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// Declared default. Informational only; absent arguments are never defaulted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, r#type: impl Into<ParameterType>) -> Self {
        Self {
            name: name.into(),
            r#type: r#type.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }
}

/// A declarative slash command backed by one outbound HTTP request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Command {
    /// Slash command name, unique across the catalog
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// HTTP verb of the outbound request
    #[serde(default)]
    pub method: String,
    /// Static target URL; query parameters are appended to it
    #[serde(default)]
    pub url: String,
    /// Parameters sent in the request body
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub body: Vec<Parameter>,
    /// Template producing the request body instead of JSON serialization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_template: Option<String>,
    /// Parameters appended to the query string
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query: Vec<Parameter>,
    /// Reserved: exposed as options but never bound into the request
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub form: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, String>,
    /// Output field name to structured-query expression
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub parse_json: IndexMap<String, String>,
    /// Template applied to the extracted fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_template: Option<String>,
}

impl Command {
    /// Returns every parameter in option order: body, then query, then form.
    pub fn parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.body.iter().chain(self.query.iter()).chain(self.form.iter())
    }
}
