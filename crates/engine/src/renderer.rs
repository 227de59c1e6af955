//! Turns a raw response body into the reply text for one invocation.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use slashhook_types::Command;

use crate::query::Query;
use crate::templates::{TemplateError, render_template};

/// Output field name to extracted, stringified value.
pub type ExtractedFields = IndexMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("response is not valid JSON: {message}")]
    ResponseJson { message: String },

    #[error("response JSON is not an object (found {found})")]
    ResponseNotObject { found: String },

    #[error("could not render the response template: {source}")]
    Template {
        #[source]
        source: TemplateError,
    },
}

/// Renders a raw response body according to `command`'s extraction and template settings.
pub fn render(command: &Command, raw: &[u8]) -> Result<String, RenderError> {
    if command.parse_json.is_empty() {
        return Ok(present(raw.to_vec()));
    }

    let document: Value = serde_json::from_slice(raw).map_err(|error| RenderError::ResponseJson {
        message: error.to_string(),
    })?;
    if !document.is_object() {
        return Err(RenderError::ResponseNotObject {
            found: kind_of(&document).to_string(),
        });
    }

    let fields = extract(&command.name, &command.parse_json, &document);
    let fields_value = Value::Object(fields.into_iter().map(|(name, value)| (name, Value::String(value))).collect::<Map<_, _>>());

    let working = match command.response_template.as_deref() {
        Some(source) => render_template(source, &fields_value)
            .map_err(|source| RenderError::Template { source })?
            .into_bytes(),
        None => fields_value.to_string().into_bytes(),
    };
    Ok(present(working))
}

/// Runs every configured query against `document`.
///
/// When a query yields several values the last one is kept. A query that fails
/// to parse is skipped; a runtime error keeps whatever the query already produced.
pub fn extract(command: &str, queries: &IndexMap<String, String>, document: &Value) -> ExtractedFields {
    let mut fields = ExtractedFields::new();
    for (field, expression) in queries {
        let query = match Query::parse(expression) {
            Ok(query) => query,
            Err(error) => {
                warn!(command = %command, field = %field, expression = %expression, error = %error, "skipping field with invalid query");
                continue;
            }
        };

        let run = query.run(document);
        if let Some(error) = &run.error {
            warn!(command = %command, field = %field, error = %error, "query stopped with an error");
        }
        if let Some(value) = run.last() {
            fields.insert(field.clone(), stringify(value));
        }
    }
    fields
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Fences a JSON object as a pretty code block; anything else is returned as text.
fn present(body: Vec<u8>) -> String {
    match serde_json::from_slice::<Value>(&body) {
        Ok(value @ Value::Object(_)) => {
            let sorted = sort_keys(value);
            let pretty = serde_json::to_string_pretty(&sorted).unwrap_or_else(|_| sorted.to_string());
            format!("```json\n{pretty}\n```")
        }
        _ => String::from_utf8_lossy(&body).into_owned(),
    }
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().map(|(key, value)| (key, sort_keys(value))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
