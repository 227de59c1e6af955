//! Field-substitution templates for request bodies and replies.
//!
//! Templates use the familiar `{{ .field }}` action syntax but only support
//! field references: `{{ . }}`, `{{ .name }}` and nested `{{ .a.b }}`.
//! `{{-` and `-}}` trim the whitespace next to an action. There are no
//! conditionals, loops or function calls.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template parse error at byte {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("template references undefined field '{path}'")]
    UndefinedField { path: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    /// Field path; empty means the whole data value.
    Field(Vec<String>),
}

/// A parsed template ready to render against JSON data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut remainder = source;
        let mut trim_following_text = false;

        loop {
            let consumed = source.len() - remainder.len();
            let Some(start) = remainder.find("{{") else {
                push_text(&mut segments, remainder, trim_following_text, false);
                break;
            };

            let mut after_open = &remainder[start + 2..];
            let trim_preceding_text = after_open.starts_with('-') && after_open[1..].starts_with(char::is_whitespace);
            if trim_preceding_text {
                after_open = &after_open[1..];
            }

            let Some(end) = after_open.find("}}") else {
                return Err(TemplateError::Parse {
                    position: consumed + start,
                    message: "unclosed action".to_string(),
                });
            };

            let mut action = &after_open[..end];
            let trim_next = action.ends_with('-') && action[..action.len() - 1].ends_with(char::is_whitespace);
            if trim_next {
                action = &action[..action.len() - 1];
            }

            push_text(&mut segments, &remainder[..start], trim_following_text, trim_preceding_text);
            let path = parse_field_path(action.trim()).map_err(|message| TemplateError::Parse {
                position: consumed + start,
                message,
            })?;
            segments.push(Segment::Field(path));

            trim_following_text = trim_next;
            remainder = &after_open[end + 2..];
        }

        Ok(Template { segments })
    }

    /// Renders the template; a reference to a missing field is an error.
    pub fn render(&self, data: &Value) -> Result<String, TemplateError> {
        let mut output = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => output.push_str(text),
                Segment::Field(path) => {
                    let value = lookup(data, path).ok_or_else(|| TemplateError::UndefinedField {
                        path: format!(".{}", path.join(".")),
                    })?;
                    write_value(&mut output, value);
                }
            }
        }
        Ok(output)
    }
}

/// Parses and renders `source` in one step.
pub fn render_template(source: &str, data: &Value) -> Result<String, TemplateError> {
    Template::parse(source)?.render(data)
}

fn push_text(segments: &mut Vec<Segment>, text: &str, trim_start: bool, trim_end: bool) {
    let mut text = text;
    if trim_start {
        text = text.trim_start();
    }
    if trim_end {
        text = text.trim_end();
    }
    if !text.is_empty() {
        segments.push(Segment::Text(text.to_string()));
    }
}

fn parse_field_path(action: &str) -> Result<Vec<String>, String> {
    if action.is_empty() {
        return Err("empty action".to_string());
    }
    if action == "." {
        return Ok(Vec::new());
    }
    let Some(path) = action.strip_prefix('.') else {
        return Err(format!("unsupported action '{action}'; only field references such as .name are allowed"));
    };

    let mut segments = Vec::new();
    for segment in path.split('.') {
        let valid = !segment.is_empty()
            && segment
                .chars()
                .all(|character| character.is_alphanumeric() || character == '_' || character == '-');
        if !valid {
            return Err(format!("invalid field reference '{action}'"));
        }
        segments.push(segment.to_string());
    }
    Ok(segments)
}

fn lookup<'a>(data: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(data, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        _ => None,
    })
}

fn write_value(output: &mut String, value: &Value) {
    match value {
        Value::String(text) => output.push_str(text),
        Value::Null => {}
        other => output.push_str(&other.to_string()),
    }
}
