//! Binds invocation arguments into an outbound HTTP request.
//!
//! Body parameters become a JSON document (or feed the body template), query
//! parameters are appended to the command URL, and headers are copied as-is.
//! `form` parameters are reserved and never bound.

use std::str::FromStr;

use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;
use url::Url;

use slashhook_types::{Command, InvocationArguments};
use slashhook_util::OutboundRequest;

use crate::templates::{Template, TemplateError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("invalid body template for command '{command}': {source}")]
    TemplateParse {
        command: String,
        #[source]
        source: TemplateError,
    },

    #[error("could not render body template for command '{command}': {source}")]
    TemplateRender {
        command: String,
        #[source]
        source: TemplateError,
    },

    #[error("missing value for query parameter '{parameter}'")]
    MissingQueryValue { parameter: String },

    #[error("invalid HTTP method '{method}'")]
    InvalidMethod { method: String },

    #[error("invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("invalid header '{name}'")]
    InvalidHeader { name: String },
}

/// Builds the outbound request for one invocation of `command`.
pub fn bind(command: &Command, arguments: &InvocationArguments) -> Result<OutboundRequest, BindError> {
    let method = parse_method(&command.method)?;
    let mut url = Url::parse(&command.url).map_err(|error| BindError::InvalidUrl {
        url: command.url.clone(),
        message: error.to_string(),
    })?;

    let body = bind_body(command, arguments)?;
    bind_query(command, arguments, &mut url)?;
    let headers = bind_headers(command)?;

    debug!(
        command = %command.name,
        method = %method,
        has_body = body.is_some(),
        query_count = command.query.len(),
        "bound invocation request"
    );

    Ok(OutboundRequest {
        method,
        url,
        headers,
        body,
    })
}

/// An empty method means `GET`.
fn parse_method(method: &str) -> Result<Method, BindError> {
    if method.trim().is_empty() {
        return Ok(Method::GET);
    }
    Method::from_str(method).map_err(|_| BindError::InvalidMethod {
        method: method.to_string(),
    })
}

fn bind_body(command: &Command, arguments: &InvocationArguments) -> Result<Option<Vec<u8>>, BindError> {
    let mut fields = Map::new();
    for parameter in &command.body {
        if let Some(value) = arguments.get(&parameter.name) {
            fields.insert(parameter.name.clone(), value.clone());
        }
    }
    if fields.is_empty() {
        return Ok(None);
    }

    let data = Value::Object(fields);
    let Some(source) = command.body_template.as_deref() else {
        return Ok(Some(data.to_string().into_bytes()));
    };

    let template = Template::parse(source).map_err(|source| BindError::TemplateParse {
        command: command.name.clone(),
        source,
    })?;
    let rendered = template.render(&data).map_err(|source| BindError::TemplateRender {
        command: command.name.clone(),
        source,
    })?;
    Ok(Some(rendered.into_bytes()))
}

fn bind_query(command: &Command, arguments: &InvocationArguments, url: &mut Url) -> Result<(), BindError> {
    if command.query.is_empty() {
        return Ok(());
    }

    let mut pairs = Vec::with_capacity(command.query.len());
    for parameter in &command.query {
        let value = arguments.get(&parameter.name).ok_or_else(|| BindError::MissingQueryValue {
            parameter: parameter.name.clone(),
        })?;
        pairs.push((parameter.name.as_str(), query_value(value)));
    }

    let mut serializer = url.query_pairs_mut();
    for (name, value) in &pairs {
        serializer.append_pair(name, value);
    }
    drop(serializer);
    Ok(())
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn bind_headers(command: &Command) -> Result<HeaderMap, BindError> {
    let mut headers = HeaderMap::with_capacity(command.headers.len());
    for (name, value) in &command.headers {
        let invalid = || BindError::InvalidHeader { name: name.clone() };
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
        let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
        headers.append(header_name, header_value);
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use slashhook_types::Parameter;

    fn weather_command() -> Command {
        Command {
            name: "weather".into(),
            method: "GET".into(),
            url: "https://api.example.com/data?appid=abc".into(),
            query: vec![Parameter::new("q", "string").required(), Parameter::new("cnt", "integer")],
            headers: [("Accept".to_string(), "application/json".to_string())].into_iter().collect(),
            ..Default::default()
        }
    }

    fn arguments(value: Value) -> InvocationArguments {
        match value {
            Value::Object(map) => map.into_iter().collect(),
            _ => InvocationArguments::new(),
        }
    }

    #[test]
    fn appends_query_pairs_to_existing_query_string() {
        let request = bind(&weather_command(), &arguments(json!({ "q": "New York", "cnt": 3 }))).expect("bind");
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.url.as_str(), "https://api.example.com/data?appid=abc&q=New+York&cnt=3");
        assert_eq!(request.headers.get("accept").unwrap(), "application/json");
        assert!(request.body.is_none());
    }

    #[test]
    fn missing_query_value_is_an_error() {
        let error = bind(&weather_command(), &arguments(json!({ "q": "Oslo" }))).expect_err("cnt missing");
        assert_eq!(error, BindError::MissingQueryValue { parameter: "cnt".into() });
    }

    #[test]
    fn absent_body_fields_are_omitted() {
        let command = Command {
            name: "echo".into(),
            method: "POST".into(),
            url: "https://api.example.com/echo".into(),
            body: vec![Parameter::new("message", "string"), Parameter::new("loud", "boolean")],
            ..Default::default()
        };
        let request = bind(&command, &arguments(json!({ "message": "hi" }))).expect("bind");
        assert_eq!(request.body.as_deref(), Some(br#"{"message":"hi"}"#.as_slice()));

        let empty = bind(&command, &InvocationArguments::new()).expect("bind");
        assert!(empty.body.is_none());
    }

    #[test]
    fn body_template_renders_against_bound_fields() {
        let command = Command {
            name: "echo".into(),
            method: "POST".into(),
            url: "https://api.example.com/echo".into(),
            body: vec![Parameter::new("message", "string")],
            body_template: Some(r#"{"text":"{{ .message }}"}"#.into()),
            ..Default::default()
        };
        let request = bind(&command, &arguments(json!({ "message": "hi" }))).expect("bind");
        assert_eq!(request.body.as_deref(), Some(br#"{"text":"hi"}"#.as_slice()));
    }

    #[test]
    fn body_template_errors_abort_binding() {
        let mut command = Command {
            name: "echo".into(),
            method: "POST".into(),
            url: "https://api.example.com/echo".into(),
            body: vec![Parameter::new("message", "string")],
            body_template: Some("{{ .other }}".into()),
            ..Default::default()
        };
        let args = arguments(json!({ "message": "hi" }));
        assert!(matches!(bind(&command, &args), Err(BindError::TemplateRender { .. })));

        command.body_template = Some("{{ upper .message }}".into());
        assert!(matches!(bind(&command, &args), Err(BindError::TemplateParse { .. })));
    }

    #[test]
    fn form_parameters_are_never_bound() {
        let command = Command {
            name: "upload".into(),
            method: "POST".into(),
            url: "https://api.example.com/upload".into(),
            form: vec![Parameter::new("file", "string")],
            ..Default::default()
        };
        let request = bind(&command, &arguments(json!({ "file": "x" }))).expect("bind");
        assert!(request.body.is_none());
        assert_eq!(request.url.query(), None);
    }

    #[test]
    fn commands_without_a_method_default_to_get() {
        let command: Command = serde_json::from_value(json!({ "name": "ping", "url": "https://example.com/ping" })).expect("command");
        let request = bind(&command, &InvocationArguments::new()).expect("bind");
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.url.as_str(), "https://example.com/ping");

        let mut blank = command.clone();
        blank.method = "  ".into();
        assert_eq!(bind(&blank, &InvocationArguments::new()).expect("bind").method, Method::GET);
    }

    #[test]
    fn rejects_invalid_method_url_and_headers() {
        let mut command = weather_command();
        command.method = "GE T".into();
        let args = arguments(json!({ "q": "a", "cnt": 1 }));
        assert!(matches!(bind(&command, &args), Err(BindError::InvalidMethod { .. })));

        let mut command = weather_command();
        command.url = "not a url".into();
        assert!(matches!(bind(&command, &args), Err(BindError::InvalidUrl { .. })));

        let mut command = weather_command();
        command.headers.insert("X-Bad".into(), "line\nbreak".into());
        assert!(matches!(bind(&command, &args), Err(BindError::InvalidHeader { .. })));
    }
}
