use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;

use slashhook_engine::{InvocationOutcome, Pipeline, PipelineError};
use slashhook_registry::Catalog;
use slashhook_types::{Command, Invocation, InvocationArguments, Parameter};
use slashhook_util::{OutboundRequest, OutboundResponse, Transport, TransportError};

/// Transport double that records requests and answers with a canned body.
struct CannedTransport {
    status: StatusCode,
    body: Vec<u8>,
    fail_with_timeout: bool,
    seen: Mutex<Vec<OutboundRequest>>,
}

impl CannedTransport {
    fn ok(body: &str) -> Arc<Self> {
        Arc::new(Self {
            status: StatusCode::OK,
            body: body.as_bytes().to_vec(),
            fail_with_timeout: false,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn timing_out() -> Arc<Self> {
        Arc::new(Self {
            status: StatusCode::OK,
            body: Vec::new(),
            fail_with_timeout: true,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<OutboundRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for CannedTransport {
    async fn execute(&self, request: OutboundRequest) -> Result<OutboundResponse, TransportError> {
        let url = request.url.to_string();
        self.seen.lock().unwrap().push(request);
        if self.fail_with_timeout {
            return Err(TransportError::Timeout { url, timeout_ms: 10 });
        }
        Ok(OutboundResponse {
            status: self.status,
            body: self.body.clone(),
        })
    }
}

fn catalog() -> Arc<Catalog> {
    let weather = Command {
        name: "weather".into(),
        description: "Current weather".into(),
        method: "GET".into(),
        url: "https://api.example.com/weather?units=metric".into(),
        query: vec![Parameter::new("city", "string").required()],
        parse_json: [("temp".to_string(), ".main.temp".to_string())].into_iter().collect(),
        response_template: Some("{{ .temp }} degrees".into()),
        ..Default::default()
    };
    let echo = Command {
        name: "echo".into(),
        description: "Echo a message".into(),
        method: "POST".into(),
        url: "https://api.example.com/echo".into(),
        body: vec![Parameter::new("message", "string"), Parameter::new("count", "integer")],
        ..Default::default()
    };
    Arc::new(Catalog::from_commands(vec![weather, echo]).expect("catalog"))
}

fn invocation(name: &str, arguments: serde_json::Value) -> Invocation {
    let arguments: InvocationArguments = match arguments {
        serde_json::Value::Object(map) => map.into_iter().collect(),
        _ => InvocationArguments::new(),
    };
    Invocation::new(name, arguments)
}

#[tokio::test]
async fn renders_extracted_fields_through_the_template() {
    let transport = CannedTransport::ok(r#"{"main":{"temp":21.5},"name":"Oslo"}"#);
    let pipeline = Pipeline::new(catalog(), transport.clone());

    let outcome = pipeline.handle(invocation("weather", json!({ "city": "Oslo" }))).await;
    assert!(outcome.is_success());
    assert_eq!(outcome.reply_text(), "21.5 degrees");

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.as_str(), "https://api.example.com/weather?units=metric&city=Oslo");
}

#[tokio::test]
async fn sends_only_supplied_body_fields() {
    let transport = CannedTransport::ok(r#"{"ok":true}"#);
    let pipeline = Pipeline::new(catalog(), transport.clone());

    let outcome = pipeline.handle(invocation("echo", json!({ "message": "hi" }))).await;
    assert_eq!(outcome.reply_text(), "```json\n{\n  \"ok\": true\n}\n```");
    assert_eq!(transport.requests()[0].body.as_deref(), Some(br#"{"message":"hi"}"#.as_slice()));
}

#[tokio::test]
async fn unknown_command_replies_with_fixed_text() {
    let transport = CannedTransport::ok("{}");
    let pipeline = Pipeline::new(catalog(), transport.clone());

    let outcome = pipeline.handle(invocation("nope", json!({}))).await;
    assert!(matches!(outcome, InvocationOutcome::NotFound { .. }));
    assert_eq!(outcome.reply_text(), "Could not find command");
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn missing_query_value_fails_before_any_request() {
    let transport = CannedTransport::ok("{}");
    let pipeline = Pipeline::new(catalog(), transport.clone());

    let outcome = pipeline.handle(invocation("weather", json!({}))).await;
    assert!(matches!(outcome, InvocationOutcome::Failed { error: PipelineError::Bind(_), .. }));
    assert_eq!(outcome.reply_text(), "Command `weather` failed: a required argument was missing.");
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn transport_timeout_is_reported_per_invocation() {
    let pipeline = Pipeline::new(catalog(), CannedTransport::timing_out());

    let outcome = pipeline.handle(invocation("echo", json!({ "message": "hi" }))).await;
    assert!(matches!(outcome, InvocationOutcome::Failed { error: PipelineError::Transport(_), .. }));
    assert!(outcome.reply_text().contains("timed out"));
}

#[tokio::test]
async fn non_object_response_with_extraction_is_a_render_failure() {
    let transport = CannedTransport::ok("[1,2,3]");
    let pipeline = Pipeline::new(catalog(), transport);

    let outcome = pipeline.handle(invocation("weather", json!({ "city": "Oslo" }))).await;
    assert!(matches!(outcome, InvocationOutcome::Failed { error: PipelineError::Render(_), .. }));
}

#[tokio::test]
async fn concurrent_invocations_share_one_pipeline() {
    let transport = CannedTransport::ok("plain text reply");
    let pipeline = Pipeline::new(catalog(), transport.clone());

    let handles: Vec<_> = (0..8)
        .map(|index| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.handle(invocation("echo", json!({ "count": index }))).await })
        })
        .collect();
    for handle in handles {
        let outcome = handle.await.expect("task");
        assert_eq!(outcome.reply_text(), "plain text reply");
    }
    assert_eq!(transport.requests().len(), 8);
}
