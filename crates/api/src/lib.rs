//! Discord REST client utilities.
//!
//! This module provides a small client for the two Discord endpoints the bot
//! needs:
//!
//! - Bulk-overwriting the application's slash commands (globally or per guild)
//! - Editing the original response of a deferred interaction
//!
//! The base URL defaults to the public v10 API and may be pointed elsewhere
//! (e.g. a local mock) through `DISCORD_API_BASE`. Non-local hosts must use
//! HTTPS and belong to a Discord domain.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use slashhook_api::{DiscordClient, DEFAULT_DISCORD_API_BASE};
//!
//! let client = DiscordClient::new(DEFAULT_DISCORD_API_BASE, "1234", "bot-token", Duration::from_secs(10))?;
//! client.edit_original_response("interaction-token", "done").await?;
//! ```

use std::time::{Duration, Instant};

use reqwest::{Client, Method, RequestBuilder, StatusCode, Url, header};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use slashhook_types::ApplicationCommand;
use slashhook_util::{redact_sensitive, truncate_chars};

/// Default Discord REST API base.
pub const DEFAULT_DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Allowed hostnames or base domains for non-local configurations of
/// `DISCORD_API_BASE`. Subdomains of these domains are also allowed.
const ALLOWED_DISCORD_DOMAINS: &[&str] = &["discord.com", "discordapp.com"];
/// Hostnames allowed for local development regardless of scheme.
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1"];

/// Longest response body excerpt kept in an [`ApiError::Status`].
const ERROR_BODY_LIMIT: usize = 512;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid DISCORD_API_BASE '{base}': {message}")]
    InvalidBaseUrl { base: String, message: String },

    #[error("bot token contains characters that are not valid in a header")]
    InvalidToken,

    #[error("could not build the HTTP client: {0}")]
    Client(String),

    #[error("{method} {route} failed: {message}")]
    Request { method: Method, route: String, message: String },

    #[error("{method} {route} returned {status}: {body}")]
    Status {
        method: Method,
        route: String,
        status: StatusCode,
        body: String,
    },

    #[error("could not decode the response of {method} {route}: {message}")]
    Decode { method: Method, route: String, message: String },
}

#[derive(Debug, Serialize)]
struct MessageEdit<'a> {
    content: &'a str,
}

#[derive(Debug, Clone)]
/// Thin wrapper around a configured `reqwest::Client` for Discord API access.
///
/// The client pre-configures bot authorization, user agent and timeout, and
/// builds requests against a validated base URL.
pub struct DiscordClient {
    base_url: String,
    application_id: String,
    http: Client,
}

impl DiscordClient {
    pub fn new(base_url: &str, application_id: impl Into<String>, token: &str, timeout: Duration) -> Result<Self, ApiError> {
        validate_base_url(base_url)?;

        let mut default_headers = header::HeaderMap::new();
        let mut authorization =
            header::HeaderValue::from_str(&format!("Bot {}", token.trim())).map_err(|_| ApiError::InvalidToken)?;
        authorization.set_sensitive(true);
        default_headers.insert(header::AUTHORIZATION, authorization);
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(default_headers)
            .user_agent(concat!(
                "DiscordBot (https://example.com/slashhook, ",
                env!("CARGO_PKG_VERSION"),
                ")"
            ))
            .timeout(timeout)
            .build()
            .map_err(|error| ApiError::Client(error.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            application_id: application_id.into(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn application_id(&self) -> &str {
        &self.application_id
    }

    /// Route of the command collection, guild-scoped when `guild_id` is set.
    pub fn commands_route(&self, guild_id: Option<&str>) -> String {
        match guild_id {
            Some(guild_id) => format!("/applications/{}/guilds/{guild_id}/commands", self.application_id),
            None => format!("/applications/{}/commands", self.application_id),
        }
    }

    pub fn original_response_route(&self, interaction_token: &str) -> String {
        format!("/webhooks/{}/{interaction_token}/messages/@original", self.application_id)
    }

    /// Replaces the application's commands with `commands`; returns how many Discord accepted.
    pub async fn bulk_overwrite_commands(
        &self,
        guild_id: Option<&str>,
        commands: &[ApplicationCommand],
    ) -> Result<usize, ApiError> {
        let route = self.commands_route(guild_id);
        let body = self.send(Method::PUT, &route, commands).await?;
        let registered: Vec<Value> = serde_json::from_slice(&body).map_err(|error| ApiError::Decode {
            method: Method::PUT,
            route: route.clone(),
            message: error.to_string(),
        })?;
        info!(
            guild = guild_id.unwrap_or("global"),
            count = registered.len(),
            "registered application commands"
        );
        Ok(registered.len())
    }

    /// Replaces the content of a deferred interaction reply.
    pub async fn edit_original_response(&self, interaction_token: &str, content: &str) -> Result<(), ApiError> {
        let route = self.original_response_route(interaction_token);
        self.send(Method::PATCH, &route, &MessageEdit { content }).await?;
        Ok(())
    }

    fn request(&self, method: Method, route: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, route);
        debug!(url = %redact_sensitive(&url), %method, "building request");
        self.http.request(method, url)
    }

    async fn send<T: Serialize + ?Sized>(&self, method: Method, route: &str, payload: &T) -> Result<Vec<u8>, ApiError> {
        let start = Instant::now();
        let display_route = redact_sensitive(route);
        let request_error = |error: reqwest::Error| ApiError::Request {
            method: method.clone(),
            route: display_route.clone(),
            message: redact_sensitive(&error.without_url().to_string()),
        };

        let response = self
            .request(method.clone(), route)
            .json(payload)
            .send()
            .await
            .map_err(request_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(request_error)?;
        debug!(
            %method,
            route = %display_route,
            status = %status,
            duration_ms = start.elapsed().as_millis(),
            "discord request completed"
        );

        if !status.is_success() {
            return Err(ApiError::Status {
                method,
                route: display_route,
                status,
                body: truncate_chars(&String::from_utf8_lossy(&body), ERROR_BODY_LIMIT),
            });
        }
        Ok(body.to_vec())
    }
}

/// Validate that a base URL is acceptable for use by the client.
///
/// Rules:
/// - `localhost` or `127.0.0.1`: any scheme is allowed
/// - otherwise: scheme must be HTTPS, and host must be a Discord domain or a
///   subdomain thereof
pub fn validate_base_url(base: &str) -> Result<(), ApiError> {
    let invalid = |message: String| ApiError::InvalidBaseUrl {
        base: base.to_string(),
        message,
    };
    let parsed_base_url = Url::parse(base).map_err(|error| invalid(error.to_string()))?;

    let host_name = parsed_base_url
        .host_str()
        .ok_or_else(|| invalid("must include a host".to_string()))?;

    if LOCALHOST_DOMAINS
        .iter()
        .any(|&allowed| host_name.eq_ignore_ascii_case(allowed))
    {
        return Ok(());
    }

    if parsed_base_url.scheme() != "https" {
        return Err(invalid(format!(
            "must use https for non-localhost hosts; got '{}://'",
            parsed_base_url.scheme()
        )));
    }

    let is_allowed_domain = ALLOWED_DISCORD_DOMAINS.iter().any(|&allowed_domain| {
        host_name.eq_ignore_ascii_case(allowed_domain) || host_name.ends_with(&format!(".{allowed_domain}"))
    });
    if !is_allowed_domain {
        return Err(invalid(format!(
            "host '{host_name}' is not allowed; must be one of {ALLOWED_DISCORD_DOMAINS:?} or a subdomain, or localhost"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::body::Bytes;
    use axum::http::{HeaderMap, Method as AxumMethod, Uri};
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    type Seen = Arc<Mutex<Vec<(String, String, String, String)>>>;

    async fn spawn_recorder(status: axum::http::StatusCode, reply: &'static str) -> (SocketAddr, Seen) {
        let seen: Seen = Arc::default();
        let recorded = seen.clone();
        let router = Router::new().fallback(move |method: AxumMethod, uri: Uri, headers: HeaderMap, body: Bytes| {
            let recorded = recorded.clone();
            async move {
                let authorization = headers
                    .get("authorization")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                recorded.lock().unwrap().push((
                    method.to_string(),
                    uri.path().to_string(),
                    authorization,
                    String::from_utf8_lossy(&body).into_owned(),
                ));
                (status, reply)
            }
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
        let address = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        (address, seen)
    }

    fn client(base: &str) -> DiscordClient {
        DiscordClient::new(base, "42", "secret-token", Duration::from_secs(5)).expect("client")
    }

    #[test]
    fn accepts_discord_and_local_bases() {
        assert!(validate_base_url(DEFAULT_DISCORD_API_BASE).is_ok());
        assert!(validate_base_url("https://canary.discord.com/api/v10").is_ok());
        assert!(validate_base_url("http://localhost:3000/api").is_ok());
        assert!(validate_base_url("http://127.0.0.1:9999").is_ok());
    }

    #[test]
    fn rejects_plain_http_and_foreign_hosts() {
        assert!(matches!(
            validate_base_url("http://discord.com/api/v10"),
            Err(ApiError::InvalidBaseUrl { .. })
        ));
        assert!(validate_base_url("https://discord.com.evil.example/api").is_err());
        assert!(validate_base_url("not a url").is_err());
    }

    #[test]
    fn builds_command_and_webhook_routes() {
        let client = client("https://discord.com/api/v10/");
        assert_eq!(client.base_url(), "https://discord.com/api/v10");
        assert_eq!(client.commands_route(None), "/applications/42/commands");
        assert_eq!(client.commands_route(Some("7")), "/applications/42/guilds/7/commands");
        assert_eq!(client.original_response_route("tok"), "/webhooks/42/tok/messages/@original");
    }

    #[tokio::test]
    async fn bulk_overwrite_puts_commands_with_bot_authorization() {
        let (address, seen) = spawn_recorder(axum::http::StatusCode::OK, r#"[{"id":"1"},{"id":"2"}]"#).await;
        let commands = vec![ApplicationCommand {
            name: "weather".into(),
            description: "Current weather".into(),
            options: Vec::new(),
            kind: 1,
        }];

        let count = client(&format!("http://{address}"))
            .bulk_overwrite_commands(Some("7"), &commands)
            .await
            .expect("register");

        assert_eq!(count, 2);
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].0, "PUT");
        assert_eq!(seen[0].1, "/applications/42/guilds/7/commands");
        assert_eq!(seen[0].2, "Bot secret-token");
        assert_eq!(
            serde_json::from_str::<Value>(&seen[0].3).unwrap(),
            serde_json::json!([{ "name": "weather", "description": "Current weather", "options": [], "type": 1 }])
        );
    }

    #[tokio::test]
    async fn edit_original_response_patches_content() {
        let (address, seen) = spawn_recorder(axum::http::StatusCode::OK, "{}").await;

        client(&format!("http://{address}"))
            .edit_original_response("tok", "It is 21 degrees")
            .await
            .expect("edit");

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].0, "PATCH");
        assert_eq!(seen[0].1, "/webhooks/42/tok/messages/@original");
        assert_eq!(seen[0].3, r#"{"content":"It is 21 degrees"}"#);
    }

    #[tokio::test]
    async fn error_status_carries_body_excerpt() {
        let (address, _) = spawn_recorder(axum::http::StatusCode::BAD_REQUEST, r#"{"message":"Invalid Form Body"}"#).await;

        let error = client(&format!("http://{address}"))
            .bulk_overwrite_commands(None, &[])
            .await
            .expect_err("400");

        match error {
            ApiError::Status { status, body, .. } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert!(body.contains("Invalid Form Body"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
