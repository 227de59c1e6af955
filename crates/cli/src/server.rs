//! Interactions webhook endpoint.
//!
//! Discord posts every interaction to `POST /interactions`. Requests must carry a
//! valid Ed25519 signature. `PING` is answered inline; application commands are
//! acknowledged with a deferred reply and completed on a spawned task that edits
//! the original response.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use tracing::{debug, info, warn};

use slashhook_api::DiscordClient;
use slashhook_engine::Pipeline;
use slashhook_types::{Interaction, InteractionCallback, InteractionType, Invocation};

use crate::signature::{SIGNATURE_HEADER, SignatureVerifier, TIMESTAMP_HEADER};

/// Shared state for the interactions endpoint.
#[derive(Debug, Clone)]
pub struct InteractionState {
    pub pipeline: Pipeline,
    pub discord: DiscordClient,
    pub verifier: SignatureVerifier,
}

pub fn router(state: InteractionState) -> Router {
    Router::new()
        .route("/interactions", post(handle_interaction))
        .with_state(state)
}

/// Serves interactions on `bind_address` until Ctrl-C.
pub async fn serve(bind_address: SocketAddr, state: InteractionState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .with_context(|| format!("could not bind interactions endpoint to {bind_address}"))?;
    let bound_address = listener.local_addr()?;
    info!(address = %bound_address, "serving interactions");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await
        .context("interactions server failed")?;
    Ok(())
}

async fn handle_interaction(State(state): State<InteractionState>, headers: HeaderMap, body: Bytes) -> Response {
    let signature = header_text(&headers, SIGNATURE_HEADER);
    let timestamp = header_text(&headers, TIMESTAMP_HEADER);
    let (Some(signature), Some(timestamp)) = (signature, timestamp) else {
        warn!("interaction request without signature headers");
        return (StatusCode::UNAUTHORIZED, "missing request signature").into_response();
    };
    if !state.verifier.verify(timestamp, &body, signature) {
        warn!("interaction request with invalid signature");
        return (StatusCode::UNAUTHORIZED, "invalid request signature").into_response();
    }

    let interaction: Interaction = match serde_json::from_slice(&body) {
        Ok(interaction) => interaction,
        Err(error) => {
            warn!(error = %error, "malformed interaction payload");
            return (StatusCode::BAD_REQUEST, "malformed interaction").into_response();
        }
    };

    match interaction.kind {
        InteractionType::Ping => {
            debug!("answering ping");
            Json(InteractionCallback::pong()).into_response()
        }
        InteractionType::ApplicationCommand => {
            let Some(invocation) = interaction.invocation() else {
                warn!(interaction = %interaction.id, "application command without data");
                return (StatusCode::BAD_REQUEST, "missing command data").into_response();
            };
            debug!(interaction = %interaction.id, command = %invocation.name, "deferring application command");
            spawn_invocation(state, interaction.token, invocation);
            Json(InteractionCallback::deferred()).into_response()
        }
        InteractionType::Other(kind) => {
            debug!(kind, "ignoring unsupported interaction type");
            (StatusCode::BAD_REQUEST, "unsupported interaction type").into_response()
        }
    }
}

/// Runs the invocation off the request path and delivers exactly one reply.
fn spawn_invocation(state: InteractionState, token: String, invocation: Invocation) {
    tokio::spawn(async move {
        let command = invocation.name.clone();
        let outcome = state.pipeline.handle(invocation).await;
        let reply = outcome.reply_text();
        if let Err(error) = state.discord.edit_original_response(&token, &reply).await {
            warn!(command = %command, error = %error, "could not deliver interaction reply");
        }
    });
}

fn header_text<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
