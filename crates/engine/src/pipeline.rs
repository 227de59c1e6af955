//! Invocation pipeline: look up, bind, execute and render one slash command.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info, warn};

use slashhook_registry::Catalog;
use slashhook_types::Invocation;
use slashhook_util::{Transport, TransportError, truncate_chars};

use crate::binder::{BindError, bind};
use crate::renderer::{RenderError, render};

/// Reply sent when no command with the invoked name exists.
pub const COMMAND_NOT_FOUND_REPLY: &str = "Could not find command";

/// Discord's message content limit, in characters.
pub const MAX_REPLY_CHARS: usize = 2000;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Bind(#[from] BindError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl PipelineError {
    /// Short cause suitable for showing to the invoking user.
    pub fn short_cause(&self) -> &'static str {
        match self {
            PipelineError::Bind(BindError::MissingQueryValue { .. }) => "a required argument was missing",
            PipelineError::Bind(_) => "the command is misconfigured",
            PipelineError::Transport(TransportError::Timeout { .. }) => "the upstream request timed out",
            PipelineError::Transport(_) => "the upstream request failed",
            PipelineError::Render(_) => "the response could not be rendered",
        }
    }
}

#[derive(Debug)]
pub enum InvocationOutcome {
    Rendered(String),
    NotFound { name: String },
    Failed { command: String, error: PipelineError },
}

impl InvocationOutcome {
    /// Text delivered back to the chat channel, capped at [`MAX_REPLY_CHARS`].
    pub fn reply_text(&self) -> String {
        let text = match self {
            InvocationOutcome::Rendered(text) => text.clone(),
            InvocationOutcome::NotFound { .. } => COMMAND_NOT_FOUND_REPLY.to_string(),
            InvocationOutcome::Failed { command, error } => {
                format!("Command `{command}` failed: {}.", error.short_cause())
            }
        };
        truncate_chars(&text, MAX_REPLY_CHARS)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, InvocationOutcome::Rendered(_))
    }
}

/// Shared, read-only state needed to serve invocations concurrently.
#[derive(Clone)]
pub struct Pipeline {
    catalog: Arc<Catalog>,
    transport: Arc<dyn Transport>,
}

impl Pipeline {
    pub fn new(catalog: Arc<Catalog>, transport: Arc<dyn Transport>) -> Self {
        Self { catalog, transport }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub async fn handle(&self, invocation: Invocation) -> InvocationOutcome {
        let Some(command) = self.catalog.find_by_name(&invocation.name) else {
            warn!(command = %invocation.name, "invocation for unknown command");
            return InvocationOutcome::NotFound { name: invocation.name };
        };

        let start = Instant::now();
        debug!(command = %command.name, argument_count = invocation.arguments.len(), "handling invocation");

        match self.run(command, &invocation).await {
            Ok(text) => {
                info!(
                    command = %command.name,
                    duration_ms = start.elapsed().as_millis(),
                    reply_len = text.chars().count(),
                    "invocation completed"
                );
                InvocationOutcome::Rendered(text)
            }
            Err(error) => {
                warn!(
                    command = %command.name,
                    duration_ms = start.elapsed().as_millis(),
                    error = %error,
                    "invocation failed"
                );
                InvocationOutcome::Failed {
                    command: command.name.clone(),
                    error,
                }
            }
        }
    }

    async fn run(&self, command: &slashhook_types::Command, invocation: &Invocation) -> Result<String, PipelineError> {
        let request = bind(command, &invocation.arguments)?;
        let response = self.transport.execute(request).await?;
        Ok(render(command, &response.body)?)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline").field("commands", &self.catalog.len()).finish_non_exhaustive()
    }
}
