//! Interaction payloads exchanged with the Discord interactions endpoint.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::InvocationArguments;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum InteractionType {
    Ping,
    ApplicationCommand,
    Other(u8),
}

impl From<u8> for InteractionType {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Ping,
            2 => Self::ApplicationCommand,
            other => Self::Other(other),
        }
    }
}

impl From<InteractionType> for u8 {
    fn from(value: InteractionType) -> Self {
        match value {
            InteractionType::Ping => 1,
            InteractionType::ApplicationCommand => 2,
            InteractionType::Other(other) => other,
        }
    }
}

/// An argument value supplied by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionOption {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionData {
    pub name: String,
    #[serde(default)]
    pub options: Vec<InteractionOption>,
}

/// Incoming interaction delivered by Discord.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub application_id: String,
    #[serde(rename = "type")]
    pub kind: InteractionType,
    /// Continuation token used to edit the deferred reply
    #[serde(default)]
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<InteractionData>,
}

impl Interaction {
    /// Extracts the command invocation carried by an application command interaction.
    pub fn invocation(&self) -> Option<Invocation> {
        if self.kind != InteractionType::ApplicationCommand {
            return None;
        }
        let data = self.data.as_ref()?;
        Some(Invocation::from(data))
    }
}

/// One user-triggered run of a registered command.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Invocation {
    pub name: String,
    pub arguments: InvocationArguments,
}

impl Invocation {
    pub fn new(name: impl Into<String>, arguments: InvocationArguments) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

impl From<&InteractionData> for Invocation {
    fn from(data: &InteractionData) -> Self {
        let arguments = data
            .options
            .iter()
            .filter_map(|option| option.value.clone().map(|value| (option.name.clone(), value)))
            .collect();
        Self {
            name: data.name.clone(),
            arguments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionCallbackData {
    pub content: String,
}

/// Synchronous response to an interaction webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionCallback {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<InteractionCallbackData>,
}

impl InteractionCallback {
    pub fn pong() -> Self {
        Self { kind: 1, data: None }
    }

    pub fn message(content: impl Into<String>) -> Self {
        Self {
            kind: 4,
            data: Some(InteractionCallbackData { content: content.into() }),
        }
    }

    /// Acknowledges the interaction; the reply is delivered later by editing it.
    pub fn deferred() -> Self {
        Self { kind: 5, data: None }
    }
}
