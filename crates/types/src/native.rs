//! Discord application command shapes.
//!
//! These mirror the JSON accepted by the bulk-overwrite endpoint for
//! `CHAT_INPUT` commands.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `CHAT_INPUT` application command type.
pub const CHAT_INPUT_COMMAND: u8 = 1;

/// Native option kind, serialized as Discord's numeric option type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum CommandOptionType {
    String,
    Integer,
    Boolean,
}

impl From<CommandOptionType> for u8 {
    fn from(value: CommandOptionType) -> Self {
        match value {
            CommandOptionType::String => 3,
            CommandOptionType::Integer => 4,
            CommandOptionType::Boolean => 5,
        }
    }
}

impl TryFrom<u8> for CommandOptionType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            3 => Ok(Self::String),
            4 => Ok(Self::Integer),
            5 => Ok(Self::Boolean),
            other => Err(format!("unsupported application command option type: {other}")),
        }
    }
}

/// One fixed choice offered for an option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOptionChoice {
    pub name: String,
    pub value: Value,
}

/// A typed option of a native command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationCommandOption {
    #[serde(rename = "type")]
    pub kind: CommandOptionType,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<CommandOptionChoice>>,
}

/// A registrable slash command definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationCommand {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub options: Vec<ApplicationCommandOption>,
    #[serde(rename = "type", default = "chat_input_command")]
    pub kind: u8,
}

fn chat_input_command() -> u8 {
    CHAT_INPUT_COMMAND
}
