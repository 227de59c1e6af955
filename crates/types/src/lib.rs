//! Shared type definitions for slashhook.
//!
//! The crate holds the declarative command model read from JSON
//! configuration, the native slash-command shapes registered with Discord,
//! and the interaction payloads delivered back when a user runs a command.

pub mod command;
pub mod interaction;
pub mod native;

pub use command::{Command, InvocationArguments, Parameter, ParameterType};
pub use interaction::{Interaction, InteractionCallback, InteractionCallbackData, InteractionData, InteractionOption, InteractionType, Invocation};
pub use native::{ApplicationCommand, ApplicationCommandOption, CommandOptionChoice, CommandOptionType};
