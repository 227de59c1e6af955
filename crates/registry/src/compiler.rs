//! Translation of declarative commands into Discord application commands.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use slashhook_types::native::CHAT_INPUT_COMMAND;
use slashhook_types::{ApplicationCommand, ApplicationCommandOption, Command, CommandOptionChoice, CommandOptionType, Parameter, ParameterType};

use crate::CompileError;

const MAX_NAME_LENGTH: usize = 32;
const MAX_DESCRIPTION_LENGTH: usize = 100;
const MAX_OPTIONS: usize = 25;
const MAX_CHOICES: usize = 25;

static NAME_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-_\p{L}\p{N}]{1,32}$").expect("command name regex should compile"));

/// Builds the native definition for a single command.
///
/// Body, query and form parameters are flattened into one option list in
/// that order, so the chat client shows them without their provenance.
///
/// # Errors
///
/// Returns [`CompileError::UnrecognizedType`] when any parameter declares a
/// type other than string, integer or boolean. The whole command is rejected.
pub fn compile(command: &Command) -> Result<ApplicationCommand, CompileError> {
    let options = command
        .parameters()
        .map(|parameter| compile_option(command, parameter))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ApplicationCommand {
        name: command.name.clone(),
        description: command.description.clone(),
        options,
        kind: CHAT_INPUT_COMMAND,
    })
}

fn compile_option(command: &Command, parameter: &Parameter) -> Result<ApplicationCommandOption, CompileError> {
    let kind = match &parameter.r#type {
        ParameterType::String => CommandOptionType::String,
        ParameterType::Integer => CommandOptionType::Integer,
        ParameterType::Boolean => CommandOptionType::Boolean,
        ParameterType::Unrecognized(kind) => {
            return Err(CompileError::UnrecognizedType {
                command: command.name.clone(),
                parameter: parameter.name.clone(),
                kind: kind.clone(),
            });
        }
    };

    Ok(ApplicationCommandOption {
        kind,
        name: parameter.name.clone(),
        description: parameter.description.clone(),
        required: parameter.required,
        choices: build_choices(&parameter.options),
    })
}

fn build_choices(options: &[String]) -> Option<Vec<CommandOptionChoice>> {
    if options.is_empty() {
        return None;
    }
    let choices = options
        .iter()
        .map(|option| CommandOptionChoice {
            name: option.clone(),
            value: Value::String(option.clone()),
        })
        .collect();
    Some(choices)
}

/// Reports where a compiled command exceeds Discord's registration limits.
///
/// The findings are advisory; registration still decides what is accepted.
pub fn lint(command: &ApplicationCommand) -> Vec<String> {
    let mut findings = Vec::new();

    check_name(&mut findings, "command", &command.name);
    check_description(&mut findings, &format!("command '{}'", command.name), &command.description);
    if command.options.len() > MAX_OPTIONS {
        findings.push(format!(
            "command '{}' has {} options; at most {MAX_OPTIONS} are allowed",
            command.name,
            command.options.len()
        ));
    }

    let mut seen_optional = false;
    for option in &command.options {
        let subject = format!("option '{}' of command '{}'", option.name, command.name);
        check_name(&mut findings, "option", &option.name);
        check_description(&mut findings, &subject, &option.description);
        if let Some(choices) = &option.choices
            && choices.len() > MAX_CHOICES
        {
            findings.push(format!("{subject} has {} choices; at most {MAX_CHOICES} are allowed", choices.len()));
        }
        if option.required && seen_optional {
            findings.push(format!("{subject} is required but follows an optional option"));
        }
        seen_optional |= !option.required;
    }

    findings
}

fn check_name(findings: &mut Vec<String>, what: &str, name: &str) {
    if !NAME_REGEX.is_match(name) || name.chars().count() > MAX_NAME_LENGTH {
        findings.push(format!(
            "{what} name '{name}' must be 1-{MAX_NAME_LENGTH} letters, digits, '-' or '_'"
        ));
    } else if name.chars().any(char::is_uppercase) {
        findings.push(format!("{what} name '{name}' must be lowercase"));
    }
}

fn check_description(findings: &mut Vec<String>, subject: &str, description: &str) {
    let length = description.chars().count();
    if length == 0 || length > MAX_DESCRIPTION_LENGTH {
        findings.push(format!(
            "{subject} description must be 1-{MAX_DESCRIPTION_LENGTH} characters (has {length})"
        ));
    }
}
