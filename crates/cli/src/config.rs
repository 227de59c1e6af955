//! Bootstrap configuration assembled once from flags and the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use serde_json::Value;

use slashhook_api::DEFAULT_DISCORD_API_BASE;
use slashhook_util::expand_tilde;

#[derive(Debug, Clone, Parser)]
#[command(name = "slashhook", version, about = "Discord slash commands backed by declarative HTTP requests")]
pub struct AppConfig {
    /// Bot token used for command registration and reply delivery
    #[arg(long, env = "BOT_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Discord application id
    #[arg(long = "app", env = "APP_ID", global = true)]
    pub application_id: Option<String>,

    /// Register commands in this guild instead of globally
    #[arg(long = "guild", env = "GUILD_ID", global = true)]
    pub guild_id: Option<String>,

    /// Directory containing one JSON document per command
    #[arg(long, env = "CONFIG_DIR", default_value = "./config", global = true)]
    pub config_dir: String,

    /// Hex-encoded Ed25519 public key of the application
    #[arg(long, env = "DISCORD_PUBLIC_KEY", global = true)]
    pub public_key: Option<String>,

    /// Address the interactions endpoint listens on
    #[arg(long = "bind", env = "BIND_ADDRESS", default_value = "0.0.0.0:8080", global = true)]
    pub bind_address: SocketAddr,

    /// Limit for each outbound command request, in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 10, global = true)]
    pub request_timeout_secs: u64,

    /// Discord REST API base URL
    #[arg(long = "api-base", env = "DISCORD_API_BASE", default_value = DEFAULT_DISCORD_API_BASE, global = true)]
    pub api_base: String,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum CliCommand {
    /// Register the commands and serve interactions until interrupted (default)
    Serve,
    /// Register the commands and exit
    Register,
    /// Load and compile the commands, then print their native definitions
    Validate,
    /// Run one command locally and print the reply
    Invoke {
        /// Command name
        name: String,
        /// Argument as key=value; the value is parsed as JSON when possible
        #[arg(long = "arg", value_parser = parse_argument)]
        args: Vec<(String, Value)>,
    },
}

impl AppConfig {
    pub fn config_dir(&self) -> PathBuf {
        expand_tilde(&self.config_dir)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn require_token(&self) -> Result<&str> {
        required(self.token.as_deref(), "bot token", "--token", "BOT_TOKEN")
    }

    pub fn require_application_id(&self) -> Result<&str> {
        required(self.application_id.as_deref(), "application id", "--app", "APP_ID")
    }

    pub fn require_public_key(&self) -> Result<&str> {
        required(self.public_key.as_deref(), "public key", "--public-key", "DISCORD_PUBLIC_KEY")
    }
}

fn required<'a>(value: Option<&'a str>, what: &str, flag: &str, env: &str) -> Result<&'a str> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| anyhow!("missing {what}; pass {flag} or set {env}"))
}

/// Parses `key=value`; the value is JSON when it parses as such and a string otherwise.
fn parse_argument(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing argument name in '{raw}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ENV_KEYS: [&str; 8] = [
        "BOT_TOKEN",
        "APP_ID",
        "GUILD_ID",
        "CONFIG_DIR",
        "DISCORD_PUBLIC_KEY",
        "BIND_ADDRESS",
        "REQUEST_TIMEOUT_SECS",
        "DISCORD_API_BASE",
    ];

    fn cleared<F: FnOnce()>(overrides: &[(&str, &str)], test: F) {
        let vars: Vec<(&str, Option<&str>)> = ENV_KEYS
            .iter()
            .map(|key| (*key, overrides.iter().find(|(name, _)| name == key).map(|(_, value)| *value)))
            .collect();
        temp_env::with_vars(vars, test);
    }

    #[test]
    fn defaults_apply_without_flags_or_environment() {
        cleared(&[], || {
            let config = AppConfig::try_parse_from(["slashhook"]).expect("parse");
            assert_eq!(config.config_dir, "./config");
            assert_eq!(config.bind_address, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
            assert_eq!(config.request_timeout(), Duration::from_secs(10));
            assert_eq!(config.api_base, DEFAULT_DISCORD_API_BASE);
            assert!(config.command.is_none());
            assert!(config.require_token().is_err());
        });
    }

    #[test]
    fn environment_fills_unset_flags() {
        cleared(
            &[("BOT_TOKEN", "abc"), ("APP_ID", "42"), ("GUILD_ID", "7"), ("CONFIG_DIR", "/etc/slashhook")],
            || {
                let config = AppConfig::try_parse_from(["slashhook", "register"]).expect("parse");
                assert_eq!(config.require_token().unwrap(), "abc");
                assert_eq!(config.require_application_id().unwrap(), "42");
                assert_eq!(config.guild_id.as_deref(), Some("7"));
                assert_eq!(config.config_dir(), PathBuf::from("/etc/slashhook"));
                assert!(matches!(config.command, Some(CliCommand::Register)));
            },
        );
    }

    #[test]
    fn flags_override_environment() {
        cleared(&[("APP_ID", "42")], || {
            let config = AppConfig::try_parse_from(["slashhook", "--app", "99", "validate"]).expect("parse");
            assert_eq!(config.require_application_id().unwrap(), "99");
        });
    }

    #[test]
    fn invoke_arguments_parse_as_json_or_text() {
        cleared(&[], || {
            let config = AppConfig::try_parse_from([
                "slashhook",
                "invoke",
                "weather",
                "--arg",
                "city=New York",
                "--arg",
                "days=3",
                "--arg",
                "metric=true",
            ])
            .expect("parse");
            let Some(CliCommand::Invoke { name, args }) = config.command else {
                panic!("expected invoke");
            };
            assert_eq!(name, "weather");
            assert_eq!(
                args,
                vec![
                    ("city".to_string(), json!("New York")),
                    ("days".to_string(), json!(3)),
                    ("metric".to_string(), json!(true)),
                ]
            );
        });
    }

    #[test]
    fn malformed_arguments_are_rejected() {
        assert!(parse_argument("no-equals").is_err());
        assert!(parse_argument("=value").is_err());
        assert_eq!(parse_argument("k=").unwrap(), ("k".to_string(), json!("")));
    }
}
