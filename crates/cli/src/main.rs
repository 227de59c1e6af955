mod config;
mod server;
mod signature;

use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use slashhook_api::DiscordClient;
use slashhook_engine::{InvocationOutcome, Pipeline};
use slashhook_registry::{ApplicationCommand, Catalog, lint};
use slashhook_types::Invocation;
use slashhook_util::HttpExecutor;

use crate::config::{AppConfig, CliCommand};
use crate::server::InteractionState;
use crate::signature::SignatureVerifier;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let config = AppConfig::parse();

    match config.command.clone().unwrap_or(CliCommand::Serve) {
        CliCommand::Serve => serve(&config).await,
        CliCommand::Register => {
            let catalog = load_catalog(&config)?;
            let definitions = compile_catalog(&catalog)?;
            register(&config, &discord_client(&config)?, &definitions).await
        }
        CliCommand::Validate => validate(&config),
        CliCommand::Invoke { name, args } => invoke(&config, name, args).await,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

fn load_catalog(config: &AppConfig) -> Result<Catalog> {
    let dir = config.config_dir();
    let catalog = Catalog::load_dir(&dir).with_context(|| format!("could not load commands from {}", dir.display()))?;
    info!(dir = %dir.display(), count = catalog.len(), "loaded command catalog");
    Ok(catalog)
}

/// Compiles every command; any failure stops startup before registration.
fn compile_catalog(catalog: &Catalog) -> Result<Vec<ApplicationCommand>> {
    let definitions = catalog.compile_all().context("could not compile commands")?;
    for definition in &definitions {
        for problem in lint(definition) {
            warn!(command = %definition.name, problem = %problem, "command may be rejected by Discord");
        }
    }
    Ok(definitions)
}

fn discord_client(config: &AppConfig) -> Result<DiscordClient> {
    let client = DiscordClient::new(
        &config.api_base,
        config.require_application_id()?,
        config.require_token()?,
        config.request_timeout(),
    )?;
    Ok(client)
}

async fn register(config: &AppConfig, discord: &DiscordClient, definitions: &[ApplicationCommand]) -> Result<()> {
    let count = discord
        .bulk_overwrite_commands(config.guild_id.as_deref(), definitions)
        .await
        .context("could not register commands")?;
    info!(count, guild = config.guild_id.as_deref().unwrap_or("global"), "commands registered");
    Ok(())
}

fn pipeline(config: &AppConfig, catalog: Catalog) -> Result<Pipeline> {
    let transport = HttpExecutor::new(config.request_timeout())?;
    Ok(Pipeline::new(Arc::new(catalog), Arc::new(transport)))
}

async fn serve(config: &AppConfig) -> Result<()> {
    let verifier = SignatureVerifier::from_hex(config.require_public_key()?).context("invalid public key")?;
    let catalog = load_catalog(config)?;
    let definitions = compile_catalog(&catalog)?;
    let discord = discord_client(config)?;
    register(config, &discord, &definitions).await?;

    let state = InteractionState {
        pipeline: pipeline(config, catalog)?,
        discord,
        verifier,
    };
    server::serve(config.bind_address, state).await
}

fn validate(config: &AppConfig) -> Result<()> {
    let catalog = load_catalog(config)?;
    let definitions = compile_catalog(&catalog)?;
    println!("{}", serde_json::to_string_pretty(&definitions)?);
    Ok(())
}

async fn invoke(config: &AppConfig, name: String, args: Vec<(String, Value)>) -> Result<()> {
    let catalog = load_catalog(config)?;
    let pipeline = pipeline(config, catalog)?;
    let outcome = pipeline.handle(Invocation::new(name, args.into_iter().collect())).await;
    println!("{}", outcome.reply_text());

    match outcome {
        InvocationOutcome::Rendered(_) => Ok(()),
        InvocationOutcome::NotFound { name } => bail!("no command named '{name}'"),
        InvocationOutcome::Failed { command, error } => Err(anyhow!(error).context(format!("command '{command}' failed"))),
    }
}
