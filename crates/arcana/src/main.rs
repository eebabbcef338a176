// SPDX-FileCopyrightText: 2026 Arcana Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Arcana - a tarot-reading Telegram bot.
//!
//! Binary entry point: loads and validates configuration, sets up
//! tracing, wires the repositories, generation client, conversation
//! engine and Telegram transport together, and runs long polling until
//! interrupted.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use teloxide::Bot;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use arcana_config::ArcanaConfig;
use arcana_flow::{EngineConfig, FlowEngine};
use arcana_openai::ReadingClient;
use arcana_store::{ReadingRepo, UserRepo};
use arcana_telegram::TelegramPort;

/// Arcana - a tarot-reading Telegram bot.
#[derive(Parser, Debug)]
#[command(name = "arcana", version, about, long_about = None)]
struct Cli {
    /// Path to an explicit config file (default: arcana.toml hierarchy).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the bot (default).
    Serve,
    /// Load and validate the configuration, then exit.
    CheckConfig,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            for e in &errors {
                eprintln!("arcana: {e}");
            }
            std::process::exit(1);
        }
    };

    init_tracing(&config);

    match cli.command {
        Some(Commands::CheckConfig) => {
            info!("configuration is valid");
        }
        Some(Commands::Serve) | None => serve(config).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<ArcanaConfig, Vec<arcana_config::ConfigError>> {
    match path {
        Some(path) => match arcana_config::load_config_from_path(path) {
            Ok(config) => {
                arcana_config::validate_config(&config)?;
                Ok(config)
            }
            Err(err) => Err(err
                .into_iter()
                .map(|e| arcana_config::ConfigError {
                    message: e.to_string(),
                })
                .collect()),
        },
        None => arcana_config::load_and_validate(),
    }
}

fn init_tracing(config: &ArcanaConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn serve(config: ArcanaConfig) {
    let Some(token) = config.bot.token.clone().filter(|t| !t.is_empty()) else {
        error!("bot.token is required to serve (set ARCANA_BOT_TOKEN or [bot] token)");
        std::process::exit(1);
    };

    let data_dir = PathBuf::from(&config.storage.data_dir);
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        error!(path = %data_dir.display(), error = %e, "failed to create data directory");
        std::process::exit(1);
    }

    let client = match ReadingClient::new(&config.openai) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "failed to initialize the generation client");
            std::process::exit(1);
        }
    };

    let bot = Bot::new(token);
    let engine = Arc::new(FlowEngine::new(
        EngineConfig::from_app(&config),
        UserRepo::new(&data_dir),
        ReadingRepo::new(&data_dir),
        Arc::new(client),
        Arc::new(TelegramPort::new(bot.clone())),
    ));

    info!(
        data_dir = %data_dir.display(),
        free_test_limit = config.limits.free_test_limit,
        "arcana starting"
    );
    arcana_telegram::run_polling(bot, engine).await;
    info!("arcana stopped");
}
