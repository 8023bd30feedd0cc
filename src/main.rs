//! Pigeon - a Matrix bot that relays anonymous notes.
//!
//! Pigeon joins rooms on invitation and lets any user pass an anonymous
//! note into one of those rooms, picked by numeric index. A per-user
//! cooldown keeps senders from flooding.
//!
//! # Bot commands
//!
//! Once running, users interact with the bot in any room it has joined:
//!
//! - `!relay rooms` - list the rooms notes can be delivered to, with their
//!   indices
//! - `!relay <room index> <message...>` - deliver the message to the chosen
//!   room as an anonymous note
//! - `!relay help` - show the usage message
//!
//! The bot answers every command with a notice: the room listing, the note
//! acceptance, the cooldown rejection, or the delivery failure. The sender
//! of a relayed note is never revealed in the target room.
//!
//! # Configuration
//!
//! Create a `config.yaml` file with the bot account settings:
//!
//! ```yaml
//! matrix:
//!   user_id: "@pigeon:example.com"
//!   password: "your-password"
//!   passphrase: "your-recovery-passphrase"
//!
//! relay:
//!   cooldown_secs: 60
//! ```
//!
//! Any value can be overridden with a `PIGEON_`-prefixed environment
//! variable:
//!
//! ```bash
//! export PIGEON_MATRIX__PASSWORD="secret-from-env"
//! ```
//!
//! # Usage
//!
//! ```bash
//! pigeon --config config.yaml --data ./pigeon-data
//! ```
//!
//! # Architecture
//!
//! - [`bot`] - wiring between the Matrix event stream and the relay feature
//! - [`commands`] - command parsing, execution and reply formatting
//! - [`config`] - YAML configuration with environment variable overrides
//! - [`matrix`] - Matrix client, session persistence and synchronization
//! - [`relay`] - room registry and per-user cooldown state
//!
//! # Environment variables
//!
//! - `RUST_LOG` - controls the logging level (default: `info`)

use clap::Parser;
use env_logger::Env;
use log::{error, info};

use crate::{bot::Bot, config::Config};

mod bot;
mod commands;
mod config;
mod matrix;
mod relay;

/// Command-line arguments for the Pigeon bot.
///
/// Most configuration lives in the YAML file (see [`config::Config`]); the
/// command line only locates that file and the data directory.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the YAML configuration file.
    ///
    /// Holds the Matrix account credentials and the relay settings. Values
    /// can be overridden with `PIGEON_`-prefixed environment variables.
    #[arg(short, long)]
    config: String,

    /// Path to the directory for storing persistent data.
    ///
    /// Contains the Matrix session (authentication tokens, encryption
    /// keys). Treat it like a credential: anyone with this directory and
    /// the passphrase can act as the bot.
    #[arg(short, long)]
    data: String,
}

/// Main entry point for the Pigeon bot.
///
/// Sets up logging, loads the configuration, connects to Matrix and runs
/// the sync loop until the process is terminated. Configuration and login
/// failures are logged and abort startup; anything later is handled per
/// command and never kills the process.
#[tokio::main]
async fn main() {
    // Put logger at info level by default
    let env = Env::default().filter_or("RUST_LOG", "info");
    env_logger::init_from_env(env);

    info!("Starting pigeon {}...", env!("CARGO_PKG_VERSION"));

    // Parse command line arguments
    let args = Args::parse();

    // Load configuration from YAML file with environment variable overrides
    let config: Config = match Config::load(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load config file: {}", e);
            return;
        }
    };

    // Launch bot
    let bot = match Bot::new(config, args).await {
        Ok(b) => b,
        Err(e) => {
            error!("Failed to initialize bot: {}", e);
            return;
        }
    };
    bot.start().await;
}
