//! Command-line interface definitions.

pub mod check;
pub mod output;
pub mod run;
pub mod say;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Tyggbot - Twitch chat bot connection pools.
#[derive(Parser, Debug)]
#[command(name = "tyggbot")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connect to chat and keep the pools running until Ctrl-C
    Run(RunArgs),

    /// Send one message to the configured channel and exit
    Say(SayArgs),

    /// Run diagnostic checks
    #[command(subcommand)]
    Check(CheckCommand),
}

/// Subcommands for `tyggbot check`
#[derive(Subcommand, Debug)]
pub enum CheckCommand {
    /// Validate configuration file
    Config(ConfigPathArg),
    /// Query the server directory for chat and whisper servers
    Directory(ConfigPathArg),
}

/// Shared argument for commands that only need a config path.
#[derive(Parser, Debug)]
pub struct ConfigPathArg {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Override log level (debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Use JSON log format instead of pretty
    #[arg(long)]
    pub json_logs: bool,

    /// Override the target channel
    #[arg(long)]
    pub channel: Option<String>,
}

/// Arguments for the `say` subcommand.
#[derive(Parser, Debug)]
pub struct SayArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Send as a `/me` action
    #[arg(long)]
    pub me: bool,

    /// Message text
    #[arg(required = true)]
    pub message: Vec<String>,
}
