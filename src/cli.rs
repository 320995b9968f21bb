/// CLI interface and commands.

/// Common functions for CLI.
pub mod common;

/// Executor for parallel operations.
pub mod executor;

/// Client API commands.
pub mod client;

/// Application API commands.
pub mod admin;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pelicanctl", version)]
#[command(about = "🚀 Pelican panel CLI - control game servers in bulk through the client and application APIs")]
pub struct Cli {
    /// Config file (defaults to <config dir>/pelicanctl/config.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 🎮 Client API (power, console commands, backups)
    Client(client::ClientCommand),
    /// ⚙️  Application API (suspend, reinstall, health, backups)
    Admin(admin::AdminCommand),
}
