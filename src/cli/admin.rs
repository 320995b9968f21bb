/// Application API commands.
use anyhow::Result;
use clap::{Args, Subcommand};

pub mod backup;
pub mod health;
pub mod server;

use crate::{api::ApplicationApi, cli::common::CommandContext};

/// Build the application API from config; only called once a command needs the network.
pub(crate) fn connect(ctx: &CommandContext) -> Result<ApplicationApi> {
    ApplicationApi::from_config(&ctx.config, &ctx.tokens)
}

#[derive(Args)]
pub struct AdminCommand {
    #[command(subcommand)]
    pub action: AdminAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum AdminAction {
    /// Manage servers
    Server(server::ServerCommand),
}

impl AdminCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        match &self.action {
            AdminAction::Server(command) => command.execute(ctx).await,
        }
    }
}
