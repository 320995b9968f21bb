/// Client API commands.
use anyhow::Result;
use clap::{Args, Subcommand};

pub mod backup;
pub mod command;
pub mod power;

use crate::{api::ClientApi, cli::common::CommandContext};

/// Build the client API from config; only called once a command needs the network.
pub(crate) fn connect(ctx: &CommandContext) -> Result<ClientApi> {
    ClientApi::from_config(&ctx.config, &ctx.tokens)
}

#[derive(Args)]
pub struct ClientCommand {
    #[command(subcommand)]
    pub action: ClientAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ClientAction {
    /// Send a power signal (start, stop, restart, kill)
    Power(power::PowerAction),
    /// Send a console command
    Command(command::CommandAction),
    /// Manage backups
    Backup(backup::BackupCommand),
}

impl ClientCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        match &self.action {
            ClientAction::Power(action) => action.execute(ctx).await,
            ClientAction::Command(action) => action.execute(ctx).await,
            ClientAction::Backup(action) => action.execute(ctx).await,
        }
    }
}
