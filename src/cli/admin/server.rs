use anyhow::Result;
use clap::{Args, Subcommand};

use super::{backup, health};
use crate::{
    api::{ApplicationApi, PowerSignal},
    cli::common::{self, BulkArgs, CommandContext},
};

#[derive(Args, Debug, Clone)]
pub struct ServerCommand {
    #[command(subcommand)]
    pub action: ServerAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ServerAction {
    /// Suspend servers
    Suspend(BulkArgs),
    /// Unsuspend servers
    Unsuspend(BulkArgs),
    /// Reinstall servers
    Reinstall(BulkArgs),
    /// Send a power signal (start, stop, restart, kill)
    Power(PowerAction),
    /// Container status and crash detection
    Health(health::HealthAction),
    /// Manage backups
    Backup(backup::BackupCommand),
}

#[derive(Args, Debug, Clone)]
pub struct PowerAction {
    /// Power signal to send
    #[arg(value_enum)]
    pub signal: PowerSignal,
    #[command(flatten)]
    pub bulk: BulkArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StateChange {
    Suspend,
    Unsuspend,
    Reinstall,
}

impl StateChange {
    fn as_str(&self) -> &'static str {
        match self {
            StateChange::Suspend => "suspend",
            StateChange::Unsuspend => "unsuspend",
            StateChange::Reinstall => "reinstall",
        }
    }

    fn past_tense(&self) -> &'static str {
        match self {
            StateChange::Suspend => "suspended",
            StateChange::Unsuspend => "unsuspended",
            StateChange::Reinstall => "reinstall started",
        }
    }
}

impl ServerCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        match &self.action {
            ServerAction::Suspend(bulk) => change_state(ctx, bulk, StateChange::Suspend).await,
            ServerAction::Unsuspend(bulk) => change_state(ctx, bulk, StateChange::Unsuspend).await,
            ServerAction::Reinstall(bulk) => change_state(ctx, bulk, StateChange::Reinstall).await,
            ServerAction::Power(action) => action.execute(ctx).await,
            ServerAction::Health(action) => action.execute(ctx).await,
            ServerAction::Backup(action) => action.execute(ctx).await,
        }
    }
}

async fn change_state(ctx: &CommandContext, bulk: &BulkArgs, change: StateChange) -> Result<()> {
    let targets = common::resolve_targets(bulk, || async {
        super::connect(ctx)?.list_servers().await
    })
    .await?;
    if !common::should_run(ctx, bulk, change.as_str(), &targets)? {
        return Ok(());
    }

    let api = super::connect(ctx)?;
    let results = common::run_bulk(ctx, bulk, change.as_str(), targets, move |id| {
        apply_state(api.clone(), id, change)
    })
    .await;

    // Administrative state changes fail the command on any error.
    common::report_bulk(ctx, change.past_tense(), &results, false)?;
    Ok(())
}

async fn apply_state(api: ApplicationApi, id: String, change: StateChange) -> Result<()> {
    match change {
        StateChange::Suspend => api.suspend(&id).await,
        StateChange::Unsuspend => api.unsuspend(&id).await,
        StateChange::Reinstall => api.reinstall(&id).await,
    }
}

impl PowerAction {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let targets = common::resolve_targets(&self.bulk, || async {
            super::connect(ctx)?.list_servers().await
        })
        .await?;
        let action = self.signal.as_str();
        if !common::should_run(ctx, &self.bulk, action, &targets)? {
            return Ok(());
        }

        let api = super::connect(ctx)?;
        let signal = self.signal;
        let results = common::run_bulk(ctx, &self.bulk, action, targets, move |id| {
            send_power(api.clone(), id, signal)
        })
        .await;

        common::report_bulk(ctx, action, &results, false)?;
        Ok(())
    }
}

async fn send_power(api: ApplicationApi, id: String, signal: PowerSignal) -> Result<()> {
    api.send_power(&id, signal).await
}
