use anyhow::Result;
use clap::{Args, Subcommand};
use log::info;

use crate::{
    api::ClientApi,
    cli::common::{self, BulkArgs, CommandContext},
};

#[derive(Args, Debug, Clone)]
pub struct BackupCommand {
    #[command(subcommand)]
    pub action: BackupAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum BackupAction {
    /// Create a backup on each server
    Create(CreateBackupAction),
}

#[derive(Args, Debug, Clone)]
pub struct CreateBackupAction {
    #[command(flatten)]
    pub bulk: BulkArgs,
}

impl BackupCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        match &self.action {
            BackupAction::Create(action) => action.execute(ctx).await,
        }
    }
}

impl CreateBackupAction {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let targets = common::resolve_targets(&self.bulk, || async {
            super::connect(ctx)?.list_servers().await
        })
        .await?;
        if !common::should_run(ctx, &self.bulk, "create backups for", &targets)? {
            return Ok(());
        }

        let api = super::connect(ctx)?;
        let results = common::run_bulk(ctx, &self.bulk, "backup", targets, move |id| {
            create_backup(api.clone(), id)
        })
        .await;

        // Backup creation fails the command on any error.
        common::report_bulk(ctx, "backup created", &results, false)?;
        Ok(())
    }
}

async fn create_backup(api: ClientApi, id: String) -> Result<()> {
    let backup = api.create_backup(&id).await?;
    info!(
        "{}: backup {} created",
        id,
        backup.uuid.as_deref().unwrap_or("<unknown>")
    );
    Ok(())
}
