use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Args;

use crate::{
    api::ClientApi,
    cli::common::{self, BulkArgs, CommandContext},
};

#[derive(Args, Debug, Clone)]
pub struct CommandAction {
    /// Console command to send
    #[arg(long)]
    pub command: String,
    #[command(flatten)]
    pub bulk: BulkArgs,
}

impl CommandAction {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        if self.command.trim().is_empty() {
            bail!("--command must not be empty");
        }

        let targets = common::resolve_targets(&self.bulk, || async {
            super::connect(ctx)?.list_servers().await
        })
        .await?;
        let action = "send command to";
        if !common::should_run(ctx, &self.bulk, action, &targets)? {
            return Ok(());
        }

        let api = super::connect(ctx)?;
        let command: Arc<str> = Arc::from(self.command.as_str());
        let results = common::run_bulk(ctx, &self.bulk, "command", targets, move |id| {
            send_command(api.clone(), id, Arc::clone(&command))
        })
        .await;

        common::report_bulk(ctx, "command sent", &results, self.bulk.continue_on_error)?;
        Ok(())
    }
}

async fn send_command(api: ClientApi, id: String, command: Arc<str>) -> Result<()> {
    api.send_command(&id, &command).await
}
