use anyhow::Result;
use clap::Args;

use crate::{
    api::{ClientApi, PowerSignal},
    cli::common::{self, BulkArgs, CommandContext},
};

#[derive(Args, Debug, Clone)]
pub struct PowerAction {
    /// Power signal to send
    #[arg(value_enum)]
    pub signal: PowerSignal,
    #[command(flatten)]
    pub bulk: BulkArgs,
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

        common::report_bulk(ctx, action, &results, self.bulk.continue_on_error)?;
        Ok(())
    }
}

async fn send_power(api: ClientApi, id: String, signal: PowerSignal) -> Result<()> {
    api.send_power(&id, signal).await
}
