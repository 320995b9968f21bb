use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, FixedOffset};
use clap::Args;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::{
    api::ApplicationApi,
    cli::common::{self, BulkArgs, CommandContext},
    output::HealthRow,
    retry_operation,
};

type HealthStore = Arc<Mutex<HashMap<String, Value>>>;

#[derive(Args, Debug, Clone)]
pub struct HealthAction {
    #[command(flatten)]
    pub bulk: BulkArgs,
    /// Check for crashes since this time (RFC 3339)
    #[arg(long, value_parser = parse_since)]
    pub since: Option<DateTime<FixedOffset>>,
    /// Crash detection window in minutes (1-1440)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=1440))]
    pub window: Option<u32>,
}

fn parse_since(value: &str) -> Result<DateTime<FixedOffset>, String> {
    DateTime::parse_from_rfc3339(value)
        .map_err(|e| format!("invalid --since format, expected RFC 3339 ({})", e))
}

impl HealthAction {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let targets = common::resolve_targets(&self.bulk, || async {
            super::connect(ctx)?.list_servers().await
        })
        .await?;
        if !common::should_run(ctx, &self.bulk, "check health for", &targets)? {
            return Ok(());
        }

        let api = super::connect(ctx)?;
        if let [target] = targets.as_slice() {
            let health: Value = retry_operation!(
                self.bulk.max_retry,
                api.server_health(target, self.since, self.window).await,
                target
            )?;
            return ctx.output.print_value(&health);
        }

        let store: HealthStore = Arc::new(Mutex::new(HashMap::new()));
        let results = {
            let store = Arc::clone(&store);
            let (since, window) = (self.since, self.window);
            common::run_bulk(ctx, &self.bulk, "health", targets, move |id| {
                check_health(api.clone(), Arc::clone(&store), id, since, window)
            })
            .await
        };

        let health = store.lock().await;
        let rows: Vec<HealthRow> = results
            .iter()
            .map(|result| HealthRow {
                server: result.id().to_string(),
                health: match &result.error {
                    Some(err) => Err(format!("{:#}", err)),
                    None => Ok(health.get(result.id()).cloned().unwrap_or(Value::Null)),
                },
            })
            .collect();

        // Per-server failures are reported, never fatal.
        ctx.output.health_report(&rows)
    }
}

async fn check_health(
    api: ApplicationApi,
    store: HealthStore,
    id: String,
    since: Option<DateTime<FixedOffset>>,
    window: Option<u32>,
) -> Result<()> {
    let health = api.server_health(&id, since, window).await?;
    store.lock().await.insert(id, health);
    Ok(())
}
