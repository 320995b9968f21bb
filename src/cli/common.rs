/// Common functions for CLI.
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use dialoguer::{theme::ColorfulTheme, Confirm};
use indicatif::ProgressBar;
use log::{debug, info};

use crate::{
    api::ServerRef,
    auth::TokenResolver,
    cli::executor::{
        summarize, Executor, ExecutorConfig, Operation, OperationResult, Summary,
        DEFAULT_MAX_CONCURRENCY,
    },
    config::Config,
    output::Formatter,
    retry_operation,
};

/// Everything a command handler needs besides its own arguments.
pub struct CommandContext {
    pub config: Config,
    pub tokens: TokenResolver,
    pub output: Formatter,
}

/// Target selection and execution policy shared by every bulk command.
#[derive(Args, Debug, Clone)]
pub struct BulkArgs {
    /// Server identifiers, space or comma separated
    #[arg(value_name = "SERVER")]
    pub servers: Vec<String>,
    /// Operate on every server visible to the API token
    #[arg(long)]
    pub all: bool,
    /// Read server identifiers from a file, one per line
    #[arg(long, value_name = "PATH")]
    pub from_file: Option<PathBuf>,
    /// Maximum parallel operations
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENCY as i64, allow_negative_numbers = true)]
    pub max_concurrency: i64,
    /// Do not fail the command when some operations fail
    #[arg(long)]
    pub continue_on_error: bool,
    /// Skip remaining operations after the first failure
    #[arg(long)]
    pub fail_fast: bool,
    /// List the affected servers without calling the API
    #[arg(long)]
    pub dry_run: bool,
    /// Skip confirmation prompts
    #[arg(short, long)]
    pub yes: bool,
    /// Maximum retry attempts for failed operations
    #[arg(long, default_value = "0")]
    pub max_retry: u32,
}

impl BulkArgs {
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig::new(self.max_concurrency, self.continue_on_error, self.fail_fast)
    }
}

/// Split positional arguments on commas and whitespace.
pub fn parse_target_args(args: &[String]) -> Vec<String> {
    args.iter()
        .flat_map(|arg| arg.split(|c: char| c == ',' || c.is_whitespace()))
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// One identifier per line; blank lines and `#` comments are ignored.
pub fn parse_target_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

pub fn read_targets_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read server list from {}", path.display()))?;
    Ok(parse_target_lines(&content))
}

/// Resolve the final target list: `--all`, then `--from-file`, then positionals.
pub async fn resolve_targets<F, Fut>(args: &BulkArgs, list_servers: F) -> Result<Vec<String>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<ServerRef>>>,
{
    let targets = if args.all {
        let servers = list_servers()
            .await
            .context("Failed to list servers for --all")?;
        let targets: Vec<String> = servers.iter().filter_map(ServerRef::selector).collect();
        if targets.is_empty() {
            bail!("no servers found");
        }
        targets
    } else if let Some(path) = &args.from_file {
        read_targets_file(path)?
    } else {
        parse_target_args(&args.servers)
    };

    if targets.is_empty() {
        return Err(anyhow!("no servers specified"));
    }
    Ok(targets)
}

pub fn needs_confirmation(action: &str, count: usize) -> bool {
    matches!(action, "kill" | "reinstall") || (action == "stop" && count > 1)
}

/// Ask before destructive actions unless `--yes` was given.
pub fn confirm(action: &str, count: usize, yes: bool) -> Result<bool> {
    if yes || !needs_confirmation(action, count) {
        return Ok(true);
    }

    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("This will {} {} server(s). Continue?", action, count))
        .default(false)
        .interact()
        .context("Failed to read confirmation")
}

/// Handle `--dry-run` and the confirmation prompt. Returns false when nothing should run.
pub fn should_run(ctx: &CommandContext, args: &BulkArgs, action: &str, targets: &[String]) -> Result<bool> {
    if args.dry_run {
        ctx.output.dry_run(action, targets)?;
        return Ok(false);
    }

    if !confirm(action, targets.len(), args.yes)? {
        ctx.output.print_info("Cancelled");
        return Ok(false);
    }
    Ok(true)
}

fn bulk_operation<F, Fut>(id: String, make: Arc<F>, max_retry: u32, pb: ProgressBar) -> Operation
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Operation::new(id.clone(), id.clone(), move || async move {
        let result: Result<()> = retry_operation!(max_retry, make(id.clone()).await, &id);
        if let Err(e) = &result {
            debug!("{}: {:#}", id, e);
        }
        pb.inc(1);
        result
    })
}

/// Run `make` for every target through the bulk executor.
pub async fn run_bulk<F, Fut>(
    ctx: &CommandContext,
    args: &BulkArgs,
    action: &str,
    targets: Vec<String>,
    make: F,
) -> Vec<OperationResult>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let executor = Executor::new(args.executor_config());
    info!(
        "Running {} on {} server(s), max concurrency {}",
        action,
        targets.len(),
        executor.config().max_concurrency()
    );

    let pb = ctx.output.progress(targets.len(), action);
    let make = Arc::new(make);
    let operations = targets
        .into_iter()
        .map(|id| bulk_operation(id, Arc::clone(&make), args.max_retry, pb.clone()))
        .collect();

    let results = executor.execute(operations).await;
    pb.finish_and_clear();
    results
}

/// Print the per-operation report and apply the fatal rule.
pub fn report_bulk(
    ctx: &CommandContext,
    action: &str,
    results: &[OperationResult],
    continue_on_error: bool,
) -> Result<Summary> {
    let summary = summarize(results);
    ctx.output.bulk_report(action, results, &summary)?;

    if summary.is_fatal(continue_on_error) {
        bail!("{} operation(s) failed", summary.failed);
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn bulk_args(servers: &[&str]) -> BulkArgs {
        BulkArgs {
            servers: servers.iter().map(|s| s.to_string()).collect(),
            all: false,
            from_file: None,
            max_concurrency: 10,
            continue_on_error: false,
            fail_fast: false,
            dry_run: false,
            yes: false,
            max_retry: 0,
        }
    }

    #[test]
    fn positional_targets_accept_commas_and_spaces() {
        let args = vec!["a,b".to_string(), " c ".to_string(), "d e,,".to_string()];
        assert_eq!(parse_target_args(&args), vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn target_file_skips_comments_and_blanks() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# production\n  1  \n\nabcd-ef01\n#2").unwrap();

        let targets = read_targets_file(file.path()).unwrap();
        assert_eq!(targets, vec!["1", "abcd-ef01"]);
    }

    #[tokio::test]
    async fn all_prefers_uuid_over_id() {
        let mut args = bulk_args(&["ignored"]);
        args.all = true;

        let targets = resolve_targets(&args, || async {
            Ok(vec![
                ServerRef {
                    id: Some(1),
                    uuid: Some("uuid-1".into()),
                    ..Default::default()
                },
                ServerRef {
                    id: Some(2),
                    ..Default::default()
                },
            ])
        })
        .await
        .unwrap();

        assert_eq!(targets, vec!["uuid-1", "2"]);
    }

    #[tokio::test]
    async fn empty_selection_is_an_error() {
        let err = resolve_targets(&bulk_args(&[" , "]), || async { Ok(Vec::new()) })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "no servers specified");
    }

    #[test]
    fn destructive_actions_need_confirmation() {
        assert!(needs_confirmation("kill", 1));
        assert!(needs_confirmation("reinstall", 1));
        assert!(needs_confirmation("stop", 2));
        assert!(!needs_confirmation("stop", 1));
        assert!(!needs_confirmation("start", 5));
        assert!(confirm("kill", 3, true).unwrap());
    }

    #[test]
    fn non_positive_concurrency_falls_back_to_default() {
        let mut args = bulk_args(&[]);
        args.max_concurrency = -3;
        assert_eq!(args.executor_config().max_concurrency(), DEFAULT_MAX_CONCURRENCY);
    }
}
