use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Subcommand};
use tokio::sync::Mutex;

use crate::{
    api::{ApplicationApi, BackupRequest},
    cli::{
        common::{self, BulkArgs, CommandContext},
        executor::OperationResult,
    },
};

type BackupStore = Arc<Mutex<HashMap<String, String>>>;

#[derive(Args, Debug, Clone)]
pub struct BackupCommand {
    #[command(subcommand)]
    pub action: BackupAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum BackupAction {
    /// Create a backup on each server
    Create(CreateBackupAction),
    /// View backups by server and backup pairs
    View(ViewBackupAction),
}

#[derive(Args, Debug, Clone)]
pub struct CreateBackupAction {
    #[command(flatten)]
    pub bulk: BulkArgs,
    /// Backup name
    #[arg(long)]
    pub name: Option<String>,
    /// Comma-separated files or patterns to exclude
    #[arg(long, value_delimiter = ',')]
    pub ignore: Vec<String>,
    /// File with ignore patterns, one per line (overrides --ignore)
    #[arg(long, value_name = "PATH")]
    pub ignore_file: Option<PathBuf>,
    /// Lock the backup after creation
    #[arg(long)]
    pub locked: bool,
    /// Save server-id,backup-uuid pairs to this file
    #[arg(long, value_name = "PATH")]
    pub save_pairs: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ViewBackupAction {
    /// Alternating server identifiers and backup UUIDs
    #[arg(value_name = "SERVER BACKUP", conflicts_with = "from_file")]
    pub pairs: Vec<String>,
    /// File of server-id,backup-uuid lines, as written by --save-pairs
    #[arg(long, value_name = "PATH")]
    pub from_file: Option<PathBuf>,
}

impl BackupCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        match &self.action {
            BackupAction::Create(action) => action.execute(ctx).await,
            BackupAction::View(action) => action.execute(ctx).await,
        }
    }
}

impl CreateBackupAction {
    pub fn request(&self) -> Result<BackupRequest> {
        let patterns = match &self.ignore_file {
            Some(path) => {
                let content = fs::read_to_string(path).with_context(|| {
                    format!("Failed to read ignore file {}", path.display())
                })?;
                ignore_patterns(content.lines())
            }
            None => ignore_patterns(self.ignore.iter().map(String::as_str)),
        };

        Ok(BackupRequest {
            name: self.name.clone().filter(|name| !name.trim().is_empty()),
            ignored: (!patterns.is_empty()).then_some(patterns),
            is_locked: self.locked,
        })
    }

    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let request = Arc::new(self.request()?);
        let targets = common::resolve_targets(&self.bulk, || async {
            super::connect(ctx)?.list_servers().await
        })
        .await?;
        if !common::should_run(ctx, &self.bulk, "create backups for", &targets)? {
            return Ok(());
        }

        let api = super::connect(ctx)?;
        let store: BackupStore = Arc::new(Mutex::new(HashMap::new()));
        let results = {
            let store = Arc::clone(&store);
            common::run_bulk(ctx, &self.bulk, "backup", targets, move |id| {
                create_backup(api.clone(), Arc::clone(&request), Arc::clone(&store), id)
            })
            .await
        };

        if let Some(path) = &self.save_pairs {
            let pairs = backup_pairs(&results, &*store.lock().await);
            if !pairs.is_empty() {
                match write_pairs(path, &pairs) {
                    Ok(()) => ctx.output.print_success(&format!(
                        "Saved {} server+backup pairs to {}",
                        pairs.len(),
                        path.display()
                    )),
                    Err(e) => ctx
                        .output
                        .print_error(&format!("Failed to save pairs to file: {:#}", e)),
                }
            }
        }

        // Backup creation fails the command on any error.
        common::report_bulk(ctx, "backup created", &results, false)?;
        Ok(())
    }
}

impl ViewBackupAction {
    pub fn pairs(&self) -> Result<Vec<(String, String)>> {
        let pairs = match &self.from_file {
            Some(path) => read_pairs(path)?,
            None => pairs_from_args(&self.pairs)?,
        };
        if pairs.is_empty() {
            bail!("no backup pairs specified");
        }
        Ok(pairs)
    }

    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let pairs = self.pairs()?;
        let api = super::connect(ctx)?;

        let mut backups = Vec::with_capacity(pairs.len());
        for (server, backup) in &pairs {
            match api.get_backup(server, backup).await {
                Ok(found) => backups.push(found),
                Err(e) => ctx
                    .output
                    .print_error(&format!("{}/{}: {:#}", server, backup, e)),
            }
        }

        if backups.is_empty() {
            bail!("no backups found");
        }
        ctx.output.backup_report(&backups)
    }
}

fn pairs_from_args(args: &[String]) -> Result<Vec<(String, String)>> {
    if args.len() % 2 != 0 {
        bail!("requires server+backup pairs (even number of arguments)");
    }
    Ok(args
        .chunks_exact(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect())
}

fn read_pairs(path: &Path) -> Result<Vec<(String, String)>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read pairs file {}", path.display()))?;
    parse_pairs(&content)
}

/// `server-id,backup-uuid` per line; blank lines and `#` comments are skipped.
fn parse_pairs(content: &str) -> Result<Vec<(String, String)>> {
    content
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(number, line)| match line.split_once(',') {
            Some((server, backup)) if !backup.contains(',') => {
                Ok((server.trim().to_string(), backup.trim().to_string()))
            }
            _ => Err(anyhow!(
                "line {}: expected format 'server-id,backup-uuid', got '{}'",
                number,
                line
            )),
        })
        .collect()
}

/// Trimmed, non-empty patterns joined with newlines.
fn ignore_patterns<'a>(lines: impl Iterator<Item = &'a str>) -> String {
    lines
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

async fn create_backup(
    api: ApplicationApi,
    request: Arc<BackupRequest>,
    store: BackupStore,
    id: String,
) -> Result<()> {
    let backup = api.create_backup(&id, &request).await?;
    if let Some(uuid) = backup.uuid {
        store.lock().await.insert(id, uuid);
    }
    Ok(())
}

/// Pairs for successful creations, in input order.
fn backup_pairs(results: &[OperationResult], created: &HashMap<String, String>) -> Vec<(String, String)> {
    results
        .iter()
        .filter(|result| result.success())
        .filter_map(|result| {
            created
                .get(result.id())
                .map(|uuid| (result.id().to_string(), uuid.clone()))
        })
        .collect()
}

fn write_pairs(path: &Path, pairs: &[(String, String)]) -> Result<()> {
    let content = pairs
        .iter()
        .map(|(server, backup)| format!("{},{}", server, backup))
        .collect::<Vec<_>>()
        .join("\n");

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
