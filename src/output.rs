/// Terminal and JSON rendering of command results.
use std::io::IsTerminal;

use anyhow::{Context, Result};
use comfy_table::Table;
use crossterm::style::Stylize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde_json::{json, Map, Value};

use crate::cli::executor::{OperationResult, Summary};

const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Writes command output to stdout in the selected format.
#[derive(Debug, Clone, Copy)]
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    pub fn new(json: bool) -> Self {
        let format = if json {
            OutputFormat::Json
        } else {
            OutputFormat::Table
        };
        Self { format }
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    pub fn print_success(&self, message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    pub fn print_error(&self, message: &str) {
        println!("{} {}", "✗".red(), message);
    }

    pub fn print_info(&self, message: &str) {
        println!("{}", message);
    }

    pub fn print_json(&self, value: &Value) -> Result<()> {
        let rendered = serde_json::to_string_pretty(value).context("Failed to encode JSON output")?;
        println!("{}", rendered);
        Ok(())
    }

    /// Print a value as JSON, or as `key: value` lines in table mode.
    pub fn print_value(&self, value: &Value) -> Result<()> {
        match (self.format, value) {
            (OutputFormat::Table, Value::Object(map)) => {
                let mut table = Table::new();
                table.set_header(vec!["Key", "Value"]);
                for (key, value) in map {
                    table.add_row(vec![key.clone(), value_to_string(value)]);
                }
                println!("{table}");
                Ok(())
            }
            _ => self.print_json(value),
        }
    }

    /// Progress bar ticking once per completed operation; hidden for JSON or a non-terminal stderr.
    pub fn progress(&self, len: usize, action: &str) -> ProgressBar {
        if self.is_json() || !std::io::stderr().is_terminal() {
            return ProgressBar::with_draw_target(Some(len as u64), ProgressDrawTarget::hidden());
        }

        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message(action.to_string());
        pb
    }

    pub fn dry_run(&self, action: &str, targets: &[String]) -> Result<()> {
        if self.is_json() {
            return self.print_json(&json!({
                "dry_run": true,
                "action": action,
                "servers": targets,
            }));
        }

        self.print_info(&format!(
            "Dry run - would {} {} server(s):",
            action,
            targets.len()
        ));
        for target in targets {
            self.print_info(&format!("  - {}", target));
        }
        Ok(())
    }

    /// Per-operation lines in input order followed by the summary.
    pub fn bulk_report(&self, action: &str, results: &[OperationResult], summary: &Summary) -> Result<()> {
        if self.is_json() {
            return self.print_json(&bulk_report_json(results, summary));
        }

        for result in results {
            match &result.error {
                None => self.print_success(&format!("{}: {}", result.id(), action)),
                Some(err) => self.print_error(&format!("{}: {:#}", result.id(), err)),
            }
        }
        self.print_info(&format!(
            "Summary: {} succeeded, {} failed",
            summary.succeeded, summary.failed
        ));
        Ok(())
    }

    pub fn backup_report(&self, backups: &[Value]) -> Result<()> {
        if self.is_json() {
            return self.print_json(&Value::Array(backups.to_vec()));
        }

        println!("{}", backup_table(backups));
        Ok(())
    }

    pub fn health_report(&self, rows: &[HealthRow]) -> Result<()> {
        if self.is_json() {
            return self.print_json(&health_json(rows));
        }

        for row in rows {
            if let Err(err) = &row.health {
                self.print_error(&format!("{}: {}", row.server, err));
            }
        }
        println!("{}", health_table(rows));
        Ok(())
    }
}

pub fn bulk_report_json(results: &[OperationResult], summary: &Summary) -> Value {
    let results: Vec<Value> = results
        .iter()
        .map(|result| {
            let mut record = Map::new();
            record.insert("server_identifier".into(), json!(result.id()));
            match &result.error {
                None => {
                    record.insert("status".into(), json!("success"));
                }
                Some(err) => {
                    record.insert("status".into(), json!("error"));
                    record.insert("error".into(), json!(format!("{:#}", err)));
                }
            }
            Value::Object(record)
        })
        .collect();

    json!({
        "results": results,
        "summary": summary,
    })
}

/// One row per backup with its identity and state.
pub fn backup_table(backups: &[Value]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        "UUID",
        "Name",
        "Successful",
        "Locked",
        "Created At",
        "Completed At",
    ]);

    for backup in backups {
        table.add_row(vec![
            text_at(backup, &["uuid"]),
            text_at(backup, &["name"]),
            flag_at(backup, &["is_successful"]),
            flag_at(backup, &["is_locked"]),
            text_at(backup, &["created_at"]),
            text_at(backup, &["completed_at"]),
        ]);
    }
    table
}

/// Outcome of one health check, keyed by the identifier the user supplied.
#[derive(Debug, Clone)]
pub struct HealthRow {
    pub server: String,
    pub health: Result<Value, String>,
}

pub fn health_json(rows: &[HealthRow]) -> Value {
    let items = rows
        .iter()
        .map(|row| match &row.health {
            Ok(Value::Object(health)) => {
                let mut tagged = health.clone();
                tagged.insert("server_identifier".into(), json!(row.server));
                Value::Object(tagged)
            }
            Ok(other) => json!({"server_identifier": row.server, "health": other}),
            Err(err) => json!({"server_identifier": row.server, "error": err}),
        })
        .collect();
    Value::Array(items)
}

pub fn health_table(rows: &[HealthRow]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        "Server",
        "Name",
        "Container Status",
        "Healthy",
        "Crashed",
        "Checked At",
    ]);

    for row in rows {
        let cells = match &row.health {
            Ok(health) => vec![
                row.server.clone(),
                text_at(health, &["server", "name"]),
                text_at(health, &["container", "status"]),
                flag_at(health, &["container", "healthy"]),
                flag_at(health, &["crashed"]),
                text_at(health, &["checked_at"]),
            ],
            Err(_) => vec![
                row.server.clone(),
                String::new(),
                "error".to_string(),
                String::new(),
                String::new(),
                String::new(),
            ],
        };
        table.add_row(cells);
    }
    table
}

fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(key))
}

/// String at `path`, or `unknown`.
pub fn text_at(value: &Value, path: &[&str]) -> String {
    lookup(value, path)
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN)
        .to_string()
}

/// Boolean at `path` rendered as `true`/`false`, or `unknown`.
pub fn flag_at(value: &Value, path: &[&str]) -> String {
    match lookup(value, path).and_then(Value::as_bool) {
        Some(flag) => flag.to_string(),
        None => UNKNOWN.to_string(),
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::executor::{summarize, Executor, ExecutorConfig, Operation};

    #[tokio::test]
    async fn json_report_has_results_and_summary() {
        let operations = vec![
            Operation::new("srv-1", "srv-1", || async { Ok(()) }),
            Operation::new("srv-2", "srv-2", || async {
                Err(anyhow::anyhow!("Resource not found"))
            }),
        ];
        let results = Executor::new(ExecutorConfig::default())
            .execute(operations)
            .await;
        let report = bulk_report_json(&results, &summarize(&results));

        assert_eq!(
            report,
            json!({
                "results": [
                    {"server_identifier": "srv-1", "status": "success"},
                    {"server_identifier": "srv-2", "status": "error", "error": "Resource not found"}
                ],
                "summary": {"total": 2, "succeeded": 1, "failed": 1}
            })
        );
    }

    #[test]
    fn health_fields_default_to_unknown() {
        let health = json!({
            "server": {"name": "lobby"},
            "container": {"status": "running"},
            "crashed": false
        });

        assert_eq!(text_at(&health, &["server", "name"]), "lobby");
        assert_eq!(text_at(&health, &["container", "status"]), "running");
        assert_eq!(flag_at(&health, &["container", "healthy"]), "unknown");
        assert_eq!(flag_at(&health, &["crashed"]), "false");
        assert_eq!(text_at(&health, &["checked_at"]), "unknown");
    }

    #[test]
    fn backup_table_has_a_row_per_backup() {
        let backups = vec![
            json!({"uuid": "b-1", "name": "nightly", "is_successful": true, "is_locked": false}),
            json!({"uuid": "b-2"}),
        ];

        let rendered = backup_table(&backups).to_string();
        assert!(rendered.contains("nightly"));
        assert!(rendered.contains("b-2"));
        assert!(rendered.contains("unknown"));
    }

    #[test]
    fn health_json_tags_each_entry() {
        let rows = vec![
            HealthRow {
                server: "1".into(),
                health: Ok(json!({"crashed": true})),
            },
            HealthRow {
                server: "2".into(),
                health: Err("Resource not found: no server".into()),
            },
        ];

        assert_eq!(
            health_json(&rows),
            json!([
                {"crashed": true, "server_identifier": "1"},
                {"server_identifier": "2", "error": "Resource not found: no server"}
            ])
        );
    }
}
