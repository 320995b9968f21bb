use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};

/// Concurrency used when the configured value is zero or negative.
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

type ActionFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;
type Action = Box<dyn FnOnce() -> ActionFuture + Send>;

/// Identifier and display label of a bulk target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub id: String,
    pub name: String,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.id == self.name {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{} ({})", self.name, self.id)
        }
    }
}

/// One unit of bulk work: a target plus the action to run against it.
pub struct Operation {
    target: Target,
    action: Action,
}

impl Operation {
    pub fn new<F, Fut>(id: impl Into<String>, name: impl Into<String>, action: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            target: Target {
                id: id.into(),
                name: name.into(),
            },
            action: Box::new(move || Box::pin(action())),
        }
    }

    pub fn id(&self) -> &str {
        &self.target.id
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("id", &self.target.id)
            .field("name", &self.target.name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    /// The action ran and returned an error.
    #[error(transparent)]
    Failed(anyhow::Error),
    /// The action never ran because fail-fast observed an earlier failure.
    #[error("skipped due to previous error")]
    Skipped,
}

/// Outcome of a single operation, index-aligned with the submitted list.
#[derive(Debug)]
pub struct OperationResult {
    pub target: Target,
    pub error: Option<OperationError>,
}

impl OperationResult {
    fn succeeded(target: Target) -> Self {
        Self {
            target,
            error: None,
        }
    }

    fn failed(target: Target, error: anyhow::Error) -> Self {
        Self {
            target,
            error: Some(OperationError::Failed(error)),
        }
    }

    fn skipped(target: Target) -> Self {
        Self {
            target,
            error: Some(OperationError::Skipped),
        }
    }

    pub fn id(&self) -> &str {
        &self.target.id
    }

    pub fn success(&self) -> bool {
        self.error.is_none()
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.error, Some(OperationError::Skipped))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorConfig {
    max_concurrency: usize,
    pub continue_on_error: bool,
    pub fail_fast: bool,
}

impl ExecutorConfig {
    /// Build a policy, coercing a non-positive concurrency to the default.
    pub fn new(max_concurrency: i64, continue_on_error: bool, fail_fast: bool) -> Self {
        let max_concurrency = match usize::try_from(max_concurrency) {
            Ok(n) if n > 0 => n,
            _ => DEFAULT_MAX_CONCURRENCY,
        };

        Self {
            max_concurrency,
            continue_on_error,
            fail_fast,
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENCY as i64, false, false)
    }
}

/// Runs operations with bounded parallelism and collects one result per operation.
#[derive(Debug, Clone)]
pub struct Executor {
    config: ExecutorConfig,
}

impl Executor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute all operations and return their results in input order.
    ///
    /// Submission waits for a free slot before spawning each operation, so with
    /// `fail_fast` the failure check runs against every operation that finished
    /// while we were waiting. Operations already running are never cancelled.
    pub async fn execute(&self, operations: Vec<Operation>) -> Vec<OperationResult> {
        let total = operations.len();
        if total == 0 {
            return Vec::new();
        }

        let targets: Vec<Target> = operations.iter().map(|op| op.target.clone()).collect();
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let has_failed = Arc::new(AtomicBool::new(false));
        let slots: Arc<Mutex<Vec<Option<OperationResult>>>> =
            Arc::new(Mutex::new((0..total).map(|_| None).collect()));

        let mut handles = Vec::with_capacity(total);
        let mut pending = operations.into_iter().enumerate();

        while let Some((idx, operation)) = pending.next() {
            if self.config.fail_fast && has_failed.load(Ordering::SeqCst) {
                skip_remaining(&slots, idx, operation, pending).await;
                break;
            }

            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    skip_remaining(&slots, idx, operation, pending).await;
                    break;
                }
            };

            // The slot may have been freed by a failing operation.
            if self.config.fail_fast && has_failed.load(Ordering::SeqCst) {
                drop(permit);
                skip_remaining(&slots, idx, operation, pending).await;
                break;
            }

            let mut guard = TaskGuard {
                has_failed: Arc::clone(&has_failed),
                succeeded: false,
                _permit: permit,
            };
            let task_slots = Arc::clone(&slots);
            let Operation { target, action } = operation;

            let handle = tokio::spawn(async move {
                let result = match action().await {
                    Ok(()) => {
                        guard.succeeded = true;
                        OperationResult::succeeded(target)
                    }
                    Err(e) => OperationResult::failed(target, e),
                };
                task_slots.lock().await[idx] = Some(result);
                drop(guard);
            });
            handles.push((idx, handle));
        }

        for (idx, handle) in handles {
            if let Err(e) = handle.await {
                slots.lock().await[idx] = Some(OperationResult::failed(
                    targets[idx].clone(),
                    anyhow!("operation aborted: {}", e),
                ));
            }
        }

        let mut slots = slots.lock().await;
        slots
            .drain(..)
            .zip(targets)
            .map(|(slot, target)| {
                slot.unwrap_or_else(|| {
                    OperationResult::failed(target, anyhow!("operation produced no result"))
                })
            })
            .collect()
    }
}

/// Owns a task's concurrency slot. Unless the action succeeded, marks the batch as
/// failed before the slot is released, including when the action panics.
struct TaskGuard {
    has_failed: Arc<AtomicBool>,
    succeeded: bool,
    _permit: OwnedSemaphorePermit,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if !self.succeeded {
            self.has_failed.store(true, Ordering::SeqCst);
        }
    }
}

async fn skip_remaining(
    slots: &Mutex<Vec<Option<OperationResult>>>,
    idx: usize,
    operation: Operation,
    rest: impl Iterator<Item = (usize, Operation)>,
) {
    let mut slots = slots.lock().await;
    slots[idx] = Some(OperationResult::skipped(operation.target));
    for (idx, operation) in rest {
        slots[idx] = Some(OperationResult::skipped(operation.target));
    }
}

/// Aggregate counts over a result set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct Summary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl Summary {
    /// A batch is fatal iff something failed and the caller did not opt into continuing.
    pub fn is_fatal(&self, continue_on_error: bool) -> bool {
        self.failed > 0 && !continue_on_error
    }
}

pub fn summarize(results: &[OperationResult]) -> Summary {
    let succeeded = results.iter().filter(|r| r.success()).count();

    Summary {
        total: results.len(),
        succeeded,
        failed: results.len() - succeeded,
    }
}
