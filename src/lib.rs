/// Configuration serialization and deserialization.
pub mod config;

/// API token resolution.
pub mod auth;

/// Pelican panel API clients.
pub mod api;

/// Terminal and JSON rendering of command results.
pub mod output;

/// CLI interface and commands.
pub mod cli;

/// Macro for retrying operations with exponential backoff
#[macro_export]
macro_rules! retry_operation {
    // Simple version without logging
    ($max_retry:expr, $operation:expr) => {{
        let max_retry: u32 = $max_retry;
        let mut attempt: u32 = 0;
        loop {
            match $operation {
                Ok(res) => break Ok(res),
                Err(_) if attempt < max_retry => {
                    // Exponential backoff: 1s, 2s, 4s, 8s...
                    let delay = std::time::Duration::from_millis(1000 * (1u64 << attempt.min(16)));
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => break Err(e),
            }
        }
    }};

    // Version with logging
    ($max_retry:expr, $operation:expr, $log_prefix:expr) => {{
        let max_retry: u32 = $max_retry;
        let mut attempt: u32 = 0;
        loop {
            match $operation {
                Ok(res) => break Ok(res),
                Err(e) if attempt < max_retry => {
                    log::warn!(
                        "{} failed (attempt {}/{}): {}, retrying in {}s...",
                        $log_prefix,
                        attempt + 1,
                        max_retry + 1,
                        e,
                        1u64 << attempt.min(16)
                    );

                    // Exponential backoff: 1s, 2s, 4s, 8s...
                    let delay = std::time::Duration::from_millis(1000 * (1u64 << attempt.min(16)));
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if max_retry > 0 {
                        log::error!(
                            "{} failed after {} attempts: {}",
                            $log_prefix,
                            max_retry + 1,
                            e
                        );
                    }
                    break Err(e);
                }
            }
        }
    }};
}
