//! Polling with exponential backoff.
//!
//! Long-running ARM operations are driven to completion by re-checking their
//! status until the provider reports a terminal state.

use anyhow::Result;
use backon::{BackoffBuilder, ExponentialBuilder};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for polling with exponential backoff.
#[derive(Debug, Clone)]
pub struct WaitConfig {
    /// Initial delay between checks
    pub initial_delay: Duration,
    /// Maximum delay between checks (cap for exponential growth)
    pub max_delay: Duration,
    /// Maximum total time to wait before giving up
    pub timeout: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            timeout: Duration::from_secs(2 * 60 * 60),
        }
    }
}

/// Outcome of one status check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll {
    /// Terminal success
    Done,
    /// Not finished; the provider may suggest when to ask again
    Pending { retry_after: Option<Duration> },
}

/// Poll `check` until it reports [`Poll::Done`].
///
/// A provider-suggested `retry_after` takes precedence over the backoff delay
/// but is still capped at `max_delay`.
///
/// # Returns
/// * `Ok(())` - The operation completed
/// * `Err` - Timeout, or the check returned an error
pub async fn wait_for_resource<F, Fut>(config: &WaitConfig, check: F, resource_name: &str) -> Result<()>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Poll>>,
{
    let start = tokio::time::Instant::now();
    let mut attempts = 0u32;

    let mut delays = ExponentialBuilder::default()
        .with_min_delay(config.initial_delay)
        .with_max_delay(config.max_delay)
        .with_factor(2.0)
        .build();

    loop {
        attempts += 1;

        if start.elapsed() >= config.timeout {
            anyhow::bail!(
                "Timeout waiting for {} after {:?} ({} attempts)",
                resource_name,
                config.timeout,
                attempts
            );
        }

        match check().await {
            Ok(Poll::Done) => {
                debug!(resource = %resource_name, attempts, "Operation complete");
                return Ok(());
            }
            Ok(Poll::Pending { retry_after }) => {
                let backoff = delays.next().unwrap_or(config.max_delay);
                let delay = retry_after.unwrap_or(backoff).min(config.max_delay);
                debug!(
                    resource = %resource_name,
                    attempt = attempts,
                    delay_ms = delay.as_millis(),
                    "Operation in progress, polling again"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                warn!(resource = %resource_name, error = ?e, "Status check failed");
                return Err(e);
            }
        }
    }
}
