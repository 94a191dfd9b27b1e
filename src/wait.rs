//! Resource waiting with exponential backoff.
//!
//! Provides a generic abstraction for waiting on AWS resources (or any async
//! condition) to become ready, with configurable exponential backoff, jitter,
//! and a bounded overall timeout.

use anyhow::Result;
use backon::{BackoffBuilder, ExponentialBuilder};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for resource waiting with exponential backoff.
#[derive(Debug, Clone)]
pub struct WaitConfig {
    /// Initial delay between checks
    pub initial_delay: Duration,
    /// Maximum delay between checks (cap for exponential growth)
    pub max_delay: Duration,
    /// Maximum total time to wait before timeout
    pub timeout: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            timeout: Duration::from_secs(60),
        }
    }
}

impl WaitConfig {
    /// Wait profile for the database instance. RDS creation routinely takes
    /// tens of minutes, so the poll interval and timeout are generous.
    pub fn database() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(30),
            timeout: Duration::from_secs(40 * 60),
        }
    }

    /// Wait profile for the EC2 tunnel host.
    pub fn compute() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(15),
            timeout: Duration::from_secs(10 * 60),
        }
    }
}

/// Wait for a resource to become ready with exponential backoff.
///
/// Uses `backon::ExponentialBuilder` for delay calculation.
///
/// # Arguments
/// * `config` - Wait configuration
/// * `check` - Async function that returns `Ok(true)` when ready, `Ok(false)` to retry
/// * `resource_name` - Name for logging
///
/// # Returns
/// * `Ok(())` - Resource is ready
/// * `Err` - Timeout, or the check returned an error
pub async fn wait_for_resource<F, Fut>(
    config: WaitConfig,
    check: F,
    resource_name: &str,
) -> Result<()>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let start = std::time::Instant::now();
    let mut attempts = 0u32;

    let backoff = ExponentialBuilder::default()
        .with_min_delay(config.initial_delay)
        .with_max_delay(config.max_delay)
        .with_factor(2.0)
        .with_jitter()
        .build();

    let mut delays = backoff.into_iter();

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
            Ok(true) => {
                debug!(resource = %resource_name, attempts, "Resource ready");
                return Ok(());
            }
            Ok(false) => {
                let delay = delays.next().unwrap_or(config.max_delay);
                debug!(
                    resource = %resource_name,
                    attempt = attempts,
                    delay_ms = delay.as_millis(),
                    "Resource not ready, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                warn!(resource = %resource_name, error = ?e, "Resource check failed");
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config() -> WaitConfig {
        WaitConfig {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            timeout: Duration::from_millis(250),
        }
    }

    #[tokio::test]
    async fn ready_after_three_checks() {
        let calls = AtomicU32::new(0);
        let result = wait_for_resource(
            fast_config(),
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(n >= 3)
            },
            "test-resource",
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn times_out_when_never_ready() {
        let result = wait_for_resource(fast_config(), || async { Ok(false) }, "stuck").await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("Timeout waiting for stuck"));
    }

    #[tokio::test]
    async fn check_error_propagates() {
        let result = wait_for_resource(
            fast_config(),
            || async { anyhow::bail!("describe failed") },
            "broken",
        )
        .await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("describe failed"));
    }
}
