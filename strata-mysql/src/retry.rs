//! Connect-with-retry for servers that may still be starting.

use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::config::MysqlConfig;
use crate::connection::MysqlConnection;
use crate::error::{MysqlError, MysqlResult};

/// Fixed-interval retry policy bounded by a total timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay between attempts.
    pub interval: Duration,
    /// Give up once this much time has passed since the first attempt.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            timeout: Duration::from_secs(150),
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the delay between attempts.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the total time budget.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// A policy that makes exactly one attempt.
    pub fn once() -> Self {
        Self {
            interval: Duration::ZERO,
            timeout: Duration::ZERO,
        }
    }

    /// Upper bound on the number of attempts this policy allows.
    pub fn max_attempts(&self) -> u32 {
        if self.interval.is_zero() {
            return 1;
        }
        let extra = self.timeout.as_millis() / self.interval.as_millis();
        u32::try_from(extra).unwrap_or(u32::MAX).saturating_add(1)
    }
}

/// Connect to `config`, retrying until the policy's timeout elapses.
///
/// Only connection-level failures are retried; an authentication error or an
/// unknown database fails immediately.
pub async fn connect_with_retry(
    config: &MysqlConfig,
    label: &str,
    policy: RetryPolicy,
) -> MysqlResult<MysqlConnection> {
    let started = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        match MysqlConnection::connect(config, label).await {
            Ok(conn) => {
                if attempt > 1 {
                    info!(target_db = %label, attempt, "Connected after retrying");
                }
                return Ok(conn);
            }
            Err(e) if e.is_connection_error() => {
                let elapsed = started.elapsed();
                if elapsed + policy.interval > policy.timeout || attempt >= policy.max_attempts() {
                    return Err(MysqlError::Timeout {
                        target: config.masked_url(),
                        elapsed,
                        last_error: e.to_string(),
                    });
                }
                warn!(
                    target_db = %label,
                    attempt,
                    error = %e,
                    retry_in = ?policy.interval,
                    "Connection failed, retrying"
                );
                tokio::time::sleep(policy.interval).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_builder() {
        let policy = RetryPolicy::new()
            .interval(Duration::from_secs(1))
            .timeout(Duration::from_secs(5));
        assert_eq!(policy.interval, Duration::from_secs(1));
        assert_eq!(policy.max_attempts(), 6);
    }

    #[test]
    fn test_once() {
        assert_eq!(RetryPolicy::once().max_attempts(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_server_times_out() {
        let config = MysqlConfig::new("db")
            .host("127.0.0.1")
            .port(1)
            .connect_timeout(Duration::from_millis(200));
        let policy = RetryPolicy::new()
            .interval(Duration::from_millis(10))
            .timeout(Duration::from_millis(50));

        let err = connect_with_retry(&config, "sandbox", policy)
            .await
            .unwrap_err();
        assert!(matches!(err, MysqlError::Timeout { .. }), "{err}");
    }
}
