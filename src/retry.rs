//! Redelivery policy for the two unreliable external legs: mailbox polling
//! and outbound send. Bounded retries with exponential backoff; exhaustion
//! is logged and the error handed back to the caller to drop the exchange.

use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

/// Bounded retry-with-backoff discipline.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Redeliveries after the initial attempt.
    pub max_redeliveries: u32,
    pub initial_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    /// 3 redeliveries, delays 1000 ms, 2000 ms, 4000 ms.
    fn default() -> Self {
        Self {
            max_redeliveries: 3,
            initial_delay: Duration::from_millis(1000),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay before redelivery number `attempt` (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.initial_delay
            .mul_f64(self.backoff_multiplier.powi(attempt as i32))
    }
}

/// Run `op`, redelivering on failure per `policy`.
///
/// Returns the first success, or the final error once redeliveries are
/// exhausted (after logging the exhaustion).
pub async fn with_redelivery<T, E, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_redeliveries => {
                let delay = policy.delay_for(attempt);
                warn!(
                    op = label,
                    redelivery = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Operation failed, redelivering"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                error!(
                    op = label,
                    redeliveries = policy.max_redeliveries,
                    error = %e,
                    "Redeliveries exhausted"
                );
                return Err(e);
            }
        }
    }
}
