use super::EventQueue;
use crate::model::{NegotiationError, NetworkError, Transport, TransportConnector};
use std::time::Duration;
use tracing::{info, warn};

/// Delay between connection attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed(Duration),
    /// `step * attempt` after the n-th failed attempt
    Linear { step: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::Fixed(Duration::from_secs(2)),
        }
    }
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Fixed(delay),
        }
    }

    pub fn linear(max_attempts: u32, step: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Linear { step },
        }
    }

    /// Wait after the given failed attempt (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed(delay) => delay,
            Backoff::Linear { step } => step.saturating_mul(attempt),
        }
    }

    /// At least one attempt is always made
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Open the signaling channel, retrying per `policy`. Each attempt is
/// bounded by `attempt_timeout`.
pub async fn connect_with_retry(
    connector: &dyn TransportConnector,
    url: &str,
    events: &EventQueue,
    policy: &RetryPolicy,
    attempt_timeout: Duration,
) -> Result<Box<dyn Transport>, NegotiationError> {
    let attempts = policy.attempts();
    let mut last_error = NetworkError::UnknownError("no attempt made".to_string());

    for attempt in 1..=attempts {
        let result = tokio::time::timeout(attempt_timeout, connector.connect(url, events.clone()))
            .await
            .unwrap_or_else(|_| {
                Err(NetworkError::ConnectionTimeout {
                    address: url.to_string(),
                })
            });

        match result {
            Ok(transport) => {
                info!(url, attempt, "Signaling channel connected");
                return Ok(transport);
            }
            Err(e) => {
                warn!(
                    url,
                    attempt,
                    max_attempts = attempts,
                    error = %e,
                    "Signaling connection failed"
                );
                last_error = e;
            }
        }

        if attempt < attempts {
            tokio::time::sleep(policy.delay_after(attempt)).await;
        }
    }

    Err(NegotiationError::SignalingUnreachable {
        url: url.to_string(),
        attempts,
        reason: last_error.to_string(),
    })
}
