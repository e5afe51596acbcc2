/*
[INPUT]:  Order update client, retry budget, shutdown token
[OUTPUT]: Repeated sessions with bounded exponential backoff
[POS]:    WebSocket layer - opt-in reconnect wrapper around single sessions
[UPDATE]: When changing reconnection backoff or giving-up rules
*/

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::RetryConfig;
use crate::error::{OrderUpdateError, Result};
use crate::ws::client::{OrderUpdate, SessionEnd};
use crate::ws::transport::Transport;

/// Totals across every session the supervisor ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorSummary {
    pub sessions: u32,
    pub frames_received: u64,
    pub end: SessionEnd,
}

/// Runs sessions back to back while failures are retryable.
///
/// A session that ends before any frame arrives after login is taken as a
/// credential rejection and never retried. The attempt counter only resets
/// after a session stayed up and received frames for `stable_session_secs`,
/// so a server that answers every login with one error frame and a close
/// still exhausts the budget.
pub struct ReconnectSupervisor<'a, T: Transport> {
    client: &'a OrderUpdate<T>,
    retry: RetryConfig,
}

impl<'a, T: Transport> ReconnectSupervisor<'a, T> {
    /// Use the retry settings from the client's config
    pub fn new(client: &'a OrderUpdate<T>) -> Self {
        Self {
            client,
            retry: client.config().retry.clone(),
        }
    }

    pub fn with_retry(client: &'a OrderUpdate<T>, retry: RetryConfig) -> Self {
        Self { client, retry }
    }

    pub async fn run(&self, shutdown: &CancellationToken) -> Result<SupervisorSummary> {
        let mut totals = SupervisorSummary {
            sessions: 0,
            frames_received: 0,
            end: SessionEnd::StreamEnded,
        };
        let mut retry_count: u32 = 0;

        loop {
            let report = self.client.run_session(shutdown).await;
            totals.sessions += 1;
            totals.frames_received += report.stats.frames_received;

            let uptime = (report.ended_at - report.started_at)
                .to_std()
                .unwrap_or_default();
            if report.stats.frames_received > 0
                && uptime >= Duration::from_secs(self.retry.stable_session_secs)
            {
                retry_count = 0;
            }

            let last_error = match report.outcome {
                Ok(SessionEnd::Cancelled) => {
                    totals.end = SessionEnd::Cancelled;
                    return Ok(totals);
                }
                Ok(end) if self.retry.max_retries == 0 => {
                    totals.end = end;
                    return Ok(totals);
                }
                Ok(_) if report.stats.frames_received == 0 => {
                    warn!(
                        client_id = %self.client.client_id(),
                        "feed closed right after login; not reconnecting"
                    );
                    return Err(OrderUpdateError::LoginRejected);
                }
                Ok(_) => OrderUpdateError::StreamEnded,
                Err(err) if self.retry.max_retries == 0 || !err.is_retryable() => return Err(err),
                Err(err) => err,
            };

            retry_count = retry_count.saturating_add(1);
            if retry_count > self.retry.max_retries {
                warn!(
                    retry_count,
                    max_retries = self.retry.max_retries,
                    error = %last_error,
                    "order update feed gave up reconnecting"
                );
                return Err(OrderUpdateError::RetriesExhausted {
                    attempts: self.retry.max_retries,
                    last_error: last_error.to_string(),
                });
            }

            let backoff = backoff_duration(retry_count, self.retry.max_backoff_secs);
            warn!(
                retry_count,
                ?backoff,
                error = %last_error,
                "order update session ended; reconnecting with backoff"
            );

            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("reconnect cancelled during backoff");
                    totals.end = SessionEnd::Cancelled;
                    return Ok(totals);
                }
                _ = tokio::time::sleep(backoff) => {}
            }
        }
    }
}

/// 1s, 2s, 4s ... clamped to `max_secs`
pub fn backoff_duration(retry_count: u32, max_secs: u64) -> Duration {
    let exp = retry_count.saturating_sub(1).min(63);
    let secs = 1u64 << exp;
    Duration::from_secs(secs.min(max_secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_clamps_at_max() {
        assert_eq!(backoff_duration(1, 30), Duration::from_secs(1));
        assert_eq!(backoff_duration(2, 30), Duration::from_secs(2));
        assert_eq!(backoff_duration(3, 30), Duration::from_secs(4));
        assert_eq!(backoff_duration(5, 30), Duration::from_secs(16));
        assert_eq!(backoff_duration(6, 30), Duration::from_secs(30));
        assert_eq!(backoff_duration(100, 30), Duration::from_secs(30));
    }

    #[test]
    fn test_backoff_first_attempt_is_one_second() {
        assert_eq!(backoff_duration(0, 30), Duration::from_secs(1));
        assert_eq!(backoff_duration(4, 2), Duration::from_secs(2));
    }
}
