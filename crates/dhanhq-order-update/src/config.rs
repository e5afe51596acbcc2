/*
[INPUT]:  Serialized session settings (YAML/JSON via serde)
[OUTPUT]: Validated timeouts, frame error policies and reconnect budget
[POS]:    Configuration layer - session tuning
[UPDATE]: When adding new session options
*/

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{OrderUpdateError, Result};

/// What the dispatch loop does when a single frame fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FramePolicy {
    /// Log, count and move on to the next frame
    #[default]
    Skip,
    /// End the session with the frame's error
    Abort,
}

/// Settings for one order update session
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Limit for opening the connection; `None` waits forever
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: Option<u64>,
    /// Limit on the gap between two frames; `None` waits forever
    #[serde(default)]
    pub idle_timeout_secs: Option<u64>,
    /// Policy for frames that are not valid JSON
    #[serde(default)]
    pub malformed_frames: FramePolicy,
    /// Policy for errors returned by the update handler
    #[serde(default = "default_handler_policy")]
    pub handler_errors: FramePolicy,
    /// Reconnect budget used by the supervisor
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Bounded reconnect settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RetryConfig {
    /// Reconnect attempts after the first session; 0 disables reconnecting
    #[serde(default)]
    pub max_retries: u32,
    /// Upper bound for the exponential backoff
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,
    /// A session must receive frames for this long before the attempt counter resets
    #[serde(default = "default_stable_session_secs")]
    pub stable_session_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            idle_timeout_secs: None,
            malformed_frames: FramePolicy::Skip,
            handler_errors: default_handler_policy(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            max_backoff_secs: default_max_backoff_secs(),
            stable_session_secs: default_stable_session_secs(),
        }
    }
}

fn default_connect_timeout_secs() -> Option<u64> {
    Some(10)
}

fn default_handler_policy() -> FramePolicy {
    FramePolicy::Abort
}

fn default_max_backoff_secs() -> u64 {
    30
}

fn default_stable_session_secs() -> u64 {
    60
}

impl SessionConfig {
    /// Reject settings the session cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout_secs == Some(0) {
            return Err(OrderUpdateError::Config(
                "connect_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.idle_timeout_secs == Some(0) {
            return Err(OrderUpdateError::Config(
                "idle_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.retry.max_retries > 0 && self.retry.max_backoff_secs == 0 {
            return Err(OrderUpdateError::Config(
                "retry.max_backoff_secs must be greater than zero when retries are enabled"
                    .to_string(),
            ));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs.map(Duration::from_secs)
    }
}
