/*
[INPUT]:  YAML configuration file
[OUTPUT]: Parsed credentials and session settings
[POS]:    Configuration layer - runner setup
[UPDATE]: When adding new configuration options
*/

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

use dhanhq_order_update::{Credentials, SessionConfig};

/// Top-level configuration for the order update runner
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunnerConfig {
    /// Dhan client identifier
    pub client_id: String,
    /// Access token for the login handshake
    pub access_token: String,
    /// Session tuning; every field has a default
    #[serde(default)]
    pub session: SessionConfig,
}

impl RunnerConfig {
    /// Load configuration from YAML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.client_id.trim().is_empty() {
            bail!("client_id must not be empty");
        }
        if self.access_token.trim().is_empty() {
            bail!("access_token must not be empty");
        }
        self.session.validate().context("invalid session block")?;
        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.client_id.clone(), self.access_token.clone())
    }
}
