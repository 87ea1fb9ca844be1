//! Transport configuration.

use dex_core::DexError;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl ClientConfig {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            request_timeout_ms: 10_000,
            user_agent: None,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = timeout_ms;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn validate(&self) -> Result<(), DexError> {
        let base = self.api_base_url.trim();
        if base.is_empty() {
            return Err(DexError::Config {
                field: "api_base_url",
                reason: "must not be empty".to_string(),
            });
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(DexError::Config {
                field: "api_base_url",
                reason: "must use http or https".to_string(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(DexError::Config {
                field: "request_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if let Some(agent) = &self.user_agent {
            if agent.trim().is_empty() {
                return Err(DexError::Config {
                    field: "user_agent",
                    reason: "must not be blank when set".to_string(),
                });
            }
        }
        Ok(())
    }
}
