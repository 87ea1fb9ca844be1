//! Configuration loading for the dex CLI.
//!
//! The transport fields are required. The `[catalog]` section is optional
//! and falls back to the library defaults.

use std::path::Path;

use dex_catalog::options::{DEFAULT_CONCURRENCY, DEFAULT_PAGE_SIZE};
use dex_catalog::CatalogOptions;
use dex_client::ClientConfig;
use dex_core::DexError;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    pub api_base_url: String,
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub catalog: CatalogSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogSection {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for CatalogSection {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or DEX_CONFIG)")]
    MissingConfigPath,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl From<DexError> for ConfigError {
    fn from(err: DexError) -> Self {
        match err {
            DexError::Config { field, reason } => ConfigError::InvalidValue { field, reason },
            other => ConfigError::InvalidValue {
                field: "config",
                reason: other.to_string(),
            },
        }
    }
}

impl CliConfig {
    /// Read and validate the config at `path`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.ok_or(ConfigError::MissingConfigPath)?;
        let config = Self::from_path(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.client_config().validate()?;
        if self.catalog.page_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "catalog.page_size",
                reason: "must be > 0".to_string(),
            });
        }
        if self.catalog.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "catalog.concurrency",
                reason: "must be > 0".to_string(),
            });
        }
        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        let config = ClientConfig::new(self.api_base_url.clone())
            .with_timeout_ms(self.request_timeout_ms);
        match &self.user_agent {
            Some(agent) => config.with_user_agent(agent.clone()),
            None => config,
        }
    }

    pub fn catalog_options(&self) -> CatalogOptions {
        CatalogOptions::new()
            .with_page_size(self.catalog.page_size)
            .with_concurrency(self.catalog.concurrency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
api_base_url = "https://pokeapi.co/api/v2"
request_timeout_ms = 5000
"#;

    #[test]
    fn test_minimal_config_uses_catalog_defaults() {
        let config = CliConfig::from_toml(MINIMAL).unwrap();
        config.validate().unwrap();
        assert_eq!(config.catalog.page_size, 24);
        assert_eq!(config.catalog.concurrency, 6);
        assert!(config.user_agent.is_none());
    }

    #[test]
    fn test_catalog_section_overrides() {
        let toml = format!("{MINIMAL}user_agent = \"dex/0.1\"\n\n[catalog]\npage_size = 12\n");
        let config = CliConfig::from_toml(&toml).unwrap();
        assert_eq!(config.catalog.page_size, 12);
        assert_eq!(config.catalog.concurrency, 6);

        let options = config.catalog_options();
        assert_eq!(options.page_size, 12);
        assert_eq!(config.client_config().user_agent.as_deref(), Some("dex/0.1"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let toml = format!("{MINIMAL}theme = \"dark\"\n");
        assert!(matches!(CliConfig::from_toml(&toml), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validate_reports_field() {
        let toml = format!("{MINIMAL}\n[catalog]\nconcurrency = 0\n");
        let config = CliConfig::from_toml(&toml).unwrap();
        match config.validate() {
            Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, "catalog.concurrency"),
            other => panic!("unexpected: {:?}", other),
        }

        let config = CliConfig::from_toml(
            "api_base_url = \"ftp://example\"\nrequest_timeout_ms = 1\n",
        )
        .unwrap();
        match config.validate() {
            Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, "api_base_url"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_load_requires_path() {
        assert!(matches!(CliConfig::load(None), Err(ConfigError::MissingConfigPath)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let config = CliConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.request_timeout_ms, 5000);
    }
}
