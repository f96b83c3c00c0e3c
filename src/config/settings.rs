//! Configuration loading and validation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::error::{ClimaqlError, ConfigError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub datasets: DatasetsConfig,
    pub extraction: ExtractionConfig,
    pub service: ServiceConfig,
    pub render: RenderConfig,
    pub geocode: GeocodeConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(ConfigError::ReadFile)?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations or use defaults.
    pub fn load() -> Result<Self> {
        let config_paths = [
            PathBuf::from("config.toml"),
            PathBuf::from("climaql.toml"),
            dirs::config_dir()
                .map(|p| p.join("climaql/config.toml"))
                .unwrap_or_default(),
            dirs::home_dir()
                .map(|p| p.join(".climaql/config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if path.exists() {
                tracing::info!("loading config from {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("no config file found, using defaults");
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<()> {
        if self.extraction.similarity_threshold <= 0.0 || self.extraction.similarity_threshold > 1.0
        {
            return Err(ClimaqlError::Config(ConfigError::Invalid(
                "extraction.similarity_threshold must be in (0, 1]".into(),
            )));
        }
        if self.extraction.ambiguity_margin < 0.0 || self.extraction.ambiguity_margin >= 1.0 {
            return Err(ClimaqlError::Config(ConfigError::Invalid(
                "extraction.ambiguity_margin must be in [0, 1)".into(),
            )));
        }
        if self.service.row_ceiling == 0 {
            return Err(ClimaqlError::Config(ConfigError::Invalid(
                "service.row_ceiling must be at least 1".into(),
            )));
        }
        if self.render.enabled && self.render.url.is_empty() {
            return Err(ClimaqlError::Config(ConfigError::MissingField(
                "render.url".into(),
            )));
        }
        Ok(())
    }

    /// Filesystem path of a domain's dataset, tilde-expanded.
    pub fn dataset_path(&self, domain: Domain) -> Result<PathBuf> {
        let raw = self.datasets.path(domain).ok_or_else(|| {
            ClimaqlError::Config(ConfigError::MissingDataset(domain.to_string()))
        })?;
        let expanded = shellexpand::tilde(raw);
        Ok(PathBuf::from(expanded.as_ref()))
    }

    /// Domains that have a dataset configured.
    pub fn configured_domains(&self) -> Vec<Domain> {
        Domain::ALL
            .into_iter()
            .filter(|d| self.datasets.path(*d).is_some())
            .collect()
    }
}

/// SQLite file per domain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetsConfig {
    pub disaster_costs: Option<String>,
    pub assistance: Option<String>,
    pub reanalysis: Option<String>,
    pub emissions: Option<String>,
}

impl DatasetsConfig {
    fn path(&self, domain: Domain) -> Option<&str> {
        match domain {
            Domain::DisasterCosts => self.disaster_costs.as_deref(),
            Domain::Assistance => self.assistance.as_deref(),
            Domain::Reanalysis => self.reanalysis.as_deref(),
            Domain::Emissions => self.emissions.as_deref(),
        }
    }
}

/// Filter extraction tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Jaro-Winkler similarity floor for fuzzy vocabulary matches.
    pub similarity_threshold: f64,
    /// Top-two score gap below which a fuzzy match is ambiguous.
    pub ambiguity_margin: f64,
    /// Seed location vocabularies from distinct dataset values at startup.
    pub seed_locations: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.85,
            ambiguity_margin: 0.02,
            seed_locations: true,
        }
    }
}

/// Query service limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Hard cap on rows per response.
    pub row_ceiling: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self { row_ceiling: 100 }
    }
}

/// Prose renderer endpoint. Credentials come from the environment
/// (`CLIMAQL_RENDER_USER` / `CLIMAQL_RENDER_KEY`), never from the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub enabled: bool,
    pub url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            model: String::new(),
            timeout_secs: 30,
        }
    }
}

impl RenderConfig {
    pub fn credentials(&self) -> Result<(String, String)> {
        let user = std::env::var("CLIMAQL_RENDER_USER").map_err(|_| {
            ClimaqlError::Config(ConfigError::MissingField("CLIMAQL_RENDER_USER".into()))
        })?;
        let key = std::env::var("CLIMAQL_RENDER_KEY").map_err(|_| {
            ClimaqlError::Config(ConfigError::MissingField("CLIMAQL_RENDER_KEY".into()))
        })?;
        Ok((user, key))
    }
}

/// Geocoding fallback endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodeConfig {
    pub enabled: bool,
    pub url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: "climaql".to_string(),
            timeout_secs: 5,
        }
    }
}

/// Logging output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit logs as JSON lines instead of human-readable text.
    pub json: bool,
    /// Default filter when RUST_LOG is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json: false,
            level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.service.row_ceiling, 100);
        assert!(config.configured_domains().is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let config = Config::from_str(
            r#"
            [datasets]
            assistance = "~/data/assistance.db"
            emissions = "/data/emissions.db"

            [extraction]
            similarity_threshold = 0.9

            [service]
            row_ceiling = 50

            [render]
            enabled = true
            url = "https://example.com/v1/chat/completions"
            model = "climate_8b"
        "#,
        )
        .unwrap();
        assert_eq!(config.extraction.similarity_threshold, 0.9);
        assert_eq!(config.service.row_ceiling, 50);
        assert_eq!(
            config.configured_domains(),
            vec![Domain::Assistance, Domain::Emissions]
        );
        let path = config.dataset_path(Domain::Assistance).unwrap();
        assert!(!path.to_string_lossy().contains('~'));
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let err = Config::from_str("[extraction]\nsimilarity_threshold = 1.5\n").unwrap_err();
        assert!(err.to_string().contains("similarity_threshold"));
    }

    #[test]
    fn test_render_enabled_requires_url() {
        let err = Config::from_str("[render]\nenabled = true\n").unwrap_err();
        assert!(err.to_string().contains("render.url"));
    }

    #[test]
    fn test_missing_dataset_error() {
        let config = Config::default();
        let err = config.dataset_path(Domain::Reanalysis).unwrap_err();
        assert!(err.to_string().contains("reanalysis"));
    }
}
