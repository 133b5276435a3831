//! Pipeline configuration
//!
//! Values come from, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. a YAML (or TOML/JSON) file, `config.yaml` by default
//! 3. `ANIMAL_ETL_*` environment variables, e.g. `ANIMAL_ETL_HOME_URL`
//! 4. command-line overrides
//!
//! The result is validated once; a missing source or sink URL is fatal.

use crate::error::{EtlError, Result};
use config::{Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Configuration Constants
// ============================================================================

/// Config file read when none is given explicitly. Optional.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "ANIMAL_ETL";

pub const DEFAULT_BATCH_SIZE: usize = 100;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Listing pages walked at most, so an unreachable source still ends the run
pub const DEFAULT_MAX_PAGES: u32 = 500;

/// ETL configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EtlConfig {
    /// Listing endpoint; detail records live at `{animals_url}/{id}`
    #[serde(default)]
    pub animals_url: String,

    /// Sink that receives batches of transformed records
    #[serde(default)]
    pub home_url: String,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Attempts per request, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base of the exponential wait between attempts, in seconds
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_seconds: u64,

    /// Stop paging after this page number
    #[serde(default = "default_max_pages")]
    pub max_pages: Option<u32>,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_backoff_factor() -> f64 {
    DEFAULT_BACKOFF_FACTOR
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_pages() -> Option<u32> {
    Some(DEFAULT_MAX_PAGES)
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub animals_url: Option<String>,
    pub home_url: Option<String>,
    pub batch_size: Option<usize>,
}

impl EtlConfig {
    /// Config with the given endpoints and every other value defaulted
    pub fn new(animals_url: impl Into<String>, home_url: impl Into<String>) -> Self {
        Self {
            animals_url: animals_url.into(),
            home_url: home_url.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
            max_pages: default_max_pages(),
        }
    }

    /// Load and validate configuration
    ///
    /// An explicit `path` must exist. Without one, [`DEFAULT_CONFIG_FILE`] is
    /// read if present. A `.env` file in the working directory is loaded first.
    pub fn load(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::load_with_env(path, Environment::with_prefix(ENV_PREFIX), overrides)
    }

    fn load_with_env(
        path: Option<&Path>,
        env: Environment,
        overrides: &ConfigOverrides,
    ) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = config::Config::builder()
            .add_source(file)
            .add_source(env.try_parsing(true))
            .set_override_option("animals_url", overrides.animals_url.clone())?
            .set_override_option("home_url", overrides.home_url.clone())?
            .set_override_option("batch_size", overrides.batch_size.map(|n| n as i64))?
            .build()?;

        let config: EtlConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.animals_url.trim().is_empty() {
            return Err(EtlError::config("animals_url is required"));
        }

        if self.home_url.trim().is_empty() {
            return Err(EtlError::config("home_url is required"));
        }

        if self.batch_size == 0 {
            return Err(EtlError::config("batch_size must be greater than 0"));
        }

        if self.max_attempts == 0 {
            return Err(EtlError::config("max_attempts must be greater than 0"));
        }

        if !self.backoff_factor.is_finite() || self.backoff_factor < 0.0 {
            return Err(EtlError::config(format!(
                "backoff_factor must be a non-negative number, got {}",
                self.backoff_factor
            )));
        }

        if self.timeout_seconds == 0 {
            return Err(EtlError::config("timeout_seconds must be greater than 0"));
        }

        if self.max_pages == Some(0) {
            return Err(EtlError::config("max_pages must be greater than 0"));
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: config::Map<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Environment::with_prefix(ENV_PREFIX).source(Some(map))
    }

    fn yaml_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_from_minimal_file() {
        let file = yaml_file(
            "animals_url: http://localhost:3123/animals/v1/animals\n\
             home_url: http://localhost:3123/animals/v1/home\n",
        );

        let config =
            EtlConfig::load_with_env(Some(file.path()), env(&[]), &ConfigOverrides::default())
                .unwrap();

        assert_eq!(config.animals_url, "http://localhost:3123/animals/v1/animals");
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.backoff_factor, 2.0);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.max_pages, Some(500));
    }

    #[test]
    fn test_file_values_and_env_precedence() {
        let file = yaml_file(
            "animals_url: http://a/animals\n\
             home_url: http://a/home\n\
             batch_size: 25\n\
             backoff_factor: 1.5\n\
             timeout_seconds: 10\n",
        );

        let config = EtlConfig::load_with_env(
            Some(file.path()),
            env(&[("ANIMAL_ETL_BATCH_SIZE", "7"), ("ANIMAL_ETL_MAX_ATTEMPTS", "3")]),
            &ConfigOverrides::default(),
        )
        .unwrap();

        assert_eq!(config.batch_size, 7);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.max_pages, Some(500));
        assert_eq!(config.backoff_factor, 1.5);
        assert_eq!(config.timeout_seconds, 10);
    }

    #[test]
    fn test_page_cap_from_file_and_env() {
        let file = yaml_file(
            "animals_url: http://a/animals\n\
             home_url: http://a/home\n\
             max_pages: 20\n",
        );

        let from_file =
            EtlConfig::load_with_env(Some(file.path()), env(&[]), &ConfigOverrides::default())
                .unwrap();
        assert_eq!(from_file.max_pages, Some(20));

        let from_env = EtlConfig::load_with_env(
            Some(file.path()),
            env(&[("ANIMAL_ETL_MAX_PAGES", "3")]),
            &ConfigOverrides::default(),
        )
        .unwrap();
        assert_eq!(from_env.max_pages, Some(3));
    }

    #[test]
    fn test_cli_overrides_win() {
        let file = yaml_file("animals_url: http://a/animals\nhome_url: http://a/home\n");
        let overrides = ConfigOverrides {
            home_url: Some("http://b/home".to_string()),
            batch_size: Some(2),
            ..Default::default()
        };

        let config = EtlConfig::load_with_env(
            Some(file.path()),
            env(&[("ANIMAL_ETL_HOME_URL", "http://env/home")]),
            &overrides,
        )
        .unwrap();

        assert_eq!(config.home_url, "http://b/home");
        assert_eq!(config.batch_size, 2);
    }

    #[test]
    fn test_missing_urls_are_fatal() {
        let file = yaml_file("animals_url: http://a/animals\n");

        let err =
            EtlConfig::load_with_env(Some(file.path()), env(&[]), &ConfigOverrides::default())
                .unwrap_err();

        assert!(matches!(err, EtlError::Config(ref msg) if msg.contains("home_url")));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let result = EtlConfig::load_with_env(
            Some(Path::new("/nonexistent/etl-config.yaml")),
            env(&[]),
            &ConfigOverrides::default(),
        );
        assert!(matches!(result, Err(EtlError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let base = EtlConfig::new("http://a/animals", "http://a/home");
        assert!(base.validate().is_ok());

        let mut config = base.clone();
        config.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.backoff_factor = -1.0;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.backoff_factor = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = base;
        config.max_pages = Some(0);
        assert!(config.validate().is_err());
    }
}
