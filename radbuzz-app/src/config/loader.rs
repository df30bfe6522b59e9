//! Configuration loading
//!
//! Reads the configuration file, applies environment overrides and
//! validates the result. Falls back to the embedded defaults if no file
//! is present.

use std::path::{Path, PathBuf};
use std::{env, fmt, fs, io};

use radbuzz_core::config::ConfigError as InvalidConfig;

use super::AppConfig;

/// Embedded default configuration
const EMBEDDED_CONFIG: &str = include_str!("../../radbuzz.toml");

/// Configuration file looked up in the working directory
const DEFAULT_CONFIG_PATH: &str = "radbuzz.toml";

/// Environment variable overriding `tiles.api_key`
pub const API_KEY_ENV: &str = "RADBUZZ_TILE_API_KEY";

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    /// Configuration file could not be read
    Io { path: PathBuf, source: io::Error },
    /// TOML parsing failed
    Parse(toml::de::Error),
    /// Values out of range
    Invalid(InvalidConfig),
    /// API key longer than the configured maximum
    ApiKeyTooLong,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "cannot read {}: {}", path.display(), source)
            }
            ConfigError::Parse(e) => write!(f, "invalid TOML: {}", e),
            ConfigError::Invalid(e) => write!(f, "invalid configuration: {:?}", e),
            ConfigError::ApiKeyTooLong => write!(f, "{} is too long", API_KEY_ENV),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl From<InvalidConfig> for ConfigError {
    fn from(e: InvalidConfig) -> Self {
        ConfigError::Invalid(e)
    }
}

/// Load the configuration
///
/// `path` wins over `./radbuzz.toml`, which wins over the embedded copy.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let default_path = Path::new(DEFAULT_CONFIG_PATH);
    let path = path.or_else(|| default_path.exists().then_some(default_path));

    let mut config = match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading configuration");
            let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            parse_config(&text)?
        }
        None => {
            tracing::info!("no configuration file, using embedded defaults");
            parse_config(EMBEDDED_CONFIG)?
        }
    };

    if let Ok(key) = env::var(API_KEY_ENV) {
        apply_api_key(&mut config, &key)?;
    }

    validate(&config)?;
    log_config_summary(&config);
    Ok(config)
}

/// Parse a TOML document, missing keys take their defaults
pub fn parse_config(text: &str) -> Result<AppConfig, ConfigError> {
    Ok(toml::from_str(text)?)
}

fn apply_api_key(config: &mut AppConfig, key: &str) -> Result<(), ConfigError> {
    config.tiles.api_key.clear();
    config
        .tiles
        .api_key
        .push_str(key)
        .map_err(|_| ConfigError::ApiKeyTooLong)
}

fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    config.tiles.validate()?;
    config.speedometer.validate()?;
    Ok(())
}

fn log_config_summary(config: &AppConfig) {
    tracing::info!(
        data_dir = %config.data_dir.display(),
        zoom = config.tiles.zoom,
        tile_slots = config.tiles.capacity(),
        "configuration loaded"
    );
    if config.tiles.api_key.is_empty() {
        tracing::warn!("no tile API key, set {} for downloads", API_KEY_ENV);
    }
    tracing::debug!(
        max_speed_kmh = config.speedometer.max_speed_kmh,
        alert_distance_m = config.buzzer.alert_distance_m,
        ride_s = config.simulator.duration_s,
        "handler settings"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_config_matches_defaults() {
        let config = parse_config(EMBEDDED_CONFIG).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = parse_config(
            r#"
            data_dir = "/tmp/radbuzz"

            [tiles]
            zoom = 16

            [simulator]
            online = false
            "#,
        )
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/radbuzz"));
        assert_eq!(config.tiles.zoom, 16);
        assert_eq!(config.tiles.city_tile_factor, 4);
        assert!(!config.simulator.online);
        assert_eq!(config.simulator.tick_ms, 1000);
        assert_eq!(config.speedometer.zero_to_max_steps, 6000);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let config = parse_config("[tiles]\ncity_tile_factor = 0\n").unwrap();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Invalid(InvalidConfig::InvalidCityTileFactor(0)))
        ));

        assert!(matches!(
            parse_config("[tiles]\nzoom = \"high\"\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_api_key_override() {
        let mut config = AppConfig::default();
        apply_api_key(&mut config, "abc123").unwrap();
        assert_eq!(config.tiles.api_key.as_str(), "abc123");

        let long = "k".repeat(200);
        assert!(matches!(
            apply_api_key(&mut config, &long),
            Err(ConfigError::ApiKeyTooLong)
        ));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = load_config(Some(Path::new("/nonexistent/radbuzz.toml")));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
