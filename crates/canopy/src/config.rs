//! Configuration management for canopy.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "canopy";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "canopy.db";

/// Tolerance when checking that score weights sum to one.
const WEIGHT_SUM_EPSILON: f64 = 1e-9;

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `CANOPY_`, nested keys split on `__`)
/// 2. TOML config file at `~/.config/canopy/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Scoring configuration.
    pub scoring: ScoringConfig,
    /// Routing configuration.
    pub routing: RoutingConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/canopy/canopy.db`
    pub database_path: Option<PathBuf>,
}

/// Scoring-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Buffer distance around road segments, in meters.
    pub buffer_meters: f64,
    /// Expected CRS of ingested datasets (projected, meter-based).
    pub crs: String,
    /// Weight of the normalized canopy score in the static EQS composite.
    pub eqs_canopy_weight: f64,
    /// Weight of the normalized CO2 score in the static EQS composite.
    pub eqs_co2_weight: f64,
    /// Weight of the normalized biodiversity score in the static EQS composite.
    pub eqs_bio_weight: f64,
    /// Weight of the normalized canopy score in the serenity composite.
    pub serenity_canopy_weight: f64,
    /// Weight of the normalized biodiversity score in the serenity composite.
    pub serenity_bio_weight: f64,
}

/// Routing-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Weight of the distance cost in the holistic cost.
    pub distance_weight: f64,
    /// Weight of the emissions cost in the holistic cost.
    pub emissions_weight: f64,
    /// Weight of the environmental reward in the holistic cost.
    pub eco_weight: f64,
    /// Baseline emission coefficient (g/km).
    pub emission_k1: f64,
    /// Congestion emission coefficient (g·km/h per km).
    pub emission_k2: f64,
    /// Aerodynamic drag emission coefficient (g·h²/km³).
    pub emission_k3: f64,
    /// Assumed cruising speed for segments without one, in km/h.
    pub default_speed_kmh: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            buffer_meters: 10.0,
            crs: "EPSG:32643".to_string(),
            eqs_canopy_weight: 0.5,
            eqs_co2_weight: 0.3,
            eqs_bio_weight: 0.2,
            serenity_canopy_weight: 0.7,
            serenity_bio_weight: 0.3,
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            distance_weight: 0.3,
            emissions_weight: 0.5,
            eco_weight: 0.2,
            emission_k1: 80.0,
            emission_k2: 6500.0,
            emission_k3: 0.03,
            default_speed_kmh: 30.0,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `CANOPY_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file).nested())
            .merge(Env::prefixed("CANOPY_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.scoring.buffer_meters <= 0.0 {
            return Err(Error::ConfigValidation {
                message: format!(
                    "buffer_meters must be positive, got {}",
                    self.scoring.buffer_meters
                ),
            });
        }

        let eqs_sum = self.scoring.eqs_canopy_weight
            + self.scoring.eqs_co2_weight
            + self.scoring.eqs_bio_weight;
        if (eqs_sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
            return Err(Error::ConfigValidation {
                message: format!("EQS weights must sum to 1.0, got {eqs_sum}"),
            });
        }

        let serenity_sum = self.scoring.serenity_canopy_weight + self.scoring.serenity_bio_weight;
        if (serenity_sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
            return Err(Error::ConfigValidation {
                message: format!("serenity weights must sum to 1.0, got {serenity_sum}"),
            });
        }

        for (name, value) in [
            ("distance_weight", self.routing.distance_weight),
            ("emissions_weight", self.routing.emissions_weight),
            ("eco_weight", self.routing.eco_weight),
            ("emission_k1", self.routing.emission_k1),
            ("emission_k2", self.routing.emission_k2),
            ("emission_k3", self.routing.emission_k3),
        ] {
            if value <= 0.0 {
                return Err(Error::ConfigValidation {
                    message: format!("{name} must be positive, got {value}"),
                });
            }
        }

        // The reward term is bounded by eco_weight * length; keeping it
        // strictly below the distance cost keeps every edge cost positive,
        // which Dijkstra requires.
        if self.routing.eco_weight >= self.routing.distance_weight {
            return Err(Error::ConfigValidation {
                message: format!(
                    "eco_weight ({}) must be less than distance_weight ({})",
                    self.routing.eco_weight, self.routing.distance_weight
                ),
            });
        }

        if self.routing.default_speed_kmh < 1.0 {
            return Err(Error::ConfigValidation {
                message: format!(
                    "default_speed_kmh must be at least 1, got {}",
                    self.routing.default_speed_kmh
                ),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!((config.scoring.buffer_meters - 10.0).abs() < f64::EPSILON);
        assert_eq!(config.scoring.crs, "EPSG:32643");
        assert!((config.routing.default_speed_kmh - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_default_weights_match_paper() {
        let scoring = ScoringConfig::default();
        assert!((scoring.eqs_canopy_weight - 0.5).abs() < f64::EPSILON);
        assert!((scoring.eqs_co2_weight - 0.3).abs() < f64::EPSILON);
        assert!((scoring.eqs_bio_weight - 0.2).abs() < f64::EPSILON);
        assert!((scoring.serenity_canopy_weight - 0.7).abs() < f64::EPSILON);
        assert!((scoring.serenity_bio_weight - 0.3).abs() < f64::EPSILON);

        let routing = RoutingConfig::default();
        assert!((routing.distance_weight - 0.3).abs() < f64::EPSILON);
        assert!((routing.emissions_weight - 0.5).abs() < f64::EPSILON);
        assert!((routing.eco_weight - 0.2).abs() < f64::EPSILON);
        assert!((routing.emission_k1 - 80.0).abs() < f64::EPSILON);
        assert!((routing.emission_k2 - 6500.0).abs() < f64::EPSILON);
        assert!((routing.emission_k3 - 0.03).abs() < f64::EPSILON);
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_negative_buffer() {
        let mut config = Config::default();
        config.scoring.buffer_meters = -5.0;

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("buffer_meters"));
    }

    #[test]
    fn test_validate_eqs_weights_must_sum_to_one() {
        let mut config = Config::default();
        config.scoring.eqs_canopy_weight = 0.9;

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("EQS weights"));
    }

    #[test]
    fn test_validate_serenity_weights_must_sum_to_one() {
        let mut config = Config::default();
        config.scoring.serenity_bio_weight = 0.5;

        let result = config.validate();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("serenity weights"));
    }

    #[test]
    fn test_validate_eco_weight_below_distance_weight() {
        let mut config = Config::default();
        config.routing.eco_weight = 0.3;
        config.routing.distance_weight = 0.2;

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("eco_weight"));
    }

    #[test]
    fn test_validate_nonpositive_emission_coefficient() {
        let mut config = Config::default();
        config.routing.emission_k2 = 0.0;

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("emission_k2"));
    }

    #[test]
    fn test_validate_default_speed_too_low() {
        let mut config = Config::default();
        config.routing.default_speed_kmh = 0.5;

        let result = config.validate();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("default_speed_kmh"));
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        let path = config.database_path();
        assert!(path.to_string_lossy().contains("canopy.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("canopy"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_default_data_dir() {
        let path = Config::default_data_dir();
        assert!(path.to_string_lossy().contains("canopy"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        // Loading from a nonexistent path should work (uses defaults)
        let result = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")));
        assert!(result.is_ok());

        let config = result.unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_scoring_config_deserialize() {
        let json = r#"{"buffer_meters": 15.0, "crs": "EPSG:32644"}"#;
        let scoring: ScoringConfig = serde_json::from_str(json).unwrap();
        assert!((scoring.buffer_meters - 15.0).abs() < f64::EPSILON);
        assert_eq!(scoring.crs, "EPSG:32644");
        // Unspecified fields fall back to defaults.
        assert!((scoring.eqs_canopy_weight - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_routing_config_serialize() {
        let routing = RoutingConfig::default();
        let json = serde_json::to_string(&routing).unwrap();
        assert!(json.contains("emission_k1"));
        assert!(json.contains("default_speed_kmh"));
    }

    #[test]
    fn test_config_clone_and_eq() {
        let config = Config::default();
        let cloned = config.clone();
        assert_eq!(config, cloned);
    }
}
