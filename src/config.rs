//! Session settings, optionally loaded from a JSON file.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Precision {0} is out of range (at most {MAX_PRECISION})")]
    Precision(u32),
}

/// Most decimal places a result may be printed with.
pub const MAX_PRECISION: u32 = 100;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Decimal places kept in numeric results.
    pub precision: u32,
    /// Quadrature intervals and 2D plot sample count.
    pub resolution: usize,
    /// Half-width of the 2D plot domain.
    pub plot_range: f64,
    /// Half-width of the square 3D plot domain.
    pub surface_range: f64,
    /// Intervals per axis of the 3D plot grid.
    pub surface_grid: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            precision: 6,
            resolution: 100,
            plot_range: 10.0,
            surface_range: 5.0,
            surface_grid: 40,
        }
    }
}

impl Settings {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(text)?;
        if settings.precision > MAX_PRECISION {
            return Err(ConfigError::Precision(settings.precision));
        }
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let settings = Settings::from_json(r#"{ "precision": 3 }"#).unwrap();
        assert_eq!(settings.precision, 3);
        assert_eq!(settings.resolution, 100);
        assert_eq!(settings.surface_grid, 40);
        assert_eq!(Settings::from_json("{}").unwrap(), Settings::default());
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(matches!(
            Settings::from_json(r#"{ "precison": 3 }"#),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn rejects_excessive_precision() {
        assert!(matches!(
            Settings::from_json(r#"{ "precision": 4000000000 }"#),
            Err(ConfigError::Precision(4_000_000_000))
        ));
        assert_eq!(Settings::from_json(r#"{ "precision": 100 }"#).unwrap().precision, 100);
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            Settings::load("/nonexistent/calculus.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
