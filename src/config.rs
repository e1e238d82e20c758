//! User settings, read from `<config_dir>/flaner/config.json`.

use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::entity::{DEFAULT_WIDTH, HIT_TOLERANCE};
use crate::grid::DEFAULT_SPACING_M;
use crate::history::UNDO_LIMIT;

/// Environment variable overriding the projects folder.
pub const PROJECTS_ENV: &str = "FLANER_PROJECTS";

pub const LINE_WIDTH_RANGE: RangeInclusive<u32> = 1..=12;
pub const LABEL_SCALE_RANGE: RangeInclusive<f32> = 0.5..=3.0;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Stroke width for new entities, in display pixels.
    pub line_width: u32,
    pub label_scale: f32,
    pub grid_visible: bool,
    pub grid_spacing_m: f32,
    /// Hit-test radius in screen pixels.
    pub hit_tolerance: f32,
    pub undo_limit: usize,
    pub projects_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            line_width: DEFAULT_WIDTH,
            label_scale: 1.0,
            grid_visible: true,
            grid_spacing_m: DEFAULT_SPACING_M,
            hit_tolerance: HIT_TOLERANCE,
            undo_limit: UNDO_LIMIT,
            projects_dir: None,
        }
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("flaner").join("config.json"))
    }

    /// Load from the default location. Problems are logged and yield defaults.
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => {
                log::debug!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("Ignoring config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let data = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&data)?;
        Ok(config.sanitized())
    }

    /// Clamp every value into its supported range.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        self.line_width = self
            .line_width
            .clamp(*LINE_WIDTH_RANGE.start(), *LINE_WIDTH_RANGE.end());
        self.label_scale = if self.label_scale.is_finite() {
            self.label_scale
                .clamp(*LABEL_SCALE_RANGE.start(), *LABEL_SCALE_RANGE.end())
        } else {
            defaults.label_scale
        };
        if !(self.grid_spacing_m.is_finite() && self.grid_spacing_m > 0.0) {
            self.grid_spacing_m = defaults.grid_spacing_m;
        }
        if !(self.hit_tolerance.is_finite() && self.hit_tolerance >= 0.0) {
            self.hit_tolerance = defaults.hit_tolerance;
        }
        self.undo_limit = self.undo_limit.max(1);
        self
    }

    /// `FLANER_PROJECTS` wins over the configured folder.
    pub fn projects_override(&self) -> Option<PathBuf> {
        std::env::var_os(PROJECTS_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| self.projects_dir.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_fields_take_defaults() {
        let config: Config = serde_json::from_str(r#"{"line_width": 4}"#).unwrap();
        assert_eq!(config.line_width, 4);
        assert_eq!(config.grid_spacing_m, DEFAULT_SPACING_M);
        assert_eq!(config.undo_limit, UNDO_LIMIT);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"line_width": 40, "label_scale": 0.1, "grid_spacing_m": -1, "undo_limit": 0}"#,
        )
        .unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.line_width, 12);
        assert_eq!(config.label_scale, 0.5);
        assert_eq!(config.grid_spacing_m, DEFAULT_SPACING_M);
        assert_eq!(config.undo_limit, 1);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse(_))));
        assert!(matches!(
            Config::load_from(&dir.path().join("absent.json")),
            Err(ConfigError::Io(_))
        ));
    }
}
