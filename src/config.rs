//! Configuration file support
//!
//! Settings are read from TOML. Lookup order:
//!
//! 1. Path given with `--config`
//! 2. `./card-extract.toml`
//! 3. `<config dir>/card-extract/config.toml`
//! 4. Built-in defaults
//!
//! Command-line values are layered on top with [`Config::merge_with_cli`].
//!
//! ```toml
//! [card]
//! min_area = 800
//! padding_percent = 2.0
//!
//! [stitch]
//! dpi = 200
//! workers = 4
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::card::CardOptions;
use crate::stitch::StitchOptions;

/// File name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "card-extract.toml";

/// Directory under the user config dir
pub const CONFIG_DIR_NAME: &str = "card-extract";

/// File name inside [`CONFIG_DIR_NAME`]
pub const USER_CONFIG_FILE: &str = "config.toml";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub card: CardOptions,
    pub stitch: StitchOptions,
}

/// Values given on the command line; `None` leaves the file value alone
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    pub min_area: Option<u32>,
    pub scale_factor: Option<f32>,
    pub padding_percent: Option<f32>,
    pub dpi: Option<u32>,
    pub workers: Option<usize>,
    pub center_pages: Option<bool>,
    pub page_scale: Option<f32>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no value is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Config {
    /// Load from the first config file found, or defaults when none exists
    pub fn load() -> Result<Self, ConfigError> {
        for path in Self::search_paths() {
            if path.is_file() {
                tracing::debug!(path = %path.display(), "loading config");
                return Self::load_from_path(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load from an explicit path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Render as TOML text
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Candidate files in lookup order, excluding `--config`
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Some(path) = Self::user_config_path() {
            paths.push(path);
        }
        paths
    }

    /// `<config dir>/card-extract/config.toml`
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(USER_CONFIG_FILE))
    }

    /// Apply CLI values on top of this config (CLI wins)
    pub fn merge_with_cli(&self, cli: &CliOverrides) -> Config {
        let card = CardOptions {
            base_blur_kernel: self.card.base_blur_kernel,
            base_block_size: self.card.base_block_size,
            base_merge_length: self.card.base_merge_length,
            global_close_size: self.card.global_close_size,
            ..CardOptions::builder()
                .min_area(cli.min_area.unwrap_or(self.card.min_area))
                .scale_factor(cli.scale_factor.unwrap_or(self.card.scale_factor))
                .padding_percent(cli.padding_percent.unwrap_or(self.card.padding_percent))
                .adaptive_offset(self.card.adaptive_offset)
                .upscale_factor(self.card.upscale_factor)
                .build()
        };

        let stitch = StitchOptions::builder()
            .dpi(cli.dpi.unwrap_or(self.stitch.dpi))
            .workers(cli.workers.unwrap_or(self.stitch.workers))
            .white_threshold(self.stitch.white_threshold)
            .center_pages(cli.center_pages.unwrap_or(self.stitch.center_pages))
            .page_scale(cli.page_scale.unwrap_or(self.stitch.page_scale))
            .build();

        Config { card, stitch }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.card, CardOptions::default());
        assert_eq!(config.stitch, StitchOptions::default());
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml(
            r#"
            [card]
            min_area = 800

            [stitch]
            workers = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.card.min_area, 800);
        assert_eq!(config.card.padding_percent, 1.5);
        assert_eq!(config.stitch.workers, 4);
        assert_eq!(config.stitch.dpi, 300);
    }

    #[test]
    fn test_invalid_toml() {
        let result = Config::from_toml("[card]\nmin_area = \"lots\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[stitch]\ndpi = 150\ncenter_pages = false").unwrap();

        let config = Config::load_from_path(file.path()).unwrap();
        assert_eq!(config.stitch.dpi, 150);
        assert!(!config.stitch.center_pages);
    }

    #[test]
    fn test_load_missing_path() {
        let result = Config::load_from_path(Path::new("/nonexistent/card-extract.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_toml_roundtrip_keeps_values() {
        let mut config = Config::default();
        config.card.min_area = 1234;
        config.stitch.page_scale = 2.0;

        let parsed = Config::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_cli_overrides_win() {
        let mut file_config = Config::default();
        file_config.card.min_area = 800;
        file_config.stitch.dpi = 150;
        file_config.stitch.white_threshold = 240.0;

        let overrides = CliOverrides {
            min_area: Some(300),
            workers: Some(2),
            center_pages: Some(false),
            ..CliOverrides::new()
        };
        let merged = file_config.merge_with_cli(&overrides);

        assert_eq!(merged.card.min_area, 300);
        assert_eq!(merged.stitch.dpi, 150);
        assert_eq!(merged.stitch.workers, 2);
        assert_eq!(merged.stitch.white_threshold, 240.0);
        assert!(!merged.stitch.center_pages);
    }

    #[test]
    fn test_empty_overrides_keep_config() {
        let mut config = Config::default();
        config.card.base_block_size = 15;

        assert!(CliOverrides::new().is_empty());
        assert_eq!(config.merge_with_cli(&CliOverrides::new()), config);
    }

    #[test]
    fn test_user_config_path() {
        if let Some(path) = Config::user_config_path() {
            assert!(path.ends_with("card-extract/config.toml"));
        }
    }
}
