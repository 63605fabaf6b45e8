//! Configuration management for the registry.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::signature::{Background, RasterOptions, DEFAULT_MARGIN};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "community-registry";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "registry.db";

/// Prefix for environment overrides, e.g. `REGISTRY_EXPORT__ROWS_PER_PAGE`.
const ENV_PREFIX: &str = "REGISTRY_";

/// Smallest and largest accepted signature margin, in pixels.
const MARGIN_RANGE: std::ops::RangeInclusive<u32> = 5..=10;

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `REGISTRY_`, sections split on `__`)
/// 2. TOML config file at `~/.config/community-registry/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Signature rendering configuration.
    pub signature: SignatureConfig,
    /// Export configuration.
    pub export: ExportConfig,
    /// Form validation configuration.
    pub validation: ValidationConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/community-registry/registry.db`
    pub database_path: Option<PathBuf>,
}

/// Signature canvas configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignatureConfig {
    /// Canvas width in pixels.
    pub canvas_width: u32,
    /// Canvas height in pixels.
    pub canvas_height: u32,
    /// Blank border around the drawing, in pixels.
    pub margin: u32,
    /// Canvas fill.
    pub background: Background,
}

/// Export-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory exports are written to when no output file is given.
    /// Defaults to the current directory.
    pub output_dir: Option<PathBuf>,
    /// Organization name printed in document headers.
    pub organization_name: Option<String>,
    /// PNG logo placed in PDF headers.
    pub logo_path: Option<PathBuf>,
    /// Embed signature thumbnails in PDF tables.
    pub include_signatures: bool,
    /// Table rows per PDF page.
    pub rows_per_page: usize,
}

/// Form validation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Pattern a non-blank contact number must match.
    /// Unset disables the check.
    pub contact_number_pattern: Option<String>,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            canvas_width: 400,
            canvas_height: 150,
            margin: DEFAULT_MARGIN,
            background: Background::Transparent,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            organization_name: None,
            logo_path: None,
            include_signatures: true,
            rows_per_page: 18,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            contact_number_pattern: Some(default_contact_pattern()),
        }
    }
}

/// Digits with an optional leading `+`, allowing spaces and dashes.
fn default_contact_pattern() -> String {
    r"^\+?[0-9][0-9 \-]{6,19}$".to_string()
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config = Self::figment(config_path).extract::<Self>()?;
        config.validate()?;
        Ok(config)
    }

    /// The provider stack used by [`Config::load_from`].
    #[must_use]
    pub fn figment(config_path: Option<PathBuf>) -> Figment {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
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
        let sig = &self.signature;
        if !MARGIN_RANGE.contains(&sig.margin) {
            return Err(Error::ConfigValidation {
                message: format!(
                    "signature.margin ({}) must be between {} and {}",
                    sig.margin,
                    MARGIN_RANGE.start(),
                    MARGIN_RANGE.end()
                ),
            });
        }

        let min_side = sig.margin * 2;
        if sig.canvas_width <= min_side || sig.canvas_height <= min_side {
            return Err(Error::ConfigValidation {
                message: format!(
                    "signature canvas {}x{} leaves no room inside a {}px margin",
                    sig.canvas_width, sig.canvas_height, sig.margin
                ),
            });
        }

        if self.export.rows_per_page == 0 {
            return Err(Error::ConfigValidation {
                message: "export.rows_per_page must be greater than 0".to_string(),
            });
        }

        self.contact_regex()?;
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

    /// Directory exports are written to, defaulting to the working directory.
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.export
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Canvas settings for rendering signatures.
    #[must_use]
    pub fn raster_options(&self) -> RasterOptions {
        RasterOptions::new(self.signature.canvas_width, self.signature.canvas_height)
            .with_margin(self.signature.margin)
            .with_background(self.signature.background)
    }

    /// Compile the contact number pattern, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is not a valid regex.
    pub fn contact_regex(&self) -> Result<Option<Regex>> {
        match self.validation.contact_number_pattern.as_deref() {
            None | Some("") => Ok(None),
            Some(pattern) => Regex::new(pattern).map(Some).map_err(|e| Error::ConfigValidation {
                message: format!("invalid contact_number_pattern '{pattern}': {e}"),
            }),
        }
    }
}
