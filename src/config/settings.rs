//! TOML-based configuration for the mapper.
//!
//! Supports a config file (nano.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [mapper]
//! strict_columns = true
//! verify_shape = false
//!
//! [schema]
//! path = "${APP_ROOT}/config/schema.toml"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::mapper::MapperOptions;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Mapper behaviour.
    pub mapper: MapperSettings,

    /// Where the entity schema lives.
    pub schema: SchemaSettings,
}

/// Mapper configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MapperSettings {
    /// Treat a missing `{column}_{iteration}` key as an error.
    pub strict_columns: bool,

    /// Check the first row of each result set against the plan.
    pub verify_shape: bool,
}

impl Default for MapperSettings {
    fn default() -> Self {
        let options = MapperOptions::default();
        Self {
            strict_columns: options.strict_columns,
            verify_shape: options.verify_shape,
        }
    }
}

impl From<&MapperSettings> for MapperOptions {
    fn from(settings: &MapperSettings) -> Self {
        MapperOptions {
            strict_columns: settings.strict_columns,
            verify_shape: settings.verify_shape,
        }
    }
}

/// Schema location.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SchemaSettings {
    /// Path to the TOML schema (supports ${ENV_VAR} expansion).
    pub path: Option<String>,
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `NANO_CONFIG`
    /// 2. `./nano.toml`
    /// 3. `~/.config/nano/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("NANO_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("nano.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("nano").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Mapper options derived from these settings.
    pub fn mapper_options(&self) -> MapperOptions {
        (&self.mapper).into()
    }

    /// The schema path with environment variables expanded, if configured.
    pub fn schema_path(&self) -> Result<Option<PathBuf>, SettingsError> {
        self.schema
            .path
            .as_deref()
            .map(|p| expand_env_vars(p).map(PathBuf::from))
            .transpose()
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax. A `$` not followed by a name is kept.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let braced = chars.peek() == Some(&'{');
        if braced {
            chars.next();
        }

        let mut var_name = String::new();
        while let Some(&ch) = chars.peek() {
            if braced && ch == '}' {
                chars.next();
                break;
            }
            if !braced && !(ch.is_alphanumeric() || ch == '_') {
                break;
            }
            var_name.push(ch);
            chars.next();
        }

        if var_name.is_empty() && !braced {
            result.push('$');
            continue;
        }

        let value = env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name))?;
        result.push_str(&value);
    }

    Ok(result)
}
