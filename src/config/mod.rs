//! Configuration module.
//!
//! Handles the config file, environment variables, and mapper settings.

mod settings;

pub use settings::{expand_env_vars, MapperSettings, SchemaSettings, Settings, SettingsError};
