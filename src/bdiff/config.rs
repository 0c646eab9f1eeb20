//! Configuration loading
//!
//! `defaults/bdiff.default.toml` is embedded into the crate so the documented defaults and the
//! runtime behavior never drift apart. Callers layer an optional user file, `BDIFF__*`
//! environment variables and command line overrides on top via [`Loader`] before
//! deserializing into [`BdiffConfig`].

use std::path::Path;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat, ValueKind};
use serde::Deserialize;

use crate::bdiff::diffing::DiffAlgorithm;

const DEFAULT_TOML: &str = include_str!("../../defaults/bdiff.default.toml");

/// Exit status reserved for failures; change counts never reach it.
pub const ERROR_EXIT_CODE: u8 = 255;

#[derive(Debug, Clone, Deserialize)]
pub struct BdiffConfig {
    pub diff: DiffConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiffConfig {
    /// Fallback language when the file extension says nothing
    pub language: String,
    pub algorithm: DiffAlgorithm,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub max_exit_code: u8,
}

impl OutputConfig {
    /// Exit status for a diff with `changes` records.
    ///
    /// The cap never drops below 1: any change at all exits non-zero.
    pub fn exit_code(&self, changes: usize) -> u8 {
        let cap = self.max_exit_code.clamp(1, ERROR_EXIT_CODE - 1);
        u8::try_from(changes).unwrap_or(u8::MAX).min(cap)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    Text,
    Json,
}

/// Layers user configuration over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start from the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file that must exist.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer a configuration file if it exists.
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer `BDIFF__SECTION__KEY` environment variables.
    pub fn with_environment(mut self) -> Self {
        self.builder = self
            .builder
            .add_source(Environment::with_prefix("BDIFF").separator("__"));
        self
    }

    /// Apply a single key/value override, e.g. from a command line flag.
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    pub fn build(self) -> Result<BdiffConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

pub fn load_defaults() -> Result<BdiffConfig, ConfigError> {
    Loader::new().build()
}
