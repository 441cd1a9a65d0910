//! CLI settings
//!
//! Resolved from, in order of precedence: command line flags, environment
//! variables, the `migrator.toml` file and built-in defaults.

use anyhow::{bail, Context};
use elif_migrator::MigratorConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_SETTINGS_FILE: &str = "migrator.toml";

pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_HISTORY_TABLE: &str = "MIGRATOR_HISTORY_TABLE";
pub const ENV_LOG_LEVEL: &str = "MIGRATOR_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "MIGRATOR_LOG_FORMAT";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => bail!("unknown log format '{}', expected 'text' or 'json'", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub migrator: MigratorConfig,
    pub database_url: Option<String>,
    pub history_table: Option<String>,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            migrator: MigratorConfig::default(),
            database_url: None,
            history_table: None,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub directory: Option<PathBuf>,
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub json_logs: bool,
}

impl Settings {
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("invalid settings file")
    }

    /// Read `path`, or `migrator.toml` when no path is given.
    ///
    /// An explicit path must exist; the default file is optional.
    pub fn from_file(path: Option<&Path>) -> anyhow::Result<Self> {
        let (path, required) = match path {
            Some(path) => (path, true),
            None => (Path::new(DEFAULT_SETTINGS_FILE), false),
        };

        if !path.exists() {
            if required {
                bail!("settings file {} does not exist", path.display());
            }
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("in {}", path.display()))
    }

    /// Full resolution: file, then environment, then flags
    pub fn load(path: Option<&Path>, overrides: &Overrides) -> anyhow::Result<Self> {
        let settings = Self::from_file(path)?
            .merge_env(|key| std::env::var(key).ok())?
            .apply(overrides);
        settings.validated()
    }

    /// Override fields from variables returned by `lookup`
    pub fn merge_env<F>(mut self, lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.migrator = self.migrator.merge_env_with(&lookup);
        if let Some(url) = lookup(ENV_DATABASE_URL) {
            self.database_url = Some(url);
        }
        if let Some(table) = lookup(ENV_HISTORY_TABLE) {
            self.history_table = Some(table);
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT) {
            self.log_format = format.parse()?;
        }
        Ok(self)
    }

    pub fn apply(mut self, overrides: &Overrides) -> Self {
        if let Some(directory) = &overrides.directory {
            self.migrator.directory = directory.clone();
        }
        if let Some(url) = &overrides.database_url {
            self.database_url = Some(url.clone());
        }
        if let Some(level) = &overrides.log_level {
            self.log_level = level.clone();
        }
        if overrides.json_logs {
            self.log_format = LogFormat::Json;
        }
        self
    }

    fn validated(mut self) -> anyhow::Result<Self> {
        self.migrator = self.migrator.validated()?;
        Ok(self)
    }

    /// Database URL, required by every command touching the database
    pub fn require_database_url(&self) -> anyhow::Result<&str> {
        match self.database_url.as_deref() {
            Some(url) if !url.trim().is_empty() => Ok(url),
            _ => bail!(
                "no database URL, pass --database-url or set {}",
                ENV_DATABASE_URL
            ),
        }
    }
}
