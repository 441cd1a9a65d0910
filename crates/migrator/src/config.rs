//! Migrator configuration

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{MigratorError, MigratorResult};
use crate::migrations::MigrationFormat;

pub const ENV_DIRECTORY: &str = "MIGRATOR_DIR";
pub const ENV_EXTENSION: &str = "MIGRATOR_EXTENSION";
pub const ENV_INITIAL_NAME: &str = "MIGRATOR_INITIAL_NAME";

/// Configuration for the migration engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigratorConfig {
    /// Directory where migration files are stored
    pub directory: PathBuf,
    /// Extension of migration files
    pub extension: String,
    /// Name given to the bootstrap migration written by `init`
    pub initial_migration_name: String,
    /// Section markers of migration files
    pub format: MigrationFormat,
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("migrations"),
            extension: ".sql".to_string(),
            initial_migration_name: "init_migrator".to_string(),
            format: MigrationFormat::default(),
        }
    }
}

impl MigratorConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `MIGRATOR_DIR`, `MIGRATOR_EXTENSION` and
    /// `MIGRATOR_INITIAL_NAME`
    pub fn from_env() -> MigratorResult<Self> {
        Self::default().merge_env().validated()
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> MigratorResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| MigratorError::Configuration(format!("invalid TOML: {}", e)))?;
        config.validated()
    }

    /// Load a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> MigratorResult<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| MigratorError::io(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Override fields from the environment
    pub fn merge_env(self) -> Self {
        self.merge_env_with(|key| env::var(key).ok())
    }

    /// Override fields from variables returned by `lookup`
    pub fn merge_env_with<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(directory) = lookup(ENV_DIRECTORY) {
            self.directory = PathBuf::from(directory);
        }
        if let Some(extension) = lookup(ENV_EXTENSION) {
            self.extension = extension;
        }
        if let Some(name) = lookup(ENV_INITIAL_NAME) {
            self.initial_migration_name = name;
        }
        self
    }

    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn with_initial_migration_name(mut self, name: impl Into<String>) -> Self {
        self.initial_migration_name = name.into();
        self
    }

    pub fn with_format(mut self, format: MigrationFormat) -> Self {
        self.format = format;
        self
    }

    /// Make sure the extension starts with a dot
    pub fn normalized(mut self) -> Self {
        if !self.extension.is_empty() && !self.extension.starts_with('.') {
            self.extension = format!(".{}", self.extension);
        }
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> MigratorResult<()> {
        if self.extension.trim_start_matches('.').is_empty() {
            return Err(MigratorError::Configuration(
                "extension cannot be empty".to_string(),
            ));
        }

        if self.initial_migration_name.trim().is_empty() {
            return Err(MigratorError::Configuration(
                "initial migration name cannot be empty".to_string(),
            ));
        }

        let markers = self.format.markers();
        if markers.iter().any(|marker| marker.is_empty()) {
            return Err(MigratorError::Configuration(
                "migration markers cannot be empty".to_string(),
            ));
        }
        for (index, marker) in markers.iter().enumerate() {
            if markers[index + 1..].contains(marker) {
                return Err(MigratorError::Configuration(format!(
                    "migration marker '{}' is used twice",
                    marker
                )));
            }
        }

        Ok(())
    }

    /// Normalize then validate
    pub fn validated(self) -> MigratorResult<Self> {
        let config = self.normalized();
        config.validate()?;
        Ok(config)
    }

    /// Full path of the migration file called `file_name`
    pub fn migration_path(&self, file_name: &str) -> PathBuf {
        self.directory.join(file_name)
    }

    /// File name of a new migration: `<token>_<name><extension>`
    pub fn migration_file_name(&self, token: &str, name: &str) -> String {
        format!("{}_{}{}", token, name, self.extension)
    }

    /// True when `file_name` looks like a migration file
    pub fn is_migration_file(&self, file_name: &str) -> bool {
        file_name.len() > self.extension.len() && file_name.ends_with(&self.extension)
    }
}
