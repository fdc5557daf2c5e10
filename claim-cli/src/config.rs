//! Settings file for the command line tool.
//!
//! Values resolve in this order, first match wins:
//! 1. command line flags (`--backend`, `--db`)
//! 2. the TOML file given by `--config`, or `progress-claims.toml` in the
//!    working directory
//! 3. built-in defaults
//!
//! ```toml
//! [database]
//! backend = "sqlite"
//! connection_string = "claims.db"
//!
//! [logging]
//! level = "debug"
//! file = "progress-claims.log"
//!
//! [defaults]
//! gst_rate = "10.00"
//! retention_rate = "5.00"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use claim_core::db::DbConfig;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_CONFIG_FILE: &str = "progress-claims.toml";
pub const DEFAULT_DATABASE: &str = "claims.db";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub database: DatabaseSection,
    pub logging: LoggingSection,
    pub defaults: DefaultsSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseSection {
    pub backend: Option<String>,
    pub connection_string: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    /// Bare level or full filter directive. `RUST_LOG` takes precedence.
    pub level: Option<String>,
    /// Log records are appended here in addition to stderr.
    pub file: Option<PathBuf>,
}

/// Percentages applied to new projects created without explicit rates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DefaultsSection {
    pub gst_rate: Option<Decimal>,
    pub retention_rate: Option<Decimal>,
}

impl AppConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse configuration")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Reads `path` when given. Otherwise reads the default file if it
    /// exists and falls back to built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    Self::from_file(default_path)
                } else {
                    debug!("no config file, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    /// Combines the `--backend`/`--db` flags with the `[database]` section.
    pub fn db_config(
        &self,
        backend: Option<String>,
        connection_string: Option<String>,
    ) -> DbConfig {
        DbConfig {
            backend: backend
                .or_else(|| self.database.backend.clone())
                .unwrap_or_else(|| DbConfig::default().backend),
            connection_string: connection_string
                .or_else(|| self.database.connection_string.clone())
                .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
        }
    }
}
