//! Configuration management for sql-boxcar.
//!
//! Loads a TOML file and layers environment variables over it. Command-line
//! flags are applied last by the binary.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::boxcar::ApprovalMode;
use crate::error::{BoxcarError, Result};
use crate::llm::LlmProvider;

/// Connection used when neither the file nor `DATABASE_URL` names one.
pub const DEFAULT_DATABASE_URL: &str = "sqlite::memory:";

/// Boxcar name used when none is configured.
pub const DEFAULT_BOXCAR_NAME: &str = "Data";

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub boxcar: BoxcarConfig,
}

/// LLM provider configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,

    /// Model name. Falls back to `OPENAI_MODEL`, then the client default.
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
}

impl DatabaseConfig {
    pub fn resolved_url(&self) -> &str {
        self.url.as_deref().unwrap_or(DEFAULT_DATABASE_URL)
    }
}

/// Settings of one boxcar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoxcarConfig {
    pub name: String,

    /// Defaults to a sentence naming the boxcar.
    pub description: Option<String>,

    /// Entities the boxcar may use. Absent means the whole catalog.
    pub tables: Option<Vec<String>>,

    /// Entities removed from the visible set.
    pub except: Vec<String>,

    /// System deny-list, applied on top of `except`.
    pub deny: Vec<String>,

    /// Return the generated code without running it.
    pub code_only: bool,

    pub approval: ApprovalMode,

    /// Log the generated code at info level.
    pub log_generated: bool,
}

impl Default for BoxcarConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_BOXCAR_NAME.to_string(),
            description: None,
            tables: None,
            except: Vec::new(),
            deny: Vec::new(),
            code_only: false,
            approval: ApprovalMode::default(),
            log_generated: false,
        }
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sql-boxcar")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file. A missing file yields defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| BoxcarError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            BoxcarError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Applies `DATABASE_URL` and `LOG_GEN` from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Applies environment overrides read through `lookup`.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()) {
            self.database.url = Some(url);
        }
        if lookup("LOG_GEN").is_some_and(|value| is_truthy(&value)) {
            self.boxcar.log_generated = true;
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
