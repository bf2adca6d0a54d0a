//! Configuration types for the generation pipeline.
//!
//! All types implement [`serde::Deserialize`] with per-field defaults, so a
//! configuration file only needs the settings it overrides.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration combining generation and prompt settings.
//! - [`GenerationConfig`] - Model, service endpoint, timeout and credential.
//! - [`PromptConfig`] - SQL dialect and audit response language.
//!
//! # Example
//!
//! ```
//! # use ergen::config::AppConfig;
//! let config: AppConfig = toml::from_str(r#"
//!     [generation]
//!     model = "gemini-2.5-pro"
//!
//!     [prompts]
//!     sql_dialect = "sqlite"
//! "#).unwrap();
//!
//! assert_eq!(config.generation().timeout().as_secs(), 60);
//! assert_eq!(config.prompts().response_language(), "English");
//! ```

use std::{fmt, time::Duration};

use serde::Deserialize;

use crate::{client::Credential, model::ModelId};

/// Base URL of the generative-language service.
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Generation service section.
    #[serde(default)]
    generation: GenerationConfig,

    /// Prompt wording section.
    #[serde(default)]
    prompts: PromptConfig,
}

impl AppConfig {
    /// Creates a new [`AppConfig`] from its two sections.
    pub fn new(generation: GenerationConfig, prompts: PromptConfig) -> Self {
        Self {
            generation,
            prompts,
        }
    }

    /// Returns the generation configuration.
    pub fn generation(&self) -> &GenerationConfig {
        &self.generation
    }

    /// Returns the generation configuration for command-line overrides.
    pub fn generation_mut(&mut self) -> &mut GenerationConfig {
        &mut self.generation
    }

    /// Returns the prompt configuration.
    pub fn prompts(&self) -> &PromptConfig {
        &self.prompts
    }
}

/// Settings for the external text-generation service.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    model: ModelId,
    endpoint: String,
    timeout_secs: u64,
    api_key: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: ModelId::default(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            api_key: None,
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl GenerationConfig {
    /// Returns the selected model.
    pub fn model(&self) -> ModelId {
        self.model
    }

    /// Returns the service base URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns the configured credential, if one is set and non-empty.
    pub fn credential(&self) -> Option<Credential> {
        self.api_key.as_deref().and_then(Credential::new)
    }

    /// Replaces the selected model.
    pub fn set_model(&mut self, model: ModelId) {
        self.model = model;
    }

    /// Replaces the credential.
    pub fn set_api_key(&mut self, api_key: impl Into<String>) {
        self.api_key = Some(api_key.into());
    }
}

/// SQL dialect targeted by the schema export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    #[default]
    PostgreSql,
    MySql,
    Sqlite,
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SqlDialect::PostgreSql => "PostgreSQL",
            SqlDialect::MySql => "MySQL",
            SqlDialect::Sqlite => "SQLite",
        })
    }
}

/// Wording knobs for the derived-artifact prompts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    sql_dialect: SqlDialect,
    response_language: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            sql_dialect: SqlDialect::default(),
            response_language: "English".to_string(),
        }
    }
}

impl PromptConfig {
    /// Creates a new [`PromptConfig`].
    pub fn new(sql_dialect: SqlDialect, response_language: impl Into<String>) -> Self {
        Self {
            sql_dialect,
            response_language: response_language.into(),
        }
    }

    /// Returns the SQL dialect for schema export.
    pub fn sql_dialect(&self) -> SqlDialect {
        self.sql_dialect
    }

    /// Returns the natural language audits are written in.
    pub fn response_language(&self) -> &str {
        &self.response_language
    }
}
