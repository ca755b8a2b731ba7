use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::program::progress::ProgressPolicy;

/// Main configuration structure for the e-renstra workflow core
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ERenstraConfig {
    /// Workflow policy settings
    pub workflow: WorkflowConfig,
    /// Observability settings
    pub observability: ObservabilityConfig,
    /// Database settings (optional; in-memory store when absent)
    pub database: Option<DatabaseConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowConfig {
    /// How to treat reports whose realisasi is below the current
    /// progress. Rewinds are allowed by default so an overstated
    /// report can be corrected.
    pub progress_policy: ProgressPolicy,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Enable structured tracing output
    pub tracing_enabled: bool,
    /// Log level
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database URL (SQLite file path or connection string)
    pub url: String,
    /// Maximum connections in pool
    pub max_connections: u32,
    /// Enable automatic migrations
    pub auto_migrate: bool,
}

impl Default for ERenstraConfig {
    fn default() -> Self {
        Self {
            workflow: WorkflowConfig {
                progress_policy: ProgressPolicy::AllowRewind,
            },
            observability: ObservabilityConfig {
                tracing_enabled: true,
                log_level: "info".to_string(),
            },
            database: Some(DatabaseConfig {
                url: ".e-renstra/e-renstra.db".to_string(),
                max_connections: 10,
                auto_migrate: true,
            }),
        }
    }
}

impl ERenstraConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (e-renstra.toml)
    /// 3. Environment variables (prefixed with E_RENSTRA_)
    pub fn load() -> Result<Self> {
        let mut builder =
            Config::builder().add_source(Config::try_from(&ERenstraConfig::default())?);

        if Path::new("e-renstra.toml").exists() {
            builder = builder.add_source(File::with_name("e-renstra"));
        }

        builder = builder.add_source(
            Environment::with_prefix("E_RENSTRA")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let loaded: ERenstraConfig = config.try_deserialize()?;

        Ok(loaded)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<ERenstraConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        let _ = ERenstraConfig::load_env_file();
        ERenstraConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static ERenstraConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}
