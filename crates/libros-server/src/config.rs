//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::storage::config::StorageConfig;

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/libros";

pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 2;

pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default database idle timeout in seconds (10 minutes).
pub const DEFAULT_DATABASE_IDLE_TIMEOUT_SECS: u64 = 600;

/// Default CORS allowed origin for local development.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "http://localhost:3000";

// ============================================================================
// Pipeline Constants
// ============================================================================

/// Column holding the fixed-width route code that drives partitioning.
pub const DEFAULT_CODE_COLUMN: &str = "Codigo Ruta Suministro";

/// Prefix of every artifact file and therefore of every partition collection.
pub const DEFAULT_ARTIFACT_PREFIX: &str = "libro_";

/// Spreadsheets whose name starts with this are pipeline output and never re-read.
pub const DEFAULT_PROCESSED_PREFIX: &str = "processed_";

/// Content type of `.xlsx` uploads.
pub const SPREADSHEET_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub const ARTIFACT_CONTENT_TYPE: &str = "application/json";

pub const DEFAULT_MAX_BATCH_OPS: usize = crate::store::DEFAULT_MAX_BATCH_OPS;

// ============================================================================
// Host Constants
// ============================================================================

pub const DEFAULT_SPREADSHEET_TIMEOUT_SECS: u64 = 300;

pub const DEFAULT_ARTIFACT_TIMEOUT_SECS: u64 = 540;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

pub const DEFAULT_RETRY_INITIAL_MS: u64 = 500;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub storage: StorageConfig,
    pub pipeline: PipelineConfig,
    pub host: HostConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

/// Naming conventions and limits of the ingestion pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub code_column: String,
    pub artifact_prefix: String,
    pub processed_prefix: String,
    /// Operations per atomic write unit
    pub max_batch_ops: usize,
    /// Delete the source spreadsheet once every partition artifact is uploaded
    pub delete_source: bool,
    /// Parent directory for per-invocation scratch directories
    pub scratch_dir: PathBuf,
}

/// Timeout and redelivery policy of the event host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    pub spreadsheet_timeout_secs: u64,
    pub artifact_timeout_secs: u64,
    /// Redeliver artifact events that failed with a transient error
    pub artifact_retry: bool,
    pub max_attempts: u32,
    pub retry_initial_ms: u64,
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_string(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            code_column: DEFAULT_CODE_COLUMN.to_string(),
            artifact_prefix: DEFAULT_ARTIFACT_PREFIX.to_string(),
            processed_prefix: DEFAULT_PROCESSED_PREFIX.to_string(),
            max_batch_ops: DEFAULT_MAX_BATCH_OPS,
            delete_source: false,
            scratch_dir: std::env::temp_dir(),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            code_column: env_string("PIPELINE_CODE_COLUMN", &defaults.code_column),
            artifact_prefix: env_string("PIPELINE_ARTIFACT_PREFIX", &defaults.artifact_prefix),
            processed_prefix: env_string("PIPELINE_PROCESSED_PREFIX", &defaults.processed_prefix),
            max_batch_ops: env_or("PIPELINE_MAX_BATCH_OPS", defaults.max_batch_ops),
            delete_source: env_or("PIPELINE_DELETE_SOURCE", defaults.delete_source),
            scratch_dir: std::env::var("PIPELINE_SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.scratch_dir),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_batch_ops == 0 {
            anyhow::bail!("Pipeline max_batch_ops must be greater than 0");
        }

        if self.artifact_prefix.is_empty() {
            anyhow::bail!("Pipeline artifact prefix cannot be empty");
        }

        if self.code_column.is_empty() {
            anyhow::bail!("Pipeline code column cannot be empty");
        }

        Ok(())
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            spreadsheet_timeout_secs: DEFAULT_SPREADSHEET_TIMEOUT_SECS,
            artifact_timeout_secs: DEFAULT_ARTIFACT_TIMEOUT_SECS,
            artifact_retry: true,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_initial_ms: DEFAULT_RETRY_INITIAL_MS,
        }
    }
}

impl HostConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            spreadsheet_timeout_secs: env_or(
                "HOST_SPREADSHEET_TIMEOUT_SECS",
                defaults.spreadsheet_timeout_secs,
            ),
            artifact_timeout_secs: env_or(
                "HOST_ARTIFACT_TIMEOUT_SECS",
                defaults.artifact_timeout_secs,
            ),
            artifact_retry: env_or("HOST_ARTIFACT_RETRY", defaults.artifact_retry),
            max_attempts: env_or("HOST_MAX_ATTEMPTS", defaults.max_attempts),
            retry_initial_ms: env_or("HOST_RETRY_INITIAL_MS", defaults.retry_initial_ms),
        }
    }
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            server: ServerConfig {
                host: env_string("LIBROS_HOST", DEFAULT_SERVER_HOST),
                port: env_or("LIBROS_PORT", DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: env_or(
                    "LIBROS_SHUTDOWN_TIMEOUT",
                    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
                ),
            },
            database: DatabaseConfig {
                url: env_string("DATABASE_URL", DEFAULT_DATABASE_URL),
                max_connections: env_or(
                    "DATABASE_MAX_CONNECTIONS",
                    DEFAULT_DATABASE_MAX_CONNECTIONS,
                ),
                min_connections: env_or(
                    "DATABASE_MIN_CONNECTIONS",
                    DEFAULT_DATABASE_MIN_CONNECTIONS,
                ),
                connect_timeout_secs: env_or(
                    "DATABASE_CONNECT_TIMEOUT",
                    DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                ),
                idle_timeout_secs: env_or("DATABASE_IDLE_TIMEOUT", DEFAULT_DATABASE_IDLE_TIMEOUT_SECS),
            },
            cors: CorsConfig {
                allowed_origins: env_string("CORS_ALLOWED_ORIGINS", DEFAULT_CORS_ALLOWED_ORIGIN)
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                allow_credentials: env_or("CORS_ALLOW_CREDENTIALS", true),
            },
            storage: StorageConfig::from_env()?,
            pipeline: PipelineConfig::from_env(),
            host: HostConfig::from_env(),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "Database min_connections ({}) cannot be greater than max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        if self.host.max_attempts == 0 {
            anyhow::bail!("Host max_attempts must be at least 1");
        }

        self.pipeline.validate()?;

        if self.cors.allowed_origins.is_empty() {
            tracing::warn!("No CORS origins configured - all origins will be allowed");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            },
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                idle_timeout_secs: DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
            },
            cors: CorsConfig {
                allowed_origins: vec![DEFAULT_CORS_ALLOWED_ORIGIN.to_string()],
                allow_credentials: true,
            },
            storage: StorageConfig {
                endpoint: None,
                region: "us-east-1".to_string(),
                access_key: None,
                secret_key: None,
                path_style: false,
            },
            pipeline: PipelineConfig::default(),
            host: HostConfig::default(),
        }
    }
}
