//! Configuration module

use std::env;
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory holding `model_v*` artifact versions
    pub artifacts_dir: PathBuf,

    /// Bind address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Log output format (pretty, json)
    pub log_format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            artifacts_dir: env::var("ARTIFACTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("saved_artifacts")),

            host: env::var("HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),

            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),

            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),

            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string()),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Whether logs should be emitted as JSON lines
    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            artifacts_dir: PathBuf::from("saved_artifacts"),
            host: "0.0.0.0".to_string(),
            port: 8000,
            environment: "development".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}
