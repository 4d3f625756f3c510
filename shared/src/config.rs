//! # Application Configuration
//!
//! Centralized configuration loaded from environment variables, following
//! the same "defaults, then env overrides" layering as the rest of the
//! stack.
//!
//! ## Environment Variables
//!
//! | Variable | Required | Default |
//! |----------|----------|---------|
//! | `DB_HOST` | yes | — |
//! | `DB_PORT` | yes | — |
//! | `DB_NAME` | yes | — |
//! | `DB_USER` | yes | — |
//! | `DB_PASS` | yes | — |
//! | `MAX_DB_CONN` | no | number of available CPUs |
//! | `API_PORT` | no | `8080` |
//! | `DEFAULT_TIMEZONE` | no | `Europe/Madrid` |

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Root application configuration.
///
/// Created once at startup and shared by reference for the lifetime of the
/// process.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub service_name: String,
    #[serde(default = "default_environment")]
    pub environment: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

/// PostgreSQL connection parameters for the hand-rolled pool in
/// [`crate::database`].
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,

    /// Pool size override. `None` means "use the number of available CPUs".
    /// A configured value that is not positive is clamped to 1.
    pub max_connections: Option<i64>,

    /// Timezone applied as the connection default and used as the baseline
    /// for the query composer's static/dynamic path decision.
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
}

impl AppConfig {
    /// Loads configuration from environment variables (and an optional
    /// `.env` file for local development convenience).
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let config = Config::builder()
            .set_default("server.port", 8080)?
            .set_default("service_name", "weather-api")?
            .set_override("database.host", env_required("DB_HOST")?)?
            .set_override("database.port", env_required("DB_PORT")?)?
            .set_override("database.name", env_required("DB_NAME")?)?
            .set_override("database.user", env_required("DB_USER")?)?
            .set_override("database.password", env_required("DB_PASS")?)?
            .set_override_option("database.max_connections", std::env::var("MAX_DB_CONN").ok())?
            .set_override_option(
                "database.default_timezone",
                std::env::var("DEFAULT_TIMEZONE").ok(),
            )?
            .set_override_option("server.port", std::env::var("API_PORT").ok())?
            .set_override_option("environment", std::env::var("APP_ENV").ok())?
            .add_source(Environment::default().try_parsing(true))
            .build()?;

        config.try_deserialize()
    }

    /// True when `APP_ENV=production`; governs JSON vs. pretty log output.
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Pool size to use, resolving the `MAX_DB_CONN` override against the
    /// machine's available parallelism exactly as the pool contract
    /// requires: a configured non-positive value clamps to 1.
    pub fn pool_size(&self) -> usize {
        match self.database.max_connections {
            Some(n) if n > 0 => n as usize,
            Some(_) => 1,
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

fn env_required(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::NotFound(key.to_string()))
}

fn default_port() -> u16 {
    8080
}

fn default_timezone() -> String {
    "Europe/Madrid".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_size_clamps_non_positive_override_to_one() {
        let cfg = sample_config(Some(0));
        assert_eq!(cfg.pool_size(), 1);

        let cfg = sample_config(Some(-5));
        assert_eq!(cfg.pool_size(), 1);
    }

    #[test]
    fn pool_size_respects_positive_override() {
        let cfg = sample_config(Some(4));
        assert_eq!(cfg.pool_size(), 4);
    }

    #[test]
    fn pool_size_falls_back_to_available_parallelism() {
        let cfg = sample_config(None);
        assert!(cfg.pool_size() >= 1);
    }

    fn sample_config(max_connections: Option<i64>) -> AppConfig {
        AppConfig {
            server: ServerConfig { port: 8080 },
            database: DatabaseConfig {
                host: "localhost".into(),
                port: 5432,
                name: "weather".into(),
                user: "weather".into(),
                password: "secret".into(),
                max_connections,
                default_timezone: "Europe/Madrid".into(),
            },
            service_name: "weather-api".into(),
            environment: "development".into(),
        }
    }
}
