//! Common configuration blocks for meetup platform components.

use crate::error::CommonError;
use crate::secret::SecretString;
use std::collections::HashMap;
use std::fmt;

/// Default maximum pool size.
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 20;

/// Default per-statement timeout applied through the connection URL.
pub const DEFAULT_DB_STATEMENT_TIMEOUT_SECONDS: u32 = 5;

/// Database configuration
#[derive(Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string (redacted in Debug output)
    pub url: SecretString,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Statement timeout in seconds
    pub statement_timeout_seconds: u32,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("statement_timeout_seconds", &self.statement_timeout_seconds)
            .finish()
    }
}

impl DatabaseConfig {
    /// Read `DATABASE_URL`, `DB_MAX_CONNECTIONS` and `DB_STATEMENT_TIMEOUT_SECONDS`.
    ///
    /// # Errors
    ///
    /// Returns `CommonError::Configuration` if the URL is missing or a numeric
    /// value does not parse to a positive integer.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, CommonError> {
        let url = vars
            .get("DATABASE_URL")
            .ok_or_else(|| {
                CommonError::Configuration("Missing required environment variable: DATABASE_URL".to_string())
            })?
            .clone();

        let max_connections =
            parse_positive(vars, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?;
        let statement_timeout_seconds = parse_positive(
            vars,
            "DB_STATEMENT_TIMEOUT_SECONDS",
            DEFAULT_DB_STATEMENT_TIMEOUT_SECONDS,
        )?;

        Ok(Self {
            url: SecretString::from(url),
            max_connections,
            statement_timeout_seconds,
        })
    }
}

fn parse_positive(
    vars: &HashMap<String, String>,
    key: &str,
    default: u32,
) -> Result<u32, CommonError> {
    let Some(value_str) = vars.get(key) else {
        return Ok(default);
    };

    let value: u32 = value_str.parse().map_err(|e| {
        CommonError::Configuration(format!(
            "{key} must be a valid positive integer, got '{value_str}': {e}"
        ))
    })?;

    if value == 0 {
        return Err(CommonError::Configuration(format!(
            "{key} must be greater than 0"
        )));
    }

    Ok(value)
}

/// Observability configuration
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub default_filter: String,
    /// Enable JSON-formatted logs (`LOG_FORMAT=json`)
    pub json_logs: bool,
}

impl ObservabilityConfig {
    /// Build from environment variables, falling back to `default_filter`.
    #[must_use]
    pub fn from_vars(vars: &HashMap<String, String>, default_filter: &str) -> Self {
        let json_logs = vars
            .get("LOG_FORMAT")
            .is_some_and(|v| v.eq_ignore_ascii_case("json"));

        Self {
            default_filter: default_filter.to_string(),
            json_logs,
        }
    }
}
