//! Process configuration read from environment variables.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `INVTRACK_SEQUENCE_BACKEND` | `memory` | `memory` or `postgres` |
//! | `DATABASE_URL` | unset | required when the backend is `postgres` |
//! | `INVTRACK_DATABASE_MAX_CONNECTIONS` | `5` | Postgres pool size |
//! | `INVTRACK_DEFAULT_ID_FORMAT` | `ITEM-` + 4-digit sequence | format JSON for new inventories |

use std::str::FromStr;

use thiserror::Error;

use invtrack_custom_id::{FormatDefinition, FormatError};

pub const SEQUENCE_BACKEND_VAR: &str = "INVTRACK_SEQUENCE_BACKEND";
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";
pub const DATABASE_MAX_CONNECTIONS_VAR: &str = "INVTRACK_DATABASE_MAX_CONNECTIONS";
pub const DEFAULT_ID_FORMAT_VAR: &str = "INVTRACK_DEFAULT_ID_FORMAT";

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown sequence backend '{0}' (expected 'memory' or 'postgres')")]
    UnknownBackend(String),

    #[error("DATABASE_URL must be set when the postgres sequence backend is selected")]
    MissingDatabaseUrl,

    #[error("INVTRACK_DEFAULT_ID_FORMAT is not a valid format: {0}")]
    InvalidDefaultFormat(#[source] FormatError),

    #[error("{var} must be a positive integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },
}

/// Where ordinal counters live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequenceBackend {
    #[default]
    Memory,
    Postgres,
}

impl FromStr for SequenceBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(Self::Memory),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfraConfig {
    pub sequence_backend: SequenceBackend,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub default_id_format: FormatDefinition,
}

impl Default for InfraConfig {
    fn default() -> Self {
        Self {
            sequence_backend: SequenceBackend::Memory,
            database_url: None,
            database_max_connections: DEFAULT_MAX_CONNECTIONS,
            default_id_format: FormatDefinition::default_item(),
        }
    }
}

impl InfraConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let sequence_backend = match non_empty(SEQUENCE_BACKEND_VAR) {
            Some(raw) => raw.parse()?,
            None => SequenceBackend::default(),
        };

        let database_url = non_empty(DATABASE_URL_VAR);
        if sequence_backend == SequenceBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingDatabaseUrl);
        }

        let database_max_connections = match non_empty(DATABASE_MAX_CONNECTIONS_VAR) {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidNumber {
                        var: DATABASE_MAX_CONNECTIONS_VAR,
                        value: raw,
                    });
                }
            },
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let default_id_format = match non_empty(DEFAULT_ID_FORMAT_VAR) {
            Some(raw) => invtrack_custom_id::parse(&raw).map_err(ConfigError::InvalidDefaultFormat)?,
            None => FormatDefinition::default_item(),
        };

        Ok(Self {
            sequence_backend,
            database_url,
            database_max_connections,
            default_id_format,
        })
    }
}
