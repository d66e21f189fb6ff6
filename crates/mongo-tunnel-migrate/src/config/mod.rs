//! Configuration loading and validation.
//!
//! All configuration is environment-derived, matching the deployment shape
//! of the original tooling: credentials and endpoints live in the process
//! environment (typically populated from a `.env` file by the shell), and
//! the config struct is built exactly once at startup. The core never
//! reads the environment directly.

mod types;
mod validation;

pub use types::*;

use crate::error::{MigrateError, Result};

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Split out from [`from_env`](Self::from_env) so tests can supply
    /// variables without mutating process-global state.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| {
                    MigrateError::Config(format!("missing required environment variable {key}"))
                })
        };

        let batch_size = match lookup("MIGRATE_BATCH_SIZE") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
                MigrateError::Config(format!("MIGRATE_BATCH_SIZE is not a valid count: {raw:?}"))
            })?,
            None => crate::migrator::DEFAULT_BATCH_SIZE,
        };

        let remote_port = match lookup("MONGO_DB_PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| {
                MigrateError::Config(format!("MONGO_DB_PORT is not a valid port: {raw:?}"))
            })?,
            None => types::default_mongo_port(),
        };

        let config = Config {
            tunnel: TunnelConfig {
                host: required("EC2_URI")?,
                user: required("SSH_USERNAME")?,
                key_path: lookup("SSH_KEY_PATH")
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or_else(types::default_key_path)
                    .into(),
                remote_host: required("MONGO_DB_URI")?,
                remote_port,
            },
            destination: DestinationConfig {
                user: required("MONGO_DB_USER")?,
                password: required("MONGO_DB_PASS")?,
                ca_file: lookup("TLS_CA_FILE")
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or_else(types::default_ca_path)
                    .into(),
            },
            source: SourceConfig {
                uri: required("OLD_MONGO_DB_CONNECTION_STRING")?,
            },
            migration: MigrationConfig { batch_size },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}
