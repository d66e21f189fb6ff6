//! Configuration validation.

use super::Config;
use crate::error::{MigrateError, Result};

/// Validate a fully-constructed configuration.
pub(super) fn validate(config: &Config) -> Result<()> {
    let mut errors = Vec::new();

    if config.tunnel.host.trim().is_empty() {
        errors.push("tunnel host must not be empty".to_string());
    }
    if config.tunnel.user.trim().is_empty() {
        errors.push("SSH username must not be empty".to_string());
    }
    if config.tunnel.remote_host.trim().is_empty() {
        errors.push("remote database host must not be empty".to_string());
    }
    if config.destination.user.trim().is_empty() {
        errors.push("destination user must not be empty".to_string());
    }
    if config.destination.password.is_empty() {
        errors.push("destination password must not be empty".to_string());
    }
    if config.source.uri.trim().is_empty() {
        errors.push("source connection string must not be empty".to_string());
    }
    if config.migration.batch_size == 0 {
        errors.push("batch size must be at least 1".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(MigrateError::Config(errors.join("; ")))
    }
}
