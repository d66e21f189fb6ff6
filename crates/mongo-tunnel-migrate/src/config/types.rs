//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// SSH tunnel to the destination's network.
    pub tunnel: TunnelConfig,

    /// Destination database (reached through the tunnel).
    pub destination: DestinationConfig,

    /// Source (legacy) database.
    pub source: SourceConfig,

    /// Migration behavior configuration.
    #[serde(default)]
    pub migration: MigrationConfig,
}

/// SSH tunnel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TunnelConfig {
    /// Bastion host to tunnel through.
    pub host: String,

    /// SSH username on the bastion.
    pub user: String,

    /// Path to the SSH private key file.
    #[serde(default = "default_key_path_buf")]
    pub key_path: PathBuf,

    /// Remote database host the tunnel forwards to.
    pub remote_host: String,

    /// Remote database port (default: 27017).
    #[serde(default = "default_mongo_port")]
    pub remote_port: u16,
}

/// Destination database configuration.
///
/// The destination is reached as `127.0.0.1:<tunnel local port>`, so only
/// credentials and the TLS trust anchor are configured here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationConfig {
    /// Username.
    pub user: String,

    /// Password.
    pub password: String,

    /// Path to the TLS CA bundle.
    #[serde(default = "default_ca_path_buf")]
    pub ca_file: PathBuf,
}

/// Source database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Full connection string for the legacy instance.
    pub uri: String,
}

/// Migration behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Documents per bulk insert (default: 1000).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

pub(super) fn default_mongo_port() -> u16 {
    27017
}

pub(super) fn default_key_path() -> String {
    "creds/adh-db-proxy.pem".to_string()
}

pub(super) fn default_ca_path() -> String {
    "creds/global-bundle.pem".to_string()
}

fn default_key_path_buf() -> PathBuf {
    default_key_path().into()
}

fn default_ca_path_buf() -> PathBuf {
    default_ca_path().into()
}

fn default_batch_size() -> usize {
    crate::migrator::DEFAULT_BATCH_SIZE
}
