//! # mongo-tunnel-migrate
//!
//! One-shot migration of all user databases from a legacy MongoDB instance
//! to a new MongoDB-compatible instance (e.g. DocumentDB) reached through
//! an SSH tunnel.
//!
//! The crate is split into a small set of collaborators:
//!
//! - **Config**: environment-derived configuration, loaded once at startup
//! - **SshTunnel**: scoped local port-forward to the destination host
//! - **DocumentStore**: capability contract over a connected database
//! - **BatchMigrator**: the copy loop — enumerate, stream, batch, insert
//!
//! ## Example
//!
//! ```rust,no_run
//! use mongo_tunnel_migrate::{BatchMigrator, Config, MongoStore, SshTunnel};
//!
//! #[tokio::main]
//! async fn main() -> mongo_tunnel_migrate::Result<()> {
//!     let config = Config::from_env()?;
//!     let tunnel = SshTunnel::open(&config.tunnel).await?;
//!     let source = MongoStore::connect_source(&config.source).await?;
//!     let destination =
//!         MongoStore::connect_destination(&config.destination, tunnel.local_port()).await?;
//!
//!     let summary = BatchMigrator::new(&source, &destination)
//!         .with_batch_size(config.migration.batch_size)
//!         .run()
//!         .await?;
//!     println!("Migrated {} documents", summary.documents_migrated);
//!
//!     destination.close().await;
//!     source.close().await;
//!     tunnel.close().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod migrator;
pub mod store;
pub mod tunnel;

// Re-exports for convenient access
pub use config::{Config, DestinationConfig, MigrationConfig, SourceConfig, TunnelConfig};
pub use error::{MigrateError, Result};
pub use migrator::{BatchMigrator, CollectionStats, MigrationSummary, DEFAULT_BATCH_SIZE, EXCLUDED_DATABASES};
pub use store::{DocumentStore, MongoStore};
pub use tunnel::SshTunnel;
