//! Error types for the migration library.

use thiserror::Error;

/// Main error type for migration operations.
///
/// Every variant corresponds to one stage of the run. No error is retried
/// or swallowed: the first failure unwinds to the top-level handler, which
/// performs cleanup and maps it to an exit status.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (missing or invalid environment variable)
    #[error("Configuration error: {0}")]
    Config(String),

    /// SSH tunnel could not be established or died while starting
    #[error("Tunnel error: {0}")]
    Tunnel(String),

    /// Client handshake with source or destination failed
    #[error("Connection to {target} failed: {message}")]
    Connect { target: String, message: String },

    /// Listing databases or collections failed
    #[error("Failed to enumerate {scope}: {message}")]
    Enumeration { scope: String, message: String },

    /// Source cursor failed mid-read
    #[error("Cursor failed reading {database}.{collection}: {message}")]
    Stream {
        database: String,
        collection: String,
        message: String,
    },

    /// Bulk insert rejected by the destination
    #[error("Bulk insert failed for {database}.{collection}: {message}")]
    Write {
        database: String,
        collection: String,
        message: String,
    },

    /// IO error (key file, local socket)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MigrateError {
    /// Create a Connect error.
    pub fn connect(target: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Connect {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Create an Enumeration error.
    pub fn enumeration(scope: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Enumeration {
            scope: scope.into(),
            message: message.into(),
        }
    }

    /// Create a Stream error.
    pub fn stream(
        database: impl Into<String>,
        collection: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        MigrateError::Stream {
            database: database.into(),
            collection: collection.into(),
            message: message.into(),
        }
    }

    /// Create a Write error.
    pub fn write(
        database: impl Into<String>,
        collection: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        MigrateError::Write {
            database: database.into(),
            collection: collection.into(),
            message: message.into(),
        }
    }

    /// Stage identifier for diagnostics and tests.
    pub fn stage(&self) -> &'static str {
        match self {
            MigrateError::Config(_) => "config",
            MigrateError::Tunnel(_) => "tunnel",
            MigrateError::Connect { .. } => "connect",
            MigrateError::Enumeration { .. } => "enumeration",
            MigrateError::Stream { .. } => "stream",
            MigrateError::Write { .. } => "write",
            MigrateError::Io(_) => "io",
        }
    }

    /// Exit code for the CLI process.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) => 2,
            MigrateError::Tunnel(_) => 3,
            MigrateError::Connect { .. } => 3,
            MigrateError::Enumeration { .. } => 4,
            MigrateError::Stream { .. } => 5,
            MigrateError::Write { .. } => 6,
            MigrateError::Io(_) => 1,
        }
    }

    /// Format error with full details including error chain.
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
