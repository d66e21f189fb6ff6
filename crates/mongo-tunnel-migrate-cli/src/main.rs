//! mongo-tunnel-migrate CLI - one-shot batched migration over an SSH tunnel.

use clap::Parser;
use mongo_tunnel_migrate::{
    BatchMigrator, Config, MigrateError, MigrationSummary, MongoStore, SshTunnel,
};
use std::process::ExitCode;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "mongo-tunnel-migrate")]
#[command(about = "Migrate all user databases from a legacy MongoDB to a new instance over SSH")]
#[command(version)]
struct Cli {
    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    /// Override the documents-per-insert batch size
    #[arg(long)]
    batch_size: Option<usize>,

    /// Output JSON summary to stdout
    #[arg(long)]
    output_json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(|e| MigrateError::Config(e.to_string()))?;

    let mut config = Config::from_env()?;
    if let Some(batch_size) = cli.batch_size {
        config.migration.batch_size = batch_size;
    }
    config.validate()?;
    info!("Loaded configuration from environment");

    let tunnel = SshTunnel::open(&config.tunnel).await?;

    // Everything after the tunnel is up runs inside this block so that the
    // tunnel and both clients are released on success and on error alike.
    let result = migrate(&config, tunnel.local_port()).await;

    tunnel.close().await;

    let summary = result?;

    if cli.output_json {
        println!(
            "{}",
            summary
                .to_json()
                .map_err(|e| MigrateError::Config(e.to_string()))?
        );
    } else {
        println!("\nMigration completed successfully!");
        println!("  Run ID: {}", summary.run_id);
        println!("  Duration: {:.2}s", summary.duration_seconds);
        println!(
            "  Databases: {}, collections: {}",
            summary.databases, summary.collections
        );
        println!("  Documents: {}", summary.documents_migrated);
        println!("  Throughput: {} docs/sec", summary.docs_per_second);
    }

    Ok(())
}

/// Connect both stores, run the migrator, and close the stores on every
/// exit path before handing the result back.
async fn migrate(config: &Config, local_port: u16) -> Result<MigrationSummary, MigrateError> {
    let source = MongoStore::connect_source(&config.source)
        .await?
        .with_page_hint(config.migration.batch_size);
    let destination = match MongoStore::connect_destination(&config.destination, local_port).await {
        Ok(store) => store,
        Err(e) => {
            source.close().await;
            return Err(e);
        }
    };
    info!("Connected to both databases");

    let result = BatchMigrator::new(&source, &destination)
        .with_batch_size(config.migration.batch_size)
        .run()
        .await;

    destination.close().await;
    source.close().await;
    result
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}
