use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use watify_server::api::{self, AppState};
use watify_server::config::WatifyConfig;
use watify_server::error::ServerError;
use watify_server::factory;

/// Watify HTTP server and stage runner.
#[derive(Parser, Debug)]
#[command(name = "watify-server", about = "Queue, download and watify images")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "watify.toml")]
    config: PathBuf,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the record store table, then exit.
    Migrate,
    /// Process one notification batch and print the report as JSON.
    Handle {
        /// Which stage receives the batch.
        #[arg(value_enum)]
        kind: EventKind,
        /// Read the batch from this file instead of stdin.
        #[arg(long)]
        input: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum EventKind {
    /// Record-stream batch for the download stage.
    Records,
    /// Object notification batch for the watify stage.
    Objects,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = WatifyConfig::load(&cli.config)?;

    match cli.command {
        Some(Commands::Migrate) => {
            watify_server::telemetry::init_fmt();
            factory::migrate(&config.state).await?;
            return Ok(());
        }
        Some(Commands::Handle { kind, input }) => {
            watify_server::telemetry::init_fmt();
            return run_handle(&config, kind, input).await;
        }
        None => {}
    }

    let telemetry_guard = watify_server::telemetry::init(&config.telemetry);
    if !cli.config.exists() {
        info!(path = %cli.config.display(), "config file not found, using defaults");
    }

    let pipeline = factory::build_pipeline(&config).await?;
    // Memory stores publish their own changes; shared backends leave this empty.
    let _feeds = pipeline.spawn_change_feeds();
    let app = api::router(AppState::new(pipeline)?);

    let host = cli.host.unwrap_or(config.server.host);
    let port = cli.port.unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "watify-server listening");

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);
    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());
    if let Err(e) = server.await {
        warn!(error = %e, "server stopped with error");
    }

    // Give the exporter a bounded window to flush.
    let flush = tokio::task::spawn_blocking(move || telemetry_guard.shutdown());
    if tokio::time::timeout(shutdown_timeout, flush).await.is_err() {
        warn!(timeout_secs = shutdown_timeout.as_secs(), "telemetry flush timed out");
    }

    info!("watify-server stopped");
    Ok(())
}

async fn run_handle(
    config: &WatifyConfig,
    kind: EventKind,
    input: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    factory::ensure_shared_backends(config)?;
    let raw = match input {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let payload: serde_json::Value = serde_json::from_str(&raw)?;

    let pipeline = factory::build_pipeline(config).await?;
    let report = match kind {
        EventKind::Records => pipeline.download().handle_notification(&payload).await,
        EventKind::Objects => pipeline.watify().handle_notification(&payload).await,
    }
    .map_err(ServerError::from)?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    info!(
        items = report.len(),
        completed = report.completed(),
        failed = report.failed(),
        "batch handled"
    );
    Ok(())
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
