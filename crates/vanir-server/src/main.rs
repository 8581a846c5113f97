//! vanir - vanity import path server.
//!
//! CLI entry point: `serve` runs the resolution and ops listeners, the
//! remaining sub-commands manage entries through the selected backend.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use vanir::{Backend, MemoryBackend};
use vanir_store::{FileBackend, SqliteBackend};

mod commands;
mod config;
mod error;
mod handler;
mod metrics;
mod ops;
mod output;

use config::ServerConfig;
use error::{Result, ServerError};
use metrics::Metrics;

#[derive(Parser, Debug)]
#[command(name = "vanir")]
#[command(author, version, about = "Vanity import path server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Storage backend serving the vanity entries
    #[arg(long, value_enum, env = "VANIR_BACKEND", default_value = "memory", global = true)]
    backend: BackendKind,

    /// TOML file holding the entries (backend `file`)
    #[arg(long, env = "VANIR_FILE", global = true)]
    file: Option<PathBuf>,

    /// Database connection string (backend `sqlite`)
    #[arg(long, env = "VANIR_DATABASE_URL", default_value = "sqlite:./vanir.db", global = true)]
    database_url: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum BackendKind {
    Memory,
    File,
    Sqlite,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve vanity URLs over HTTP
    Serve,
    /// Add a vanity URL
    Add {
        import_path: String,
        vcs: String,
        vcs_root: String,
    },
    /// Get a vanity URL
    Get {
        import_path: String,
        /// Output in JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a vanity URL
    Remove { import_path: String },
    /// List vanity URLs
    List {
        /// Output in JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("vanir=debug,vanir_server=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("vanir=info,vanir_server=info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let backend = open_backend(&cli).await?;

    let outcome = match &cli.command {
        Commands::Serve => serve(backend.clone()).await,
        Commands::Add {
            import_path,
            vcs,
            vcs_root,
        } => commands::add(backend.as_ref(), import_path, vcs, vcs_root).await,
        Commands::Get { import_path, json } => {
            commands::get(backend.as_ref(), import_path, *json).await
        }
        Commands::Remove { import_path } => commands::remove(backend.as_ref(), import_path).await,
        Commands::List { json } => commands::list(backend.as_ref(), *json).await,
    };

    let closed = backend.close().await;
    outcome?;
    closed.map_err(ServerError::from)
}

async fn open_backend(cli: &Cli) -> Result<Arc<dyn Backend>> {
    let backend: Arc<dyn Backend> = match cli.backend {
        BackendKind::Memory => Arc::new(MemoryBackend::new()),
        BackendKind::File => {
            let path = cli.file.as_ref().ok_or_else(|| {
                ServerError::Config("--file is required for the file backend".to_string())
            })?;
            Arc::new(FileBackend::from_path(path).await?)
        }
        BackendKind::Sqlite => Arc::new(SqliteBackend::connect(&cli.database_url).await?),
    };
    Ok(backend)
}

async fn serve(backend: Arc<dyn Backend>) -> Result<()> {
    let config = ServerConfig::from_env()?;
    let host: IpAddr = config
        .host
        .parse()
        .map_err(|_| ServerError::Config("Invalid VANIR_HOST value".to_string()))?;

    let metrics = Arc::new(Metrics::new());

    let vanity = handler::router(Arc::new(handler::VanityState {
        backend: backend.clone(),
        doc_base_url: config.doc_base_url.clone(),
        call_deadline: Duration::from_secs(config.call_deadline_seconds),
        metrics: metrics.clone(),
    }));
    let ops = ops::router(Arc::new(ops::OpsState { backend, metrics }));

    let vanity_addr = SocketAddr::new(host, config.port);
    let ops_addr = SocketAddr::new(host, config.ops_port);

    let vanity_listener = tokio::net::TcpListener::bind(vanity_addr).await?;
    let ops_listener = tokio::net::TcpListener::bind(ops_addr).await?;

    info!("resolution listener on http://{vanity_addr}");
    info!("ops listener on http://{ops_addr}");

    let ops_task = tokio::spawn(async move {
        axum::serve(ops_listener, ops)
            .with_graceful_shutdown(shutdown_signal())
            .await
    });

    axum::serve(vanity_listener, vanity)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Ok(result) = ops_task.await {
        result?;
    }

    info!("vanir exited");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = tokio::signal::ctrl_c() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
