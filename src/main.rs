use clap::Parser;
use miette::{IntoDiagnostic, Result};
use pickup_point::application::context::AppContext;
use pickup_point::application::dispatcher::WorkerPool;
use pickup_point::application::service::OrderService;
use pickup_point::domain::clock::SystemClock;
use pickup_point::domain::ports::OrderStorageBox;
use pickup_point::error::OrderError;
use pickup_point::infrastructure::events::LogEventSink;
use pickup_point::infrastructure::in_memory::JsonStorage;
#[cfg(feature = "storage-postgres")]
use pickup_point::infrastructure::postgres::PostgresStorage;
use pickup_point::interfaces::csv::command_reader::CommandReader;
use pickup_point::interfaces::csv::result_writer::ResultWriter;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Command CSV file
    commands: PathBuf,

    /// JSON snapshot to load on start and save on exit. Without it, state lives in memory only.
    #[arg(long, env = "PICKUP_SNAPSHOT")]
    snapshot: Option<PathBuf>,

    /// Postgres connection string. If provided, uses the relational backend.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Number of workers running commands concurrently.
    #[arg(long, default_value_t = 4)]
    workers: usize,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_ansi(false))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,pickup_point=debug")),
        )
        .init();
}

async fn open_storage(cli: &Cli) -> Result<OrderStorageBox> {
    if let Some(url) = &cli.database_url {
        #[cfg(feature = "storage-postgres")]
        {
            let storage = PostgresStorage::connect(url).await.into_diagnostic()?;
            storage.migrate().await.into_diagnostic()?;
            tracing::info!("Using postgres storage");
            return Ok(Box::new(storage));
        }
        #[cfg(not(feature = "storage-postgres"))]
        {
            let _ = url;
            tracing::warn!(
                "Postgres storage requested via --database-url, but 'storage-postgres' feature is not enabled. Falling back to JSON storage."
            );
        }
    }

    let storage = match &cli.snapshot {
        Some(path) => JsonStorage::open(path).await.into_diagnostic()?,
        None => JsonStorage::new(),
    };
    Ok(Box::new(storage))
}

/// Completes on Ctrl+C, or on SIGTERM where there is one.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::warn!(%error, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::warn!(%error, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C"),
        () = terminate => tracing::info!("Received SIGTERM"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let storage = open_storage(&cli).await?;
    let service =
        OrderService::new(storage, Arc::new(SystemClock)).with_events(Box::new(LogEventSink));
    let pool = WorkerPool::new(cli.workers, cli.workers.saturating_mul(2)).into_diagnostic()?;
    let mut context = AppContext::new(service, pool);

    let mut results = context
        .take_results()
        .ok_or_else(|| OrderError::internal("results already taken"))
        .into_diagnostic()?;
    let printer = tokio::spawn(async move {
        let mut writer = ResultWriter::new(io::stdout());
        while let Some(outcome) = results.recv().await {
            if let Err(e) = writer.write(&outcome) {
                tracing::error!(error = %e, "Error writing result");
            }
        }
    });

    let file = File::open(&cli.commands).into_diagnostic()?;
    let (rows_tx, mut rows) = mpsc::channel(cli.workers.max(1));
    tokio::task::spawn_blocking(move || {
        for request in CommandReader::new(file).commands() {
            if rows_tx.blocking_send(request).is_err() {
                break;
            }
        }
    });

    let submit_all = async {
        while let Some(request) = rows.recv().await {
            match request {
                Ok(request) => context.handle(request).await?,
                Err(e) => tracing::warn!(error = %e, "Error reading command"),
            }
        }
        Ok::<(), OrderError>(())
    };

    tokio::select! {
        submitted = submit_all => submitted.into_diagnostic()?,
        () = shutdown_signal() => tracing::info!("Finishing queued commands"),
    }

    context.shutdown().await.into_diagnostic()?;
    printer.await.into_diagnostic()?;
    Ok(())
}
