//! rma-batch - RMA and buffer stock reconciliation
//!
//! `run` performs one batch for a product line and prints the result as a
//! single JSON object on stdout (exit 0 on success, 1 otherwise). `serve`
//! exposes the same batch plus upload and product line management over HTTP.
//! All logging goes to stderr so stdout stays machine-readable.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rma_batch::{batch, build_router, AppState, BatchContext, BatchResult};
use rma_common::config::{load_config, Overrides, Settings, DEFAULT_LOG_LEVEL};
use rma_common::db;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Shown under --help for callers of the flag-only batch job
const MIGRATION_NOTE: &str = "Note: the flag-only form `--db-url --db-user --db-password --product-type` \
is not accepted. Use `rma-batch run --product-type <LINE>` and put any credentials in --db-url.";

/// Command-line arguments for rma-batch
#[derive(Parser, Debug)]
#[command(name = "rma-batch")]
#[command(about = "Upsert RMA history and buffer stock spreadsheets into per-product-line tables")]
#[command(version)]
#[command(after_help = MIGRATION_NOTE)]
struct Args {
    /// Config file (defaults to <config dir>/rma-batch/config.toml when present)
    #[arg(long, global = true, env = "RMA_CONFIG")]
    config: Option<PathBuf>,

    /// Database connection URL
    #[arg(long, global = true, env = "RMA_DATABASE_URL")]
    db_url: Option<String>,

    /// Folder holding the spreadsheet exports
    #[arg(long, global = true, env = "RMA_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one batch for a product line and print the JSON result
    Run {
        /// Product line to process (e.g. VGA, MB, MiniPC)
        #[arg(long, alias = "product-line")]
        product_type: String,
    },

    /// Serve the HTTP API
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "RMA_PORT")]
        port: Option<u16>,

        /// Address to bind
        #[arg(long, env = "RMA_BIND")]
        bind: Option<String>,
    },

    /// List registered product lines, optionally adding or removing one first
    ProductLines {
        #[arg(long, conflicts_with = "remove")]
        add: Option<String>,

        #[arg(long)]
        remove: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let (bind, port) = match &args.command {
        Command::Serve { bind, port } => (bind.clone(), *port),
        _ => (None, None),
    };
    let overrides = Overrides {
        database_url: args.db_url.clone(),
        data_dir: args.data_dir.clone(),
        bind,
        port,
    };

    let settings = match load_config(args.config.as_deref()) {
        Ok((file, source)) => {
            let settings = Settings::resolve(overrides, file);
            init_tracing(&settings.log_level);
            if let Some(path) = source {
                info!("Loaded config from {}", path.display());
            }
            settings
        }
        Err(e) => {
            init_tracing(DEFAULT_LOG_LEVEL);
            error!("{}", e);
            if let Command::Run { product_type } = &args.command {
                print_result(&BatchResult::failure(product_type.as_str(), e.to_string()))?;
                return Ok(ExitCode::from(1));
            }
            return Err(e).context("Failed to load configuration");
        }
    };

    match args.command {
        Command::Run { product_type } => run(&settings, &product_type).await,
        Command::Serve { .. } => serve(&settings).await,
        Command::ProductLines { add, remove } => product_lines(&settings, add, remove).await,
    }
}

/// Route logs to stderr; RUST_LOG wins over the configured level
fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "rma_batch={level},rma_common={level},tower_http={level}",
                    level = level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_result(result: &BatchResult) -> Result<()> {
    let json = serde_json::to_string(result).context("Failed to encode batch result")?;
    println!("{}", json);
    Ok(())
}

async fn run(settings: &Settings, product_type: &str) -> Result<ExitCode> {
    info!(
        "Starting rma-batch v{} for product line {}",
        env!("CARGO_PKG_VERSION"),
        product_type
    );
    info!("Database: {}", db::redact_url(&settings.database_url));
    info!("Data folder: {}", settings.data_dir.display());

    let ctx = BatchContext::new(settings.data_dir.clone()).with_fields(settings.fields.clone());
    let result = batch::execute_batch(&settings.database_url, &ctx, product_type.trim()).await;

    if result.success {
        info!("{}", result.message);
    } else {
        warn!("{}", result.message);
    }

    print_result(&result)?;
    Ok(ExitCode::from(result.exit_code()))
}

async fn serve(settings: &Settings) -> Result<ExitCode> {
    info!("Starting rma-batch v{} HTTP server", env!("CARGO_PKG_VERSION"));
    info!("Database: {}", db::redact_url(&settings.database_url));
    info!("Data folder: {}", settings.data_dir.display());

    let pool = db::init_database(&settings.database_url)
        .await
        .context("Failed to connect to database")?;
    info!("Connected to database");

    let state = AppState::new(pool.clone(), settings.data_dir.clone())
        .with_fields(settings.fields.clone());
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", settings.bind, settings.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", settings.bind, settings.port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("rma-batch listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    pool.close().await;
    info!("Server shutdown complete");
    Ok(ExitCode::SUCCESS)
}

async fn product_lines(
    settings: &Settings,
    add: Option<String>,
    remove: Option<String>,
) -> Result<ExitCode> {
    let pool = db::init_database(&settings.database_url)
        .await
        .context("Failed to connect to database")?;

    if let Some(name) = add {
        db::add_product_line(&pool, name.trim()).await?;
        info!("Added product line {}", name.trim());
    }
    if let Some(name) = remove {
        db::remove_product_line(&pool, name.trim()).await?;
        info!("Removed product line {}", name.trim());
    }

    let names = db::list_product_line_names(&pool).await?;
    pool.close().await;

    println!("{}", serde_json::to_string(&names)?);
    Ok(ExitCode::SUCCESS)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
