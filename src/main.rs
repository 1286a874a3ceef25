use clap::{Parser, Subcommand, ValueEnum};
use leadx_api::RestApi;
use leadx_core::{Collection, Result as CoreResult};
use leadx_import::{prospect, DataSource, ImportConfig, ImportReconciler};
use leadx_storage::{Entity, StorageManager};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Prospect import and filtering service
#[derive(Parser, Debug)]
#[command(name = "leadx")]
#[command(about = "Imports prospects and serves declarative filters over them", long_about = None)]
struct Args {
    /// Path to the data directory
    #[arg(short, long, global = true, default_value = "./data")]
    data_dir: PathBuf,

    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the REST API
    Serve {
        /// HTTP API port
        #[arg(long, default_value_t = 8080)]
        http_port: u16,
    },
    /// Import prospects from external sources
    Import {
        #[arg(long, value_enum, default_value_t = SourceSelection::All)]
        source: SourceSelection,

        /// ERP user directory endpoint
        #[arg(long, env = "LEADX_ERP_URL")]
        erp_url: Option<String>,

        /// Küba people directory endpoint
        #[arg(long, env = "LEADX_KUEBA_URL")]
        kueba_url: Option<String>,

        /// Per-request timeout
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SourceSelection {
    Erp,
    Kueba,
    All,
}

impl SourceSelection {
    fn sources(self) -> Vec<DataSource> {
        match self {
            SourceSelection::Erp => vec![DataSource::Erp],
            SourceSelection::Kueba => vec![DataSource::Kueba],
            SourceSelection::All => DataSource::ALL.to_vec(),
        }
    }
}

fn open_storage(data_dir: &Path) -> CoreResult<(Arc<StorageManager>, Arc<Entity>)> {
    let storage = Arc::new(StorageManager::new(data_dir)?);
    let prospects = storage.register_with_casts(prospect::ENTITY, prospect::schema(), prospect::casts())?;
    info!(
        "Storage initialized: {} prospects ({} including trashed)",
        prospects.collection().count_live(),
        prospects.collection().len_with_trashed()
    );
    Ok((storage, prospects))
}

async fn serve(storage: Arc<StorageManager>, http_port: u16) -> anyhow::Result<()> {
    let storage_http = storage.clone();
    let http_handle = std::thread::spawn(move || {
        info!("Starting HTTP server on port {}", http_port);
        let sys = actix_web::rt::System::new();
        sys.block_on(async {
            if let Err(e) = RestApi::start(storage_http, http_port).await {
                error!("HTTP server error: {}", e);
            }
        })
    });

    info!("HTTP API: http://localhost:{}/api/filter/{}", http_port, prospect::ENTITY);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        _ = tokio::task::spawn_blocking(move || {
            http_handle.join().ok();
        }) => {
            info!("HTTP server stopped");
        }
    }

    info!("Shutting down...");
    storage.save()?;
    Ok(())
}

async fn import(
    storage: Arc<StorageManager>,
    prospects: Arc<Entity>,
    config: ImportConfig,
    selected: &[DataSource],
) -> anyhow::Result<()> {
    let adapters = config.adapters(selected)?;
    let collection: &Collection = prospects.collection();
    let reconciler = ImportReconciler::new(collection);
    let mut failed = Vec::new();

    for adapter in &adapters {
        if let Err(e) = reconciler.run(adapter).await {
            failed.push(format!("{}: {}", adapter.source().label(), e));
        }
    }

    storage.save()?;

    if !failed.is_empty() {
        anyhow::bail!("import failed for {} source(s): {}", failed.len(), failed.join("; "));
    }
    info!("Import complete: {} live prospects", prospects.collection().count_live());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting leadx v{}", env!("CARGO_PKG_VERSION"));
    info!("Data directory: {:?}", args.data_dir);

    let (storage, prospects) = open_storage(&args.data_dir)?;

    match args.command {
        Command::Serve { http_port } => serve(storage, http_port).await,
        Command::Import {
            source,
            erp_url,
            kueba_url,
            timeout_secs,
        } => {
            let config = ImportConfig {
                erp_url,
                kueba_url,
                timeout: Duration::from_secs(timeout_secs),
            };
            import(storage, prospects, config, &source.sources()).await
        }
    }
}
