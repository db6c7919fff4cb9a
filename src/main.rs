mod cli;

use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use cli::{Cli, Commands};
use livora::config::Config;
use livora::engine::{EngineSettings, JobEngine};
use livora::notify::LogDispatcher;
use livora::observability::init_tracing;
use livora::store::FjallStore;
use tracing::info;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[tokio::main]
async fn main() -> Result<(), AnyError> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from_path(path.clone()),
        None => Config::load(),
    }
    .map_err(|e| format!("Failed to load config: {e}"))?;

    init_tracing(&config.telemetry.log_filter);

    info!(path = %config.server.data_dir.display(), "Opening Fjall store");
    let store = FjallStore::open(&config.server.data_dir)
        .map_err(|e| format!("Failed to open Fjall store: {e}"))?;

    let engine = JobEngine::open(
        Arc::new(store.clone()),
        Arc::new(LogDispatcher::new()),
        EngineSettings::from(&config.ledger),
    )
    .await?;

    match cli.command {
        Commands::Serve(args) => {
            let address = args.address.unwrap_or(config.server.bind_addr);
            livora::api::run(config, Arc::new(engine), address).await?;
        }
        Commands::Sweep => {
            let refunded = engine.expire_lapsed(Utc::now()).await?;
            info!(count = refunded.len(), "Sweep finished");
            for job_id in refunded {
                println!("{job_id}");
            }
        }
        Commands::Reset => {
            engine.clear_all_data().await?;
            info!("Session reset");
        }
        Commands::Show => {
            let stats = store.stats()?;
            info!(
                records = stats.record_count,
                bytes = stats.value_bytes,
                "Store stats"
            );
            println!("{}", serde_json::to_string_pretty(&engine.session().await)?);
        }
    }

    Ok(())
}
