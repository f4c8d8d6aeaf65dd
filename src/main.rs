use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;

use drift_watcher::config::AppConfig;
use drift_watcher::dom::{ChromeDomProvider, DomProvider};
use drift_watcher::models::SiteConfig;
use drift_watcher::reconciler::{CycleOutcome, LoopSettings, ReconciliationLoop};
use drift_watcher::refresher::ProductRefresher;
use drift_watcher::scheduler::CronTrigger;
use drift_watcher::store::ConfigStore;
use drift_watcher::{service, telemetry};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Reconcile now, then on every interval until Ctrl-C (default)
    Run,
    /// Run a single reconciliation cycle and exit
    Once,
    /// Probe every platform and print the discovered selectors without saving
    Inspect,
    /// Print the most recent update log entries
    Log {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    let _log_guard = telemetry::init_tracing(&config.logging);
    let store = ConfigStore::from_config(&config.storage);

    let command = cli.command.unwrap_or(Command::Run);
    if let Command::Log { limit } = command {
        print_log(&store, limit);
        return Ok(());
    }

    let dom: Arc<dyn DomProvider> = Arc::new(ChromeDomProvider::connect(config.scraper.clone())?);
    let refresher = Arc::new(ProductRefresher::new(
        Arc::clone(&dom),
        &config.storage.products_path,
        config.refresh.clone(),
    ));
    let watcher = Arc::new(ReconciliationLoop::new(
        dom,
        store,
        refresher,
        LoopSettings::from_config(&config),
    ));

    match command {
        Command::Inspect => {
            let (platforms, failures) = watcher.probe_platforms().await;
            for failure in &failures {
                eprintln!("{}", failure);
            }
            println!("{}", serde_json::to_string_pretty(&SiteConfig::new(platforms))?);
        }
        Command::Once => match watcher.run_cycle().await {
            CycleOutcome::Aborted { reason } => anyhow::bail!("Cycle aborted: {}", reason),
            outcome => tracing::debug!("{:?}", outcome),
        },
        _ => {
            telemetry::init_metrics(&config.metrics)?;
            let trigger = CronTrigger::new().await?;

            tracing::info!("Press Ctrl+C to stop");
            service::run_until_stopped(watcher, &trigger, config.scheduler.interval_hours, async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("Failed to listen for shutdown signal: {}", e);
                }
            })
            .await?;
        }
    }

    Ok(())
}

fn print_log(store: &ConfigStore, limit: usize) {
    let entries = store.read_log();
    let skip = entries.len().saturating_sub(limit);

    for entry in entries.into_iter().skip(skip) {
        println!(
            "{} [{}] {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.kind,
            entry.message
        );
    }
}
