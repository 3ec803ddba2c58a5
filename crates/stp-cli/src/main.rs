use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use stp_engines::{evaluate_categories, evaluate_milestones};
use stp_providers::{provider_from_env, DataProvider, MockProvider};
use stp_store::{MemStore, RecordStore};
use stp_web::AppState;

const SYNC_CRON_ENV: &str = "STP_SYNC_CRON";
const MILESTONE_CRON_ENV: &str = "STP_MILESTONE_CRON";

// 6-field cron, seconds first: daily at 06:00 / 06:30 UTC.
const DEFAULT_SYNC_CRON: &str = "0 0 6 * * *";
const DEFAULT_MILESTONE_CRON: &str = "0 30 6 * * *";

#[derive(Debug, Parser)]
#[command(name = "stp-cli")]
#[command(about = "Sales training pipeline dashboard backend")]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Full sync from the generated mock cohort, then a milestone pass.
    Seed,
    /// Run one sync module by name, or all of them.
    Sync {
        /// new_joiners | scores | leads | revenue | roi | claims
        module: Option<String>,
    },
    /// Re-derive every active rep's performance category.
    Categorize,
    /// Refresh tenure and raise escalation alerts.
    Milestones,
    /// Serve the dashboard API without background jobs.
    Serve,
    /// Serve the dashboard API with scheduled sync and milestone jobs.
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let store: Arc<dyn RecordStore> = Arc::new(MemStore::new());
    let provider = provider_from_env()?;
    info!(provider = provider.variant(), "data provider selected");

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Seed => {
            let mock = MockProvider::new();
            let outcomes = stp_sync::sync_all(store.as_ref(), &mock, Utc::now()).await?;
            let milestones = evaluate_milestones(store.as_ref(), Utc::now()).await?;
            for outcome in outcomes {
                println!(
                    "{}: fetched={} upserted={} skipped={}",
                    outcome.module, outcome.fetched, outcome.upserted, outcome.skipped
                );
            }
            println!(
                "seeded: reps={} alerts_raised={}",
                milestones.evaluated, milestones.alerts_raised
            );
        }
        Commands::Sync { module } => match module {
            Some(name) => {
                let outcome =
                    stp_sync::sync_module(store.as_ref(), provider.as_ref(), &name, Utc::now())
                        .await?;
                println!(
                    "{}: fetched={} upserted={} skipped={}",
                    outcome.module, outcome.fetched, outcome.upserted, outcome.skipped
                );
            }
            None => {
                let outcomes =
                    stp_sync::sync_all(store.as_ref(), provider.as_ref(), Utc::now()).await?;
                for outcome in outcomes {
                    println!(
                        "{}: fetched={} upserted={} skipped={}",
                        outcome.module, outcome.fetched, outcome.upserted, outcome.skipped
                    );
                }
            }
        },
        Commands::Categorize => {
            let summary = evaluate_categories(store.as_ref()).await?;
            println!(
                "categorization complete: evaluated={} skipped={}",
                summary.evaluated, summary.skipped
            );
        }
        Commands::Milestones => {
            let summary = evaluate_milestones(store.as_ref(), Utc::now()).await?;
            println!(
                "milestone pass complete: evaluated={} alerts_raised={}",
                summary.evaluated, summary.alerts_raised
            );
        }
        Commands::Serve => {
            stp_web::serve_from_env(AppState::new(store, provider)).await?;
        }
        Commands::Run => {
            let scheduler = build_scheduler(store.clone(), provider.clone()).await?;
            scheduler.start().await.context("starting scheduler")?;
            stp_web::serve_from_env(AppState::new(store, provider)).await?;
        }
    }

    Ok(())
}

async fn build_scheduler(
    store: Arc<dyn RecordStore>,
    provider: Arc<dyn DataProvider>,
) -> Result<JobScheduler> {
    let sched = JobScheduler::new().await.context("creating scheduler")?;

    let sync_cron = cron_from_env(SYNC_CRON_ENV, DEFAULT_SYNC_CRON);
    let sync_store = store.clone();
    let sync_provider = provider.clone();
    let sync_job = Job::new_async(sync_cron.as_str(), move |_uuid, _l| {
        let store = sync_store.clone();
        let provider = sync_provider.clone();
        Box::pin(async move {
            if let Err(err) = stp_sync::sync_all(store.as_ref(), provider.as_ref(), Utc::now()).await
            {
                error!(error = %format!("{err:#}"), "scheduled sync failed");
            }
        })
    })
    .with_context(|| format!("creating sync job for cron {sync_cron}"))?;
    sched.add(sync_job).await.context("adding sync job")?;

    let milestone_cron = cron_from_env(MILESTONE_CRON_ENV, DEFAULT_MILESTONE_CRON);
    let milestone_job = Job::new_async(milestone_cron.as_str(), move |_uuid, _l| {
        let store = store.clone();
        Box::pin(async move {
            if let Err(err) = evaluate_milestones(store.as_ref(), Utc::now()).await {
                error!(error = %format!("{err:#}"), "scheduled milestone pass failed");
            }
        })
    })
    .with_context(|| format!("creating milestone job for cron {milestone_cron}"))?;
    sched
        .add(milestone_job)
        .await
        .context("adding milestone job")?;

    Ok(sched)
}

fn cron_from_env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
