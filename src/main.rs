use anyhow::Context;
use dinacharya::config::ConfigLoader;
use dinacharya::error::AppError;
use dinacharya::models::reminder_repository::InMemoryReminderRepository;
use dinacharya::observability::{SchedulerMetrics, init_tracing};
use dinacharya::scheduler::{OwnerSnapshot, SchedulerEngine, SystemClock, TracingSink};
use dinacharya::services::ReminderManager;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::load().context("failed to load configuration")?;
    ConfigLoader::validate(&config)?;

    let _log_guard = init_tracing(&config.logging)?;
    info!(
        "Starting {} ({} environment)...",
        config.app_name, config.environment
    );

    let repository = Arc::new(InMemoryReminderRepository::new());
    info!("Reminder store initialized");

    let metrics = SchedulerMetrics::new();
    let scheduler = Arc::new(SchedulerEngine::with_metrics(
        config.scheduler.clone(),
        metrics.clone(),
    ));
    let manager = ReminderManager::new(repository.clone()).with_scheduler(scheduler.clone());

    let owner = config.seed.owner_id.as_str();
    match manager.seed_defaults(owner, &config.seed.dominant).await {
        Ok(seeded) => info!("Seeded {} reminders for {}", seeded.len(), owner),
        Err(AppError::AlreadyInitialized(reason)) => info!("Skipping seed: {}", reason),
        Err(e) => return Err(e).context("failed to seed default reminders"),
    }

    let report = scheduler
        .start(
            Arc::new(OwnerSnapshot::new(repository, owner)),
            Arc::new(TracingSink),
            Arc::new(SystemClock),
        )
        .await?;
    info!(
        "Scheduler running for {} ({} reminders, {} delivered on start)",
        owner, report.evaluated, report.delivered
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }

    info!("Shutting down...");
    scheduler.stop().await;
    info!("Final scheduler metrics:\n{}", metrics.gather());

    Ok(())
}
