use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::AppState;

/// Run every available source on `schedule` (six-field cron, seconds first).
pub async fn start_scheduler(state: AppState, schedule: &str) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let scrape_job = Job::new_async(schedule, move |_uuid, _lock| {
        let state = state.clone();
        Box::pin(async move {
            run_scheduled_scrape(&state).await;
        })
    })?;

    scheduler.add(scrape_job).await?;
    scheduler.start().await?;

    tracing::info!(%schedule, "Scheduled ingestion started");
    Ok(scheduler)
}

async fn run_scheduled_scrape(state: &AppState) {
    tracing::info!("Running scheduled ingestion");

    let scrapers = state.registry.build_all(&state.scrape_context);
    if scrapers.is_empty() {
        tracing::warn!("No sources available for scheduled ingestion");
        return;
    }

    let report = state.engine.run_all(&scrapers).await;
    for summary in &report.summaries {
        tracing::info!(
            source = %summary.source,
            saved = summary.saved,
            duplicates = summary.duplicates,
            errors = summary.errors,
            "Scheduled scrape result"
        );
    }
}
