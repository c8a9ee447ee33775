use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::error::{Error, Result};
use crate::scrapers::{RawPosting, ScrapeContext, Scraper, ScraperRegistry};
use crate::services::job_service::JobService;

/// Outcome of one extractor within a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeSummary {
    pub source: String,
    pub found: usize,
    pub saved: usize,
    pub duplicates: usize,
    pub errors: usize,
    pub cancelled: bool,
}

impl ScrapeSummary {
    fn empty(source: &str) -> Self {
        Self {
            source: source.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub summaries: Vec<ScrapeSummary>,
    pub total_saved: usize,
    pub cancelled: bool,
}

/// Drives extractors and stores what they return. Duplicates are counted,
/// never raised; one bad item or one broken extractor does not stop the run.
#[derive(Clone)]
pub struct IngestionEngine {
    jobs: JobService,
    cancel: CancellationToken,
}

impl IngestionEngine {
    pub fn new(jobs: JobService) -> Self {
        Self::with_cancellation(jobs, CancellationToken::new())
    }

    pub fn with_cancellation(jobs: JobService, cancel: CancellationToken) -> Self {
        Self { jobs, cancel }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    #[instrument(skip_all, fields(source = scraper.source_name()))]
    pub async fn run_one(&self, scraper: &dyn Scraper) -> ScrapeSummary {
        let source = scraper.source_name().to_string();
        let mut summary = ScrapeSummary::empty(&source);

        if self.cancel.is_cancelled() {
            summary.cancelled = true;
            return summary;
        }

        info!("Starting scrape");
        let postings = tokio::select! {
            _ = self.cancel.cancelled() => {
                warn!("Scrape abandoned on cancellation");
                summary.cancelled = true;
                return summary;
            }
            postings = scraper.scrape() => postings,
        };

        if postings.is_empty() {
            info!("No jobs found");
            return summary;
        }
        summary.found = postings.len();

        for raw in postings {
            if self.cancel.is_cancelled() {
                let processed = summary.saved + summary.duplicates + summary.errors;
                warn!(processed, "Run cancelled between items");
                summary.cancelled = true;
                break;
            }
            self.store_one(raw, &source, &mut summary).await;
        }

        info!(
            found = summary.found,
            saved = summary.saved,
            duplicates = summary.duplicates,
            errors = summary.errors,
            "Scrape complete"
        );
        summary
    }

    async fn store_one(&self, raw: RawPosting, source: &str, summary: &mut ScrapeSummary) {
        let url = raw.url.clone().unwrap_or_default();

        let job = match raw.into_new_job(source) {
            Ok(job) => job,
            Err(err) => {
                warn!(%url, error = %err, "Rejected invalid posting");
                summary.errors += 1;
                return;
            }
        };

        match self.jobs.create(job).await {
            Ok(Some(_)) => summary.saved += 1,
            Ok(None) => summary.duplicates += 1,
            Err(err) => {
                error!(%url, error = %err, "Error saving job");
                summary.errors += 1;
            }
        }
    }

    /// Look `name` up in `registry` and run it. Unknown names fail before
    /// anything is fetched.
    pub async fn run_source(
        &self,
        registry: &ScraperRegistry,
        ctx: &ScrapeContext,
        name: &str,
    ) -> Result<ScrapeSummary> {
        let scraper = registry.build(name, ctx)?;
        Ok(self.run_one(scraper.as_ref()).await)
    }

    /// Runs every extractor in order. A panic inside one is contained and
    /// recorded as a failed source.
    pub async fn run_all(&self, scrapers: &[Box<dyn Scraper>]) -> RunReport {
        let mut report = RunReport::default();

        for scraper in scrapers {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let source = scraper.source_name().to_string();
            let summary = match AssertUnwindSafe(self.run_one(scraper.as_ref()))
                .catch_unwind()
                .await
            {
                Ok(summary) => summary,
                Err(panic) => {
                    let err = Error::Internal(panic_message(panic.as_ref()));
                    error!(source = %source, error = %err, "Scraper failed");
                    ScrapeSummary {
                        errors: 1,
                        ..ScrapeSummary::empty(&source)
                    }
                }
            };

            report.total_saved += summary.saved;
            report.cancelled |= summary.cancelled;
            report.summaries.push(summary);
        }

        info!(
            sources = report.summaries.len(),
            total_saved = report.total_saved,
            cancelled = report.cancelled,
            "Ingestion run finished"
        );
        report
    }

    /// Total number of newly stored postings across `scrapers`.
    pub async fn run_many(&self, scrapers: &[Box<dyn Scraper>]) -> usize {
        self.run_all(scrapers).await.total_saved
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "scraper panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScraperSettings;
    use crate::services::job_store::MockJobStore;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Fixed(Vec<RawPosting>);

    #[async_trait]
    impl Scraper for Fixed {
        fn source_name(&self) -> &str {
            "fixed"
        }

        async fn try_scrape(&self) -> Result<Vec<RawPosting>> {
            Ok(self.0.clone())
        }
    }

    fn posting(url: &str) -> RawPosting {
        RawPosting {
            title: Some("Engineer".into()),
            url: Some(url.into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn storage_errors_are_counted_per_item() {
        let mut store = MockJobStore::new();
        store.expect_find_by_url().returning(|_| Ok(None));
        store.expect_insert().returning(|job| {
            if job.url.ends_with("/bad") {
                Err(Error::Storage("write failed".into()))
            } else {
                Ok(job.into_job())
            }
        });

        let engine = IngestionEngine::new(JobService::new(Arc::new(store)));
        let scraper = Fixed(vec![
            posting("https://example.com/jobs/bad"),
            posting("https://example.com/jobs/good"),
            RawPosting::default(),
        ]);

        let summary = engine.run_one(&scraper).await;
        assert_eq!(summary.found, 3);
        assert_eq!(summary.saved, 1);
        assert_eq!(summary.duplicates, 0);
        assert_eq!(summary.errors, 2);
    }

    #[tokio::test]
    async fn empty_scrape_never_touches_the_store() {
        let mut store = MockJobStore::new();
        store.expect_find_by_url().never();
        store.expect_insert().never();

        let engine = IngestionEngine::new(JobService::new(Arc::new(store)));
        let summary = engine.run_one(&Fixed(Vec::new())).await;
        assert_eq!(summary, ScrapeSummary::empty("fixed"));
    }

    #[tokio::test]
    async fn cancelled_engine_skips_work() {
        let mut store = MockJobStore::new();
        store.expect_insert().never();

        let engine = IngestionEngine::new(JobService::new(Arc::new(store)));
        engine.cancellation_token().cancel();

        let scrapers: Vec<Box<dyn Scraper>> =
            vec![Box::new(Fixed(vec![posting("https://example.com/jobs/1")]))];
        let report = engine.run_all(&scrapers).await;
        assert!(report.cancelled);
        assert_eq!(report.total_saved, 0);
        assert!(report.summaries.is_empty());
    }

    #[tokio::test]
    async fn unknown_source_name_is_rejected_without_store_access() {
        let mut store = MockJobStore::new();
        store.expect_find_by_url().never();

        let engine = IngestionEngine::new(JobService::new(Arc::new(store)));
        let ctx = ScrapeContext::new(ScraperSettings::default()).unwrap();
        let err = engine
            .run_source(&ScraperRegistry::default(), &ctx, "craigslist")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownSource(_)));
    }

    #[test]
    fn panic_payloads_become_messages() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(payload.as_ref()), "scraper panicked");
    }
}
