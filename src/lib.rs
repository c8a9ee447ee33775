pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod models;
pub mod routes;
pub mod scrapers;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::scrapers::{IngestionEngine, ScrapeContext, ScraperRegistry};
use crate::services::{job_service::JobService, job_store::JobStore};

#[derive(Clone)]
pub struct AppState {
    pub job_service: JobService,
    pub engine: IngestionEngine,
    pub scrape_context: ScrapeContext,
    pub registry: Arc<ScraperRegistry>,
}

impl AppState {
    pub fn new(store: Arc<dyn JobStore>, scrape_context: ScrapeContext) -> Self {
        let job_service = JobService::new(store);
        let engine = IngestionEngine::new(job_service.clone());

        Self {
            job_service,
            engine,
            scrape_context,
            registry: Arc::new(ScraperRegistry::default()),
        }
    }

    pub fn with_registry(mut self, registry: ScraperRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }
}
