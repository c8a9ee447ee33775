use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::scrapers::browser::HeadlessChrome;
use crate::scrapers::remoteok::{self, RemoteOkScraper};
use crate::scrapers::remotive::{self, RemotiveScraper};
use crate::scrapers::weworkremotely::{self, WeWorkRemotelyScraper};
use crate::scrapers::{ScrapeContext, Scraper};

pub type ScraperBuilder = fn(&ScrapeContext) -> Result<Box<dyn Scraper>>;

/// Source name to extractor constructor. Names are stored and matched in
/// lowercase.
#[derive(Clone)]
pub struct ScraperRegistry {
    builders: BTreeMap<String, ScraperBuilder>,
}

impl Default for ScraperRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(remoteok::SOURCE, build_remoteok);
        registry.register(remotive::SOURCE, build_remotive);
        registry.register(weworkremotely::SOURCE, build_weworkremotely);
        registry
    }
}

fn build_remoteok(ctx: &ScrapeContext) -> Result<Box<dyn Scraper>> {
    Ok(Box::new(RemoteOkScraper::new(ctx.clone())))
}

fn build_remotive(ctx: &ScrapeContext) -> Result<Box<dyn Scraper>> {
    Ok(Box::new(RemotiveScraper::new(ctx.clone())))
}

fn build_weworkremotely(ctx: &ScrapeContext) -> Result<Box<dyn Scraper>> {
    let browser = HeadlessChrome::locate(ctx.settings())?;
    Ok(Box::new(WeWorkRemotelyScraper::new(
        ctx.clone(),
        Arc::new(browser),
    )?))
}

impl ScraperRegistry {
    pub fn empty() -> Self {
        Self {
            builders: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, name: &str, builder: ScraperBuilder) {
        self.builders.insert(name.trim().to_lowercase(), builder);
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.builders.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.builders.contains_key(&name.trim().to_lowercase())
    }

    fn builder(&self, name: &str) -> Result<ScraperBuilder> {
        self.builders
            .get(&name.trim().to_lowercase())
            .copied()
            .ok_or_else(|| {
                Error::UnknownSource(format!(
                    "{} (available: {})",
                    name,
                    self.names().join(", ")
                ))
            })
    }

    pub fn build(&self, name: &str, ctx: &ScrapeContext) -> Result<Box<dyn Scraper>> {
        let builder = self.builder(name)?;
        builder(ctx)
    }

    /// Every name is checked before anything is constructed, so a typo in
    /// the last name fails the whole request up front.
    pub fn build_selected(
        &self,
        names: &[String],
        ctx: &ScrapeContext,
    ) -> Result<Vec<Box<dyn Scraper>>> {
        let builders = names
            .iter()
            .map(|name| self.builder(name))
            .collect::<Result<Vec<_>>>()?;
        builders.into_iter().map(|build| build(ctx)).collect()
    }

    /// All sources that can be constructed here; the rest are logged and
    /// left out.
    pub fn build_all(&self, ctx: &ScrapeContext) -> Vec<Box<dyn Scraper>> {
        let mut scrapers = Vec::with_capacity(self.builders.len());
        for (name, builder) in &self.builders {
            match builder(ctx) {
                Ok(scraper) => scrapers.push(scraper),
                Err(err) => warn!(source = %name, error = %err, "Skipping unavailable source"),
            }
        }
        info!(count = scrapers.len(), "Built scrapers");
        scrapers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScraperSettings;

    fn ctx() -> ScrapeContext {
        ScrapeContext::new(ScraperSettings::default()).unwrap()
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let registry = ScraperRegistry::default();
        let scraper = registry.build("RemoteOK", &ctx()).unwrap();
        assert_eq!(scraper.source_name(), "remoteok");
        assert!(registry.contains(" Remotive "));
        assert_eq!(
            registry.names(),
            vec!["remoteok", "remotive", "weworkremotely"]
        );
    }

    #[test]
    fn unknown_name_is_rejected() {
        let registry = ScraperRegistry::default();
        let err = registry.build("indeed", &ctx()).err().unwrap();
        assert!(matches!(err, Error::UnknownSource(_)));
    }

    #[test]
    fn selection_is_validated_before_building() {
        let registry = ScraperRegistry::default();
        let names = vec!["remotive".to_string(), "nope".to_string()];
        let err = registry.build_selected(&names, &ctx()).err().unwrap();
        assert!(matches!(err, Error::UnknownSource(_)));
    }

    #[test]
    fn unavailable_sources_are_skipped() {
        fn broken(_: &ScrapeContext) -> Result<Box<dyn Scraper>> {
            Err(Error::Browser("no browser".into()))
        }

        let mut registry = ScraperRegistry::empty();
        registry.register("remotive", build_remotive);
        registry.register("broken", broken);
        let built = registry.build_all(&ctx());
        assert_eq!(built.len(), 1);
        assert_eq!(built[0].source_name(), "remotive");
    }
}
