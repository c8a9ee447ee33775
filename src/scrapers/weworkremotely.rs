use std::sync::Arc;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::models::job::{job_type, REMOTE_LOCATION, UNKNOWN_COMPANY};
use crate::scrapers::browser::{BrowserDriver, BrowserSession};
use crate::scrapers::{RawPosting, ScrapeContext, Scraper};
use crate::utils::text::{collapse_whitespace, title_case_slug};

pub const SOURCE: &str = "weworkremotely";
pub const LISTING_URL: &str = "https://weworkremotely.com/remote-jobs";

const PRIMARY_SELECTOR: &str = "li.feature";
const READY_SELECTOR: &str = "section.jobs li.feature";
const FALLBACK_SELECTORS: [&str; 3] = ["article.job", "section.jobs li", "[data-job-id]"];

const TITLE_SELECTORS: [&str; 3] = ["h3.new-listing__header__title", "span.title", "h3"];
const AD_MARKER: &str = "title--ad";
const LINK_SELECTORS: [&str; 2] = ["a.listing-link--unlocked", r#"a[href^="/remote-jobs/"]"#];
const COMPANY_LINK_SELECTOR: &str = ".tooltip--flag-logo a";
const COMPANY_TOOLTIP_SELECTOR: &str = ".tooltip--flag-logo__tooltiptext";
const PROFILE_PLACEHOLDER: &str = "View Company Profile";
const REGION_SELECTOR: &str = ".new-listing__header__icons .region";
const ICONS_SELECTOR: &str = ".new-listing__header__icons";

/// WeWorkRemotely renders its listing client-side, so the page is loaded
/// through a headless browser and the captured DOM is parsed afterwards.
pub struct WeWorkRemotelyScraper {
    ctx: ScrapeContext,
    browser: Arc<dyn BrowserDriver>,
    listing_url: Url,
}

impl WeWorkRemotelyScraper {
    pub fn new(ctx: ScrapeContext, browser: Arc<dyn BrowserDriver>) -> Result<Self> {
        Self::with_listing_url(ctx, browser, LISTING_URL)
    }

    pub fn with_listing_url(
        ctx: ScrapeContext,
        browser: Arc<dyn BrowserDriver>,
        listing_url: &str,
    ) -> Result<Self> {
        let listing_url = Url::parse(listing_url)
            .map_err(|e| Error::Config(format!("Invalid listing URL {}: {}", listing_url, e)))?;
        Ok(Self {
            ctx,
            browser,
            listing_url,
        })
    }

    async fn render(&self, session: &mut dyn BrowserSession) -> Result<String> {
        info!(url = %self.listing_url, "Loading listing page");
        session.goto(self.listing_url.as_str()).await?;

        if !session.has_selector(READY_SELECTOR).await? {
            info!("Job selector not found, trying alternative selectors");
        }
        session.content().await
    }
}

#[async_trait]
impl Scraper for WeWorkRemotelyScraper {
    fn source_name(&self) -> &str {
        SOURCE
    }

    #[instrument(skip(self), fields(source = SOURCE))]
    async fn try_scrape(&self) -> Result<Vec<RawPosting>> {
        info!("Launching browser to scrape WeWorkRemotely");
        let mut session = self.browser.launch().await?;

        let rendered = self.render(session.as_mut()).await;
        if let Err(err) = session.close().await {
            warn!(error = %err, "Failed to close browser session");
        }
        let html = rendered?;

        let postings = parse_listing_page(&html, &self.listing_url)?;
        info!(count = postings.len(), "Scraped jobs from WeWorkRemotely");

        self.ctx.polite_delay().await;
        Ok(postings)
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Parse(format!("Invalid selector {}: {:?}", css, e)))
}

/// Compiled once per page so a single listing is parsed without fallible
/// lookups.
struct ListingSelectors {
    titles: Vec<Selector>,
    links: Vec<Selector>,
    company_link: Selector,
    company_tooltip: Selector,
    region: Selector,
    icons: Selector,
}

impl ListingSelectors {
    fn compile() -> Result<Self> {
        Ok(Self {
            titles: TITLE_SELECTORS.iter().map(|s| selector(s)).collect::<Result<_>>()?,
            links: LINK_SELECTORS.iter().map(|s| selector(s)).collect::<Result<_>>()?,
            company_link: selector(COMPANY_LINK_SELECTOR)?,
            company_tooltip: selector(COMPANY_TOOLTIP_SELECTOR)?,
            region: selector(REGION_SELECTOR)?,
            icons: selector(ICONS_SELECTOR)?,
        })
    }
}

/// Parse a rendered listing page. Listings come from the primary selector,
/// or from the first fallback selector that matches anything. Relative job
/// links are resolved against `base`.
pub fn parse_listing_page(html: &str, base: &Url) -> Result<Vec<RawPosting>> {
    let document = Html::parse_document(html);
    let selectors = ListingSelectors::compile()?;

    let mut elements = document.select(&selector(PRIMARY_SELECTOR)?).collect::<Vec<_>>();
    if elements.is_empty() {
        info!("Trying alternative job selectors");
        for css in FALLBACK_SELECTORS {
            elements = document.select(&selector(css)?).collect();
            if !elements.is_empty() {
                debug!(selector = css, "Fallback selector matched");
                break;
            }
        }
    }
    info!(count = elements.len(), "Found job listings");

    Ok(elements
        .into_iter()
        .filter_map(|element| parse_listing(element, &selectors, base))
        .collect())
}

fn text_of(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

fn parse_listing(
    element: ElementRef<'_>,
    selectors: &ListingSelectors,
    base: &Url,
) -> Option<RawPosting> {
    let title_elem = selectors
        .titles
        .iter()
        .find_map(|s| element.select(s).next());

    if let Some(title_elem) = title_elem {
        let classes = title_elem.value().attr("class").unwrap_or_default();
        if classes.contains(AD_MARKER) {
            debug!("Skipping ad listing");
            return None;
        }
    }

    let Some(href) = selectors
        .links
        .iter()
        .find_map(|s| element.select(s).next())
        .and_then(|link| link.value().attr("href"))
    else {
        debug!("No valid job link found");
        return None;
    };

    if href.contains("http") || href.contains("link.") {
        debug!(%href, "Skipping external link");
        return None;
    }

    let url = match base.join(href) {
        Ok(url) => url,
        Err(err) => {
            warn!(%href, error = %err, "Skipping listing with unusable link");
            return None;
        }
    };

    let title = title_elem.map(text_of).filter(|t| !t.is_empty())?;

    let location = element
        .select(&selectors.region)
        .next()
        .map(text_of)
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| REMOTE_LOCATION.to_string());

    let icons_text = element
        .select(&selectors.icons)
        .next()
        .map(text_of)
        .unwrap_or_default();

    Some(RawPosting {
        description: Some(title.clone()),
        title: Some(title),
        company: Some(company_name(element, selectors)),
        location: Some(location),
        job_type: Some(job_type_from_text(&icons_text).to_string()),
        salary: None,
        url: Some(url.to_string()),
    })
}

/// Profile-link slug first, then the tooltip text, then the placeholder.
fn company_name(element: ElementRef<'_>, selectors: &ListingSelectors) -> String {
    let from_profile = element
        .select(&selectors.company_link)
        .filter_map(|a| a.value().attr("href"))
        .find_map(|href| href.split_once("/company/").map(|(_, slug)| slug))
        .map(|slug| title_case_slug(slug.trim_matches('/')))
        .filter(|name| !name.is_empty());

    from_profile
        .or_else(|| {
            element
                .select(&selectors.company_tooltip)
                .next()
                .map(text_of)
                .filter(|t| !t.is_empty() && !t.contains(PROFILE_PLACEHOLDER))
        })
        .unwrap_or_else(|| UNKNOWN_COMPANY.to_string())
}

/// Infer the job type from free text; anything unmatched is `remote`.
pub fn job_type_from_text(text: &str) -> &'static str {
    let text = text.to_lowercase();
    if text.contains("contract") || text.contains("freelance") {
        job_type::CONTRACT
    } else if text.contains("part-time") || text.contains("part time") {
        job_type::PART_TIME
    } else if text.contains("full-time") || text.contains("full time") {
        job_type::FULL_TIME
    } else {
        job_type::REMOTE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScraperSettings;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn base() -> Url {
        Url::parse(LISTING_URL).unwrap()
    }

    const PAGE: &str = r#"
<html><body><section class="jobs"><ul>
  <li class="feature">
    <div class="tooltip--flag-logo">
      <a href="/company/acme-corp"><img src="logo.png"></a>
      <span class="tooltip--flag-logo__tooltiptext">View Company Profile</span>
    </div>
    <a class="listing-link--unlocked" href="/remote-jobs/acme-corp-senior-rust-engineer">
      <h3 class="new-listing__header__title">Senior Rust Engineer</h3>
    </a>
    <div class="new-listing__header__icons">
      <span class="region">Anywhere in the World</span>
      <span>Full-Time</span>
    </div>
  </li>
  <li class="feature">
    <a class="listing-link--unlocked" href="https://ads.example.com/track">
      <h3 class="new-listing__header__title new-listing__header__title--ad">Sponsored</h3>
    </a>
  </li>
  <li class="feature">
    <a class="listing-link--unlocked" href="https://link.example.com/job/1">
      <h3 class="new-listing__header__title">Tracked Job</h3>
    </a>
  </li>
  <li class="feature">
    <h3 class="new-listing__header__title">No Link Here</h3>
  </li>
  <li class="feature">
    <div class="tooltip--flag-logo">
      <span class="tooltip--flag-logo__tooltiptext">Globex</span>
    </div>
    <a href="/remote-jobs/globex-designer">
      <h3 class="new-listing__header__title">Product   Designer</h3>
    </a>
    <div class="new-listing__header__icons"><span>Contract</span></div>
  </li>
</ul></section></body></html>"#;

    #[test]
    fn parses_listings_and_skips_ads_and_external_links() {
        let postings = parse_listing_page(PAGE, &base()).unwrap();
        assert_eq!(postings.len(), 2);

        let first = &postings[0];
        assert_eq!(first.title.as_deref(), Some("Senior Rust Engineer"));
        assert_eq!(first.company.as_deref(), Some("Acme Corp"));
        assert_eq!(first.location.as_deref(), Some("Anywhere in the World"));
        assert_eq!(first.job_type.as_deref(), Some("full-time"));
        assert_eq!(
            first.url.as_deref(),
            Some("https://weworkremotely.com/remote-jobs/acme-corp-senior-rust-engineer")
        );
        assert_eq!(first.description, first.title);

        let second = &postings[1];
        assert_eq!(second.title.as_deref(), Some("Product Designer"));
        assert_eq!(second.company.as_deref(), Some("Globex"));
        assert_eq!(second.location.as_deref(), Some("Remote - Worldwide"));
        assert_eq!(second.job_type.as_deref(), Some("contract"));
    }

    #[test]
    fn falls_back_to_alternative_selectors() {
        let html = r#"
<main>
  <article class="job">
    <a href="/remote-jobs/initech-qa"><span class="title">QA Analyst</span></a>
    <div class="tooltip--flag-logo"><span class="tooltip--flag-logo__tooltiptext">View Company Profile</span></div>
  </article>
</main>"#;
        let postings = parse_listing_page(html, &base()).unwrap();
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].title.as_deref(), Some("QA Analyst"));
        assert_eq!(postings[0].company.as_deref(), Some("Unknown Company"));
        assert_eq!(postings[0].job_type.as_deref(), Some("remote"));
        assert_eq!(
            postings[0].url.as_deref(),
            Some("https://weworkremotely.com/remote-jobs/initech-qa")
        );
    }

    #[test]
    fn empty_page_yields_nothing() {
        assert!(parse_listing_page("<html></html>", &base()).unwrap().is_empty());
    }

    #[test]
    fn job_type_inference() {
        assert_eq!(job_type_from_text("Freelance / Anywhere"), "contract");
        assert_eq!(job_type_from_text("Part time"), "part-time");
        assert_eq!(job_type_from_text("FULL TIME"), "full-time");
        assert_eq!(job_type_from_text("Contract, Full-Time"), "contract");
        assert_eq!(job_type_from_text(""), "remote");
    }

    struct FakeBrowser {
        html: String,
        closed: Arc<AtomicBool>,
        fail_goto: bool,
    }

    struct FakeSession {
        html: String,
        closed: Arc<AtomicBool>,
        fail_goto: bool,
    }

    #[async_trait]
    impl BrowserDriver for FakeBrowser {
        async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
            Ok(Box::new(FakeSession {
                html: self.html.clone(),
                closed: self.closed.clone(),
                fail_goto: self.fail_goto,
            }))
        }
    }

    #[async_trait]
    impl BrowserSession for FakeSession {
        async fn goto(&mut self, url: &str) -> Result<()> {
            if self.fail_goto {
                return Err(Error::Timeout(url.to_string()));
            }
            Ok(())
        }

        async fn content(&mut self) -> Result<String> {
            Ok(self.html.clone())
        }

        async fn close(&mut self) -> Result<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn quiet_ctx() -> ScrapeContext {
        ScrapeContext::new(ScraperSettings {
            delay_min: Duration::ZERO,
            delay_max: Duration::ZERO,
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn scrape_renders_through_browser_and_closes_session() {
        let closed = Arc::new(AtomicBool::new(false));
        let browser = Arc::new(FakeBrowser {
            html: PAGE.to_string(),
            closed: closed.clone(),
            fail_goto: false,
        });
        let scraper = WeWorkRemotelyScraper::new(quiet_ctx(), browser).unwrap();

        let postings = scraper.try_scrape().await.unwrap();
        assert_eq!(postings.len(), 2);
        assert!(closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn navigation_failure_still_closes_session() {
        let closed = Arc::new(AtomicBool::new(false));
        let browser = Arc::new(FakeBrowser {
            html: String::new(),
            closed: closed.clone(),
            fail_goto: true,
        });
        let scraper = WeWorkRemotelyScraper::new(quiet_ctx(), browser).unwrap();

        assert!(scraper.scrape().await.is_empty());
        assert!(closed.load(Ordering::SeqCst));
    }
}
