//! Headless browser capability used by extractors whose listings are
//! rendered client-side.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use crate::config::ScraperSettings;
use crate::error::{Error, Result};

const BROWSER_CANDIDATES: [&str; 4] = [
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
];

#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>>;
}

/// One automation session. Callers must `close` it on every path.
#[async_trait]
pub trait BrowserSession: Send {
    async fn goto(&mut self, url: &str) -> Result<()>;

    /// Rendered DOM of the current page.
    async fn content(&mut self) -> Result<String>;

    async fn close(&mut self) -> Result<()>;

    /// Whether `selector` matches anything on the current page.
    async fn has_selector(&mut self, selector: &str) -> Result<bool> {
        let html = self.content().await?;
        dom_has_selector(&html, selector)
    }
}

pub fn dom_has_selector(html: &str, selector: &str) -> Result<bool> {
    let selector = Selector::parse(selector)
        .map_err(|e| Error::Parse(format!("Invalid selector {}: {:?}", selector, e)))?;
    let document = Html::parse_document(html);
    let found = document.select(&selector).next().is_some();
    Ok(found)
}

/// Drives a Chromium-family binary in headless mode, one child process per
/// navigation. Page scripts get `render_wait` of virtual time before the
/// DOM is captured.
#[derive(Debug, Clone)]
pub struct HeadlessChrome {
    binary: PathBuf,
    render_wait: Duration,
    nav_timeout: Duration,
}

impl HeadlessChrome {
    /// Resolve the browser binary now so a missing browser is reported when
    /// the extractor is built, not halfway through a run.
    pub fn locate(settings: &ScraperSettings) -> Result<Self> {
        let binary = match settings.browser_binary.as_deref() {
            Some(configured) => Self::resolve(configured)?,
            None => BROWSER_CANDIDATES
                .iter()
                .find_map(|name| which::which(name).ok())
                .ok_or_else(|| {
                    Error::Browser(
                        "No headless browser found. Install chromium or set BROWSER_BINARY"
                            .to_string(),
                    )
                })?,
        };

        info!(binary = %binary.display(), "Using headless browser");
        Ok(Self {
            binary,
            render_wait: settings.browser_render_wait,
            nav_timeout: settings.browser_nav_timeout,
        })
    }

    fn resolve(configured: &Path) -> Result<PathBuf> {
        which::which(configured).map_err(|e| {
            Error::Browser(format!(
                "Browser binary {} is not usable: {}",
                configured.display(),
                e
            ))
        })
    }
}

#[async_trait]
impl BrowserDriver for HeadlessChrome {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        Ok(Box::new(ChromeSession {
            browser: self.clone(),
            dom: None,
            closed: false,
        }))
    }
}

struct ChromeSession {
    browser: HeadlessChrome,
    dom: Option<String>,
    closed: bool,
}

#[async_trait]
impl BrowserSession for ChromeSession {
    #[instrument(skip(self))]
    async fn goto(&mut self, url: &str) -> Result<()> {
        if self.closed {
            return Err(Error::Browser("Session already closed".to_string()));
        }

        let budget = format!(
            "--virtual-time-budget={}",
            self.browser.render_wait.as_millis()
        );
        let child = Command::new(&self.browser.binary)
            .args([
                "--headless=new",
                "--disable-gpu",
                "--no-first-run",
                "--hide-scrollbars",
                budget.as_str(),
                "--dump-dom",
                url,
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Browser(format!("Failed to launch browser: {}", e)))?;

        // Dropping the child on timeout kills the process.
        let output = tokio::time::timeout(self.browser.nav_timeout, child.wait_with_output())
            .await
            .map_err(|_| Error::Timeout(url.to_string()))?
            .map_err(|e| Error::Browser(format!("Browser process failed: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = ?output.status.code(), %stderr, "Browser exited with failure");
            return Err(Error::Browser(format!(
                "Browser exited with status {:?}",
                output.status.code()
            )));
        }

        let dom = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(bytes = dom.len(), "Captured rendered DOM");
        self.dom = Some(dom);
        Ok(())
    }

    async fn content(&mut self) -> Result<String> {
        self.dom
            .clone()
            .ok_or_else(|| Error::Browser("No page loaded".to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        self.dom = None;
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_probe() {
        let html = r#"<section class="jobs"><li class="feature">x</li></section>"#;
        assert!(dom_has_selector(html, "li.feature").unwrap());
        assert!(!dom_has_selector(html, "article.job").unwrap());
        assert!(dom_has_selector(html, "li[").is_err());
    }

    #[test]
    fn unusable_configured_binary_fails_fast() {
        let settings = ScraperSettings {
            browser_binary: Some(PathBuf::from("/nonexistent/chromium-for-tests")),
            ..Default::default()
        };
        let err = HeadlessChrome::locate(&settings).unwrap_err();
        assert!(matches!(err, Error::Browser(_)));
    }

    #[tokio::test]
    async fn closed_session_refuses_navigation() {
        let browser = HeadlessChrome {
            binary: PathBuf::from("chromium"),
            render_wait: Duration::from_millis(10),
            nav_timeout: Duration::from_secs(1),
        };
        let mut session = browser.launch().await.unwrap();
        session.close().await.unwrap();
        assert!(session.goto("https://example.com").await.is_err());
    }
}
