use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:8000";
const DEFAULT_USER_AGENT: &str = "JobTrail/1.0 (Job Application Tracker)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub scraper: ScraperSettings,
    pub scrape_schedule: Option<String>,
    pub log_format: LogFormat,
    pub export_dir: PathBuf,
}

/// Knobs shared by every extractor; carried inside the scrape context.
#[derive(Debug, Clone)]
pub struct ScraperSettings {
    pub request_timeout: Duration,
    pub delay_min: Duration,
    pub delay_max: Duration,
    pub user_agent: String,
    pub browser_binary: Option<PathBuf>,
    pub browser_render_wait: Duration,
    pub browser_nav_timeout: Duration,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            delay_min: Duration::from_millis(1000),
            delay_max: Duration::from_millis(3000),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            browser_binary: None,
            browser_render_wait: Duration::from_millis(3000),
            browser_nav_timeout: Duration::from_secs(60),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let defaults = ScraperSettings::default();
        let delay_min = Duration::from_millis(get_env_parse_or(
            "SCRAPER_DELAY_MIN_MS",
            defaults.delay_min.as_millis() as u64,
        )?);
        let delay_max = Duration::from_millis(get_env_parse_or(
            "SCRAPER_DELAY_MAX_MS",
            defaults.delay_max.as_millis() as u64,
        )?);

        let scraper = ScraperSettings {
            request_timeout: Duration::from_secs(get_env_parse_or(
                "SCRAPER_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
            delay_min: delay_min.min(delay_max),
            delay_max: delay_min.max(delay_max),
            user_agent: env::var("SCRAPER_USER_AGENT").unwrap_or(defaults.user_agent),
            browser_binary: env::var("BROWSER_BINARY").ok().map(PathBuf::from),
            browser_render_wait: Duration::from_millis(get_env_parse_or(
                "BROWSER_RENDER_WAIT_MS",
                defaults.browser_render_wait.as_millis() as u64,
            )?),
            browser_nav_timeout: Duration::from_secs(get_env_parse_or(
                "BROWSER_NAV_TIMEOUT_SECS",
                defaults.browser_nav_timeout.as_secs(),
            )?),
        };

        let log_format = match env::var("LOG_FORMAT").ok().as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(Error::Config(format!(
                    "Invalid value for LOG_FORMAT: {} (expected text or json)",
                    other
                )))
            }
        };

        Ok(Self {
            server_address: env::var("SERVER_ADDRESS")
                .unwrap_or_else(|_| DEFAULT_SERVER_ADDRESS.to_string()),
            database_url: get_env("DATABASE_URL")?,
            scraper,
            scrape_schedule: env::var("SCRAPE_SCHEDULE")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            log_format,
            export_dir: env::var("EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("exports")),
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}
