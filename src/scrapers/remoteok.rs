use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;
use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::models::job::{job_type, REMOTE_LOCATION};
use crate::scrapers::{RawPosting, ScrapeContext, Scraper};
use crate::utils::text::format_thousands;

pub const SOURCE: &str = "remoteok";
pub const API_URL: &str = "https://remoteok.com/api";

fn deserialize_amount<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Int(u64),
        Float(f64),
        String(String),
    }

    Ok(match Option::<Amount>::deserialize(deserializer)? {
        Some(Amount::Int(n)) => Some(n),
        Some(Amount::Float(f)) if f.is_finite() && f >= 0.0 => Some(f.round() as u64),
        Some(Amount::String(s)) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    })
}

#[derive(Debug, Clone, Deserialize)]
struct RemoteOkJob {
    #[serde(default)]
    id: Option<JsonValue>,
    position: Option<String>,
    company: Option<String>,
    location: Option<String>,
    apply_url: Option<String>,
    description: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "deserialize_amount")]
    salary_min: Option<u64>,
    #[serde(default, deserialize_with = "deserialize_amount")]
    salary_max: Option<u64>,
}

/// RemoteOK public API. The response is a JSON array whose first element is
/// a legal notice, not a job.
pub struct RemoteOkScraper {
    ctx: ScrapeContext,
    endpoint: String,
}

impl RemoteOkScraper {
    pub fn new(ctx: ScrapeContext) -> Self {
        Self::with_endpoint(ctx, API_URL)
    }

    pub fn with_endpoint(ctx: ScrapeContext, endpoint: impl Into<String>) -> Self {
        Self {
            ctx,
            endpoint: endpoint.into(),
        }
    }

    fn parse_job(&self, job: RemoteOkJob) -> RawPosting {
        let url = job.apply_url.filter(|u| !u.trim().is_empty()).or_else(|| {
            job.id
                .as_ref()
                .and_then(id_string)
                .map(|id| format!("https://remoteok.com/l/{}", id))
        });

        RawPosting {
            title: Some(job.position.unwrap_or_else(|| "Untitled Position".to_string())),
            company: job.company,
            location: Some(job.location.unwrap_or_else(|| REMOTE_LOCATION.to_string())),
            job_type: Some(job_type_from_tags(job.tags.as_deref().unwrap_or_default()).to_string()),
            salary: format_salary(job.salary_min, job.salary_max),
            description: job.description,
            url: Some(url.unwrap_or_else(|| self.endpoint.clone())),
        }
    }
}

#[async_trait]
impl Scraper for RemoteOkScraper {
    fn source_name(&self) -> &str {
        SOURCE
    }

    #[instrument(skip(self), fields(source = SOURCE))]
    async fn try_scrape(&self) -> Result<Vec<RawPosting>> {
        info!(endpoint = %self.endpoint, "Fetching jobs from RemoteOK API");
        let items: Vec<JsonValue> = self.ctx.fetch_json(&self.endpoint).await?;
        info!(count = items.len().saturating_sub(1), "Found jobs from RemoteOK");

        let postings = items
            .into_iter()
            .skip(1)
            .filter_map(|item| match serde_json::from_value::<RemoteOkJob>(item) {
                Ok(job) => Some(self.parse_job(job)),
                Err(err) => {
                    warn!(error = %err, "Skipping unparseable RemoteOK item");
                    None
                }
            })
            .collect();
        Ok(postings)
    }
}

fn id_string(id: &JsonValue) -> Option<String> {
    match id {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Render salary bounds for display. Zero counts as absent.
pub fn format_salary(min: Option<u64>, max: Option<u64>) -> Option<String> {
    match (min.filter(|v| *v > 0), max.filter(|v| *v > 0)) {
        (Some(min), Some(max)) => Some(format!(
            "${} - ${}",
            format_thousands(min),
            format_thousands(max)
        )),
        (Some(min), None) => Some(format!("${}+", format_thousands(min))),
        (None, Some(max)) => Some(format!("Up to ${}", format_thousands(max))),
        (None, None) => None,
    }
}

/// Tag-based category; anything unrecognised is full-time.
pub fn job_type_from_tags(tags: &[String]) -> &'static str {
    let tags: Vec<String> = tags.iter().map(|t| t.trim().to_lowercase()).collect();
    let has = |needle: &str| tags.iter().any(|t| t == needle);

    if has("contract") {
        job_type::CONTRACT
    } else if has("part-time") || has("parttime") {
        job_type::PART_TIME
    } else {
        job_type::FULL_TIME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScraperSettings;
    use serde_json::json;

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn scraper() -> RemoteOkScraper {
        RemoteOkScraper::new(ScrapeContext::new(ScraperSettings::default()).unwrap())
    }

    #[test]
    fn salary_display() {
        assert_eq!(
            format_salary(Some(50_000), Some(70_000)).as_deref(),
            Some("$50,000 - $70,000")
        );
        assert_eq!(format_salary(Some(50_000), None).as_deref(), Some("$50,000+"));
        assert_eq!(format_salary(None, Some(90_000)).as_deref(), Some("Up to $90,000"));
        assert_eq!(format_salary(None, None), None);
        assert_eq!(format_salary(Some(0), Some(0)), None);
    }

    #[test]
    fn job_type_defaults_to_full_time() {
        assert_eq!(job_type_from_tags(&tags(&["full-time", "remote"])), "full-time");
        assert_eq!(job_type_from_tags(&tags(&["Contract", "rust"])), "contract");
        assert_eq!(job_type_from_tags(&tags(&["parttime"])), "part-time");
        assert_eq!(job_type_from_tags(&[]), "full-time");
        assert_eq!(job_type_from_tags(&tags(&["golang"])), "full-time");
    }

    #[test]
    fn item_mapping_and_url_fallbacks() {
        let s = scraper();
        let job: RemoteOkJob = serde_json::from_value(json!({
            "id": 12345,
            "position": "Rust Engineer",
            "company": "Ferris Labs",
            "tags": ["contract"],
            "salary_min": "60,000",
            "salary_max": 0
        }))
        .unwrap();
        let raw = s.parse_job(job);
        assert_eq!(raw.title.as_deref(), Some("Rust Engineer"));
        assert_eq!(raw.url.as_deref(), Some("https://remoteok.com/l/12345"));
        assert_eq!(raw.location.as_deref(), Some("Remote - Worldwide"));
        assert_eq!(raw.job_type.as_deref(), Some("contract"));
        assert_eq!(raw.salary.as_deref(), Some("$60,000+"));

        let bare: RemoteOkJob = serde_json::from_value(json!({})).unwrap();
        let raw = s.parse_job(bare);
        assert_eq!(raw.title.as_deref(), Some("Untitled Position"));
        assert_eq!(raw.url.as_deref(), Some(API_URL));
    }

    #[test]
    fn apply_url_wins_over_id() {
        let job: RemoteOkJob = serde_json::from_value(json!({
            "id": "abc",
            "position": "SRE",
            "apply_url": "https://remoteok.com/remote-jobs/abc"
        }))
        .unwrap();
        let raw = scraper().parse_job(job);
        assert_eq!(raw.url.as_deref(), Some("https://remoteok.com/remote-jobs/abc"));
    }
}
