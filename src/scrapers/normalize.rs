use validator::Validate;

use crate::error::Result;
use crate::models::job::{job_type, NewJob, REMOTE_LOCATION, UNKNOWN_COMPANY};
use crate::scrapers::RawPosting;
use crate::utils::text::clean;

impl RawPosting {
    /// Canonical form tagged with `source`. Missing company, location and
    /// job type take their defaults; a missing or unusable title or URL is
    /// a validation error.
    pub fn into_new_job(self, source: &str) -> Result<NewJob> {
        let job = NewJob {
            title: clean(self.title).unwrap_or_default(),
            company: clean(self.company).unwrap_or_else(|| UNKNOWN_COMPANY.to_string()),
            location: clean(self.location).unwrap_or_else(|| REMOTE_LOCATION.to_string()),
            job_type: clean(self.job_type).unwrap_or_else(|| job_type::UNSPECIFIED.to_string()),
            salary: clean(self.salary),
            description: clean(self.description),
            url: clean(self.url).unwrap_or_default(),
            source: source.trim().to_string(),
        };
        job.validate()?;
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn raw(title: Option<&str>, url: Option<&str>) -> RawPosting {
        RawPosting {
            title: title.map(str::to_string),
            url: url.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn fills_documented_defaults() {
        let job = raw(Some("  Platform Engineer "), Some("https://example.com/jobs/9"))
            .into_new_job("remotive")
            .unwrap();
        assert_eq!(job.title, "Platform Engineer");
        assert_eq!(job.company, "Unknown Company");
        assert_eq!(job.location, "Remote - Worldwide");
        assert_eq!(job.job_type, "unspecified");
        assert_eq!(job.source, "remotive");
        assert_eq!(job.salary, None);
    }

    #[test]
    fn blank_strings_count_as_missing() {
        let mut posting = raw(Some("SRE"), Some("https://example.com/jobs/10"));
        posting.company = Some("   ".into());
        posting.description = Some(String::new());
        let job = posting.into_new_job("remoteok").unwrap();
        assert_eq!(job.company, "Unknown Company");
        assert_eq!(job.description, None);
    }

    #[test]
    fn missing_title_is_rejected() {
        let err = raw(None, Some("https://example.com/jobs/11"))
            .into_new_job("remoteok")
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn relative_or_missing_url_is_rejected() {
        assert!(raw(Some("SRE"), None).into_new_job("x").is_err());
        assert!(raw(Some("SRE"), Some("/remote-jobs/1")).into_new_job("x").is_err());
    }
}
