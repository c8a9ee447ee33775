use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_xlsxwriter::*;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::job::Job;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
    Xlsx,
}

impl ExportFormat {
    pub const SUPPORTED: [&'static str; 3] = ["csv", "json", "xlsx"];

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Json => "application/json",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "xlsx" => Ok(ExportFormat::Xlsx),
            other => Err(Error::BadRequest(format!(
                "Unsupported format: {} (supported: {})",
                other,
                Self::SUPPORTED.join(", ")
            ))),
        }
    }
}

#[derive(Serialize)]
struct JsonRow<'a> {
    id: String,
    title: &'a str,
    company: &'a str,
    location: &'a str,
    job_type: &'a str,
    source: &'a str,
    url: &'a str,
}

pub struct ExportService;

impl ExportService {
    pub const CSV_HEADER: [&'static str; 6] = ["id", "title", "company", "job_type", "source", "url"];

    pub fn render(jobs: &[Job], format: ExportFormat) -> Result<Vec<u8>> {
        match format {
            ExportFormat::Csv => Self::to_csv(jobs),
            ExportFormat::Json => Self::to_json(jobs).map(String::into_bytes),
            ExportFormat::Xlsx => Self::to_xlsx(jobs),
        }
    }

    pub fn to_csv(jobs: &[Job]) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(Self::CSV_HEADER)?;
        for job in jobs {
            let id = job.id.to_string();
            writer.write_record([
                id.as_str(),
                job.title.as_str(),
                job.company.as_str(),
                job.job_type.as_str(),
                job.source.as_str(),
                job.url.as_str(),
            ])?;
        }
        writer
            .into_inner()
            .map_err(|e| Error::Internal(format!("Failed to flush CSV: {}", e)))
    }

    pub fn to_json(jobs: &[Job]) -> Result<String> {
        let rows: Vec<JsonRow<'_>> = jobs
            .iter()
            .map(|job| JsonRow {
                id: job.id.to_string(),
                title: &job.title,
                company: &job.company,
                location: &job.location,
                job_type: &job.job_type,
                source: &job.source,
                url: &job.url,
            })
            .collect();
        Ok(serde_json::to_string_pretty(&rows)?)
    }

    /// Styled workbook: title band, header row, zebra rows, frozen header.
    pub fn to_xlsx(jobs: &[Job]) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Jobs")?;

        let primary_color = Color::RGB(0x1E293B);
        let header_bg = Color::RGB(0x0F172A);
        let alt_row = Color::RGB(0xF8FAFC);
        let border_color = Color::RGB(0xE2E8F0);

        let columns = [
            ("ID", 38.0),
            ("Title", 40.0),
            ("Company", 28.0),
            ("Location", 24.0),
            ("Type", 14.0),
            ("Source", 16.0),
            ("Status", 12.0),
            ("Added", 18.0),
            ("URL", 60.0),
        ];
        for (i, (_, width)) in columns.iter().enumerate() {
            worksheet.set_column_width(i as u16, *width)?;
        }

        let title_format = Format::new()
            .set_font_size(14)
            .set_bold()
            .set_font_color(Color::White)
            .set_background_color(primary_color)
            .set_align(FormatAlign::CenterAcross)
            .set_align(FormatAlign::VerticalCenter);
        worksheet.set_row_height(0, 32)?;
        let title = format!(
            "JobTrail export: {} jobs, {}",
            jobs.len(),
            chrono::Utc::now().format("%Y-%m-%d %H:%M UTC")
        );
        worksheet.merge_range(0, 0, 0, (columns.len() - 1) as u16, &title, &title_format)?;

        let header_format = Format::new()
            .set_bold()
            .set_font_size(10)
            .set_font_color(Color::White)
            .set_background_color(header_bg)
            .set_align(FormatAlign::Center)
            .set_border(FormatBorder::Thin)
            .set_border_color(border_color);
        let header_row = 1;
        for (i, (name, _)) in columns.iter().enumerate() {
            worksheet.write_string_with_format(header_row, i as u16, *name, &header_format)?;
        }

        let data_start_row = 2;
        for (idx, job) in jobs.iter().enumerate() {
            let row = data_start_row + idx as u32;
            let bg = if idx % 2 == 0 { alt_row } else { Color::White };
            let fmt = Format::new()
                .set_font_size(10)
                .set_background_color(bg)
                .set_border(FormatBorder::Thin)
                .set_border_color(border_color);

            let added = job.created_at.format("%Y-%m-%d").to_string();
            let cells = [
                job.id.to_string(),
                job.title.clone(),
                job.company.clone(),
                job.location.clone(),
                job.job_type.clone(),
                job.source.clone(),
                job.status.clone(),
                added,
            ];
            for (col, value) in cells.iter().enumerate() {
                worksheet.write_string_with_format(row, col as u16, value, &fmt)?;
            }
            worksheet.write_url_with_text(row, 8, job.url.as_str(), &job.url)?;
        }

        worksheet.set_freeze_panes(2, 0)?;
        worksheet.autofilter(
            header_row,
            0,
            (data_start_row + jobs.len() as u32).saturating_sub(1).max(header_row),
            (columns.len() - 1) as u16,
        )?;

        Ok(workbook.save_to_buffer()?)
    }

    /// Write `<dir>/jobs.<ext>` and return the path written.
    pub fn write_to_dir(jobs: &[Job], format: ExportFormat, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("jobs.{}", format.extension()));
        std::fs::write(&path, Self::render(jobs, format)?)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::NewJob;

    fn job(title: &str, company: &str, url: &str) -> Job {
        NewJob {
            title: title.into(),
            company: company.into(),
            location: "Remote - Worldwide".into(),
            job_type: "contract".into(),
            salary: None,
            description: None,
            url: url.into(),
            source: "remotive".into(),
        }
        .into_job()
    }

    #[test]
    fn csv_has_fixed_column_order_and_quotes_commas() {
        let jobs = vec![job("Rust, Senior", "Ferris Inc", "https://example.com/a")];
        let out = String::from_utf8(ExportService::to_csv(&jobs).unwrap()).unwrap();
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("id,title,company,job_type,source,url"));
        let row = lines.next().unwrap();
        assert!(row.starts_with(&jobs[0].id.to_string()));
        assert!(row.contains("\"Rust, Senior\",Ferris Inc,contract,remotive,https://example.com/a"));
    }

    #[test]
    fn json_includes_location_but_not_status() {
        let jobs = vec![job("Go Dev", "Gopher Co", "https://example.com/b")];
        let out = ExportService::to_json(&jobs).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        let row = &parsed[0];
        assert_eq!(row["location"], "Remote - Worldwide");
        assert_eq!(row["url"], "https://example.com/b");
        assert!(row.get("status").is_none());
    }

    #[test]
    fn xlsx_renders_a_zip_container() {
        let jobs = vec![job("Go Dev", "Gopher Co", "https://example.com/b")];
        let bytes = ExportService::to_xlsx(&jobs).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn format_parsing_is_case_insensitive() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!("pdf".parse::<ExportFormat>().is_err());
    }
}
