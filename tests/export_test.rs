use std::sync::Arc;

use jobtrail::models::job::NewJob;
use jobtrail::services::export_service::{ExportFormat, ExportService};
use jobtrail::services::job_service::JobService;
use jobtrail::services::memory_store::MemoryJobStore;

fn new_job(title: &str, url: &str) -> NewJob {
    NewJob {
        title: title.into(),
        company: "Acme".into(),
        location: "Remote - Worldwide".into(),
        job_type: "full-time".into(),
        salary: Some("$50,000+".into()),
        description: None,
        url: url.into(),
        source: "remoteok".into(),
    }
}

async fn seeded_service() -> JobService {
    let service = JobService::new(Arc::new(MemoryJobStore::new()));
    for (title, url) in [
        ("Backend Engineer", "https://example.com/jobs/1"),
        ("Quoted \"Lead\"", "https://example.com/jobs/2"),
    ] {
        service.create(new_job(title, url)).await.unwrap();
    }
    service
}

#[tokio::test]
async fn writes_every_format_into_the_output_dir() {
    let service = seeded_service().await;
    let jobs = service.snapshot().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("nested");

    let csv_path = ExportService::write_to_dir(&jobs, ExportFormat::Csv, &out).unwrap();
    assert_eq!(csv_path, out.join("jobs.csv"));
    let csv = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(csv.lines().count(), 3);
    assert!(csv.contains("\"Quoted \"\"Lead\"\"\""));

    let json_path = ExportService::write_to_dir(&jobs, ExportFormat::Json, &out).unwrap();
    let parsed: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(json_path).unwrap()).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), 2);

    let xlsx_path = ExportService::write_to_dir(&jobs, ExportFormat::Xlsx, &out).unwrap();
    assert!(std::fs::metadata(xlsx_path).unwrap().len() > 0);
}

#[tokio::test]
async fn snapshot_is_unaffected_by_later_writes() {
    let service = seeded_service().await;
    let snapshot = service.snapshot().await.unwrap();

    service
        .create(new_job("Late Arrival", "https://example.com/jobs/3"))
        .await
        .unwrap();

    let csv = String::from_utf8(ExportService::to_csv(&snapshot).unwrap()).unwrap();
    assert!(!csv.contains("Late Arrival"));
    assert_eq!(service.snapshot().await.unwrap().len(), 3);
}
