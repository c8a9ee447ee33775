use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use jobtrail::{
    config::Config,
    database::pool::{create_pool, run_migrations},
    models::job::JobFilter,
    routes,
    scrapers::{RunReport, ScrapeContext},
    services::{
        export_service::{ExportFormat, ExportService},
        job_store::{JobStore, PgJobStore},
        scheduled_tasks::start_scheduler,
    },
    utils::logging::init_tracing,
    AppState,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "jobtrail", version, about = "Remote job aggregator and application tracker")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API (and the scrape schedule, when configured)
    Serve,
    /// Scrape one or more sources into the store
    Scrape {
        /// Source name; repeat for several
        #[arg(long = "source", conflicts_with = "all", required_unless_present = "all")]
        sources: Vec<String>,
        /// Every available source
        #[arg(long)]
        all: bool,
    },
    /// List stored jobs, newest first
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Show counts by status, source and type
    Stats,
    /// Write every stored job to <output-dir>/jobs.<format>
    Export {
        #[arg(long, default_value = "csv")]
        format: String,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    let pool = create_pool(&config).await?;
    run_migrations(&pool).await?;

    let store: Arc<dyn JobStore> = Arc::new(PgJobStore::new(pool));
    let scrape_context = ScrapeContext::new(config.scraper.clone())?;
    let state = AppState::new(store, scrape_context);

    match cli.command {
        Command::Serve => serve(state, &config).await,
        Command::Scrape { sources, all } => scrape(state, sources, all).await,
        Command::List {
            status,
            source,
            search,
            limit,
        } => {
            let filter = JobFilter {
                status,
                source,
                search,
                limit: Some(limit.max(1)),
                ..Default::default()
            };
            list(state, filter).await
        }
        Command::Stats => stats(state).await,
        Command::Export { format, output_dir } => {
            let format: ExportFormat = format.parse()?;
            let dir = output_dir.unwrap_or_else(|| config.export_dir.clone());
            export(state, format, dir).await
        }
    }
}

async fn serve(state: AppState, config: &Config) -> anyhow::Result<()> {
    let scheduler = match config.scrape_schedule.as_deref() {
        Some(schedule) => Some(
            start_scheduler(state.clone(), schedule)
                .await
                .with_context(|| format!("Invalid SCRAPE_SCHEDULE: {}", schedule))?,
        ),
        None => None,
    };

    let cancel = state.engine.cancellation_token();
    let app = routes::router(state);

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await?;

    if let Some(mut scheduler) = scheduler {
        scheduler.shutdown().await?;
    }
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal(cancel: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
    cancel.cancel();
}

async fn scrape(state: AppState, sources: Vec<String>, all: bool) -> anyhow::Result<()> {
    let scrapers = if all {
        state.registry.build_all(&state.scrape_context)
    } else {
        state
            .registry
            .build_selected(&sources, &state.scrape_context)?
    };
    if scrapers.is_empty() {
        println!("{}", "No sources available".yellow());
        return Ok(());
    }

    let cancel = state.engine.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "Cancelling after the current item...".yellow());
            cancel.cancel();
        }
    });

    for scraper in &scrapers {
        println!("{} {}", "Scraping".bright_cyan(), scraper.source_name().bold());
    }
    let report = state.engine.run_all(&scrapers).await;
    print_report(&report);
    Ok(())
}

fn print_report(report: &RunReport) {
    println!();
    for summary in &report.summaries {
        let status = if summary.cancelled {
            "cancelled".yellow()
        } else if summary.errors > 0 {
            "with errors".red()
        } else {
            "ok".green()
        };
        println!(
            "{:<16} found {:>4}  saved {:>4}  duplicates {:>4}  errors {:>4}  {}",
            summary.source.bold(),
            summary.found,
            summary.saved,
            summary.duplicates,
            summary.errors,
            status
        );
    }
    println!(
        "{}",
        format!("Total new jobs saved: {}", report.total_saved)
            .bright_green()
            .bold()
    );
    if report.cancelled {
        println!("{}", "Run was cancelled; results are partial".yellow());
    }
}

async fn list(state: AppState, filter: JobFilter) -> anyhow::Result<()> {
    let jobs = state.job_service.list(&filter).await?;
    if jobs.is_empty() {
        println!("{}", "No jobs found".yellow());
        return Ok(());
    }

    for job in &jobs {
        println!(
            "{}  {} {} {}  [{}] {}",
            job.id.to_string()[..8].dimmed(),
            job.title.bold(),
            "@".dimmed(),
            job.company,
            job.source.cyan(),
            job.status.green()
        );
        println!("          {}", job.url.dimmed());
    }
    println!("\n{} jobs", jobs.len());
    Ok(())
}

async fn stats(state: AppState) -> anyhow::Result<()> {
    let stats = state.job_service.stats().await?;

    println!("{} {}", "Total jobs:".bold(), stats.total);
    println!(
        "{} {} (7 days), {} (30 days)",
        "Recently added:".bold(),
        stats.recent_7days,
        stats.recent_30days
    );
    for (heading, counts) in [
        ("By status", &stats.by_status),
        ("By source", &stats.by_source),
        ("By type", &stats.by_job_type),
    ] {
        println!("\n{}", heading.bright_cyan());
        for (key, count) in counts {
            println!("  {:<20} {}", key, count);
        }
    }
    Ok(())
}

async fn export(state: AppState, format: ExportFormat, dir: PathBuf) -> anyhow::Result<()> {
    let jobs = state.job_service.snapshot().await?;
    if jobs.is_empty() {
        println!("{}", "No jobs to export".yellow());
        return Ok(());
    }

    let path = ExportService::write_to_dir(&jobs, format, &dir)?;
    println!(
        "{} {} jobs to {}",
        "Exported".green(),
        jobs.len(),
        path.display()
    );
    Ok(())
}
