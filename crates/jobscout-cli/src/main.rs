use std::path::PathBuf;
use std::pin::pin;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use jobscout_client::{ScoutConfig, build_registry};
use jobscout_core::models::{JobRecord, JobSource, ManagerStatus};
use jobscout_core::traits::{JobSink, MemorySink};
use jobscout_core::{ExecutionMode, ScraperManager};
use jobscout_db::{Database, DatabaseConfig, JobRepository};

#[derive(Parser)]
#[command(name = "jobscout", version, about = "Rate-limited job listing scraper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the configured scrapers once and print the jobs found
    Run {
        /// Sources to scrape, comma separated (linkedin, github, google)
        #[arg(
            short,
            long,
            env = "JOBSCOUT_SCRAPERS",
            value_delimiter = ',',
            default_value = "linkedin,github"
        )]
        scrapers: Vec<JobSource>,

        /// Run scrapers one after another or all at once
        #[arg(short, long, env = "JOBSCOUT_MODE", default_value = "sequential")]
        mode: ExecutionMode,

        /// Directory holding followers.txt, blacklist.txt, whitelist.txt and templist.txt
        #[arg(long, env = "JOBSCOUT_DATA_DIR", default_value = "data")]
        data_dir: PathBuf,

        /// LinkedIn requests per second (default one every ten seconds)
        #[arg(long, env = "JOBSCOUT_LINKEDIN_RATE")]
        linkedin_rate: Option<f64>,

        /// LinkedIn search keywords, comma separated (overrides the built-in list)
        #[arg(short, long, value_delimiter = ',')]
        keywords: Vec<String>,

        /// Number of postings the synthetic google source generates
        #[arg(long, env = "JOBSCOUT_SYNTHETIC_COUNT")]
        synthetic_count: Option<usize>,

        /// Save jobs to the database (requires DATABASE_URL)
        #[arg(long, default_value_t = false)]
        save: bool,

        /// Write jobs as JSON to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Seconds between progress reports
        #[arg(long, default_value_t = 10)]
        poll_secs: u64,
    },

    /// Show the most recently stored jobs
    Recent {
        /// Number of results to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let mut filter = EnvFilter::from_default_env();
    for directive in ["jobscout=info", "jobscout_core=info", "jobscout_client=info", "jobscout_db=info"] {
        filter = filter.add_directive(directive.parse()?);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            scrapers,
            mode,
            data_dir,
            linkedin_rate,
            keywords,
            synthetic_count,
            save,
            output,
            poll_secs,
        } => {
            let mut config = ScoutConfig::default().with_data_dir(data_dir);
            if let Some(rate) = linkedin_rate {
                config.linkedin_requests.rate = rate;
            }
            if !keywords.is_empty() {
                config.linkedin.keywords = keywords;
            }
            if let Some(count) = synthetic_count {
                config.google.count = count;
            }

            let registry = build_registry(&config, &scrapers)
                .await
                .context("Failed to build scrapers")?;
            let poll = Duration::from_secs(poll_secs.max(1));

            let jobs = if save {
                let repo = connect_db().await?;
                cmd_run(ScraperManager::new(registry, repo, mode), poll).await?
            } else {
                cmd_run(ScraperManager::new(registry, MemorySink::new(), mode), poll).await?
            };

            write_jobs(&jobs, output.as_ref())?;
        }
        Commands::Recent { limit } => {
            let repo = connect_db().await?;
            cmd_recent(&repo, limit).await?;
        }
    }

    Ok(())
}

/// Connect to PostgreSQL using DATABASE_URL and apply migrations.
async fn connect_db() -> Result<JobRepository> {
    let config = DatabaseConfig::from_env().context("Database is not configured")?;
    let db = Database::connect(&config)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await.context("Failed to run migrations")?;
    Ok(db.job_repo())
}

/// Start a run, report progress until it ends, cancel on Ctrl-C.
async fn cmd_run<S: JobSink>(manager: ScraperManager<S>, poll: Duration) -> Result<Vec<JobRecord>> {
    if !manager.start() {
        anyhow::bail!("A scrape run is already in progress");
    }

    let mut finished = pin!(manager.wait());
    let mut ctrl_c = pin!(tokio::signal::ctrl_c());
    let mut ticker = tokio::time::interval(poll);
    ticker.tick().await;
    let mut cancelled = false;

    let jobs = loop {
        tokio::select! {
            jobs = &mut finished => break jobs.context("Scrape run ended abnormally")?,
            _ = ticker.tick() => log_progress(&manager.status()),
            signal = &mut ctrl_c, if !cancelled => {
                signal.context("Failed to listen for Ctrl-C")?;
                tracing::warn!("Interrupted, cancelling after the current step");
                manager.cancel();
                cancelled = true;
            }
        }
    };

    log_summary(&manager.status(), jobs.len());
    Ok(jobs)
}

fn log_progress(status: &ManagerStatus) {
    tracing::info!(
        progress = format!("{:.0}%", status.progress_percent),
        eta_secs = status.estimated_seconds_remaining,
        "Scraping"
    );
    for (name, state) in &status.scrapers {
        tracing::debug!(
            scraper = %name,
            status = %state.status,
            steps = format!("{}/{}", state.completed_steps, state.total_steps),
            "Scraper progress"
        );
    }
}

fn log_summary(status: &ManagerStatus, total: usize) {
    for (name, state) in &status.scrapers {
        match &state.last_error {
            Some(error) => tracing::warn!(scraper = %name, status = %state.status, %error, "Scraper summary"),
            None => tracing::info!(
                scraper = %name,
                status = %state.status,
                jobs = state.jobs_found,
                "Scraper summary"
            ),
        }
    }
    tracing::info!(
        run_id = ?status.run_id,
        jobs = total,
        progress = format!("{:.0}%", status.progress_percent),
        "Run complete"
    );
}

fn write_jobs(jobs: &[JobRecord], output: Option<&PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(jobs)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), jobs = jobs.len(), "Jobs written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

async fn cmd_recent(repo: &JobRepository, limit: usize) -> Result<()> {
    let stored = repo
        .recent(limit)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    if stored.is_empty() {
        println!("No jobs stored yet");
        return Ok(());
    }

    for entry in &stored {
        let job = &entry.job;
        let followers = job
            .follower_count
            .map(|c| format!(", {c} followers"))
            .unwrap_or_default();
        println!(
            "  [{}] {} @ {} ({}{}) {}",
            job.source,
            job.title,
            job.company,
            job.location,
            followers,
            job.url,
        );
    }

    println!("\nShowing {} of {} jobs", stored.len(), repo.count().await?);

    Ok(())
}
