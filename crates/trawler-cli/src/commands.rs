use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use trawler_browser::BrowserEngine;
use trawler_core::AppConfig;
use trawler_db::{listings, runs, Database};
use trawler_scraper::{RunOrchestrator, RunSummary};

/// Load, override from the environment, and validate the configuration.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => AppConfig::load().context("failed to load config")?,
    };

    let config = config.with_env_overrides();
    config.validate().context("invalid configuration")?;
    Ok(config)
}

async fn open_database(config: &AppConfig) -> Result<Database> {
    let path = config.database_path()?;
    Database::open_migrated(&path)
        .await
        .with_context(|| format!("failed to open database at {}", path.display()))
}

pub fn init_config(path: Option<&Path>, force: bool) -> Result<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => AppConfig::config_path()?,
    };
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    AppConfig::default().save_to(&path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

/// Scrape once. Returns whether the run succeeded.
pub async fn run(config: AppConfig, json: bool) -> Result<bool> {
    let db = Arc::new(open_database(&config).await?);
    let engine = BrowserEngine::new(config.browser.clone());
    let timeout = config.run.timeout_secs.map(Duration::from_secs);

    let orchestrator = RunOrchestrator::new(config, engine, Arc::clone(&db), Arc::clone(&db));
    let watcher = tokio::spawn(cancel_on_signal(orchestrator.cancellation_token(), timeout));

    let summary = orchestrator.run().await;
    watcher.abort();
    let summary = summary.context("run could not be recorded")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(summary.success)
}

async fn cancel_on_signal(cancel: CancellationToken, timeout: Option<Duration>) {
    let deadline = async {
        match timeout {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, stopping at the next step");
        }
        () = deadline => {
            tracing::warn!("Run timeout reached, stopping at the next step");
        }
    }
    cancel.cancel();
}

fn print_summary(summary: &RunSummary) {
    let status = if summary.success { "succeeded" } else { "failed" };
    println!(
        "Run {} {} with {} listings",
        summary.run_id, status, summary.listings_found
    );
    for report in &summary.combinations {
        match &report.error {
            None => println!("  {}: {} listings", report.combination, report.listings),
            Some(error) => println!("  {}: abandoned ({error})", report.combination),
        }
    }
    if let Some(error) = &summary.error {
        println!("Error: {error}");
    }
}

pub async fn list_runs(config: &AppConfig, limit: u32) -> Result<()> {
    let db = open_database(config).await?;
    let recent = runs::list_recent(db.pool(), limit).await?;

    if recent.is_empty() {
        println!("No runs recorded yet");
    }
    for run in recent {
        let status = match run.success {
            None => "open",
            Some(true) => "ok",
            Some(false) => "failed",
        };
        println!(
            "{}  {}  {:>6}  {:>5} listings  {}",
            run.start_time.format("%Y-%m-%d %H:%M:%S"),
            run.id,
            status,
            run.listings_found,
            run.error.unwrap_or_default()
        );
    }

    db.close().await;
    Ok(())
}

pub async fn purge(config: &AppConfig) -> Result<()> {
    let db = open_database(config).await?;
    let removed = listings::purge_expired(db.pool(), Utc::now()).await?;
    println!("Removed {removed} expired listings");
    db.close().await;
    Ok(())
}
