use chrono::Utc;
use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;

mod cli;

use cli::Cli;
use cli::commands::{Commands, SyncTarget};
use ghledger::config::Config;
use ghledger::engine::TimeWindow;
use ghledger::github::GithubClient;
use ghledger::storage::{JsonlStorage, UserStore};
use ghledger::sync::{Pipeline, RankMetric, StageReport, derive};

fn setup_logging(log_stderr: bool, default_level: &str) -> Result<()> {
    let env = env_logger::Env::default().default_filter_or(default_level);

    if log_stderr {
        env_logger::Builder::from_env(env)
            .target(env_logger::Target::Stderr)
            .init();
        return Ok(());
    }

    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ghledger")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("ghledger.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_env(env)
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn open_storage(config: &Config) -> Result<JsonlStorage> {
    JsonlStorage::new(&config.storage.data_dir)
        .context(format!("Failed to open data directory {}", config.storage.data_dir.display()))
}

fn open_pipeline(config: &Config) -> Result<Pipeline<JsonlStorage, GithubClient>> {
    let storage = open_storage(config)?;
    let client = GithubClient::new(&config.github).context("Failed to create GitHub client")?;
    Ok(Pipeline::new(config.clone(), storage, client)?)
}

fn print_stage(label: &str, report: &StageReport) {
    println!(
        "{} {} added, {} updated, {} removed",
        format!("{}:", label).green(),
        report.inserted,
        report.updated,
        report.removed
    );
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    let now = Utc::now();
    match cli.command.clone().unwrap_or(Commands::Run) {
        Commands::Run => {
            println!("{}", "Starting full run...".cyan());
            let report = open_pipeline(config)?.run(now).await?;
            print_stage("Users", &report.users);
            print_stage("Organizations", &report.orgs);
            println!("{} {} users scored and ranked", "Derived:".green(), report.scored);
            if let Some(stat) = report.stat {
                println!(
                    "{} {} users, {} organizations, {} commits in window",
                    "Totals:".green(),
                    stat.total_users,
                    stat.total_orgs,
                    stat.total_commits
                );
            }
        }
        Commands::Sync { target } => {
            let pipeline = open_pipeline(config)?;
            match target {
                SyncTarget::Users => {
                    println!("{}", "Syncing users...".cyan());
                    print_stage("Users", &pipeline.sync_users(now).await?);
                }
                SyncTarget::Orgs => {
                    println!("{}", "Syncing organizations...".cyan());
                    print_stage("Organizations", &pipeline.sync_orgs().await?);
                }
            }
        }
        Commands::Score => {
            let storage = open_storage(config)?;
            let window = TimeWindow::trailing_days(now, config.scoring.window_days);
            let scored = derive::update_scores(&storage, &window)?;
            println!("{} {} users", "Scored:".green(), scored);
        }
        Commands::Rank => {
            let storage = open_storage(config)?;
            derive::rank_users(&storage, RankMetric::Score)?;
            let ranked = derive::rank_users(&storage, RankMetric::Contributions)?;
            println!("{} {} users", "Ranked:".green(), ranked);
        }
        Commands::Show { username } => {
            let storage = open_storage(config)?;
            let user = UserStore::new(&storage)
                .find_by_key(&username)?
                .ok_or_else(|| eyre::eyre!("Unknown user: {}", username))?;

            println!("{} {}", "User:".green(), user.username.bold());
            println!("  location:            {}", user.location.as_deref().unwrap_or("-"));
            println!("  score:               {}", user.score);
            println!("  commitsTotalCount:   {}", user.commits_total_count);
            let rank = |r: Option<u64>| r.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string());
            println!("  score_rank:          {}", rank(user.score_rank));
            println!("  contributions_rank:  {}", rank(user.contributions_rank));
            println!("{}", "Commit repositories:".cyan());
            for bucket in user.commit_contributions.buckets() {
                println!(
                    "  {} ({} stars, {} days)",
                    bucket.url,
                    bucket.stars_count,
                    bucket.events().len()
                );
            }
            println!(
                "  issues: {}, pull requests: {}, reviews: {}",
                user.issue_contributions.event_count(),
                user.pr_contributions.event_count(),
                user.code_review_contributions.event_count()
            );
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                log::warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging
    setup_logging(cli.log_stderr, config.log_level.as_deref().unwrap_or("info"))
        .context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    tokio::select! {
        result = run_application(&cli, &config) => result.context("Application failed"),
        _ = shutdown_signal() => {
            log::warn!("Termination signal received, stopping");
            println!("{}", "Interrupted, exiting".yellow());
            Ok(())
        }
    }
}
