//! # Idea Radar CLI (`radar`)
//!
//! The `radar` binary drives the pipelines. It provides commands for
//! database initialization, topic administration, one-shot pipeline runs,
//! and the scheduler-facing trigger server.
//!
//! ## Usage
//!
//! ```bash
//! radar --config ./config/radar.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `radar init` | Create the SQLite database and run schema migrations |
//! | `radar topic add <name>` | Register a topic with its keywords |
//! | `radar topic list` | List registered topics |
//! | `radar run` | Run one idea synthesis pass |
//! | `radar digest` | Run one digest email pass |
//! | `radar serve` | Start the trigger HTTP server |
//!
//! ## Environment
//!
//! Secrets are never stored in the config file:
//! `OPENROUTER_API_KEY`, `RESEND_API_KEY`, `RADAR_JOB_TOKEN`, and the
//! `REDDIT_CLIENT_ID` / `REDDIT_CLIENT_SECRET` / `REDDIT_USERNAME` /
//! `REDDIT_PASSWORD` set for the Reddit source.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use idea_radar::config::{load_config, Config};
use idea_radar::store::{IdeaStore, SqliteStore};
use idea_radar::{db, jobs, migrate, server};

/// Idea Radar — mine content sources for pain points and turn them into
/// scored product ideas with daily digest emails.
#[derive(Parser)]
#[command(
    name = "radar",
    about = "Idea Radar — pain-point mining and idea synthesis pipelines",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/radar.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables (topics,
    /// ideas, idea_sources, subscriptions, subscription_topics). Idempotent.
    Init,

    /// Manage topics.
    Topic {
        #[command(subcommand)]
        command: TopicCommands,
    },

    /// Run one idea synthesis pass over all topics and sources.
    ///
    /// Prints the run summary. Partial failures are reported in the
    /// summary's error list; the command itself only fails on setup errors
    /// (bad config, missing credentials).
    Run,

    /// Run one digest email pass for today's ideas.
    Digest,

    /// Start the trigger HTTP server for the external scheduler.
    Serve,
}

#[derive(Subcommand)]
enum TopicCommands {
    /// Register a new topic.
    Add {
        /// Topic name shown to subscribers.
        name: String,

        /// Comma-separated keywords / source identifiers (for the Reddit
        /// source these are subreddit names).
        #[arg(long, default_value = "")]
        keywords: String,
    },

    /// List registered topics.
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "idea_radar=info,radar=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Init => init(&config).await,
        Commands::Topic { command } => topic(&config, command).await,
        Commands::Run => run_synthesis(&config).await,
        Commands::Digest => run_digest(&config).await,
        Commands::Serve => serve(&config).await,
    }
}

async fn open_store(config: &Config) -> Result<Arc<SqliteStore>> {
    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;
    Ok(Arc::new(SqliteStore::new(pool)))
}

async fn init(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;
    pool.close().await;
    println!("initialized {}", config.db.path.display());
    Ok(())
}

async fn topic(config: &Config, command: TopicCommands) -> Result<()> {
    let store = open_store(config).await?;

    match command {
        TopicCommands::Add { name, keywords } => {
            let id = store.insert_topic(&name, &keywords).await?;
            println!("added topic {} (id {})", name, id);
        }
        TopicCommands::List => {
            let topics = store.list_topics().await?;
            if topics.is_empty() {
                println!("no topics registered");
            }
            for topic in topics {
                println!("{}  {}  [{}]", topic.id, topic.name, topic.keywords);
            }
        }
    }

    Ok(())
}

async fn run_synthesis(config: &Config) -> Result<()> {
    let store = open_store(config).await?;
    let orchestrator = jobs::build_synthesis(config, store)?;

    let report = orchestrator.run().await;

    println!("synthesis run");
    println!("  topics processed: {}", report.topics_processed);
    println!("  ideas created: {}", report.ideas_created);
    println!("  ideas updated: {}", report.ideas_updated);
    println!("  sources logged: {}", report.sources_logged);
    if report.errors.is_empty() {
        println!("ok");
    } else {
        println!("  errors: {}", report.errors.len());
        for error in &report.errors {
            println!("    {}", error);
        }
    }

    Ok(())
}

async fn run_digest(config: &Config) -> Result<()> {
    let store = open_store(config).await?;
    let orchestrator = jobs::build_digest(config, store)?;

    let report = orchestrator.run().await;

    println!("digest run");
    println!("  emails sent: {}", report.emails_sent);
    println!("  emails skipped: {}", report.emails_skipped);
    if report.errors.is_empty() {
        println!("ok");
    } else {
        println!("  errors: {}", report.errors.len());
        for error in &report.errors {
            println!("    {}", error);
        }
    }

    Ok(())
}

async fn serve(config: &Config) -> Result<()> {
    let store = open_store(config).await?;
    server::run_server(config, store).await
}
