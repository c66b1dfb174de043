use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use logtriage::classify::{explain, mitigate, Severity};
use logtriage::detect::AnalysisEngine;
use logtriage::ingest::collect::JournalSource;
use logtriage::normalize;
use logtriage::notify::TracingNotifier;
use logtriage::scheduler::CollectionScheduler;

#[derive(Parser)]
#[command(
    name = "logtriage",
    about = "Log anomaly triage and incident-response workflow engine",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the daemon (API server + collection scheduler)
    Serve {
        /// Bind address
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: String,

        /// SQLite database path
        #[arg(long, default_value = "data/logtriage.db")]
        db: String,
    },

    /// Run one collect -> train -> analyze cycle and print the outcome
    Collect {
        /// SQLite database path
        #[arg(long, default_value = "data/logtriage.db")]
        db: String,

        /// Maximum items to collect
        #[arg(long, default_value = "1000")]
        max_items: usize,
    },

    /// Score stored logs and auto-create incidents
    Analyze {
        /// SQLite database path
        #[arg(long, default_value = "data/logtriage.db")]
        db: String,
    },

    /// Classify a single message (structured view, insight, mitigation)
    Classify {
        /// The raw log message
        message: String,

        /// Optional anomaly score for severity banding
        #[arg(long)]
        score: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind, db } => {
            tracing::info!(%bind, "Starting logtriage daemon");
            logtriage::serve(&bind, &db).await?;
        }
        Commands::Collect { db, max_items } => {
            let pool = logtriage::storage::open_pool(&db)?;
            let engine = Arc::new(AnalysisEngine::new(pool.clone(), Arc::new(TracingNotifier)));
            let scheduler =
                CollectionScheduler::new(pool, engine, Arc::new(JournalSource));

            let result = scheduler.run_cycle(max_items).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Analyze { db } => {
            let pool = logtriage::storage::open_pool(&db)?;
            let engine = AnalysisEngine::new(pool, Arc::new(TracingNotifier));
            let report = tokio::task::spawn_blocking(move || engine.analyze()).await??;

            println!("Scored {} records, {} anomalies, {} incidents created",
                report.total, report.anomalies.len(), report.incidents_created);
            for anomaly in report.anomalies.iter().take(20) {
                println!("  [{:.2}] {}", anomaly.score, anomaly.message);
            }
        }
        Commands::Classify { message, score } => {
            println!("Severity:   {}", Severity::from_score(score));
            println!("Structured: {}", serde_json::to_string(&normalize::structure(&message))?);
            match explain(&message) {
                Some(insight) => println!("Insight:    {insight}"),
                None => println!("Insight:    (none)"),
            }
            match mitigate(&message) {
                Some(m) => {
                    println!("Action:     {}", m.action);
                    println!("Command:    {}", m.command);
                }
                None => println!("Action:     (none)"),
            }
        }
    }

    Ok(())
}
