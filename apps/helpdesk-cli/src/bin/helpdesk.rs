use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;

use helpdesk_core::config::Config;
use helpdesk_embed::get_default_embedder;
use helpdesk_service::{ingest, metrics_report, Helpdesk};

#[derive(Debug, Parser)]
#[command(name = "helpdesk")]
#[command(about = "Retrieval helpdesk: index text files, answer questions, track retrieval quality")]
struct Cli {
    /// Directory holding config.toml and config.<env>.toml
    #[arg(long, global = true, default_value = ".")]
    config_dir: PathBuf,

    /// Selects config.<env>.toml
    #[arg(long, global = true, env = "RUST_ENV", default_value = "dev")]
    env: String,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Chunk, embed and persist every .txt file in paths.raw_dir
    Ingest {
        #[arg(long)]
        no_progress: bool,
    },
    /// Retrieve the best chunks for a question
    Ask {
        question: String,
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Record where the expected file ranked for a question
    Feedback {
        question: String,
        #[arg(long)]
        answer_file: String,
        #[arg(short, long)]
        k: Option<usize>,
        /// Report the rank without appending to the log
        #[arg(long)]
        dry_run: bool,
    },
    /// hit@k, MRR and nDCG@k over the feedback log
    Metrics {
        #[arg(short, long, default_value_t = 5)]
        k: usize,
    },
    /// List indexed files
    Files,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .try_init()
        .ok();

    let settings = Config::load_from(&cli.config_dir, &cli.env)
        .map_err(|e| { eprintln!("Error loading config: {}", e); e })?
        .settings()?;
    debug!(?settings, "configuration loaded");

    match cli.command {
        Commands::Ingest { no_progress } => {
            let raw_dir = settings.paths.raw_dir();
            println!("📂 Ingesting from {}", raw_dir.display());
            let embedder = get_default_embedder(&settings.embedder)?;
            let report = ingest(&settings, embedder, !no_progress).await?;
            let mode = if report.persisted.accelerated { "LanceDB" } else { "embeddings only" };
            println!("✅ Indexed {} chunks from {} documents ({})", report.chunks, report.documents, mode);
            println!("📊 Index written to {}", report.persisted.location.display());
        }
        Commands::Ask { question, k } => {
            let helpdesk = Helpdesk::from_settings(settings).await?;
            let k = k.unwrap_or(helpdesk.settings().search.default_k);
            let answer = helpdesk.ask(&question, k).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&answer)?);
            } else {
                println!("🔎 {} ({} ms)", question, answer.latency_ms);
                for hit in &answer.contexts {
                    println!("  {}. [{:.3}] {}", hit.rank, hit.score, hit.source_file);
                }
                println!("\n{}", answer.answer);
            }
        }
        Commands::Feedback { question, answer_file, k, dry_run } => {
            let helpdesk = Helpdesk::from_settings(settings).await?;
            if !helpdesk.files().contains(&answer_file) {
                eprintln!("⚠️  {} is not among the indexed files", answer_file);
            }
            let k = k.unwrap_or(helpdesk.settings().search.feedback_k);
            let outcome = helpdesk.feedback(&question, &answer_file, k, !dry_run).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                match outcome.rank {
                    Some(rank) => println!("→ Rank: {}", rank),
                    None => println!("→ Rank: NOT FOUND in top-{}", k),
                }
                if outcome.saved { println!("💾 Saved to {}", helpdesk.settings().paths.feedback_path().display()); }
            }
        }
        Commands::Metrics { k } => {
            let report = metrics_report(&settings.paths.feedback_path(), k)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Queries: {} (skipped {} malformed lines)", report.count, report.skipped);
                println!("  hit@{}: {:.3}", report.k, report.hit_at_k);
                println!("  MRR: {:.3}", report.mrr);
                println!("  nDCG@{}: {:.3}", report.k, report.ndcg_at_k);
            }
        }
        Commands::Files => {
            let helpdesk = Helpdesk::from_settings(settings).await?;
            let files = helpdesk.files();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "files": files }))?);
            } else {
                println!("Available files ({}):", files.len());
                for f in files { println!("  {}", f); }
            }
        }
    }
    Ok(())
}
