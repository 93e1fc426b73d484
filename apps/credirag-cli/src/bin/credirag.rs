use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use credirag_core::config::{Config, Settings};
use credirag_core::normalize::FilterMode;
use credirag_core::types::Answer;
use credirag_pipeline::{ingest, RagPipeline};

#[derive(Parser, Debug)]
#[command(name = "credirag", about = "Ask questions over consumer financial complaints")]
struct Cli {
    /// Directory holding config.toml and config.<env>.toml.
    #[arg(long, env = "CREDIRAG_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Config environment (dev, prod, test); defaults to RUST_ENV.
    #[arg(long)]
    env: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clean, chunk and embed the complaint dataset into the vector index.
    Ingest {
        /// CSV/JSONL file or directory; overrides data.dataset_path.
        #[arg(long)]
        dataset: Option<PathBuf>,
        /// strict | expanded | all
        #[arg(long)]
        filter_mode: Option<FilterMode>,
        /// Remove the existing index before ingesting.
        #[arg(long)]
        rebuild: bool,
    },
    /// Answer a single question.
    Ask {
        question: String,
        #[arg(long)]
        k: Option<usize>,
        /// Characters of each source excerpt to print.
        #[arg(long, default_value_t = 200)]
        preview: usize,
    },
    /// Interactive question loop; `exit` or `quit` leaves.
    Chat {
        #[arg(long)]
        k: Option<usize>,
        #[arg(long, default_value_t = 200)]
        preview: usize,
    },
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let config = match &cli.config_dir {
        Some(dir) => Config::load_for_env(dir, cli.env.as_deref())?,
        None => {
            let cwd = std::env::current_dir()?;
            Config::load_for_env(&cwd, cli.env.as_deref())?
        }
    };
    Ok(config.settings()?)
}

fn print_answer(answer: &Answer, preview: usize) {
    println!("\n---\nAnswer:\n{}", answer.text);
    let sources = answer.sources();
    if sources.is_empty() {
        println!("\n(no matching complaints in the index)");
        return;
    }
    println!("\nSources:");
    for s in sources {
        println!("- [{}] {}: {}", s.id, s.category, s.preview(preview));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut settings = load_settings(&cli)?;

    match cli.command {
        Command::Ingest { dataset, filter_mode, rebuild } => {
            if let Some(path) = dataset { settings.data.dataset_path = path; }
            if let Some(mode) = filter_mode { settings.ingest.filter_mode = mode; }
            tracing::info!(dataset = %settings.data.dataset_path.display(), index = %settings.data.index_dir.display(), rebuild, "ingesting");
            let report = ingest(&settings, rebuild).await?;
            println!(
                "Ingested {} of {} records into {} chunks ({} off-category, {} empty, {} too short, {} malformed)",
                report.records.kept,
                report.records.read,
                report.entries_written,
                report.records.off_category,
                report.records.empty_narrative,
                report.records.too_short,
                report.records.schema_errors
            );
        }
        Command::Ask { question, k, preview } => {
            if let Some(k) = k { settings.retrieval.k = k; }
            let pipeline = RagPipeline::from_settings(&settings).await?;
            let answer = pipeline.ask(&question).await?;
            print_answer(&answer, preview);
        }
        Command::Chat { k, preview } => {
            if let Some(k) = k { settings.retrieval.k = k; }
            let pipeline = RagPipeline::from_settings(&settings).await?;
            println!("RAG pipeline ready.");
            let stdin = io::stdin();
            loop {
                print!("\nEnter your question (or 'exit'): ");
                io::stdout().flush()?;
                let mut line = String::new();
                if stdin.lock().read_line(&mut line)? == 0 { break; }
                let question = line.trim();
                if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") { break; }
                // a failed question must not end the session
                match pipeline.ask(question).await {
                    Ok(answer) => print_answer(&answer, preview),
                    Err(e) => eprintln!("Error: {e}"),
                }
            }
        }
    }
    Ok(())
}
