//! CLI binary for processing scientific articles from the command line.

mod bench;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use scriba_pipeline::{Decision, Orchestrator, PipelineConfig};
use scriba_types::Stage;

#[derive(Parser)]
#[command(name = "scriba", version, about = "Multi-agent processing for scientific articles")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a single article file (.pdf or .txt)
    Run {
        /// Path to the article file
        file: PathBuf,

        /// Revision rounds allowed per stage after the first attempt
        #[arg(long, default_value = "1")]
        max_revisions: u32,

        /// Model name to request (default: provider's default)
        #[arg(long)]
        model: Option<String>,
    },

    /// Process every article in a directory and report latency/token metrics
    Bench {
        /// Directory of test articles
        dir: PathBuf,

        /// Write the full JSON report here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Run {
            file,
            max_revisions,
            model,
        } => {
            cmd_run(&file, max_revisions, model).await?;
        }
        Commands::Bench { dir, output } => {
            bench::run_bench(&dir, output.as_deref()).await?;
        }
    }

    Ok(())
}

async fn cmd_run(
    file: &std::path::Path,
    max_revisions: u32,
    model: Option<String>,
) -> anyhow::Result<()> {
    let article_text = scriba_extract::extract_article_text(file)
        .with_context(|| format!("Failed to extract text from {}", file.display()))?;
    if article_text.is_empty() {
        return Err(scriba_types::ScribaError::EmptyInput.into());
    }
    println!("Extracted {} characters", article_text.chars().count());

    let client = scriba_llm::CompletionClient::from_env()
        .context("No completion-service credentials; set GIGACHAT_AUTH_KEY or OPENAI_API_KEY")?;

    let mut config = PipelineConfig::from_env().with_max_revisions(max_revisions);
    if let Some(model) = model {
        config = config.with_model(model);
    }

    let orchestrator = Orchestrator::new(std::sync::Arc::new(client), config);
    let run = orchestrator.run(&article_text).await?;

    let record = run
        .record
        .context("Pipeline produced no record for a non-empty article")?;

    println!("\n{}", "=".repeat(72));
    println!("Rubric:\n{}\n", record.rubric.trim());
    println!("Keywords:\n{}\n", record.keywords.trim());
    println!("Summary:\n{}\n", record.summary.trim());
    println!("Normalized text:\n{}\n", record.normalized.trim());
    println!("{}", "=".repeat(72));

    for stage in Stage::ALL {
        let slot = run.state.slot(stage);
        let outcome = match run.decisions.get(&stage) {
            Some(Decision::Continue) => "approved",
            Some(Decision::MaxRetries) => "revision ceiling reached",
            Some(Decision::Revise) | None => "unresolved",
        };
        println!(
            "{stage}: {} attempt(s), {outcome}",
            slot.revision_count
        );
    }
    println!("Trace: {:?}", run.state.status);

    Ok(())
}
