mod combine;
mod input;
mod score;
mod validate;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "kwrank")]
#[command(about = "Keyword discovery and rank validation for place listings")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate tiered candidate keywords from a keyword set or place document
    Combine {
        /// Keyword-set JSON or crawled place JSON
        #[arg(long)]
        input: PathBuf,
        /// Minimum keyword length, whitespace excluded
        #[arg(long)]
        min_length: Option<usize>,
        /// Maximum keyword length, whitespace excluded
        #[arg(long)]
        max_length: Option<usize>,
        #[arg(long)]
        max_results: Option<usize>,
    },
    /// Score how complete a crawled place document is
    Score {
        /// Crawled place JSON
        #[arg(long)]
        input: PathBuf,
        /// Keyword-set JSON to score instead of the harvested one
        #[arg(long)]
        keywords: Option<PathBuf>,
        /// Manually entered keywords and notes
        #[arg(long)]
        manual: Option<PathBuf>,
    },
    /// Probe search rankings for every candidate keyword
    Validate {
        /// Listing id to look for (defaults to the place document's id)
        #[arg(long)]
        target: Option<String>,
        /// Keyword-set JSON or crawled place JSON
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        concurrency: Option<usize>,
        /// Ranks at or above this count as winners
        #[arg(long)]
        max_rank: Option<u32>,
        #[arg(long)]
        max_pages: Option<u32>,
        /// Stop starting new probes after this many winners (0 disables)
        #[arg(long, default_value = "0")]
        early_stop: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    let config = kwrank_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    // Logs go to stderr so stdout stays machine-readable JSON.
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Combine {
            input,
            min_length,
            max_length,
            max_results,
        } => combine::run_combine(
            &config,
            &input,
            &combine::LengthOverrides {
                min_length,
                max_length,
                max_results,
            },
        )?,
        Commands::Score {
            input,
            keywords,
            manual,
        } => score::run_score(&input, keywords.as_deref(), manual.as_deref())?,
        Commands::Validate {
            target,
            input,
            concurrency,
            max_rank,
            max_pages,
            early_stop,
        } => {
            validate::run_validate(
                &config,
                &validate::ValidateArgs {
                    target,
                    input,
                    concurrency,
                    max_rank,
                    max_pages,
                    early_stop,
                },
            )
            .await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests;
