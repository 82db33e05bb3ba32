//! Sentimeter command-line interface.
//!
//! `sentimeter analyze <FILE>` scores every review in the file and
//! prints the aggregate totals as JSON on stdout. Failures print a JSON
//! error document on stderr; the exit code distinguishes rejected input
//! (2, nothing was scored) from a failed batch (1).

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use sentimeter_runtime::{
    aggregate::{BatchError, SentimentAggregator},
    config::RuntimeConfig,
    dataset,
    providers::GroqProvider,
};

/// The batch ran and failed; an error document was printed.
const EXIT_BATCH_FAILED: u8 = 1;

/// The input was rejected before any scoring happened.
const EXIT_BAD_INPUT: u8 = 2;

#[derive(Parser)]
#[command(
    name = "sentimeter",
    version,
    about = "Aggregate review sentiment via an LLM inference endpoint"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score every review in a dataset and print the aggregate totals
    Analyze {
        /// Path to a .csv or .xlsx file with a 'Review' column
        file: PathBuf,

        /// YAML runtime configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the configured model
        #[arg(long)]
        model: Option<String>,

        /// Override batch concurrency
        #[arg(long)]
        concurrency: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze {
            file,
            config,
            model,
            concurrency,
        } => analyze(&file, config.as_deref(), model, concurrency).await,
    }
}

async fn analyze(
    file: &Path,
    config_path: Option<&Path>,
    model: Option<String>,
    concurrency: Option<usize>,
) -> ExitCode {
    let mut config = match load_config(config_path) {
        Ok(config) => config,
        Err(err) => return bad_input(&err),
    };
    if let Some(model) = model {
        config.model = model;
    }
    if let Some(concurrency) = concurrency {
        config.max_concurrency = concurrency;
    }

    // Input problems are rejected here, before any quota is spent.
    let reviews = match dataset::load_reviews(file) {
        Ok(reviews) => reviews,
        Err(err) => return bad_input(&anyhow::Error::new(err)),
    };
    tracing::info!(total_reviews = reviews.len(), file = %file.display(), "dataset loaded");

    let aggregator = match build_aggregator(&config) {
        Ok(aggregator) => aggregator,
        Err(err) => return bad_input(&err),
    };

    match aggregator.run_batch(&reviews).await {
        Ok(result) => {
            let usage = aggregator.usage();
            tracing::info!(
                llm_calls = usage.llm_calls,
                retries = usage.retries,
                rate_limit_hits = usage.rate_limit_hits,
                cache_hits = usage.cache_hits,
                "batch complete"
            );
            println!("{}", serde_json::json!(result));
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", batch_error_document(&err));
            ExitCode::from(EXIT_BATCH_FAILED)
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<RuntimeConfig> {
    match path {
        Some(path) => RuntimeConfig::from_yaml_file(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(RuntimeConfig::default()),
    }
}

fn build_aggregator(config: &RuntimeConfig) -> anyhow::Result<SentimentAggregator> {
    let provider = GroqProvider::from_env().context("configuring inference provider")?;
    SentimentAggregator::from_config(Arc::new(provider), config)
        .context("building batch aggregator")
}

/// The single error document a failed batch reports. Extraction failures
/// carry the raw response for diagnosis; nothing reports per-review
/// detail beyond the failing index in the message.
fn batch_error_document(err: &BatchError) -> String {
    let mut document = serde_json::json!({ "error": error_chain(err) });
    if let BatchError::ExtractionFailed { raw_response, .. } = err {
        document["raw_response"] = raw_response.clone().into();
    }
    document.to_string()
}

fn bad_input(err: &anyhow::Error) -> ExitCode {
    eprintln!("{}", serde_json::json!({ "error": format!("{err:#}") }));
    ExitCode::from(EXIT_BAD_INPUT)
}

/// Flatten an error and its sources into one message.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
