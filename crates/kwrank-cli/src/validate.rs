//! `validate`: probe rankings for every candidate and stream events.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use kwrank_core::{AppConfig, KeywordCombinator};
use kwrank_probe::HttpFetcher;
use kwrank_validator::{BatchOptions, BatchRequest, RankValidator, ValidatorConfig};
use tokio::sync::mpsc;

use crate::input::load_source;

#[derive(Debug)]
pub(crate) struct ValidateArgs {
    pub target: Option<String>,
    pub input: PathBuf,
    pub concurrency: Option<usize>,
    pub max_rank: Option<u32>,
    pub max_pages: Option<u32>,
    pub early_stop: usize,
}

pub(crate) fn batch_options(defaults: BatchOptions, args: &ValidateArgs) -> BatchOptions {
    BatchOptions {
        concurrency: args.concurrency.unwrap_or(defaults.concurrency),
        max_rank: args.max_rank.unwrap_or(defaults.max_rank),
        max_pages: args.max_pages.unwrap_or(defaults.max_pages),
        early_stop_count: args.early_stop,
    }
}

pub(crate) async fn run_validate(config: &AppConfig, args: &ValidateArgs) -> anyhow::Result<()> {
    let source = load_source(&args.input)?;
    let target_id = args
        .target
        .clone()
        .or_else(|| source.place_id().map(str::to_owned))
        .context("--target is required when the input has no place id")?;

    let candidates =
        KeywordCombinator::new(config.combinator_options()).generate(&source.keyword_set());
    let fetcher = HttpFetcher::new(Duration::from_millis(config.request_timeout_ms))
        .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {e}"))?;
    let validator = RankValidator::new(fetcher, ValidatorConfig::from_app_config(config))?;
    let options = batch_options(validator.default_options(), args);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::error!(error = %e, "failed to serialize event"),
            }
        }
    });

    let outcome = validator
        .validate_batch_streaming(
            BatchRequest {
                target_id,
                candidates,
                options,
            },
            tx,
        )
        .await;
    printer.await.context("event printer task failed")?;
    let outcome = outcome?;

    println!("{}", serde_json::to_string(&outcome)?);
    Ok(())
}
