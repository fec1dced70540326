//! `combine`: print tiered candidates for a keyword set.

use std::path::Path;

use kwrank_core::{AppConfig, CandidateKeyword, CombinatorOptions, KeywordCombinator, TierCounts};
use serde::Serialize;

use crate::input::load_source;

/// Length flags that override the configured combinator bounds.
#[derive(Debug, Default)]
pub(crate) struct LengthOverrides {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub max_results: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CombineOutput {
    total: usize,
    tier_counts: TierCounts,
    candidates: Vec<CandidateKeyword>,
}

pub(crate) fn combinator_options(
    config: &AppConfig,
    overrides: &LengthOverrides,
) -> anyhow::Result<CombinatorOptions> {
    let base = config.combinator_options();
    let options = CombinatorOptions {
        min_length: overrides.min_length.unwrap_or(base.min_length),
        max_length: overrides.max_length.unwrap_or(base.max_length),
        max_results: overrides.max_results.unwrap_or(base.max_results),
        ..base
    };
    if options.min_length > options.max_length {
        anyhow::bail!(
            "--min-length ({}) must not exceed --max-length ({})",
            options.min_length,
            options.max_length
        );
    }
    Ok(options)
}

pub(crate) fn run_combine(
    config: &AppConfig,
    input: &Path,
    overrides: &LengthOverrides,
) -> anyhow::Result<()> {
    let options = combinator_options(config, overrides)?;
    let set = load_source(input)?.keyword_set();
    let candidates = KeywordCombinator::new(options).generate(&set);
    let tier_counts = TierCounts::from_candidates(&candidates);

    tracing::info!(
        fragments = set.len(),
        candidates = candidates.len(),
        t1 = tier_counts.t1,
        t2 = tier_counts.t2,
        t3 = tier_counts.t3,
        "generated candidate keywords"
    );

    let output = CombineOutput {
        total: candidates.len(),
        tier_counts,
        candidates,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
