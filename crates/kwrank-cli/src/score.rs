//! `score`: print the completeness score of a place document.

use std::path::Path;

use kwrank_core::{
    harvest_keyword_set, CompletenessScorer, HarvestOptions, KeywordFragmentSet, ManualData,
};

use crate::input::{load_place, read_file};

pub(crate) fn run_score(
    input: &Path,
    keywords: Option<&Path>,
    manual: Option<&Path>,
) -> anyhow::Result<()> {
    let place = load_place(input)?;
    let keyword_set = match keywords {
        Some(path) => KeywordFragmentSet::from_json(&read_file(path)?)?,
        None => harvest_keyword_set(&place, HarvestOptions::default()),
    };
    let manual_data: Option<ManualData> = match manual {
        Some(path) => Some(serde_json::from_str(&read_file(path)?)?),
        None => None,
    };

    let score =
        CompletenessScorer::default().score(&place, Some(&keyword_set), manual_data.as_ref());
    tracing::info!(
        place_id = place.id().unwrap_or("-"),
        total_score = score.total_score,
        grade = %score.grade,
        "scored place completeness"
    );
    println!("{}", serde_json::to_string_pretty(&score)?);
    Ok(())
}
