//! Reading keyword sets and place documents from disk.

use std::path::Path;

use anyhow::Context;
use kwrank_core::{harvest_keyword_set, HarvestOptions, KeywordFragmentSet, PlaceSnapshot};
use serde_json::Value;

/// Top-level keys that only a crawled place document carries.
const PLACE_KEYS: [&str; 5] = ["placeId", "basic", "menus", "reviews", "facilities"];

#[derive(Debug)]
pub(crate) enum Source {
    Keywords(KeywordFragmentSet),
    Place(Box<PlaceSnapshot>),
}

impl Source {
    /// The keyword set as given, or harvested from the place document.
    pub(crate) fn keyword_set(&self) -> KeywordFragmentSet {
        match self {
            Source::Keywords(set) => set.clone(),
            Source::Place(place) => harvest_keyword_set(place, HarvestOptions::default()),
        }
    }

    pub(crate) fn place_id(&self) -> Option<&str> {
        match self {
            Source::Keywords(_) => None,
            Source::Place(place) => place.id(),
        }
    }
}

pub(crate) fn read_file(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Reads `path` as either a keyword set or a place document.
pub(crate) fn load_source(path: &Path) -> anyhow::Result<Source> {
    let text = read_file(path)?;
    classify(&text).with_context(|| format!("failed to parse {}", path.display()))
}

/// Decides whether `text` is a place document or a keyword set.
pub(crate) fn classify(text: &str) -> anyhow::Result<Source> {
    let value: Value = serde_json::from_str(text)?;
    let Some(object) = value.as_object() else {
        anyhow::bail!("expected a JSON object");
    };
    if PLACE_KEYS.iter().any(|key| object.contains_key(*key)) {
        Ok(Source::Place(Box::new(PlaceSnapshot::from_json(text)?)))
    } else {
        Ok(Source::Keywords(KeywordFragmentSet::from_json(text)?))
    }
}

pub(crate) fn load_place(path: &Path) -> anyhow::Result<PlaceSnapshot> {
    match load_source(path)? {
        Source::Place(place) => Ok(*place),
        Source::Keywords(_) => anyhow::bail!(
            "{} looks like a keyword set; a place document is required",
            path.display()
        ),
    }
}
