//! Keyword fragment and candidate types shared by the combinator, harvester,
//! and rank validator.
//!
//! ## Input shape
//!
//! A keyword set is a JSON object with five upper-case category keys. Each
//! category is an array of `{ "text": ..., "source": ... }` objects; bare
//! strings are also accepted and tagged with source `"custom"`. Missing
//! categories are treated as empty:
//!
//! ```json
//! { "CORE": [{ "text": "국밥", "source": "place" }], "LOCATION": ["서울역"] }
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// A single harvested keyword fragment with its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "FragmentRepr")]
pub struct KeywordFragment {
    pub text: String,
    pub source: String,
}

impl KeywordFragment {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FragmentRepr {
    Full {
        text: String,
        #[serde(default = "custom_source")]
        source: String,
    },
    Bare(String),
}

fn custom_source() -> String {
    "custom".to_string()
}

impl From<FragmentRepr> for KeywordFragment {
    fn from(repr: FragmentRepr) -> Self {
        match repr {
            FragmentRepr::Full { text, source } => Self { text, source },
            FragmentRepr::Bare(text) => Self {
                text,
                source: custom_source(),
            },
        }
    }
}

/// The five fixed keyword categories harvested for an entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordFragmentSet {
    /// Business type, e.g. `"국밥"`, `"카페"`.
    #[serde(rename = "CORE", default)]
    pub core: Vec<KeywordFragment>,
    /// District, neighbourhood, or station names.
    #[serde(rename = "LOCATION", default)]
    pub location: Vec<KeywordFragment>,
    #[serde(rename = "MENU", default)]
    pub menu: Vec<KeywordFragment>,
    /// Descriptive qualifiers, e.g. `"분위기좋은"`.
    #[serde(rename = "ATTRIBUTE", default)]
    pub attribute: Vec<KeywordFragment>,
    #[serde(rename = "SENTIMENT", default)]
    pub sentiment: Vec<KeywordFragment>,
}

impl KeywordFragmentSet {
    /// Parses a keyword set from its JSON representation.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Deserialize`] if `json` is not a valid keyword-set object.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        serde_json::from_str(json).map_err(|source| CoreError::Deserialize {
            context: "keyword set".to_string(),
            source,
        })
    }

    /// Total number of fragments across all categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.core.len()
            + self.location.len()
            + self.menu.len()
            + self.attribute.len()
            + self.sentiment.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a copy with every category cut to at most `max` fragments.
    #[must_use]
    pub fn truncated(&self, max: usize) -> Self {
        let cut = |v: &Vec<KeywordFragment>| v.iter().take(max).cloned().collect();
        Self {
            core: cut(&self.core),
            location: cut(&self.location),
            menu: cut(&self.menu),
            attribute: cut(&self.attribute),
            sentiment: cut(&self.sentiment),
        }
    }
}

/// Priority class of a generated candidate. Lower is more specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    T1,
    T2,
    T3,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::T1 => write!(f, "T1"),
            Tier::T2 => write!(f, "T2"),
            Tier::T3 => write!(f, "T3"),
        }
    }
}

impl FromStr for Tier {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "T1" => Ok(Tier::T1),
            "T2" => Ok(Tier::T2),
            "T3" => Ok(Tier::T3),
            _ => Err(CoreError::InvalidTier(s.to_string())),
        }
    }
}

/// A search phrase to be rank-checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateKeyword {
    #[serde(alias = "text")]
    pub keyword: String,
    pub tier: Tier,
}

impl CandidateKeyword {
    /// Builds a candidate from raw text, normalizing its whitespace.
    pub fn new(keyword: &str, tier: Tier) -> Self {
        Self {
            keyword: normalize_keyword(keyword),
            tier,
        }
    }

    /// Case-insensitive identity used for deduplication.
    #[must_use]
    pub fn dedup_key(&self) -> String {
        self.keyword.to_lowercase()
    }
}

/// Trims `raw` and collapses every internal whitespace run to one space.
#[must_use]
pub fn normalize_keyword(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Character count of `text` with all whitespace removed.
#[must_use]
pub fn keyword_length(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}
