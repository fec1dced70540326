//! Tiered keyword combination.
//!
//! Candidates are produced from a [`KeywordFragmentSet`] in fixed priority
//! order:
//!
//! | Tier | Combinations |
//! |------|--------------|
//! | T1 | LOCATION + CORE |
//! | T2 | LOCATION + ATTRIBUTE + CORE, LOCATION + MENU |
//! | T3 | LOCATION + SENTIMENT + CORE, ATTRIBUTE + CORE |
//!
//! Three-way tiers grow as `|LOCATION| x |ATTRIBUTE| x |CORE|`, so every
//! category is cut to [`CombinatorOptions::max_fragments_per_category`]
//! before combining.

use std::collections::HashMap;

use serde::Serialize;

use crate::keywords::{
    keyword_length, normalize_keyword, CandidateKeyword, KeywordFragment, KeywordFragmentSet,
    Tier,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombinatorOptions {
    /// Minimum length, counted in chars with whitespace removed.
    pub min_length: usize,
    /// Maximum length, counted in chars with whitespace removed.
    pub max_length: usize,
    pub max_results: usize,
    pub max_fragments_per_category: usize,
}

impl Default for CombinatorOptions {
    fn default() -> Self {
        Self {
            min_length: 6,
            max_length: 15,
            max_results: 500,
            max_fragments_per_category: 20,
        }
    }
}

/// Per-tier candidate counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct TierCounts {
    pub t1: usize,
    pub t2: usize,
    pub t3: usize,
}

impl TierCounts {
    #[must_use]
    pub fn from_candidates(candidates: &[CandidateKeyword]) -> Self {
        candidates
            .iter()
            .fold(Self::default(), |mut counts, c| {
                match c.tier {
                    Tier::T1 => counts.t1 += 1,
                    Tier::T2 => counts.t2 += 1,
                    Tier::T3 => counts.t3 += 1,
                }
                counts
            })
    }
}

#[derive(Debug, Clone, Default)]
pub struct KeywordCombinator {
    options: CombinatorOptions,
}

impl KeywordCombinator {
    #[must_use]
    pub fn new(options: CombinatorOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> &CombinatorOptions {
        &self.options
    }

    /// Generates tier-sorted, deduplicated, length-bounded candidates.
    ///
    /// When the same text (case-insensitively) comes out of several tiers only
    /// the highest-priority tier is kept. Ordering within a tier follows
    /// generation order. The result is truncated to `max_results`.
    #[must_use]
    pub fn generate(&self, set: &KeywordFragmentSet) -> Vec<CandidateKeyword> {
        let set = set.truncated(self.options.max_fragments_per_category);
        let mut raw: Vec<CandidateKeyword> = Vec::new();

        self.pair(&set.location, &set.core, Tier::T1, &mut raw);

        self.triple(&set.location, &set.attribute, &set.core, Tier::T2, &mut raw);
        self.pair(&set.location, &set.menu, Tier::T2, &mut raw);

        self.triple(&set.location, &set.sentiment, &set.core, Tier::T3, &mut raw);
        self.pair(&set.attribute, &set.core, Tier::T3, &mut raw);

        let generated = raw.len();
        let candidates = self.dedup_and_sort(raw);
        tracing::debug!(
            generated,
            kept = candidates.len(),
            max_results = self.options.max_results,
            "generated keyword candidates"
        );
        candidates
    }

    fn pair(
        &self,
        first: &[KeywordFragment],
        second: &[KeywordFragment],
        tier: Tier,
        out: &mut Vec<CandidateKeyword>,
    ) {
        for a in first {
            for b in second {
                self.push_if_valid(&format!("{} {}", a.text, b.text), tier, out);
            }
        }
    }

    fn triple(
        &self,
        first: &[KeywordFragment],
        second: &[KeywordFragment],
        third: &[KeywordFragment],
        tier: Tier,
        out: &mut Vec<CandidateKeyword>,
    ) {
        for a in first {
            for b in second {
                for c in third {
                    self.push_if_valid(&format!("{} {} {}", a.text, b.text, c.text), tier, out);
                }
            }
        }
    }

    fn push_if_valid(&self, raw: &str, tier: Tier, out: &mut Vec<CandidateKeyword>) {
        let normalized = normalize_keyword(raw);
        if self.is_valid_length(&normalized) {
            out.push(CandidateKeyword {
                keyword: normalized,
                tier,
            });
        }
    }

    /// Whether `text` falls inside the configured length window.
    #[must_use]
    pub fn is_valid_length(&self, text: &str) -> bool {
        let len = keyword_length(text);
        len >= self.options.min_length && len <= self.options.max_length
    }

    fn dedup_and_sort(&self, raw: Vec<CandidateKeyword>) -> Vec<CandidateKeyword> {
        // key -> index into `kept`; first occurrence fixes the position.
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut kept: Vec<CandidateKeyword> = Vec::new();

        for candidate in raw {
            let key = candidate.dedup_key();
            match index.get(&key) {
                Some(&i) => {
                    if candidate.tier < kept[i].tier {
                        kept[i] = candidate;
                    }
                }
                None => {
                    index.insert(key, kept.len());
                    kept.push(candidate);
                }
            }
        }

        // Stable sort keeps generation order inside each tier.
        kept.sort_by_key(|c| c.tier);
        kept.truncate(self.options.max_results);
        kept
    }
}

#[cfg(test)]
#[path = "combinator_test.rs"]
mod tests;
