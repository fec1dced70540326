//! Weighted completeness score for a crawled place.
//!
//! Scores range from 0 to 115 across seven categories. Each category score is
//! its weight multiplied by a sum of sub-check fractions, where a sub-check is
//! either a presence flag or a count/ratio measured linearly against a
//! threshold. A category never contributes more than its own weight.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::keywords::KeywordFragmentSet;
use crate::place::{non_blank, PlaceSnapshot};

// ---------------------------------------------------------------------------
// Weight constants (must sum to exactly 115)
// ---------------------------------------------------------------------------

pub const W_BASIC_INFO: u32 = 20;
pub const W_MENU: u32 = 20;
pub const W_REVIEWS: u32 = 25;
pub const W_IMAGES: u32 = 15;
pub const W_FACILITIES: u32 = 10;
/// Harvested keyword coverage, 3 points per fragment category.
pub const W_KEYWORDS: u32 = 15;
/// Operator-entered data: current keywords and notes.
pub const W_MANUAL_DATA: u32 = 10;

pub const MAX_SCORE: u32 = 115;

const _: () = assert!(
    W_BASIC_INFO + W_MENU + W_REVIEWS + W_IMAGES + W_FACILITIES + W_KEYWORDS + W_MANUAL_DATA
        == MAX_SCORE,
    "completeness weights must sum to exactly 115"
);

const HIGH_THRESHOLD: f64 = 90.0;
const MEDIUM_THRESHOLD: f64 = 60.0;

/// Minimum pixel size for an image to count as high resolution.
const HIGH_RES_WIDTH: u32 = 1200;
const HIGH_RES_HEIGHT: u32 = 800;
const LONG_BLOG_WORDS: u32 = 1500;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScoreCategory {
    BasicInfo,
    Menu,
    Reviews,
    Images,
    Facilities,
    Keywords,
    ManualData,
}

impl ScoreCategory {
    pub const ALL: [ScoreCategory; 7] = [
        ScoreCategory::BasicInfo,
        ScoreCategory::Menu,
        ScoreCategory::Reviews,
        ScoreCategory::Images,
        ScoreCategory::Facilities,
        ScoreCategory::Keywords,
        ScoreCategory::ManualData,
    ];
}

/// Per-category maximum points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletenessWeights {
    pub basic_info: f64,
    pub menu: f64,
    pub reviews: f64,
    pub images: f64,
    pub facilities: f64,
    pub keywords: f64,
    pub manual_data: f64,
}

impl Default for CompletenessWeights {
    fn default() -> Self {
        Self {
            basic_info: f64::from(W_BASIC_INFO),
            menu: f64::from(W_MENU),
            reviews: f64::from(W_REVIEWS),
            images: f64::from(W_IMAGES),
            facilities: f64::from(W_FACILITIES),
            keywords: f64::from(W_KEYWORDS),
            manual_data: f64::from(W_MANUAL_DATA),
        }
    }
}

impl CompletenessWeights {
    #[must_use]
    pub fn get(&self, category: ScoreCategory) -> f64 {
        match category {
            ScoreCategory::BasicInfo => self.basic_info,
            ScoreCategory::Menu => self.menu,
            ScoreCategory::Reviews => self.reviews,
            ScoreCategory::Images => self.images,
            ScoreCategory::Facilities => self.facilities,
            ScoreCategory::Keywords => self.keywords,
            ScoreCategory::ManualData => self.manual_data,
        }
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        ScoreCategory::ALL.iter().map(|c| self.get(*c)).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Grade {
    High,
    Medium,
    Low,
}

impl Grade {
    #[must_use]
    pub fn from_score(total: f64) -> Self {
        if total >= HIGH_THRESHOLD {
            Grade::High
        } else if total >= MEDIUM_THRESHOLD {
            Grade::Medium
        } else {
            Grade::Low
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grade::High => write!(f, "HIGH"),
            Grade::Medium => write!(f, "MEDIUM"),
            Grade::Low => write!(f, "LOW"),
        }
    }
}

/// Operator-entered data that is not part of the crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManualData {
    pub current_keywords: Vec<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletenessScore {
    /// Rounded to one decimal place.
    pub total_score: f64,
    pub max_score: u32,
    pub grade: Grade,
    pub breakdown: BTreeMap<ScoreCategory, f64>,
    pub details: CompletenessDetails,
}

/// Raw counts behind each category score, for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletenessDetails {
    pub basic_info: BasicInfoDetails,
    pub menu: MenuDetails,
    pub reviews: ReviewDetails,
    pub images: ImageDetails,
    pub facilities: FacilityDetails,
    /// `None` when no keyword set was supplied.
    pub keywords: Option<KeywordDetails>,
    /// `None` when no manual data was supplied.
    pub manual_data: Option<ManualDataDetails>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct BasicInfoDetails {
    pub has_id: bool,
    pub has_name: bool,
    pub has_category: bool,
    pub has_address: bool,
    pub has_phone: bool,
    pub description_length: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuDetails {
    pub count: usize,
    pub with_price: usize,
    pub price_ratio: f64,
    pub with_image: usize,
    pub image_ratio: f64,
    pub has_recommended: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDetails {
    pub total: u32,
    pub visitor: u32,
    pub blog: u32,
    pub receipt: u32,
    pub long_blog_reviews: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDetails {
    pub count: usize,
    pub high_res: usize,
    pub high_res_ratio: f64,
    pub category_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityDetails {
    pub available_facilities: usize,
    pub payment_methods: usize,
    pub has_parking: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordDetails {
    pub core: usize,
    pub location: usize,
    pub menu: usize,
    pub attribute: usize,
    pub sentiment: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualDataDetails {
    pub current_keywords: usize,
    pub notes_length: usize,
}

// ---------------------------------------------------------------------------
// Scorer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct CompletenessScorer {
    weights: CompletenessWeights,
}

impl CompletenessScorer {
    #[must_use]
    pub fn new(weights: CompletenessWeights) -> Self {
        Self { weights }
    }

    #[must_use]
    pub fn weights(&self) -> &CompletenessWeights {
        &self.weights
    }

    /// Scores `place`, optionally with its harvested keyword set and manual data.
    ///
    /// Missing keyword or manual inputs score zero in their category.
    #[must_use]
    pub fn score(
        &self,
        place: &PlaceSnapshot,
        keywords: Option<&KeywordFragmentSet>,
        manual: Option<&ManualData>,
    ) -> CompletenessScore {
        let details = CompletenessDetails {
            basic_info: basic_info_details(place),
            menu: menu_details(place),
            reviews: review_details(place),
            images: image_details(place),
            facilities: facility_details(place),
            keywords: keywords.map(keyword_details),
            manual_data: manual.map(manual_details),
        };

        let fractions = [
            (ScoreCategory::BasicInfo, basic_info_fraction(&details.basic_info)),
            (ScoreCategory::Menu, menu_fraction(&details.menu)),
            (ScoreCategory::Reviews, review_fraction(&details.reviews)),
            (ScoreCategory::Images, image_fraction(&details.images)),
            (ScoreCategory::Facilities, facility_fraction(&details.facilities)),
            (
                ScoreCategory::Keywords,
                details.keywords.as_ref().map_or(0.0, keyword_fraction),
            ),
            (
                ScoreCategory::ManualData,
                details.manual_data.as_ref().map_or(0.0, manual_fraction),
            ),
        ];

        let breakdown: BTreeMap<ScoreCategory, f64> = fractions
            .into_iter()
            .map(|(category, fraction)| {
                let weight = self.weights.get(category);
                (category, (weight * fraction).min(weight))
            })
            .collect();

        let (total_score, grade) = summarize(breakdown.values().sum());

        tracing::debug!(
            place_id = place.id().unwrap_or("unknown"),
            total_score,
            %grade,
            "scored place completeness"
        );

        CompletenessScore {
            total_score,
            max_score: MAX_SCORE,
            grade,
            breakdown,
            details,
        }
    }
}

/// Rounds the total to one decimal. The grade comes from the unrounded sum,
/// so a total shown as 90.0 can still grade MEDIUM.
fn summarize(raw_total: f64) -> (f64, Grade) {
    ((raw_total * 10.0).round() / 10.0, Grade::from_score(raw_total))
}

/// `value / threshold`, saturating at 1.
fn ratio(value: f64, threshold: f64) -> f64 {
    if threshold <= 0.0 {
        return 1.0;
    }
    (value / threshold).clamp(0.0, 1.0)
}

#[allow(clippy::cast_precision_loss)]
fn count_ratio(count: usize, threshold: usize) -> f64 {
    ratio(count as f64, threshold as f64)
}

fn flag(present: bool, weight: f64) -> f64 {
    if present {
        weight
    } else {
        0.0
    }
}

#[allow(clippy::cast_precision_loss)]
fn share(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

// --- basic info ------------------------------------------------------------

fn basic_info_details(place: &PlaceSnapshot) -> BasicInfoDetails {
    let basic = &place.basic;
    BasicInfoDetails {
        has_id: place.id().is_some(),
        has_name: non_blank(basic.name.as_deref()),
        has_category: non_blank(basic.category.as_deref()),
        has_address: basic.address.as_ref().is_some_and(|a| a.is_present()),
        has_phone: non_blank(basic.phone.as_deref()),
        description_length: basic
            .description
            .as_deref()
            .map_or(0, |d| d.chars().count()),
    }
}

fn basic_info_fraction(d: &BasicInfoDetails) -> f64 {
    let description = match d.description_length {
        n if n >= 1200 => 0.25,
        n if n >= 600 => 0.15,
        n if n >= 200 => 0.1,
        _ => 0.0,
    };
    flag(d.has_id, 0.1)
        + flag(d.has_name, 0.15)
        + flag(d.has_category, 0.15)
        + flag(d.has_address, 0.2)
        + flag(d.has_phone, 0.15)
        + description
}

// --- menu ------------------------------------------------------------------

fn menu_details(place: &PlaceSnapshot) -> MenuDetails {
    let menus = &place.menus;
    let with_price = menus
        .iter()
        .filter(|m| m.price.is_some_and(|p| p > 0.0))
        .count();
    let with_image = menus
        .iter()
        .filter(|m| non_blank(m.image.as_deref()))
        .count();
    MenuDetails {
        count: menus.len(),
        with_price,
        price_ratio: share(with_price, menus.len()),
        with_image,
        image_ratio: share(with_image, menus.len()),
        has_recommended: menus.iter().any(|m| m.is_recommended || m.is_popular),
    }
}

fn menu_fraction(d: &MenuDetails) -> f64 {
    if d.count == 0 {
        return 0.0;
    }
    0.4 * count_ratio(d.count, 10)
        + 0.3 * ratio(d.price_ratio, 0.8)
        + 0.2 * ratio(d.image_ratio, 0.5)
        + flag(d.has_recommended, 0.1)
}

// --- reviews ---------------------------------------------------------------

fn review_details(place: &PlaceSnapshot) -> ReviewDetails {
    let stats = place.reviews.stats;
    ReviewDetails {
        total: stats.total,
        visitor: stats.visitor,
        blog: stats.blog,
        receipt: stats.receipt,
        long_blog_reviews: place
            .reviews
            .blog_reviews
            .iter()
            .filter(|r| r.word_count >= LONG_BLOG_WORDS)
            .count(),
    }
}

fn review_fraction(d: &ReviewDetails) -> f64 {
    0.4 * ratio(f64::from(d.total), 100.0)
        + 0.24 * ratio(f64::from(d.visitor), 50.0)
        + 0.24 * count_ratio(d.long_blog_reviews, 5)
        + 0.12 * ratio(f64::from(d.receipt), 10.0)
}

// --- images ----------------------------------------------------------------

fn image_details(place: &PlaceSnapshot) -> ImageDetails {
    let images = &place.images;
    let high_res = images
        .iter()
        .filter(|i| i.width >= HIGH_RES_WIDTH && i.height >= HIGH_RES_HEIGHT)
        .count();
    let categories: HashSet<&str> = images
        .iter()
        .filter_map(|i| i.category.as_deref())
        .filter(|c| !c.trim().is_empty())
        .collect();
    ImageDetails {
        count: images.len(),
        high_res,
        high_res_ratio: share(high_res, images.len()),
        category_count: categories.len(),
    }
}

fn image_fraction(d: &ImageDetails) -> f64 {
    if d.count == 0 {
        return 0.0;
    }
    0.47 * count_ratio(d.count, 20) + 0.33 * d.high_res_ratio + 0.2 * count_ratio(d.category_count, 5)
}

// --- facilities ------------------------------------------------------------

fn facility_details(place: &PlaceSnapshot) -> FacilityDetails {
    FacilityDetails {
        available_facilities: place.facilities.iter().filter(|f| f.is_available()).count(),
        payment_methods: place.payments.len(),
        has_parking: place.facilities.iter().any(|f| f.is_parking()),
    }
}

fn facility_fraction(d: &FacilityDetails) -> f64 {
    0.5 * count_ratio(d.available_facilities, 5)
        + 0.3 * count_ratio(d.payment_methods, 3)
        + flag(d.has_parking, 0.2)
}

// --- keywords --------------------------------------------------------------

fn keyword_details(set: &KeywordFragmentSet) -> KeywordDetails {
    KeywordDetails {
        core: set.core.len(),
        location: set.location.len(),
        menu: set.menu.len(),
        attribute: set.attribute.len(),
        sentiment: set.sentiment.len(),
    }
}

/// Each of the five categories is worth a fifth; three fragments fill it.
fn keyword_fraction(d: &KeywordDetails) -> f64 {
    [d.core, d.location, d.menu, d.attribute, d.sentiment]
        .into_iter()
        .map(|n| count_ratio(n, 3) / 5.0)
        .sum()
}

// --- manual data -----------------------------------------------------------

fn manual_details(manual: &ManualData) -> ManualDataDetails {
    ManualDataDetails {
        current_keywords: manual.current_keywords.len(),
        notes_length: manual
            .notes
            .as_deref()
            .map_or(0, |n| n.trim().chars().count()),
    }
}

fn manual_fraction(d: &ManualDataDetails) -> f64 {
    let notes = match d.notes_length {
        0 => 0.0,
        n if n >= 50 => 0.4,
        _ => 0.2,
    };
    flag(d.current_keywords > 0, 0.6) + notes
}

#[cfg(test)]
#[path = "completeness_test.rs"]
mod tests;
