//! Crawled place data consumed by the completeness scorer and the keyword
//! harvester.
//!
//! The crawler that produces this document is outside this workspace; the
//! types below model only the fields that scoring and harvesting read. Every
//! field is optional on the wire and defaults to empty, so a partially
//! crawled place still deserializes.

use serde::{Deserialize, Serialize};

use crate::CoreError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaceSnapshot {
    pub place_id: Option<String>,
    pub basic: BasicInfo,
    pub menus: Vec<MenuItem>,
    pub representative_menus: Vec<String>,
    pub reviews: ReviewData,
    pub images: Vec<ImageInfo>,
    pub facilities: Vec<Facility>,
    pub payments: Vec<String>,
    pub representative_keywords: Vec<String>,
    pub voted_keywords: Vec<VotedKeyword>,
}

impl PlaceSnapshot {
    /// Parses a crawled place document.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Deserialize`] if `json` does not match the place shape.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        serde_json::from_str(json).map_err(|source| CoreError::Deserialize {
            context: "place snapshot".to_string(),
            source,
        })
    }

    /// The place id from either the top-level field or the basic block.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.place_id
            .as_deref()
            .or(self.basic.id.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BasicInfo {
    pub id: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub address: Option<Address>,
    pub phone: Option<String>,
    pub description: Option<String>,
    pub seo_keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    #[serde(alias = "roadAddress")]
    pub road: Option<String>,
    pub jibun: Option<String>,
}

impl Address {
    #[must_use]
    pub fn is_present(&self) -> bool {
        non_blank(self.road.as_deref()) || non_blank(self.jibun.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MenuItem {
    pub name: String,
    pub price: Option<f64>,
    pub image: Option<String>,
    pub is_recommended: bool,
    pub is_popular: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReviewData {
    pub stats: ReviewStats,
    pub blog_reviews: Vec<BlogReview>,
    pub visitor_reviews: Vec<VisitorReview>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewStats {
    pub total: u32,
    pub visitor: u32,
    pub blog: u32,
    pub receipt: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlogReview {
    pub word_count: u32,
    #[serde(alias = "body")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisitorReview {
    #[serde(alias = "body")]
    pub content: Option<String>,
}

impl ReviewData {
    /// Text bodies of every blog and visitor review, in that order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.blog_reviews
            .iter()
            .filter_map(|r| r.content.as_deref())
            .chain(self.visitor_reviews.iter().filter_map(|r| r.content.as_deref()))
    }

    #[must_use]
    pub fn has_any(&self) -> bool {
        !self.blog_reviews.is_empty() || !self.visitor_reviews.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Facility {
    pub name: String,
    /// `None` means the crawler did not say; only an explicit `false` excludes it.
    pub available: Option<bool>,
}

impl Facility {
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.available != Some(false)
    }

    #[must_use]
    pub fn is_parking(&self) -> bool {
        let lower = self.name.to_lowercase();
        lower.contains("주차") || lower.contains("parking")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VotedKeyword {
    pub keyword: String,
    pub count: u32,
}

pub(crate) fn non_blank(value: Option<&str>) -> bool {
    value.is_some_and(|s| !s.trim().is_empty())
}
