//! Builds a [`KeywordFragmentSet`] from a crawled [`PlaceSnapshot`].

use std::collections::HashSet;

use crate::keywords::{normalize_keyword, KeywordFragment, KeywordFragmentSet};
use crate::place::PlaceSnapshot;

const DEFAULT_ATTRIBUTES: [&str; 5] = ["맛집", "인기", "추천", "분위기좋은", "가성비"];
const DEFAULT_SENTIMENTS: [&str; 5] = ["데이트", "회식", "모임", "분위기좋은", "가족"];

/// Words looked for in review bodies.
const SENTIMENT_MARKERS: [&str; 10] = [
    "분위기", "친절", "깔끔", "넓은", "조용한", "데이트", "모임", "회식", "가족", "혼밥",
];

/// Menu names longer than this read as descriptions rather than search terms.
const MAX_MENU_NAME_CHARS: usize = 10;
const MAX_MENU_FRAGMENTS: usize = 20;
/// Only the leading address tokens (city, district, neighbourhood) are used.
const ADDRESS_TOKENS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarvestOptions {
    pub max_per_category: usize,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            max_per_category: 8,
        }
    }
}

/// Insertion-ordered, deduplicating fragment collector.
struct Bucket {
    source: &'static str,
    seen: HashSet<String>,
    items: Vec<KeywordFragment>,
}

impl Bucket {
    fn new(source: &'static str) -> Self {
        Self {
            source,
            seen: HashSet::new(),
            items: Vec::new(),
        }
    }

    fn add(&mut self, raw: &str) {
        let text = normalize_keyword(raw);
        if text.is_empty() || !self.seen.insert(text.clone()) {
            return;
        }
        self.items.push(KeywordFragment::new(text, self.source));
    }

    fn finish(self, cap: usize) -> Vec<KeywordFragment> {
        self.items.into_iter().take(cap).collect()
    }
}

/// Derives the five keyword categories from crawled place data.
///
/// Each category is deduplicated in insertion order and cut to
/// `options.max_per_category`.
#[must_use]
pub fn harvest_keyword_set(place: &PlaceSnapshot, options: HarvestOptions) -> KeywordFragmentSet {
    let cap = options.max_per_category;
    let set = KeywordFragmentSet {
        core: harvest_core(place).finish(cap),
        location: harvest_location(place).finish(cap),
        menu: harvest_menu(place).finish(cap.min(MAX_MENU_FRAGMENTS)),
        attribute: harvest_attribute(place).finish(cap),
        sentiment: harvest_sentiment(place).finish(cap),
    };
    tracing::debug!(
        place_id = place.id().unwrap_or("unknown"),
        core = set.core.len(),
        location = set.location.len(),
        menu = set.menu.len(),
        attribute = set.attribute.len(),
        sentiment = set.sentiment.len(),
        "harvested keyword set"
    );
    set
}

fn harvest_core(place: &PlaceSnapshot) -> Bucket {
    let mut core = Bucket::new("place");
    if let Some(category) = place.basic.category.as_deref() {
        core.add(category);
    }
    for keyword in &place.basic.seo_keywords {
        core.add(keyword);
    }
    for keyword in &place.representative_keywords {
        core.add(keyword);
    }
    core
}

fn harvest_location(place: &PlaceSnapshot) -> Bucket {
    let mut location = Bucket::new("address");
    let Some(address) = place.basic.address.as_ref() else {
        return location;
    };

    if let Some(road) = address.road.as_deref() {
        for token in leading_place_names(road) {
            location.add(token);
        }
        if let Some(station) = station_name(road) {
            location.add(station);
        }
    }
    if let Some(jibun) = address.jibun.as_deref() {
        for token in leading_place_names(jibun) {
            location.add(token);
        }
    }
    location
}

/// The first address tokens, skipping lot and building numbers.
fn leading_place_names(address: &str) -> impl Iterator<Item = &str> {
    address
        .split_whitespace()
        .take(ADDRESS_TOKENS)
        .filter(|t| !t.starts_with(|c: char| c.is_ascii_digit()))
}

/// First token containing `역`, cut just after its last `역` (`강남역2번출구` -> `강남역`).
fn station_name(address: &str) -> Option<&str> {
    address.split_whitespace().find_map(|token| {
        let end = token.rfind('역')? + '역'.len_utf8();
        (end > '역'.len_utf8()).then(|| &token[..end])
    })
}

fn harvest_menu(place: &PlaceSnapshot) -> Bucket {
    let mut menu = Bucket::new("menu");
    for item in &place.menus {
        if item.name.chars().count() <= MAX_MENU_NAME_CHARS {
            menu.add(&item.name);
        }
    }
    for name in &place.representative_menus {
        menu.add(name);
    }
    menu
}

fn harvest_attribute(place: &PlaceSnapshot) -> Bucket {
    let mut attribute = Bucket::new("attribute");
    for facility in place.facilities.iter().filter(|f| f.is_available()) {
        attribute.add(&facility.name);
    }
    for voted in &place.voted_keywords {
        attribute.add(&voted.keyword);
    }
    for default in DEFAULT_ATTRIBUTES {
        attribute.add(default);
    }
    attribute
}

fn harvest_sentiment(place: &PlaceSnapshot) -> Bucket {
    let mut sentiment = Bucket::new("sentiment");
    for text in place.reviews.texts() {
        for marker in SENTIMENT_MARKERS {
            if text.contains(marker) {
                sentiment.add(marker);
            }
        }
    }
    for default in DEFAULT_SENTIMENTS {
        sentiment.add(default);
    }
    sentiment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::place::{Address, BasicInfo, Facility, MenuItem, ReviewData, VisitorReview};

    fn texts(fragments: &[KeywordFragment]) -> Vec<&str> {
        fragments.iter().map(|f| f.text.as_str()).collect()
    }

    fn seoul_station_place() -> PlaceSnapshot {
        PlaceSnapshot {
            basic: BasicInfo {
                name: Some("서울역 국밥집".to_string()),
                category: Some("국밥".to_string()),
                address: Some(Address {
                    road: Some("서울 용산구 한강대로 405 서울역2번출구".to_string()),
                    jibun: Some("서울 용산구 동자동 43-205".to_string()),
                }),
                seo_keywords: vec!["순대국".to_string(), "국밥".to_string()],
                ..BasicInfo::default()
            },
            representative_keywords: vec!["해장국".to_string()],
            menus: vec![
                MenuItem {
                    name: "순대국밥".to_string(),
                    ..MenuItem::default()
                },
                MenuItem {
                    name: "아주 긴 이름의 특선 모둠 수육 정식".to_string(),
                    ..MenuItem::default()
                },
            ],
            representative_menus: vec!["수육".to_string()],
            facilities: vec![
                Facility {
                    name: "단체석".to_string(),
                    available: Some(true),
                },
                Facility {
                    name: "주차".to_string(),
                    available: Some(false),
                },
            ],
            reviews: ReviewData {
                visitor_reviews: vec![VisitorReview {
                    content: Some("직원분들이 친절하고 혼밥하기 좋아요".to_string()),
                }],
                ..ReviewData::default()
            },
            ..PlaceSnapshot::default()
        }
    }

    #[test]
    fn core_merges_category_seo_and_representative_keywords() {
        let set = harvest_keyword_set(&seoul_station_place(), HarvestOptions::default());
        assert_eq!(texts(&set.core), vec!["국밥", "순대국", "해장국"]);
        assert!(set.core.iter().all(|f| f.source == "place"));
    }

    #[test]
    fn location_uses_leading_tokens_and_station() {
        let set = harvest_keyword_set(&seoul_station_place(), HarvestOptions::default());
        assert_eq!(
            texts(&set.location),
            vec!["서울", "용산구", "한강대로", "서울역", "동자동"]
        );
    }

    #[test]
    fn numeric_address_tokens_are_skipped() {
        assert_eq!(
            leading_place_names("12 강남대로 5").collect::<Vec<_>>(),
            vec!["강남대로"]
        );
    }

    #[test]
    fn station_requires_a_name_before_the_suffix() {
        assert_eq!(station_name("서울 중구 역 앞"), None);
        assert_eq!(station_name("서울 강남역"), Some("강남역"));
    }

    #[test]
    fn long_menu_names_are_dropped() {
        let set = harvest_keyword_set(&seoul_station_place(), HarvestOptions::default());
        assert_eq!(texts(&set.menu), vec!["순대국밥", "수육"]);
    }

    #[test]
    fn attribute_skips_unavailable_facilities_and_appends_defaults() {
        let set = harvest_keyword_set(&seoul_station_place(), HarvestOptions::default());
        let attrs = texts(&set.attribute);
        assert_eq!(attrs[0], "단체석");
        assert!(!attrs.contains(&"주차"));
        assert!(attrs.ends_with(&DEFAULT_ATTRIBUTES));
    }

    #[test]
    fn sentiment_reads_review_bodies_before_defaults() {
        let set = harvest_keyword_set(&seoul_station_place(), HarvestOptions::default());
        let sentiment = texts(&set.sentiment);
        assert_eq!(&sentiment[..2], &["친절", "혼밥"]);
        assert!(sentiment.contains(&"데이트"));
    }

    #[test]
    fn every_category_is_capped() {
        let set = harvest_keyword_set(
            &seoul_station_place(),
            HarvestOptions {
                max_per_category: 2,
            },
        );
        assert!(set.core.len() <= 2);
        assert!(set.location.len() <= 2);
        assert!(set.menu.len() <= 2);
        assert_eq!(set.attribute.len(), 2);
        assert_eq!(set.sentiment.len(), 2);
    }

    #[test]
    fn empty_place_still_yields_default_qualifiers() {
        let set = harvest_keyword_set(&PlaceSnapshot::default(), HarvestOptions::default());
        assert!(set.core.is_empty());
        assert!(set.location.is_empty());
        assert_eq!(set.attribute.len(), DEFAULT_ATTRIBUTES.len());
        assert_eq!(set.sentiment.len(), DEFAULT_SENTIMENTS.len());
    }
}
