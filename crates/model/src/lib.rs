//! Core domain model for Shelfwise recommendations.
//!
//! This crate defines the fundamental types used throughout the system:
//! - `Item`: A catalog entry as fetched from the catalog store
//! - `BehaviorEvent`: One historical user action (view, click, search, purchase)
//! - `UserProfile`: Time-decayed preferences derived from behavior events
//! - `IntentRecord`: Structured interpretation of free-text user input
//! - `ScoredItem` / `Ranking`: The blended, ordered output of a request
//! - `Strategy`: Named weighting scheme used to blend sub-scores

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod numeric;

pub use numeric::{coerce_f64, sanitize_score, to_float};

/// A catalog item snapshot.
///
/// Owned by the external catalog store; treated as immutable for the
/// duration of a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Stable catalog identifier
    pub id: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Category slug (e.g. "laptop", "phone")
    #[serde(default)]
    pub category: String,

    /// Brand name
    #[serde(default)]
    pub brand: String,

    /// Unit price. Text values are coerced, unparseable values become 0.0.
    #[serde(default, deserialize_with = "numeric::lenient_f64")]
    pub price: f64,

    /// Average rating on a 0-5 scale. Coerced the same way as `price`.
    #[serde(default, deserialize_with = "numeric::lenient_f64")]
    pub rating: f64,

    /// Free-text tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Whether the item is currently sellable
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

impl Item {
    /// Create a minimal active item for testing and fixtures.
    pub fn new(
        id: impl Into<String>,
        category: impl Into<String>,
        brand: impl Into<String>,
        price: f64,
        rating: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            category: category.into(),
            brand: brand.into(),
            price,
            rating,
            tags: Vec::new(),
            active: true,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

/// Kind of behavior event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    View,
    Click,
    Search,
    Purchase,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Click => "click",
            Self::Search => "search",
            Self::Purchase => "purchase",
        }
    }

    /// Whether this kind signals enough engagement to count towards
    /// collaborative overlap between users.
    pub fn is_engagement(&self) -> bool {
        matches!(self, Self::Click | Self::Purchase)
    }
}

/// One historical user action. Append-only, read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorEvent {
    pub user_id: String,

    #[serde(default)]
    pub session_id: String,

    #[serde(alias = "behavior_type")]
    pub kind: EventKind,

    /// Item the event refers to (searches usually have none)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,

    /// Observed price. Unparseable values are dropped rather than zeroed so
    /// they cannot drag the observed price range down.
    #[serde(
        default,
        deserialize_with = "numeric::lenient_opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub price: Option<f64>,

    pub timestamp: DateTime<Utc>,
}

impl BehaviorEvent {
    pub fn new(user_id: impl Into<String>, kind: EventKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: String::new(),
            kind,
            item_id: None,
            category: None,
            brand: None,
            price: None,
            timestamp,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn with_item(mut self, item_id: impl Into<String>) -> Self {
        self.item_id = Some(item_id.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }
}

/// Observed price bounds across a user's events.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    pub fn observe(range: Option<Self>, price: f64) -> Self {
        match range {
            Some(r) => Self {
                min: r.min.min(price),
                max: r.max.max(price),
            },
            None => Self {
                min: price,
                max: price,
            },
        }
    }
}

/// Time-decayed preferences derived from a user's behavior events.
///
/// Every weight is non-negative. An empty event set yields an all-zero
/// profile with `activity_level == 0.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,

    /// Decayed weight per category
    #[serde(default)]
    pub category_preference: BTreeMap<String, f64>,

    /// Decayed weight per brand
    #[serde(default)]
    pub brand_preference: BTreeMap<String, f64>,

    /// Observed price bounds, if any event carried a price
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_range: Option<PriceRange>,

    /// Sum of all decayed contributions
    #[serde(default)]
    pub activity_level: f64,

    /// Number of events that fed the profile
    #[serde(default)]
    pub event_count: usize,

    /// Raw event count per kind
    #[serde(default)]
    pub kind_counts: BTreeMap<EventKind, usize>,

    /// Timestamp of the most recent event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<DateTime<Utc>>,

    pub built_at: DateTime<Utc>,
}

impl UserProfile {
    /// An all-zero profile, used for users without history and as the
    /// degraded result of a failed profile build.
    pub fn empty(user_id: impl Into<String>, built_at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            category_preference: BTreeMap::new(),
            brand_preference: BTreeMap::new(),
            price_range: None,
            activity_level: 0.0,
            event_count: 0,
            kind_counts: BTreeMap::new(),
            last_activity: None,
            built_at,
        }
    }

    pub fn category_weight(&self, category: &str) -> f64 {
        self.category_preference.get(category).copied().unwrap_or(0.0)
    }

    pub fn brand_weight(&self, brand: &str) -> f64 {
        self.brand_preference.get(brand).copied().unwrap_or(0.0)
    }

    pub fn count_of(&self, kind: EventKind) -> usize {
        self.kind_counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn has_purchases(&self) -> bool {
        self.count_of(EventKind::Purchase) > 0
    }

    pub fn is_empty(&self) -> bool {
        self.event_count == 0
    }
}

/// Coarse category of a user's intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    /// Ready to buy
    Purchase,
    /// Comparing prices or looking for a deal
    PriceComparison,
    /// General product questions
    Information,
    /// Interested in a particular brand
    BrandResearch,
    /// Repairs, returns, warranty
    AfterSales,
}

impl Default for IntentCategory {
    fn default() -> Self {
        Self::Information
    }
}

impl IntentCategory {
    pub const ALL: [IntentCategory; 5] = [
        Self::Purchase,
        Self::PriceComparison,
        Self::Information,
        Self::BrandResearch,
        Self::AfterSales,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::PriceComparison => "price_comparison",
            Self::Information => "information",
            Self::BrandResearch => "brand_research",
            Self::AfterSales => "after_sales",
        }
    }

    /// Fixed multiplier applied to the intent sub-score.
    pub fn weight(&self) -> f64 {
        match self {
            Self::Purchase => 0.9,
            Self::PriceComparison => 0.8,
            Self::Information => 0.6,
            Self::BrandResearch => 0.5,
            Self::AfterSales => 0.3,
        }
    }

    /// Parse a label as produced by the completion model. Accepts the
    /// snake_case slugs as well as the Chinese labels used in the prompt.
    pub fn parse_label(label: &str) -> Option<Self> {
        let label = label.trim().trim_matches(|c: char| c == '"' || c == '\'');
        match label.to_lowercase().as_str() {
            "purchase" | "buy" | "产品购买" | "购买" => Some(Self::Purchase),
            "price_comparison" | "price comparison" | "价格比较" | "比价" => {
                Some(Self::PriceComparison)
            }
            "information" | "info" | "信息查询" | "咨询" => Some(Self::Information),
            "brand_research" | "brand" | "品牌了解" | "品牌" => Some(Self::BrandResearch),
            "after_sales" | "after-sales" | "售后服务" | "售后" => Some(Self::AfterSales),
            _ => None,
        }
    }
}

impl fmt::Display for IntentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Budget bucket implied by an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceBucket {
    Low,
    Mid,
    High,
}

impl PriceBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Mid => "mid",
            Self::High => "high",
        }
    }

    pub fn parse_label(label: &str) -> Option<Self> {
        let label = label.trim().trim_matches(|c: char| c == '"' || c == '\'');
        match label.to_lowercase().as_str() {
            "low" | "低" => Some(Self::Low),
            "mid" | "medium" | "middle" | "中" => Some(Self::Mid),
            "high" | "高" => Some(Self::High),
            _ => None,
        }
    }
}

/// Where an intent record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentSource {
    /// Parsed from the completion model's response
    Model,
    /// Produced by the deterministic keyword classifier
    Offline,
}

/// Structured interpretation of free-text user input.
///
/// `confidence` and `urgency` are always within [0, 1]; call
/// [`IntentRecord::normalized`] after filling fields from untrusted input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentRecord {
    pub category: IntentCategory,
    pub confidence: f64,

    /// Ordered, duplicate-free
    #[serde(default)]
    pub preferred_categories: Vec<String>,

    #[serde(default)]
    pub preferred_brands: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_bucket: Option<PriceBucket>,

    pub urgency: f64,

    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default)]
    pub summary: String,

    pub source: IntentSource,
}

impl IntentRecord {
    /// Zero-confidence record used when there is no free text to analyze.
    pub fn empty() -> Self {
        Self {
            category: IntentCategory::Information,
            confidence: 0.0,
            preferred_categories: Vec::new(),
            preferred_brands: BTreeSet::new(),
            price_bucket: None,
            urgency: 0.0,
            keywords: Vec::new(),
            summary: String::new(),
            source: IntentSource::Offline,
        }
    }

    /// Clamp scalar fields into [0, 1] and drop duplicate categories.
    pub fn normalized(mut self) -> Self {
        self.confidence = clamp_unit(self.confidence);
        self.urgency = clamp_unit(self.urgency);

        let mut seen = BTreeSet::new();
        self.preferred_categories
            .retain(|c| !c.trim().is_empty() && seen.insert(c.to_lowercase()));
        self.preferred_brands.retain(|b| !b.trim().is_empty());
        self
    }

    pub fn prefers_category(&self, category: &str) -> bool {
        let category = category.to_lowercase();
        self.preferred_categories
            .iter()
            .any(|c| c.to_lowercase() == category)
    }

    pub fn prefers_brand(&self, brand: &str) -> bool {
        self.preferred_brands.contains(brand)
    }
}

/// Clamp a value into [0, 1], mapping NaN to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// The five named sub-scores of an item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub intent: f64,
    pub behavior: f64,
    pub collaborative: f64,
    pub content: f64,
    pub popularity: f64,
}

/// An item with its sub-scores, blended score and justification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    pub item: Item,

    pub scores: SubScores,

    /// Strategy-weighted blend. Usually within [0, 1] but not a hard ceiling.
    pub final_score: f64,

    /// Human-readable reason for the recommendation
    #[serde(default)]
    pub justification: String,
}

/// Named weighting scheme for blending sub-scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Weighted mix of every signal
    Hybrid,
    /// Intent signal only
    IntentBased,
    /// Behavior signal only
    BehaviorBased,
    /// Equal average of intent, behavior and content; used for any
    /// unrecognized strategy name
    Balanced,
}

impl Default for Strategy {
    fn default() -> Self {
        Self::Hybrid
    }
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hybrid => "hybrid",
            Self::IntentBased => "intent_based",
            Self::BehaviorBased => "behavior_based",
            Self::Balanced => "balanced",
        }
    }
}

impl From<&str> for Strategy {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "" | "hybrid" => Self::Hybrid,
            "intent_based" => Self::IntentBased,
            "behavior_based" => Self::BehaviorBased,
            _ => Self::Balanced,
        }
    }
}

impl FromStr for Strategy {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The ordered output of one recommendation request. Not mutated after
/// creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    pub items: Vec<ScoredItem>,
    pub strategy: Strategy,
    pub generated_at: DateTime<Utc>,
}

impl Ranking {
    pub fn item_ids(&self) -> Vec<&str> {
        self.items.iter().map(|s| s.item.id.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Mean catalog rating of the ranked items, 0.0 when empty.
    pub fn mean_rating(&self) -> f64 {
        if self.items.is_empty() {
            return 0.0;
        }
        self.items.iter().map(|s| s.item.rating).sum::<f64>() / self.items.len() as f64
    }
}
