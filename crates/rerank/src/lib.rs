//! Scoring and ranking of catalog items.
//!
//! Each item gets five independent sub-scores in [0, 1]:
//! - intent: match against the structured reading of the request text
//! - behavior: decayed category and brand affinity
//! - collaborative: overlap with other users on the same item
//! - content: category familiarity plus a price heuristic
//! - popularity: catalog rating
//!
//! The sub-scores are blended by strategy weights, filtered by a relevance
//! floor, stably sorted and truncated. Survivors get a justification.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shelfwise_explain::justify;
use shelfwise_features::{intent_covers_category, price_bucket, price_table_for};
use shelfwise_model::{
    clamp_unit, sanitize_score, IntentRecord, Item, Ranking, ScoredItem, Strategy, SubScores,
    UserProfile,
};

/// Distinct users needed for a full collaborative score.
const COLLABORATIVE_SATURATION: f64 = 5.0;

/// Category weight that saturates the behavior score.
const CATEGORY_SATURATION: f64 = 10.0;

/// Brand weight that saturates the behavior score.
const BRAND_SATURATION: f64 = 5.0;

/// Highest catalog rating.
const MAX_RATING: f64 = 5.0;

static NO_CO_OCCURRENCE: BTreeMap<String, usize> = BTreeMap::new();

/// Weights applied to the five sub-scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyWeights {
    pub intent: f64,
    pub behavior: f64,
    pub collaborative: f64,
    pub content: f64,
    pub popularity: f64,
}

impl Default for StrategyWeights {
    /// The hybrid mix.
    fn default() -> Self {
        Self {
            intent: 0.4,
            behavior: 0.3,
            collaborative: 0.0,
            content: 0.2,
            popularity: 0.1,
        }
    }
}

impl StrategyWeights {
    pub const INTENT_ONLY: Self = Self {
        intent: 1.0,
        behavior: 0.0,
        collaborative: 0.0,
        content: 0.0,
        popularity: 0.0,
    };

    pub const BEHAVIOR_ONLY: Self = Self {
        intent: 0.0,
        behavior: 1.0,
        collaborative: 0.0,
        content: 0.0,
        popularity: 0.0,
    };

    pub const BALANCED: Self = Self {
        intent: 1.0 / 3.0,
        behavior: 1.0 / 3.0,
        collaborative: 0.0,
        content: 1.0 / 3.0,
        popularity: 0.0,
    };

    /// Weighted sum of the sub-scores. Not clamped.
    pub fn blend(&self, scores: &SubScores) -> f64 {
        scores.intent * self.intent
            + scores.behavior * self.behavior
            + scores.collaborative * self.collaborative
            + scores.content * self.content
            + scores.popularity * self.popularity
    }
}

/// Configuration for the ranker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    /// Items scoring at or below this are dropped
    pub relevance_floor: f64,
    /// Price below which users without purchases get the content bonus
    pub low_price_threshold: f64,
    /// Weights used by the hybrid strategy
    pub hybrid: StrategyWeights,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            relevance_floor: 0.1,
            low_price_threshold: 3000.0,
            hybrid: StrategyWeights::default(),
        }
    }
}

impl RerankConfig {
    pub fn weights(&self, strategy: Strategy) -> StrategyWeights {
        match strategy {
            Strategy::Hybrid => self.hybrid,
            Strategy::IntentBased => StrategyWeights::INTENT_ONLY,
            Strategy::BehaviorBased => StrategyWeights::BEHAVIOR_ONLY,
            Strategy::Balanced => StrategyWeights::BALANCED,
        }
    }
}

/// Read-only inputs shared by every scorer for one request.
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    /// Structured intent; `None` when the request had no text
    pub intent: Option<&'a IntentRecord>,
    pub profile: &'a UserProfile,
    /// Item id to number of other users sharing an engagement with the user
    pub co_occurrence: &'a BTreeMap<String, usize>,
    /// Timestamp stamped on the ranking
    pub now: DateTime<Utc>,
}

impl<'a> ScoringContext<'a> {
    pub fn new(profile: &'a UserProfile, now: DateTime<Utc>) -> Self {
        Self {
            intent: None,
            profile,
            co_occurrence: &NO_CO_OCCURRENCE,
            now,
        }
    }

    pub fn with_intent(mut self, intent: Option<&'a IntentRecord>) -> Self {
        self.intent = intent;
        self
    }

    pub fn with_co_occurrence(mut self, co_occurrence: &'a BTreeMap<String, usize>) -> Self {
        self.co_occurrence = co_occurrence;
        self
    }
}

/// A pure `(item, context) -> [0, 1]` signal.
pub trait Scorer {
    fn score(&self, item: &Item, ctx: &ScoringContext<'_>) -> f64;
}

/// Bonuses for category, price bucket and brand matches against the
/// intent, scaled by urgency and by the weight of the intent category.
#[derive(Debug, Default, Clone, Copy)]
pub struct IntentScorer;

impl IntentScorer {
    const CATEGORY_BONUS: f64 = 0.5;
    const PRICE_BONUS: f64 = 0.3;
    const BRAND_BONUS: f64 = 0.4;
}

impl Scorer for IntentScorer {
    fn score(&self, item: &Item, ctx: &ScoringContext<'_>) -> f64 {
        let Some(intent) = ctx.intent else {
            return 0.0;
        };

        let mut bonus = 0.0;

        if intent_covers_category(intent, &item.category) {
            bonus += Self::CATEGORY_BONUS;
        }

        let table = price_table_for(&intent.preferred_categories);
        if intent.price_bucket == Some(price_bucket(item.price, table)) {
            bonus += Self::PRICE_BONUS;
        }

        if intent.prefers_brand(&item.brand) {
            bonus += Self::BRAND_BONUS;
        }

        let urgency = 0.5 + 0.5 * clamp_unit(intent.urgency);
        clamp_unit(bonus * urgency * intent.category.weight())
    }
}

/// Saturating category and brand affinity from the decayed profile.
#[derive(Debug, Default, Clone, Copy)]
pub struct BehaviorScorer;

impl Scorer for BehaviorScorer {
    fn score(&self, item: &Item, ctx: &ScoringContext<'_>) -> f64 {
        let category = (ctx.profile.category_weight(&item.category) / CATEGORY_SATURATION).min(1.0);
        let brand = (ctx.profile.brand_weight(&item.brand) / BRAND_SATURATION).min(1.0);
        clamp_unit(category + brand)
    }
}

/// Share of other users who engaged with the same item.
#[derive(Debug, Default, Clone, Copy)]
pub struct CollaborativeScorer;

impl Scorer for CollaborativeScorer {
    fn score(&self, item: &Item, ctx: &ScoringContext<'_>) -> f64 {
        let users = ctx.co_occurrence.get(&item.id).copied().unwrap_or(0);
        clamp_unit(users as f64 / COLLABORATIVE_SATURATION)
    }
}

/// Category familiarity plus a purchase/price heuristic.
#[derive(Debug, Clone, Copy)]
pub struct ContentScorer {
    pub low_price_threshold: f64,
}

impl ContentScorer {
    const CATEGORY_BONUS: f64 = 0.5;
    const PRICE_BONUS: f64 = 0.3;
}

impl Default for ContentScorer {
    fn default() -> Self {
        Self {
            low_price_threshold: RerankConfig::default().low_price_threshold,
        }
    }
}

impl Scorer for ContentScorer {
    fn score(&self, item: &Item, ctx: &ScoringContext<'_>) -> f64 {
        let mut score = 0.0;

        if ctx.profile.category_preference.contains_key(&item.category) {
            score += Self::CATEGORY_BONUS;
        }

        // Buyers are treated as price-insensitive.
        if ctx.profile.has_purchases() || item.price < self.low_price_threshold {
            score += Self::PRICE_BONUS;
        }

        clamp_unit(score)
    }
}

/// Catalog rating scaled to [0, 1].
#[derive(Debug, Default, Clone, Copy)]
pub struct PopularityScorer;

impl Scorer for PopularityScorer {
    fn score(&self, item: &Item, _ctx: &ScoringContext<'_>) -> f64 {
        clamp_unit(item.rating / MAX_RATING)
    }
}

/// Compute all five sub-scores of one item.
pub fn score_item(item: &Item, ctx: &ScoringContext<'_>, config: &RerankConfig) -> SubScores {
    let content = ContentScorer {
        low_price_threshold: config.low_price_threshold,
    };

    SubScores {
        intent: sanitize_score(IntentScorer.score(item, ctx)),
        behavior: sanitize_score(BehaviorScorer.score(item, ctx)),
        collaborative: sanitize_score(CollaborativeScorer.score(item, ctx)),
        content: sanitize_score(content.score(item, ctx)),
        popularity: sanitize_score(PopularityScorer.score(item, ctx)),
    }
}

/// Score, filter, sort and truncate `items`.
///
/// Items whose blended score is at or below the relevance floor are
/// dropped. Equal scores keep catalog order. Calling this twice with the
/// same inputs yields the same ranking.
pub fn rank(
    items: &[Item],
    ctx: &ScoringContext<'_>,
    strategy: Strategy,
    limit: usize,
    config: &RerankConfig,
) -> Ranking {
    let weights = config.weights(strategy);

    let mut scored: Vec<ScoredItem> = items
        .iter()
        .filter_map(|item| {
            let scores = score_item(item, ctx, config);
            let final_score = sanitize_score(weights.blend(&scores));

            (final_score > config.relevance_floor).then(|| ScoredItem {
                item: item.clone(),
                scores,
                final_score,
                justification: String::new(),
            })
        })
        .collect();

    // sort_by is stable
    scored.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
    scored.truncate(limit);

    for entry in &mut scored {
        entry.justification = justify(&entry.item, ctx.intent, ctx.profile);
    }

    Ranking {
        items: scored,
        strategy,
        generated_at: ctx.now,
    }
}
