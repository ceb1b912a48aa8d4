//! Justification generation for ranked items.
//!
//! Converts the signals behind a recommendation into a short
//! human-readable sentence suitable for display next to the item.

use serde::{Deserialize, Serialize};
use shelfwise_features::intent_covers_category;
use shelfwise_model::{IntentCategory, IntentRecord, Item, UserProfile};

/// Category weight above which browsing history is cited.
pub const STRONG_CATEGORY_AFFINITY: f64 = 5.0;

/// Brand weight above which brand loyalty is cited.
pub const STRONG_BRAND_AFFINITY: f64 = 3.0;

/// Rating at or above which an item counts as highly rated.
pub const HIGH_RATING: f64 = 4.5;

/// Most reasons shown in one justification.
pub const MAX_REASONS: usize = 2;

/// Phrase used when no specific reason applies.
pub const GENERAL_REASON: &str = "recommended by the general algorithm";

/// A single reason an item was recommended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reason {
    /// The request expressed purchase intent
    PurchaseIntent,
    /// The request was about comparing prices
    WithinBudget,
    /// The item category was named in the request
    RequestedCategory { category: String },
    /// The user has browsed this category a lot
    BrowsingHistory,
    /// The user repeatedly engaged with this brand
    FavoredBrand { brand: String },
    /// The item is highly rated
    HighlyRated,
}

impl Reason {
    /// Human-readable phrase for this reason.
    pub fn phrase(&self) -> String {
        match self {
            Self::PurchaseIntent => "matches your purchase intent".to_string(),
            Self::WithinBudget => "fits your budget".to_string(),
            Self::RequestedCategory { category } => {
                format!("matches your interest in {}", category)
            }
            Self::BrowsingHistory => "based on your browsing history".to_string(),
            Self::FavoredBrand { brand } => format!("you favor {}", brand),
            Self::HighlyRated => "highly rated".to_string(),
        }
    }
}

/// Collect every applicable reason in priority order.
pub fn reasons(item: &Item, intent: Option<&IntentRecord>, profile: &UserProfile) -> Vec<Reason> {
    let mut reasons = Vec::new();

    if let Some(intent) = intent {
        match intent.category {
            IntentCategory::Purchase => reasons.push(Reason::PurchaseIntent),
            IntentCategory::PriceComparison => reasons.push(Reason::WithinBudget),
            _ => {}
        }

        if intent_covers_category(intent, &item.category) {
            reasons.push(Reason::RequestedCategory {
                category: item.category.clone(),
            });
        }
    }

    if profile.category_weight(&item.category) > STRONG_CATEGORY_AFFINITY {
        reasons.push(Reason::BrowsingHistory);
    }

    if profile.brand_weight(&item.brand) > STRONG_BRAND_AFFINITY {
        reasons.push(Reason::FavoredBrand {
            brand: item.brand.clone(),
        });
    }

    if item.rating >= HIGH_RATING {
        reasons.push(Reason::HighlyRated);
    }

    reasons
}

/// Generate the justification string for a ranked item.
///
/// Joins at most [`MAX_REASONS`] phrases with `"; "`, or returns
/// [`GENERAL_REASON`] when nothing applies.
pub fn justify(item: &Item, intent: Option<&IntentRecord>, profile: &UserProfile) -> String {
    let phrases: Vec<String> = reasons(item, intent, profile)
        .iter()
        .take(MAX_REASONS)
        .map(Reason::phrase)
        .collect();

    if phrases.is_empty() {
        GENERAL_REASON.to_string()
    } else {
        phrases.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn laptop() -> Item {
        Item::new("p1", "laptop", "Lenovo", 5999.0, 4.2)
    }

    fn profile() -> UserProfile {
        UserProfile::empty("u1", Utc::now())
    }

    #[test]
    fn test_general_reason_when_nothing_applies() {
        assert_eq!(justify(&laptop(), None, &profile()), GENERAL_REASON);
    }

    #[test]
    fn test_intent_phrases_come_first() {
        let intent = IntentRecord {
            category: IntentCategory::Purchase,
            preferred_categories: vec!["laptop".to_string()],
            ..IntentRecord::empty()
        };
        let item = Item::new("p1", "laptop", "Lenovo", 5999.0, 4.8);

        assert_eq!(
            justify(&item, Some(&intent), &profile()),
            "matches your purchase intent; matches your interest in laptop"
        );
        assert_eq!(reasons(&item, Some(&intent), &profile()).len(), 3);
    }

    #[test]
    fn test_behavior_thresholds_are_strict() {
        let mut profile = profile();
        profile.category_preference.insert("laptop".to_string(), 5.0);
        profile.brand_preference.insert("Lenovo".to_string(), 3.5);

        assert_eq!(justify(&laptop(), None, &profile), "you favor Lenovo");

        profile.category_preference.insert("laptop".to_string(), 5.1);
        assert_eq!(
            justify(&laptop(), None, &profile),
            "based on your browsing history; you favor Lenovo"
        );
    }

    #[test]
    fn test_price_comparison_and_rating() {
        let intent = IntentRecord {
            category: IntentCategory::PriceComparison,
            ..IntentRecord::empty()
        };
        let item = Item::new("p2", "headphone", "Sony", 899.0, 4.5);
        assert_eq!(
            justify(&item, Some(&intent), &profile()),
            "fits your budget; highly rated"
        );
    }

    #[test]
    fn test_information_intent_has_no_phrase() {
        let intent = IntentRecord::empty();
        assert_eq!(reasons(&laptop(), Some(&intent), &profile()), vec![]);
    }
}
