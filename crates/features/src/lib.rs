//! Feature extraction for recommendation scoring.
//!
//! Provides pure functions for computing the inputs the scorers consume:
//! - Time-decayed behavior profiles
//! - Offline (keyword-based) intent classification
//! - Price bucket tables
//! - Text tokenization shared by the keyword matchers

mod offline;
mod pricing;
mod profile;

pub use offline::{canonical_category, classify_offline};
pub use pricing::{
    is_wearable, price_bucket, price_table_for, PriceTable, GENERAL_PRICES, WEARABLE_PRICES,
};
pub use profile::{build_profile, days_ago, decay_multiplier, DecayConfig, KindWeights};

use shelfwise_model::IntentRecord;

/// Whether an item category is among the intent's preferred categories,
/// either verbatim or after mapping onto its canonical slug.
pub fn intent_covers_category(intent: &IntentRecord, item_category: &str) -> bool {
    intent.prefers_category(item_category)
        || intent.prefers_category(&canonical_category(item_category))
}

/// Lower-case text and split it into alphanumeric tokens.
///
/// CJK characters count as alphanumeric, so a Chinese sentence without
/// spaces comes back as a single token; use [`matches_keyword`] for
/// matching, which falls back to substring search for non-ASCII keywords.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Normalize text for keyword matching: lower-cased tokens joined by
/// single spaces and padded on both ends.
pub fn normalize_text(text: &str) -> String {
    format!(" {} ", tokenize(text).join(" "))
}

/// Check whether `keyword` occurs in `normalized` (output of
/// [`normalize_text`]).
///
/// ASCII keywords match on whole-token boundaries ("how" does not match
/// "show"); other keywords match as substrings.
pub fn matches_keyword(normalized: &str, keyword: &str) -> bool {
    if keyword.is_ascii() {
        let needle = normalize_text(keyword);
        !needle.trim().is_empty() && normalized.contains(&needle)
    } else {
        normalized.contains(&keyword.to_lowercase())
    }
}
