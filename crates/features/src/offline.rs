//! Deterministic keyword classifier used when the completion model is
//! unavailable. No I/O, no clock, no randomness.

use std::collections::BTreeSet;

use shelfwise_model::{IntentCategory, IntentRecord, IntentSource, PriceBucket};

use crate::{matches_keyword, normalize_text};

type KeywordTable = [(IntentCategory, &'static [&'static str]); 5];

// Ties go to the earlier entry.
const INTENT_KEYWORDS: KeywordTable = [
    (
        IntentCategory::Purchase,
        &["buy", "buying", "want", "order", "purchase", "买", "购买", "想要", "下单", "入手"],
    ),
    (
        IntentCategory::PriceComparison,
        &["price", "cheap", "compare", "cost", "deal", "价格", "便宜", "比较", "对比", "多少钱", "性价比"],
    ),
    (
        IntentCategory::Information,
        &["what", "how", "spec", "specs", "review", "recommend", "参数", "怎么样", "介绍", "推荐", "配置"],
    ),
    (
        IntentCategory::BrandResearch,
        &["brand", "official", "品牌", "牌子", "官方"],
    ),
    (
        IntentCategory::AfterSales,
        &["repair", "warranty", "return", "refund", "broken", "售后", "维修", "退货", "退款", "保修"],
    ),
];

const CATEGORY_KEYWORDS: [(&str, &[&str]); 6] = [
    ("phone", &["phone", "smartphone", "iphone", "手机"]),
    ("laptop", &["laptop", "notebook", "macbook", "thinkpad", "笔记本"]),
    ("headphone", &["headphone", "headphones", "earphone", "earbuds", "airpods", "耳机"]),
    ("tablet", &["tablet", "ipad", "平板"]),
    ("camera", &["camera", "相机", "单反"]),
    ("wearable", &["watch", "smartwatch", "wearable", "手表", "手环"]),
];

const BRAND_KEYWORDS: [(&str, &[&str]); 8] = [
    ("Apple", &["apple", "iphone", "ipad", "macbook", "airpods", "苹果"]),
    ("Huawei", &["huawei", "华为"]),
    ("Xiaomi", &["xiaomi", "小米"]),
    ("Lenovo", &["lenovo", "thinkpad", "联想"]),
    ("Sony", &["sony", "索尼"]),
    ("Samsung", &["samsung", "三星"]),
    ("Microsoft", &["microsoft", "surface", "微软"]),
    ("Asus", &["asus", "华硕"]),
];

const LOW_BUDGET: &[&str] = &[
    "cheap", "budget", "affordable", "inexpensive", "便宜", "实惠", "预算", "平价",
];
const HIGH_BUDGET: &[&str] = &["premium", "flagship", "high-end", "luxury", "旗舰", "高端", "顶配"];

const URGENT: &[&str] = &[
    "now", "immediately", "urgent", "asap", "today", "马上", "立即", "立刻", "急", "现在",
];
const RELAXED: &[&str] = &["just looking", "considering", "browsing", "maybe", "看看", "考虑", "随便"];

const NO_HIT_CONFIDENCE: f64 = 0.5;

/// Classify free text into an intent record using fixed keyword tables.
///
/// The category with the most keyword hits wins, with confidence
/// `min(0.6 + 0.1 * hits, 0.9)`. Text without any intent keyword is
/// classified as `Information` with confidence 0.5. Blank text yields
/// [`IntentRecord::empty`].
pub fn classify_offline(text: &str) -> IntentRecord {
    if text.trim().is_empty() {
        return IntentRecord::empty();
    }

    let normalized = normalize_text(text);
    let mut keywords = KeywordSet::default();

    let mut best: Option<(IntentCategory, usize)> = None;
    for (category, table) in INTENT_KEYWORDS.iter() {
        let hits = keywords.collect(&normalized, table);
        if hits > 0 && best.map_or(true, |(_, top)| hits > top) {
            best = Some((*category, hits));
        }
    }

    let (category, confidence) = match best {
        Some((category, hits)) => (category, (0.6 + 0.1 * hits as f64).min(0.9)),
        None => (IntentCategory::Information, NO_HIT_CONFIDENCE),
    };

    let preferred_categories: Vec<String> = CATEGORY_KEYWORDS
        .iter()
        .filter(|(_, table)| keywords.collect(&normalized, table) > 0)
        .map(|(slug, _)| slug.to_string())
        .collect();

    let preferred_brands: BTreeSet<String> = BRAND_KEYWORDS
        .iter()
        .filter(|(_, table)| keywords.collect(&normalized, table) > 0)
        .map(|(brand, _)| brand.to_string())
        .collect();

    let price_bucket = if keywords.collect(&normalized, LOW_BUDGET) > 0 {
        PriceBucket::Low
    } else if keywords.collect(&normalized, HIGH_BUDGET) > 0 {
        PriceBucket::High
    } else {
        PriceBucket::Mid
    };

    let urgency = if keywords.collect(&normalized, URGENT) > 0 {
        0.8
    } else if keywords.collect(&normalized, RELAXED) > 0 {
        0.3
    } else {
        0.5
    };

    let summary = if preferred_categories.is_empty() {
        format!("keyword classifier: {} intent", category)
    } else {
        format!(
            "keyword classifier: {} intent for {}",
            category,
            preferred_categories.join(", ")
        )
    };

    IntentRecord {
        category,
        confidence,
        preferred_categories,
        preferred_brands,
        price_bucket: Some(price_bucket),
        urgency,
        keywords: keywords.into_vec(),
        summary,
        source: IntentSource::Offline,
    }
    .normalized()
}

/// Map a free-form category name ("Laptops", "笔记本电脑") onto the slug
/// the keyword tables use ("laptop"). Unknown names are returned trimmed
/// and lower-cased.
pub fn canonical_category(name: &str) -> String {
    let trimmed = name.trim().to_lowercase();
    if CATEGORY_KEYWORDS.iter().any(|(slug, _)| *slug == trimmed) {
        return trimmed;
    }

    let normalized = normalize_text(&trimmed);
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, table)| table.iter().any(|k| matches_keyword(&normalized, k)))
        .map(|(slug, _)| slug.to_string())
        .unwrap_or(trimmed)
}

/// Matched keywords in discovery order, without duplicates.
#[derive(Default)]
struct KeywordSet {
    seen: BTreeSet<&'static str>,
    ordered: Vec<&'static str>,
}

impl KeywordSet {
    /// Record every keyword of `table` found in `normalized`; returns the
    /// number of hits.
    fn collect(&mut self, normalized: &str, table: &[&'static str]) -> usize {
        let mut hits = 0;
        for &keyword in table {
            if matches_keyword(normalized, keyword) {
                hits += 1;
                if self.seen.insert(keyword) {
                    self.ordered.push(keyword);
                }
            }
        }
        hits
    }

    fn into_vec(self) -> Vec<String> {
        self.ordered.into_iter().map(str::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_chinese_laptop_purchase() {
        let record = classify_offline("我想买一台笔记本电脑");
        assert_eq!(record.source, IntentSource::Offline);
        assert_eq!(record.category, IntentCategory::Purchase);
        assert!(record.preferred_categories.contains(&"laptop".to_string()));
        assert!((0.6..=0.9).contains(&record.confidence));
        assert_eq!(record.price_bucket, Some(PriceBucket::Mid));
        assert_eq!(record.urgency, 0.5);
    }

    #[test]
    fn test_price_comparison_wins_on_hits() {
        let record = classify_offline("compare the price of a cheap phone");
        assert_eq!(record.category, IntentCategory::PriceComparison);
        assert!((record.confidence - 0.9).abs() < 1e-9);
        assert_eq!(record.price_bucket, Some(PriceBucket::Low));
        assert_eq!(record.preferred_categories, vec!["phone"]);
    }

    #[test]
    fn test_confidence_capped() {
        let record = classify_offline("buy buying want order purchase now");
        assert_eq!(record.category, IntentCategory::Purchase);
        assert_eq!(record.confidence, 0.9);
        assert_eq!(record.urgency, 0.8);
    }

    #[test]
    fn test_no_hits_defaults_to_information() {
        let record = classify_offline("hello there");
        assert_eq!(record.category, IntentCategory::Information);
        assert_eq!(record.confidence, 0.5);
        assert!(record.preferred_categories.is_empty());
    }

    #[test]
    fn test_brands_and_premium() {
        let record = classify_offline("just looking at a flagship Sony camera or an iPad");
        assert_eq!(
            record.preferred_brands.iter().cloned().collect::<Vec<_>>(),
            vec!["Apple".to_string(), "Sony".to_string()]
        );
        assert_eq!(record.preferred_categories, vec!["tablet", "camera"]);
        assert_eq!(record.price_bucket, Some(PriceBucket::High));
        assert_eq!(record.urgency, 0.3);
    }

    #[test]
    fn test_blank_text_is_empty_record() {
        assert_eq!(classify_offline("   "), IntentRecord::empty());
    }

    #[test]
    fn test_canonical_category() {
        assert_eq!(canonical_category("笔记本电脑"), "laptop");
        assert_eq!(canonical_category(" Phone "), "phone");
        assert_eq!(canonical_category("smartphone"), "phone");
        assert_eq!(canonical_category("Drones"), "drones");
    }

    #[test]
    fn test_deterministic() {
        let text = "想要一个便宜的华为手机，马上下单";
        assert_eq!(classify_offline(text), classify_offline(text));
    }
}
