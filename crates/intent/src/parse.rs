//! Parsing of completion model output into intent records.

use std::collections::BTreeSet;

use serde::Deserialize;
use serde_json::Value;
use shelfwise_features::canonical_category;
use shelfwise_model::{to_float, IntentCategory, IntentRecord, IntentSource, PriceBucket};

const DEFAULT_CONFIDENCE: f64 = 0.5;
const DEFAULT_URGENCY: f64 = 0.5;

/// Outcome of parsing a model response as structured data.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelResponse {
    /// A JSON object with a recognizable intent category
    Parsed(IntentRecord),
    /// Anything else, kept verbatim for label scanning
    Unparseable(String),
}

/// Loosely typed mirror of the JSON shape requested in the prompt.
#[derive(Debug, Deserialize)]
struct RawIntent {
    #[serde(default, alias = "intent")]
    intent_type: Value,
    #[serde(default)]
    confidence: Value,
    #[serde(default, alias = "categories")]
    product_categories: Value,
    #[serde(default, alias = "price_bucket")]
    price_range: Value,
    #[serde(default, alias = "brands")]
    brand_preferences: Value,
    #[serde(default, alias = "urgency")]
    urgency_level: Value,
    #[serde(default)]
    keywords: Value,
    #[serde(default, alias = "summary")]
    analysis_summary: Value,
}

/// Parse a raw model response.
///
/// Markdown code fences and prose around the first JSON object are
/// tolerated. The object must name a known intent category; numbers may
/// arrive as strings.
pub fn parse_response(raw: &str) -> ModelResponse {
    let parsed = json_object(raw)
        .and_then(|body| serde_json::from_str::<RawIntent>(body).ok())
        .and_then(|raw_intent| {
            let category = raw_intent
                .intent_type
                .as_str()
                .and_then(IntentCategory::parse_label)?;
            Some(from_raw(category, raw_intent))
        });

    match parsed {
        Some(record) => ModelResponse::Parsed(record),
        None => ModelResponse::Unparseable(raw.to_string()),
    }
}

fn json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (start < end).then(|| &raw[start..=end])
}

fn from_raw(category: IntentCategory, raw: RawIntent) -> IntentRecord {
    IntentRecord {
        category,
        confidence: to_float(&raw.confidence).unwrap_or(DEFAULT_CONFIDENCE),
        preferred_categories: value_list(&raw.product_categories)
            .iter()
            .map(|c| canonical_category(c))
            .collect(),
        preferred_brands: value_list(&raw.brand_preferences).into_iter().collect(),
        price_bucket: raw.price_range.as_str().and_then(PriceBucket::parse_label),
        urgency: to_float(&raw.urgency_level).unwrap_or(DEFAULT_URGENCY),
        keywords: value_list(&raw.keywords),
        summary: raw.analysis_summary.as_str().unwrap_or_default().to_string(),
        source: IntentSource::Model,
    }
    .normalized()
}

/// Accept either a JSON array or a delimited string.
fn value_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(clean(s).to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => split_list(s),
        _ => Vec::new(),
    }
}

fn split_list(text: &str) -> Vec<String> {
    clean(text)
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(|c: char| matches!(c, ',' | '，' | '、' | ';' | '；'))
        .map(clean)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn clean(text: &str) -> &str {
    text.trim()
        .trim_end_matches(|c: char| matches!(c, ',' | '}') || c.is_whitespace())
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '“' | '”'))
        .trim()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Label {
    Intent,
    Confidence,
    Categories,
    Price,
    Brands,
    Urgency,
    Keywords,
    Summary,
}

impl Label {
    fn from_key(key: &str) -> Option<Self> {
        let key = key
            .trim()
            .trim_start_matches(|c: char| {
                matches!(c, '-' | '*' | '#' | '>' | '.' | '{' | '[' | ',')
                    || c.is_ascii_digit()
                    || c.is_whitespace()
            })
            .trim_matches(|c: char| matches!(c, '"' | '\'' | '*' | '`'))
            .trim()
            .to_lowercase()
            .replace([' ', '-'], "_");

        match key.as_str() {
            "intent_type" | "intent" | "意图" | "意图类型" => Some(Self::Intent),
            "confidence" | "置信度" => Some(Self::Confidence),
            "product_categories" | "categories" | "category" | "产品类别" | "类别" => {
                Some(Self::Categories)
            }
            "price_range" | "price" | "budget" | "价格范围" | "价格" => Some(Self::Price),
            "brand_preferences" | "brands" | "brand" | "品牌偏好" | "品牌" => Some(Self::Brands),
            "urgency_level" | "urgency" | "紧急程度" => Some(Self::Urgency),
            "keywords" | "关键词" => Some(Self::Keywords),
            "analysis_summary" | "summary" | "分析总结" | "总结" => Some(Self::Summary),
            _ => None,
        }
    }
}

/// Split `key: value` (ASCII or full-width colon).
fn split_label(line: &str) -> Option<(&str, &str)> {
    let (idx, sep) = line.char_indices().find(|(_, c)| matches!(c, ':' | '：'))?;
    Some((&line[..idx], &line[idx + sep.len_utf8()..]))
}

/// Split a line at commas outside quotes and brackets.
fn split_top_level(line: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut depth = 0usize;
    let mut quoted = false;
    let mut escaped = false;
    let mut start = 0;

    for (idx, c) in line.char_indices() {
        if quoted {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => quoted = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => quoted = true,
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                pieces.push(&line[start..idx]);
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }
    pieces.push(&line[start..]);
    pieces
}

/// Every `label: value` pair on one line, in order. A piece without a
/// colon continues the previous value; pairs with unknown keys are kept as
/// `None` so nothing spills into a neighbouring field.
fn line_fields(line: &str) -> Vec<(Option<Label>, String)> {
    let mut fields: Vec<(Option<Label>, String)> = Vec::new();

    for piece in split_top_level(line) {
        match split_label(piece) {
            Some((key, value)) => fields.push((Label::from_key(key), value.to_string())),
            None => {
                let rest = piece.trim_matches(|c: char| {
                    c.is_whitespace() || matches!(c, '{' | '}' | '[' | ']')
                });
                if rest.is_empty() {
                    continue;
                }
                if let Some((_, value)) = fields.last_mut() {
                    value.push(',');
                    value.push_str(piece);
                }
            }
        }
    }

    fields
}

fn parse_intent_value(value: &str) -> Option<IntentCategory> {
    let value = clean(value);
    IntentCategory::parse_label(value).or_else(|| {
        value
            .split(|c: char| c.is_whitespace() || matches!(c, ',' | '(' | '（' | '/' | '|'))
            .find(|s| !s.is_empty())
            .and_then(IntentCategory::parse_label)
    })
}

/// Scan free text line by line for `label: value` pairs, several per
/// line when they are comma separated as in broken JSON.
///
/// Returns `None` unless an intent category label is found; other fields
/// fall back to neutral defaults when absent.
pub fn scan_labels(raw: &str) -> Option<IntentRecord> {
    let mut category = None;
    let mut confidence = None;
    let mut categories = Vec::new();
    let mut price_bucket = None;
    let mut brands = BTreeSet::new();
    let mut urgency = None;
    let mut keywords = Vec::new();
    let mut summary = String::new();

    let fields = raw.lines().flat_map(line_fields);
    for (label, value) in fields {
        let Some(label) = label else {
            continue;
        };
        let value = value.as_str();

        match label {
            Label::Intent => category = category.or(parse_intent_value(value)),
            Label::Confidence => confidence = to_float(&Value::String(clean(value).to_string())),
            Label::Categories => {
                categories.extend(split_list(value).iter().map(|c| canonical_category(c)))
            }
            Label::Price => price_bucket = PriceBucket::parse_label(clean(value)),
            Label::Brands => brands.extend(split_list(value)),
            Label::Urgency => urgency = to_float(&Value::String(clean(value).to_string())),
            Label::Keywords => keywords.extend(split_list(value)),
            Label::Summary => summary = clean(value).to_string(),
        }
    }

    Some(
        IntentRecord {
            category: category?,
            confidence: confidence.unwrap_or(DEFAULT_CONFIDENCE),
            preferred_categories: categories,
            preferred_brands: brands,
            price_bucket,
            urgency: urgency.unwrap_or(DEFAULT_URGENCY),
            keywords,
            summary,
            source: IntentSource::Model,
        }
        .normalized(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_plain_json() {
        let raw = r#"{"intent_type":"产品购买","confidence":0.9,"product_categories":["智能手机"],
            "price_range":"高","brand_preferences":["Apple","Apple"],"urgency_level":"0.7",
            "keywords":["iphone"],"analysis_summary":"wants an iPhone"}"#;

        let ModelResponse::Parsed(record) = parse_response(raw) else {
            panic!("expected parsed response");
        };
        assert_eq!(record.category, IntentCategory::Purchase);
        assert_eq!(record.preferred_categories, vec!["phone"]);
        assert_eq!(record.price_bucket, Some(PriceBucket::High));
        assert_eq!(record.preferred_brands.len(), 1);
        assert!((record.urgency - 0.7).abs() < 1e-9);
        assert_eq!(record.summary, "wants an iPhone");
    }

    #[test]
    fn test_parse_unknown_intent_is_unparseable() {
        let raw = r#"{"intent_type":"shopping spree","confidence":0.9}"#;
        assert_eq!(parse_response(raw), ModelResponse::Unparseable(raw.to_string()));
    }

    #[test]
    fn test_parse_not_json() {
        assert!(matches!(parse_response("no braces here"), ModelResponse::Unparseable(_)));
        assert!(matches!(parse_response("} backwards {"), ModelResponse::Unparseable(_)));
    }

    #[test]
    fn test_parse_list_as_string() {
        let raw = r#"{"intent":"brand_research","categories":"laptop, tablet","brands":"Lenovo、Apple"}"#;
        let ModelResponse::Parsed(record) = parse_response(raw) else {
            panic!("expected parsed response");
        };
        assert_eq!(record.preferred_categories, vec!["laptop", "tablet"]);
        assert!(record.prefers_brand("Lenovo") && record.prefers_brand("Apple"));
        assert_eq!(record.confidence, 0.5);
    }

    #[test]
    fn test_scan_truncated_json_lines() {
        let raw = "{\n  \"intent_type\": \"after_sales\",\n  \"confidence\": 0.65,\n  \"urgency_level\": 0.9,\n  \"brand_preferences\": [\"Sony\"";
        let record = scan_labels(raw).unwrap();
        assert_eq!(record.category, IntentCategory::AfterSales);
        assert!((record.confidence - 0.65).abs() < 1e-9);
        assert!((record.urgency - 0.9).abs() < 1e-9);
        assert!(record.prefers_brand("Sony"));
    }

    #[test]
    fn test_scan_single_line_json_with_trailing_comma() {
        let raw = r#"{"intent_type": "purchase", "confidence": 0.9, "product_categories": ["laptop", "tablet"],}"#;
        assert!(matches!(parse_response(raw), ModelResponse::Unparseable(_)));

        let record = scan_labels(raw).unwrap();
        assert_eq!(record.category, IntentCategory::Purchase);
        assert!((record.confidence - 0.9).abs() < 1e-9);
        assert_eq!(record.preferred_categories, vec!["laptop", "tablet"]);
    }

    #[test]
    fn test_scan_brace_on_first_field_line() {
        let raw = "{\"intent_type\": \"price_comparison\", \"reason\": \"compares, a lot\",\n \"confidence\": 0.8, \"brand_preferences\": [\"Apple\", \"Huawei\"";
        let record = scan_labels(raw).unwrap();
        assert_eq!(record.category, IntentCategory::PriceComparison);
        assert!((record.confidence - 0.8).abs() < 1e-9);
        assert!(record.prefers_brand("Apple") && record.prefers_brand("Huawei"));
    }

    #[test]
    fn test_scan_plain_list_keeps_commas() {
        let record = scan_labels("Intent: information\nCategories: phone, tablet").unwrap();
        assert_eq!(record.category, IntentCategory::Information);
        assert_eq!(record.preferred_categories, vec!["phone", "tablet"]);
    }

    #[test]
    fn test_scan_chinese_labels() {
        let raw = "意图：价格比较（用户关注价格）\n类别：耳机、平板电脑\n价格：低";
        let record = scan_labels(raw).unwrap();
        assert_eq!(record.category, IntentCategory::PriceComparison);
        assert_eq!(record.preferred_categories, vec!["headphone", "tablet"]);
        assert_eq!(record.price_bucket, Some(PriceBucket::Low));
    }

    #[test]
    fn test_scan_requires_intent() {
        assert_eq!(scan_labels("Categories: phone\nBudget: low"), None);
        assert_eq!(scan_labels(""), None);
    }
}
