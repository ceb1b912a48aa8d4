//! Lenient numeric coercion.
//!
//! Scores, prices and ratings coming from stores or model output are
//! loosely typed (a rating may arrive as `"4.5"`). Every externally sourced
//! number passes through [`to_float`] before it reaches scoring logic.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Coerce a JSON value into a finite `f64`.
///
/// Numbers and numeric strings succeed; everything else (including NaN and
/// infinities spelled as strings) returns `None`.
pub fn to_float(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Like [`to_float`], defaulting to 0.0.
pub fn coerce_f64(value: &Value) -> f64 {
    to_float(value).unwrap_or(0.0)
}

/// Replace non-finite scores with 0.0 so they can be compared and sorted.
pub fn sanitize_score(score: f64) -> f64 {
    if score.is_finite() {
        score
    } else {
        0.0
    }
}

pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_f64(&value))
}

pub(crate) fn lenient_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(to_float(&value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_float() {
        assert_eq!(to_float(&json!(4.5)), Some(4.5));
        assert_eq!(to_float(&json!(3)), Some(3.0));
        assert_eq!(to_float(&json!(" 4.5 ")), Some(4.5));
        assert_eq!(to_float(&json!("four")), None);
        assert_eq!(to_float(&json!("NaN")), None);
        assert_eq!(to_float(&json!(null)), None);
        assert_eq!(to_float(&json!(true)), None);
    }

    #[test]
    fn test_coerce_defaults_to_zero() {
        assert_eq!(coerce_f64(&json!("n/a")), 0.0);
        assert_eq!(coerce_f64(&json!([1, 2])), 0.0);
        assert_eq!(coerce_f64(&json!("1e3")), 1000.0);
    }

    #[test]
    fn test_sanitize_score() {
        assert_eq!(sanitize_score(f64::NAN), 0.0);
        assert_eq!(sanitize_score(f64::INFINITY), 0.0);
        assert_eq!(sanitize_score(0.42), 0.42);
    }
}
