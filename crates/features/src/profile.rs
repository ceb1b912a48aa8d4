use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shelfwise_model::{BehaviorEvent, EventKind, PriceRange, UserProfile};

/// Configuration for the behavior decay function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    /// Decay rate per day. `exp(-days_ago * lambda)`; 0.1 gives a
    /// half-life of about 6.9 days.
    pub lambda: f64,
    /// How far back events are fetched.
    pub lookback_days: u32,
    /// Base weight per event kind
    pub weights: KindWeights,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            lambda: 0.1,
            lookback_days: 30,
            weights: KindWeights::default(),
        }
    }
}

/// Base weight per event kind before decay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KindWeights {
    pub purchase: f64,
    pub click: f64,
    pub view: f64,
    pub search: f64,
}

impl Default for KindWeights {
    fn default() -> Self {
        Self {
            purchase: 3.0,
            click: 1.5,
            view: 1.0,
            search: 0.8,
        }
    }
}

impl KindWeights {
    pub fn for_kind(&self, kind: EventKind) -> f64 {
        let weight = match kind {
            EventKind::Purchase => self.purchase,
            EventKind::Click => self.click,
            EventKind::View => self.view,
            EventKind::Search => self.search,
        };
        weight.max(0.0)
    }
}

/// Whole days between `timestamp` and `now`. Events stamped in the future
/// count as today.
pub fn days_ago(now: DateTime<Utc>, timestamp: DateTime<Utc>) -> f64 {
    now.signed_duration_since(timestamp).num_days().max(0) as f64
}

/// `exp(-days_ago * lambda)`, always within (0, 1].
pub fn decay_multiplier(days_ago: f64, lambda: f64) -> f64 {
    (-days_ago.max(0.0) * lambda.max(0.0)).exp()
}

/// Aggregate a user's events into a time-decayed preference profile.
///
/// Each event contributes `base_weight(kind) * exp(-days_ago * lambda)` to
/// its category and brand (when present) and to `activity_level`. Events
/// are taken as given; filtering by lookback window is the caller's job.
pub fn build_profile(
    user_id: &str,
    events: &[BehaviorEvent],
    now: DateTime<Utc>,
    config: &DecayConfig,
) -> UserProfile {
    let mut profile = UserProfile::empty(user_id, now);

    for event in events {
        let decay = decay_multiplier(days_ago(now, event.timestamp), config.lambda);
        let weight = config.weights.for_kind(event.kind) * decay;

        if let Some(category) = non_blank(event.category.as_deref()) {
            *profile
                .category_preference
                .entry(category.to_string())
                .or_insert(0.0) += weight;
        }

        if let Some(brand) = non_blank(event.brand.as_deref()) {
            *profile
                .brand_preference
                .entry(brand.to_string())
                .or_insert(0.0) += weight;
        }

        if let Some(price) = event.price.filter(|p| p.is_finite() && *p >= 0.0) {
            profile.price_range = Some(PriceRange::observe(profile.price_range, price));
        }

        *profile.kind_counts.entry(event.kind).or_insert(0) += 1;
        profile.activity_level += weight;
        profile.last_activity = profile.last_activity.max(Some(event.timestamp));
    }

    profile.event_count = events.len();
    profile
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn view(days: i64, category: &str) -> BehaviorEvent {
        BehaviorEvent::new("u1", EventKind::View, now() - Duration::days(days))
            .with_category(category)
    }

    #[test]
    fn test_three_views_decay() {
        let events = vec![view(0, "laptop"), view(1, "laptop"), view(2, "laptop")];
        let profile = build_profile("u1", &events, now(), &DecayConfig::default());

        let expected = 0.0_f64.exp() + (-0.1_f64).exp() + (-0.2_f64).exp();
        assert!((profile.category_weight("laptop") - expected).abs() < 1e-9);
        assert!((profile.activity_level - expected).abs() < 1e-9);
        assert_eq!(profile.event_count, 3);
        assert_eq!(profile.count_of(EventKind::View), 3);
    }

    #[test]
    fn test_empty_events() {
        let profile = build_profile("u1", &[], now(), &DecayConfig::default());
        assert_eq!(profile, UserProfile::empty("u1", now()));
        assert_eq!(profile.activity_level, 0.0);
        assert!(profile.category_preference.is_empty());
        assert!(profile.brand_preference.is_empty());
    }

    #[test]
    fn test_kind_weights_and_brands() {
        let events = vec![
            BehaviorEvent::new("u1", EventKind::Purchase, now())
                .with_category("phone")
                .with_brand("Apple")
                .with_price(7999.0),
            BehaviorEvent::new("u1", EventKind::Search, now()).with_category("phone"),
            BehaviorEvent::new("u1", EventKind::Click, now())
                .with_brand("Apple")
                .with_price(1899.0),
        ];
        let profile = build_profile("u1", &events, now(), &DecayConfig::default());

        assert!((profile.category_weight("phone") - 3.8).abs() < 1e-9);
        assert!((profile.brand_weight("Apple") - 4.5).abs() < 1e-9);
        assert_eq!(profile.price_range, Some(PriceRange { min: 1899.0, max: 7999.0 }));
        assert!(profile.has_purchases());
        assert_eq!(profile.last_activity, Some(now()));
    }

    #[test]
    fn test_future_events_do_not_amplify() {
        let events = vec![BehaviorEvent::new("u1", EventKind::View, now() + Duration::days(3))
            .with_category("tablet")];
        let profile = build_profile("u1", &events, now(), &DecayConfig::default());
        assert_eq!(profile.category_weight("tablet"), 1.0);
    }

    #[test]
    fn test_negative_weights_floor_at_zero() {
        let config = DecayConfig {
            weights: KindWeights {
                view: -2.0,
                ..KindWeights::default()
            },
            ..DecayConfig::default()
        };
        let profile = build_profile("u1", &[view(1, "camera")], now(), &config);
        assert_eq!(profile.category_weight("camera"), 0.0);
        assert_eq!(profile.activity_level, 0.0);
    }

    #[test]
    fn test_decay_half_life() {
        let half = decay_multiplier(6.931_471_805_599_453, 0.1);
        assert!((half - 0.5).abs() < 1e-9);
        assert_eq!(decay_multiplier(-4.0, 0.1), 1.0);
    }
}
