use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use shelfwise_features::{build_profile, DecayConfig};
use shelfwise_model::UserProfile;
use shelfwise_store::{EventStore, StoreError};

/// Builds time-decayed behavior profiles from the event store.
pub struct ProfileBuilder<E> {
    events: Arc<E>,
    config: DecayConfig,
}

impl<E> Clone for ProfileBuilder<E> {
    fn clone(&self) -> Self {
        Self {
            events: Arc::clone(&self.events),
            config: self.config.clone(),
        }
    }
}

impl<E: EventStore> ProfileBuilder<E> {
    pub fn new(events: Arc<E>, config: DecayConfig) -> Self {
        Self { events, config }
    }

    /// Lookback window from configuration.
    pub fn default_lookback(&self) -> Duration {
        Duration::days(i64::from(self.config.lookback_days))
    }

    /// Build the profile of `user_id` from events within `lookback` of now.
    pub async fn build(
        &self,
        user_id: &str,
        lookback: Duration,
    ) -> Result<UserProfile, StoreError> {
        self.build_at(user_id, lookback, Utc::now()).await
    }

    /// Build as of `now`. A user without events gets an empty profile.
    pub async fn build_at(
        &self,
        user_id: &str,
        lookback: Duration,
        now: DateTime<Utc>,
    ) -> Result<UserProfile, StoreError> {
        let since = now.checked_sub_signed(lookback).unwrap_or(DateTime::<Utc>::MIN_UTC);
        let events = self.events.list_events(user_id, since).await?;
        let profile = build_profile(user_id, &events, now, &self.config);

        tracing::debug!(
            user_id,
            events = profile.event_count,
            categories = profile.category_preference.len(),
            activity = profile.activity_level,
            "Built behavior profile"
        );

        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfwise_model::{BehaviorEvent, EventKind};
    use shelfwise_store::MemoryStore;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[tokio::test]
    async fn test_build_within_window() {
        let store = MemoryStore::new(
            vec![],
            vec![
                BehaviorEvent::new("u1", EventKind::Purchase, now() - Duration::days(1))
                    .with_category("laptop")
                    .with_brand("Lenovo")
                    .with_price(5999.0),
                BehaviorEvent::new("u1", EventKind::View, now() - Duration::days(45))
                    .with_category("phone"),
            ],
        );
        let builder = ProfileBuilder::new(Arc::new(store), DecayConfig::default());

        let profile = builder
            .build_at("u1", builder.default_lookback(), now())
            .await
            .unwrap();

        assert_eq!(profile.event_count, 1);
        assert!(profile.has_purchases());
        assert!((profile.category_weight("laptop") - 3.0 * (-0.1f64).exp()).abs() < 1e-9);
        assert_eq!(profile.category_weight("phone"), 0.0);
    }

    #[tokio::test]
    async fn test_oversized_lookback_reads_everything() {
        let builder =
            ProfileBuilder::new(Arc::new(MemoryStore::demo(now())), DecayConfig::default());
        let profile = builder
            .build_at("user_001", Duration::days(4_000_000_000), now())
            .await
            .unwrap();

        assert!(!profile.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_user_is_empty() {
        let builder =
            ProfileBuilder::new(Arc::new(MemoryStore::demo(now())), DecayConfig::default());
        let profile = builder.build_at("nobody", Duration::days(30), now()).await.unwrap();

        assert!(profile.is_empty());
        assert_eq!(profile.activity_level, 0.0);
    }
}
