use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use shelfwise_backend_openai::{CompletionError, CompletionModel};
use shelfwise_intent::IntentExtractor;
use shelfwise_model::{IntentRecord, Item, Ranking, Strategy, UserProfile};
use shelfwise_rerank::{rank, RerankConfig, ScoringContext};
use shelfwise_store::{CatalogStore, EventStore, RankingSink};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::{EngineConfig, RankingConfig};
use crate::error::RecommendError;
use crate::profile::ProfileBuilder;
use crate::recorder::Recorder;

/// Input of one recommendation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub user_id: String,
    /// Free text describing what the user is after
    #[serde(default)]
    pub text: Option<String>,
    /// Generated when absent
    #[serde(default)]
    pub session_id: Option<String>,
    /// Falls back to the configured default limit
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub strategy: Strategy,
}

impl RecommendationRequest {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_strategy(mut self, strategy: impl Into<Strategy>) -> Self {
        self.strategy = strategy.into();
        self
    }
}

/// Output of one recommendation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub session_id: String,
    pub ranking: Arc<Ranking>,
    /// `None` when the request had no text
    pub intent: Option<IntentRecord>,
    pub profile: UserProfile,
    /// Set when the profile could not be built and an empty one was used
    pub profile_degraded: bool,
}

/// Ranks the catalog for a user by blending intent, behavior,
/// collaborative, content and popularity signals.
pub struct Recommender<M, S, R> {
    extractor: IntentExtractor<M>,
    profiles: ProfileBuilder<S>,
    store: Arc<S>,
    recorder: Recorder<R>,
    ranking: RankingConfig,
    rerank: RerankConfig,
}

impl<M, S, R> Recommender<M, S, R>
where
    M: CompletionModel,
    S: CatalogStore + EventStore + 'static,
    R: RankingSink + 'static,
{
    pub fn new(model: Arc<M>, store: Arc<S>, sink: Arc<R>, config: &EngineConfig) -> Self {
        Self {
            extractor: IntentExtractor::new(model, config.intent.clone()),
            profiles: ProfileBuilder::new(Arc::clone(&store), config.profile.clone()),
            store,
            recorder: Recorder::new(sink),
            ranking: config.ranking.clone(),
            rerank: config.ranking.rerank(),
        }
    }

    pub fn recorder(&self) -> &Recorder<R> {
        &self.recorder
    }

    pub fn profiles(&self) -> &ProfileBuilder<S> {
        &self.profiles
    }

    /// Produce a ranking for the request and queue it for recording.
    pub async fn get_recommendations(
        &self,
        request: RecommendationRequest,
    ) -> Result<Recommendation, RecommendError> {
        self.recommend(request).await
    }

    /// Like [`Self::get_recommendations`], abandoning the model call and
    /// scoring once `cancel` fires. A ranking already handed to the
    /// recorder is still persisted.
    pub async fn get_recommendations_with_cancel(
        &self,
        request: RecommendationRequest,
        cancel: CancellationToken,
    ) -> Result<Recommendation, RecommendError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(user_id = %request.user_id, "Recommendation request cancelled");
                Err(RecommendError::Cancelled)
            }
            result = self.recommend(request.clone()) => result,
        }
    }

    /// Intent analysis without ranking. Never fails.
    pub async fn analyze_intent(&self, text: &str, user_id: &str) -> IntentRecord {
        self.extractor.extract(text, user_id).await
    }

    /// Check the completion model endpoint.
    pub async fn model_health(&self) -> Result<(), CompletionError> {
        self.extractor.model().health_check().await
    }

    pub fn model_name(&self) -> &'static str {
        self.extractor.model().name()
    }

    /// Wait for every queued recording to finish.
    pub async fn shutdown(&self) {
        self.recorder.shutdown().await;
    }

    fn resolve_limit(&self, requested: Option<usize>) -> Result<usize, RecommendError> {
        let limit = requested.unwrap_or(self.ranking.default_limit);
        if limit == 0 || limit > self.ranking.max_limit {
            return Err(RecommendError::InvalidRequest(format!(
                "limit must be in range 1..={}, got {}",
                self.ranking.max_limit, limit
            )));
        }
        Ok(limit)
    }

    async fn recommend(
        &self,
        request: RecommendationRequest,
    ) -> Result<Recommendation, RecommendError> {
        let started = Instant::now();

        let user_id = request.user_id.trim();
        if user_id.is_empty() {
            return Err(RecommendError::InvalidRequest("user_id must not be empty".to_string()));
        }
        let limit = self.resolve_limit(request.limit)?;
        let session_id = request
            .session_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(new_session_id);
        let text = request.text.as_deref().map(str::trim).filter(|t| !t.is_empty());

        let now = Utc::now();
        let lookback = self.profiles.default_lookback();

        let (profile, intent) = tokio::join!(self.profiles.build_at(user_id, lookback, now), async {
            match text {
                Some(text) => Some(self.extractor.extract(text, user_id).await),
                None => None,
            }
        });

        let (profile, profile_degraded) = match profile {
            Ok(profile) => (profile, false),
            Err(e) => {
                tracing::warn!(
                    user_id,
                    error = %e,
                    retryable = e.is_retryable(),
                    "Profile build failed, continuing without behavior signal"
                );
                (UserProfile::empty(user_id, now), true)
            }
        };

        let items = self
            .store
            .list_active_items()
            .await
            .map_err(RecommendError::CatalogUnavailable)?;

        let co_occurrence = self.co_occurrence(&items, user_id).await;

        let ctx = ScoringContext::new(&profile, now)
            .with_intent(intent.as_ref())
            .with_co_occurrence(&co_occurrence);
        let ranking = Arc::new(rank(&items, &ctx, request.strategy, limit, &self.rerank));

        self.recorder.record(user_id, &session_id, Arc::clone(&ranking));

        tracing::info!(
            user_id,
            session_id = %session_id,
            strategy = %request.strategy,
            catalog = items.len(),
            items = ranking.len(),
            intent = intent.as_ref().map(|i| i.category.as_str()),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Recommendations ranked"
        );

        Ok(Recommendation {
            session_id,
            ranking,
            intent,
            profile,
            profile_degraded,
        })
    }

    /// Look up co-occurring users for every item, a bounded number at a
    /// time. Failed lookups count as zero.
    async fn co_occurrence(&self, items: &[Item], user_id: &str) -> BTreeMap<String, usize> {
        let store = &self.store;

        let counts: Vec<usize> = stream::iter(items)
            .map(|item| async move {
                match store.co_occurring_users(&item.id, user_id).await {
                    Ok(count) => count,
                    Err(e) => {
                        tracing::warn!(
                            user_id,
                            item_id = %item.id,
                            error = %e,
                            "Co-occurrence lookup failed, scoring as zero"
                        );
                        0
                    }
                }
            })
            .buffered(self.ranking.concurrency())
            .collect()
            .await;

        items
            .iter()
            .zip(counts)
            .filter(|(_, count)| *count > 0)
            .map(|(item, count)| (item.id.clone(), count))
            .collect()
    }
}

/// `session_` followed by eight hex characters.
pub fn new_session_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("session_{}", &id[..8])
}
