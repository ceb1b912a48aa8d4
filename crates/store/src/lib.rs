//! Storage gateway for catalog, behavior events and ranking records.
//!
//! Provides the collaborator traits the engine reads from and writes to,
//! plus two implementations:
//! - `MemoryStore`: catalog and events held in memory, loaded from a JSON
//!   snapshot or seeded with demo fixtures; also records rankings
//! - `JsonlRankingLog`: append-only JSON Lines file of recorded rankings

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shelfwise_model::{BehaviorEvent, Item, Ranking, Strategy};
use thiserror::Error;

mod fixtures;
mod jsonl;
mod memory;

pub use jsonl::JsonlRankingLog;
pub use memory::MemoryStore;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Store not available")]
    Unavailable,
}

impl StoreError {
    /// Whether retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Unavailable => true,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::WouldBlock
            ),
            Self::QueryFailed(_) | Self::Parse(_) => false,
        }
    }
}

/// Read access to the product catalog.
pub trait CatalogStore: Send + Sync {
    /// All currently active items. Order is not guaranteed.
    fn list_active_items(&self) -> impl Future<Output = Result<Vec<Item>, StoreError>> + Send;
}

/// Read access to historical behavior events.
pub trait EventStore: Send + Sync {
    /// Events of `user_id` at or after `since`.
    fn list_events(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<BehaviorEvent>, StoreError>> + Send;

    /// Number of distinct other users with a click or purchase on
    /// `item_id`, counted only when `user_id` also clicked or purchased it.
    fn co_occurring_users(
        &self,
        item_id: &str,
        user_id: &str,
    ) -> impl Future<Output = Result<usize, StoreError>> + Send;
}

/// Append-only persistence of produced rankings.
pub trait RankingSink: Send + Sync {
    fn save_ranking(
        &self,
        user_id: &str,
        session_id: &str,
        ranking: &Ranking,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// One ranked item as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedItemEntry {
    pub item_id: String,
    pub final_score: f64,
}

/// One recorded ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub user_id: String,
    pub session_id: String,
    pub strategy: Strategy,
    pub items: Vec<RankedItemEntry>,
    /// Mean catalog rating of the ranked items
    pub mean_rating: f64,
    pub recorded_at: DateTime<Utc>,
}

impl RankingEntry {
    pub fn new(
        user_id: &str,
        session_id: &str,
        ranking: &Ranking,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            strategy: ranking.strategy,
            items: ranking
                .items
                .iter()
                .map(|scored| RankedItemEntry {
                    item_id: scored.item.id.clone(),
                    final_score: scored.final_score,
                })
                .collect(),
            mean_rating: ranking.mean_rating(),
            recorded_at,
        }
    }
}

/// Either sink, chosen from configuration.
pub enum ConfiguredSink {
    Memory(Arc<MemoryStore>),
    Jsonl(JsonlRankingLog),
}

impl RankingSink for ConfiguredSink {
    async fn save_ranking(
        &self,
        user_id: &str,
        session_id: &str,
        ranking: &Ranking,
    ) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.save_ranking(user_id, session_id, ranking).await,
            Self::Jsonl(log) => log.save_ranking(user_id, session_id, ranking).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfwise_model::{ScoredItem, SubScores};

    #[test]
    fn test_retryable() {
        assert!(StoreError::Connection("reset".into()).is_retryable());
        assert!(StoreError::Unavailable.is_retryable());
        assert!(!StoreError::Parse("bad json".into()).is_retryable());
        assert!(StoreError::Io(std::io::Error::from(std::io::ErrorKind::TimedOut)).is_retryable());
        assert!(!StoreError::Io(std::io::Error::from(std::io::ErrorKind::NotFound)).is_retryable());
    }

    #[test]
    fn test_ranking_entry() {
        let now = Utc::now();
        let ranking = Ranking {
            items: vec![
                ScoredItem {
                    item: Item::new("a", "phone", "Apple", 7999.0, 5.0),
                    scores: SubScores::default(),
                    final_score: 0.7,
                    justification: String::new(),
                },
                ScoredItem {
                    item: Item::new("b", "phone", "Xiaomi", 3999.0, 4.0),
                    scores: SubScores::default(),
                    final_score: 0.4,
                    justification: String::new(),
                },
            ],
            strategy: Strategy::Hybrid,
            generated_at: now,
        };

        let entry = RankingEntry::new("u1", "s1", &ranking, now);
        assert_eq!(entry.items.len(), 2);
        assert_eq!(entry.items[0].item_id, "a");
        assert_eq!(entry.mean_rating, 4.5);
        assert_eq!(entry.strategy, Strategy::Hybrid);
    }
}
