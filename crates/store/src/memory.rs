use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use shelfwise_model::{BehaviorEvent, Item, Ranking};
use tokio::sync::Mutex;

use crate::{fixtures, CatalogStore, EventStore, RankingEntry, RankingSink, StoreError};

/// On-disk shape of a catalog and event snapshot.
#[derive(Debug, Default, Deserialize)]
struct Snapshot {
    #[serde(default)]
    items: Vec<Item>,
    #[serde(default)]
    events: Vec<BehaviorEvent>,
}

/// Catalog, events and recorded rankings held in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Vec<Item>,
    events: Vec<BehaviorEvent>,
    rankings: Mutex<Vec<RankingEntry>>,
}

impl MemoryStore {
    pub fn new(items: Vec<Item>, events: Vec<BehaviorEvent>) -> Self {
        Self {
            items,
            events,
            rankings: Mutex::new(Vec::new()),
        }
    }

    /// Store seeded with the demo catalog and event histories, with event
    /// timestamps laid out over the 30 days before `now`.
    pub fn demo(now: DateTime<Utc>) -> Self {
        Self::new(fixtures::demo_items(), fixtures::demo_events(now))
    }

    /// Parse a `{ "items": [...], "events": [...] }` JSON document.
    pub fn from_snapshot_str(json: &str) -> Result<Self, StoreError> {
        let snapshot: Snapshot =
            serde_json::from_str(json).map_err(|e| StoreError::Parse(e.to_string()))?;
        Ok(Self::new(snapshot.items, snapshot.events))
    }

    /// Load a snapshot file.
    pub async fn from_snapshot_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await?;
        let store = Self::from_snapshot_str(&json)?;

        tracing::info!(
            path = %path.display(),
            items = store.items.len(),
            events = store.events.len(),
            "Loaded store snapshot"
        );

        Ok(store)
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Rankings recorded so far, oldest first.
    pub async fn recorded(&self) -> Vec<RankingEntry> {
        self.rankings.lock().await.clone()
    }

    fn engaged_users(&self, item_id: &str) -> BTreeSet<&str> {
        self.events
            .iter()
            .filter(|e| e.kind.is_engagement() && e.item_id.as_deref() == Some(item_id))
            .map(|e| e.user_id.as_str())
            .collect()
    }
}

impl CatalogStore for MemoryStore {
    async fn list_active_items(&self) -> Result<Vec<Item>, StoreError> {
        Ok(self.items.iter().filter(|item| item.active).cloned().collect())
    }
}

impl EventStore for MemoryStore {
    async fn list_events(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<BehaviorEvent>, StoreError> {
        let mut events: Vec<BehaviorEvent> = self
            .events
            .iter()
            .filter(|e| e.user_id == user_id && e.timestamp >= since)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.timestamp);
        Ok(events)
    }

    async fn co_occurring_users(&self, item_id: &str, user_id: &str) -> Result<usize, StoreError> {
        let mut users = self.engaged_users(item_id);
        if !users.remove(user_id) {
            return Ok(0);
        }
        Ok(users.len())
    }
}

impl RankingSink for MemoryStore {
    async fn save_ranking(
        &self,
        user_id: &str,
        session_id: &str,
        ranking: &Ranking,
    ) -> Result<(), StoreError> {
        let entry = RankingEntry::new(user_id, session_id, ranking, Utc::now());
        self.rankings.lock().await.push(entry);
        Ok(())
    }
}
