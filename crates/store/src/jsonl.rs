use std::path::{Path, PathBuf};

use chrono::Utc;
use shelfwise_model::Ranking;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::{RankingEntry, RankingSink, StoreError};

/// Appends one JSON line per recorded ranking.
#[derive(Debug)]
pub struct JsonlRankingLog {
    path: PathBuf,
    // Serializes appends from concurrent recordings.
    write_lock: Mutex<()>,
}

impl JsonlRankingLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back every entry in the log. A missing file is an empty log.
    pub async fn entries(&self) -> Result<Vec<RankingEntry>, StoreError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(|e| StoreError::Parse(e.to_string())))
            .collect()
    }
}

impl RankingSink for JsonlRankingLog {
    async fn save_ranking(
        &self,
        user_id: &str,
        session_id: &str,
        ranking: &Ranking,
    ) -> Result<(), StoreError> {
        let entry = RankingEntry::new(user_id, session_id, ranking, Utc::now());
        let mut line = serde_json::to_string(&entry).map_err(|e| StoreError::Parse(e.to_string()))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        tracing::debug!(
            path = %self.path.display(),
            user_id,
            session_id,
            items = entry.items.len(),
            "Appended ranking to log"
        );

        Ok(())
    }
}
