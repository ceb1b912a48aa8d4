use std::sync::Arc;

use shelfwise_model::Ranking;
use shelfwise_store::RankingSink;
use tokio_util::task::TaskTracker;

/// Persists rankings off the response path.
///
/// Each recording runs as its own task; [`Recorder::shutdown`] waits for
/// every task spawned so far. Failures are logged and otherwise ignored.
pub struct Recorder<R> {
    sink: Arc<R>,
    tracker: TaskTracker,
}

impl<R> Clone for Recorder<R> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            tracker: self.tracker.clone(),
        }
    }
}

impl<R: RankingSink + 'static> Recorder<R> {
    pub fn new(sink: Arc<R>) -> Self {
        Self {
            sink,
            tracker: TaskTracker::new(),
        }
    }

    pub fn sink(&self) -> &R {
        &self.sink
    }

    /// Queue `ranking` for persistence and return immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn record(&self, user_id: &str, session_id: &str, ranking: Arc<Ranking>) {
        let sink = Arc::clone(&self.sink);
        let user_id = user_id.to_string();
        let session_id = session_id.to_string();

        self.tracker.spawn(async move {
            match sink.save_ranking(&user_id, &session_id, &ranking).await {
                Ok(()) => tracing::debug!(
                    user_id = %user_id,
                    session_id = %session_id,
                    items = ranking.len(),
                    "Recorded ranking"
                ),
                Err(e) => tracing::warn!(
                    user_id = %user_id,
                    session_id = %session_id,
                    error = %e,
                    retryable = e.is_retryable(),
                    "Failed to record ranking"
                ),
            }
        });
    }

    /// Number of recordings still running.
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Close the tracker and wait for every recording spawned so far.
    pub async fn shutdown(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        tracing::debug!("Recorder drained");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shelfwise_model::Strategy;
    use shelfwise_store::{MemoryStore, StoreError};
    use std::time::Duration;

    struct FailingSink;

    impl RankingSink for FailingSink {
        async fn save_ranking(
            &self,
            _user_id: &str,
            _session_id: &str,
            _ranking: &Ranking,
        ) -> Result<(), StoreError> {
            Err(StoreError::Unavailable)
        }
    }

    /// Saves into memory after a delay.
    #[derive(Default)]
    struct SlowSink {
        inner: MemoryStore,
    }

    impl RankingSink for SlowSink {
        async fn save_ranking(
            &self,
            user_id: &str,
            session_id: &str,
            ranking: &Ranking,
        ) -> Result<(), StoreError> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.inner.save_ranking(user_id, session_id, ranking).await
        }
    }

    fn ranking() -> Arc<Ranking> {
        Arc::new(Ranking {
            items: vec![],
            strategy: Strategy::Hybrid,
            generated_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_recordings() {
        let recorder = Recorder::new(Arc::new(MemoryStore::default()));

        recorder.record("u1", "s1", ranking());
        recorder.record("u2", "s2", ranking());
        recorder.shutdown().await;

        assert_eq!(recorder.pending(), 0);
        let recorded = recorder.sink().recorded().await;
        assert_eq!(recorded.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recording_outlives_dropped_caller() {
        let recorder = Recorder::new(Arc::new(SlowSink::default()));

        let caller = {
            let recorder = recorder.clone();
            async move {
                recorder.record("u1", "s1", ranking());
                std::future::pending::<()>().await;
            }
        };
        assert!(tokio::time::timeout(Duration::from_millis(1), caller)
            .await
            .is_err());
        assert_eq!(recorder.pending(), 1);

        recorder.shutdown().await;
        let recorded = recorder.sink().inner.recorded().await;
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].session_id, "s1");
    }

    #[tokio::test]
    async fn test_failures_are_swallowed() {
        let recorder = Recorder::new(Arc::new(FailingSink));
        recorder.record("u1", "s1", ranking());
        recorder.shutdown().await;
        assert_eq!(recorder.pending(), 0);
    }
}
