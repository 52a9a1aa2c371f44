use std::sync::Arc;

use serde::Serialize;
use sigmap_core::{artifact, AggregateState, MergeStats, Record};
use tokio::sync::RwLock;

/// One cell as served by the read endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveRecord {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub signal_dbm: i32,
    pub timestamp: i64,
    pub carrier: String,
}

/// The aggregate shared between the poller and request handlers.
///
/// One writer (the poller) and any number of readers go through a single
/// lock. The map itself never leaves this type; callers get copies.
#[derive(Clone)]
pub struct SharedAggregate {
    inner: Arc<RwLock<AggregateState>>,
}

impl SharedAggregate {
    pub fn new(state: AggregateState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    pub async fn watermark(&self) -> i64 {
        self.inner.read().await.watermark()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn merge(&self, records: Vec<Record>) -> MergeStats {
        self.inner.write().await.merge(records)
    }

    /// Artifact bytes and the watermark they correspond to.
    pub async fn render(&self) -> sigmap_core::Result<(Vec<u8>, i64)> {
        let state = self.inner.read().await;
        let bytes = artifact::render_artifact(&state)?;
        Ok((bytes, state.watermark()))
    }

    pub async fn records(&self) -> Vec<LiveRecord> {
        let state = self.inner.read().await;
        state
            .iter()
            .map(|(key, rec)| LiveRecord {
                id: rec.id.clone().unwrap_or_else(|| key.to_string()),
                latitude: rec.latitude,
                longitude: rec.longitude,
                signal_dbm: rec.signal_dbm,
                timestamp: rec.timestamp,
                carrier: rec.carrier.clone(),
            })
            .collect()
    }
}
