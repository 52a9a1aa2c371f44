use std::sync::Arc;
use std::time::Duration;

use sigmap_core::{artifact, MergeStats, OutputPaths};
use sigmap_ingest::{Query, RecordSource, SyncError};
use tracing::{error, info};

use crate::state::SharedAggregate;

/// fetch → merge → publish, once. The fetch runs without holding the lock.
pub async fn run_cycle(
    source: &dyn RecordSource,
    shared: &SharedAggregate,
    paths: &OutputPaths,
) -> Result<MergeStats, SyncError> {
    let since = shared.watermark().await;
    let records = source.fetch(Query::After(since)).await?;
    let merge = shared.merge(records).await;
    let (bytes, watermark) = shared.render().await?;
    artifact::publish(&bytes, watermark, paths)?;
    Ok(merge)
}

/// Runs until the process exits. A failed cycle is logged and the next one
/// starts after the usual interval.
pub async fn poll_forever(
    source: Arc<dyn RecordSource>,
    shared: SharedAggregate,
    paths: OutputPaths,
    interval: Duration,
) {
    info!("polling {} every {}s", source.name(), interval.as_secs());
    loop {
        match run_cycle(source.as_ref(), &shared, &paths).await {
            Ok(merge) if merge.fetched > 0 => {
                let watermark = shared.watermark().await;
                info!(
                    "cycle merged {} records ({} rejected, {} new cells, {} replaced), watermark={}",
                    merge.fetched, merge.rejected, merge.inserted, merge.replaced, watermark
                );
            }
            Ok(_) => {}
            Err(err) => error!("cycle failed: {:#}", anyhow::Error::from(err)),
        }
        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sigmap_core::{read_watermark, AggregateState, Record};
    use sigmap_ingest::FeedError;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    struct FlakySource {
        fail: AtomicBool,
        records: Vec<Record>,
    }

    #[async_trait]
    impl RecordSource for FlakySource {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn fetch(&self, query: Query) -> Result<Vec<Record>, FeedError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(FeedError::Io {
                    path: "remote".into(),
                    source: std::io::Error::new(std::io::ErrorKind::TimedOut, "slow"),
                });
            }
            Ok(self
                .records
                .iter()
                .filter(|r| query.admits(r.timestamp))
                .cloned()
                .collect())
        }
    }

    fn paths_in(dir: &TempDir) -> OutputPaths {
        OutputPaths {
            artifacts: vec![dir.path().join("heatmap.json")],
            watermark: dir.path().join("last_timestamp.txt"),
        }
    }

    #[tokio::test]
    async fn cycle_publishes_and_advances() {
        let dir = TempDir::new().unwrap();
        let paths = paths_in(&dir);
        let source = FlakySource {
            fail: AtomicBool::new(false),
            records: vec![Record::new(1.0, 2.0, -60, 10), Record::new(3.0, 4.0, -70, 20)],
        };
        let shared = SharedAggregate::new(AggregateState::default());

        let merge = run_cycle(&source, &shared, &paths).await.unwrap();
        assert_eq!(merge.inserted, 2);
        assert_eq!(read_watermark(&paths.watermark), 20);

        let again = run_cycle(&source, &shared, &paths).await.unwrap();
        assert_eq!(again.fetched, 0);
        assert_eq!(shared.len().await, 2);
    }

    #[tokio::test]
    async fn failed_fetch_keeps_state_and_files() {
        let dir = TempDir::new().unwrap();
        let paths = paths_in(&dir);
        let source = FlakySource {
            fail: AtomicBool::new(false),
            records: vec![Record::new(1.0, 2.0, -60, 10)],
        };
        let shared = SharedAggregate::new(AggregateState::default());
        run_cycle(&source, &shared, &paths).await.unwrap();

        source.fail.store(true, Ordering::SeqCst);
        assert!(run_cycle(&source, &shared, &paths).await.is_err());
        assert_eq!(shared.len().await, 1);
        assert_eq!(read_watermark(&paths.watermark), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_keeps_going_after_a_failed_cycle() {
        let dir = TempDir::new().unwrap();
        let paths = paths_in(&dir);
        let source = Arc::new(FlakySource {
            fail: AtomicBool::new(true),
            records: vec![Record::new(1.0, 2.0, -60, 10)],
        });
        let shared = SharedAggregate::new(AggregateState::default());
        let interval = Duration::from_secs(60);
        let task = tokio::spawn(poll_forever(
            source.clone(),
            shared.clone(),
            paths.clone(),
            interval,
        ));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(shared.len().await, 0);
        assert!(!paths.watermark.exists());

        source.fail.store(false, Ordering::SeqCst);
        tokio::time::sleep(interval).await;
        assert_eq!(shared.len().await, 1);
        assert_eq!(read_watermark(&paths.watermark), 10);
        assert!(paths.artifacts[0].exists());

        task.abort();
    }
}
