use serde::Serialize;
use sigmap_core::{artifact, AggregateState, MergeStats, OutputPaths};
use tracing::info;

use crate::error::{FeedError, SyncError};
use crate::{Query, RecordSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RunMode {
    /// Resume from the prior artifact and watermark.
    Incremental,
    /// Ignore prior output and refetch everything.
    FullRebuild,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub mode: RunMode,
    pub source: String,
    pub previous_watermark: i64,
    pub watermark: i64,
    pub cells: usize,
    pub artifacts: usize,
    pub merge: MergeStats,
}

/// Fetch what the state has not seen yet and fold it in.
pub async fn fetch_and_merge(
    source: &dyn RecordSource,
    state: &mut AggregateState,
    query: Query,
) -> Result<MergeStats, FeedError> {
    let records = source.fetch(query).await?;
    Ok(state.merge(records))
}

/// load → fetch → merge → publish, once. Any feed or write failure aborts
/// before the watermark file moves.
pub async fn run_batch(
    source: &dyn RecordSource,
    paths: &OutputPaths,
    precision: u32,
    mode: RunMode,
) -> Result<BatchReport, SyncError> {
    let (mut state, query) = match mode {
        RunMode::Incremental => {
            let state = artifact::load_prior(paths, precision);
            let query = Query::After(state.watermark());
            (state, query)
        }
        RunMode::FullRebuild => (AggregateState::new(precision), Query::All),
    };
    let previous_watermark = state.watermark();
    info!(
        "loaded {} cells, fetching from {} with {:?}",
        state.len(),
        source.name(),
        query
    );

    let merge = fetch_and_merge(source, &mut state, query).await?;
    info!(
        "merged {} records: {} rejected, {} new cells, {} replaced",
        merge.fetched, merge.rejected, merge.inserted, merge.replaced
    );

    artifact::persist(&state, paths)?;

    Ok(BatchReport {
        mode,
        source: source.name().to_string(),
        previous_watermark,
        watermark: state.watermark(),
        cells: state.len(),
        artifacts: paths.artifacts.len(),
        merge,
    })
}
