use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::aggregate::AggregateState;
use crate::error::{Error, Result};
use crate::geojson::{parse_features, FeatureCollection};

/// Where a run publishes its artifact copies and its checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub artifacts: Vec<PathBuf>,
    pub watermark: PathBuf,
}

impl OutputPaths {
    /// The copy the loader reads back on the next run.
    pub fn primary(&self) -> Option<&Path> {
        self.artifacts.first().map(PathBuf::as_path)
    }
}

/// Last persisted watermark; missing or unparsable reads as 0.
pub fn read_watermark(path: &Path) -> i64 {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(err) => {
            debug!("no watermark at {}: {}", path.display(), err);
            return 0;
        }
    };
    match text.trim().parse::<i64>() {
        Ok(ts) => ts,
        Err(_) => {
            warn!("ignoring corrupt watermark file {}", path.display());
            0
        }
    }
}

pub fn write_watermark(path: &Path, ts: i64) -> Result<()> {
    write_atomic(path, ts.to_string().as_bytes()).map_err(|source| Error::WatermarkWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Rebuild state from the primary artifact and the checkpoint.
///
/// A missing or unreadable artifact yields an empty state. The returned
/// watermark is the larger of the checkpoint and the newest restored record.
pub fn load_prior(paths: &OutputPaths, precision: u32) -> AggregateState {
    let mut state = AggregateState::new(precision);
    state.advance_watermark(read_watermark(&paths.watermark));

    let Some(primary) = paths.primary() else {
        return state;
    };
    let bytes = match fs::read(primary) {
        Ok(b) => b,
        Err(err) => {
            debug!("no prior artifact at {}: {}", primary.display(), err);
            return state;
        }
    };
    let parsed = match parse_features(&bytes) {
        Ok(p) => p,
        Err(err) => {
            warn!("ignoring unreadable artifact {}: {}", primary.display(), err);
            return state;
        }
    };
    if parsed.skipped > 0 {
        warn!(
            "skipped {} malformed features in {}",
            parsed.skipped,
            primary.display()
        );
    }
    for rec in parsed.records {
        state.restore(rec);
    }
    debug!(
        "restored {} cells from {}, watermark={}",
        state.len(),
        primary.display(),
        state.watermark()
    );
    state
}

/// Pretty JSON with 2-space indentation and a trailing newline.
pub fn render_artifact(state: &AggregateState) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(&FeatureCollection::from_state(state))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Write `bytes` to every artifact path, then the checkpoint. The checkpoint
/// is only touched once every artifact copy is in place.
pub fn publish(bytes: &[u8], watermark: i64, paths: &OutputPaths) -> Result<()> {
    for path in &paths.artifacts {
        write_atomic(path, bytes).map_err(|source| Error::ArtifactWrite {
            path: path.clone(),
            source,
        })?;
    }
    write_watermark(&paths.watermark, watermark)
}

pub fn persist(state: &AggregateState, paths: &OutputPaths) -> Result<()> {
    let bytes = render_artifact(state)?;
    publish(&bytes, state.watermark(), paths)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut tmp_name = OsString::from(path.as_os_str());
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);
    let written = fs::write(&tmp, bytes).and_then(|()| fs::rename(&tmp, path));
    if written.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    written
}
