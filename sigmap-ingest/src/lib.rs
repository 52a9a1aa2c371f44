//! Record feeds and the one-shot sync pipeline.

pub mod batch;
pub mod credentials;
mod error;
pub mod firestore;
pub mod jsonl;

use async_trait::async_trait;
use sigmap_core::{FeedConfig, Record};

pub use batch::{fetch_and_merge, run_batch, BatchReport, RunMode};
pub use credentials::Credentials;
pub use error::{FeedError, SyncError};
pub use firestore::FirestoreSource;
pub use jsonl::JsonlSource;

/// Which records a fetch asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    All,
    /// Timestamp strictly greater than the value.
    After(i64),
}

impl Query {
    pub fn admits(&self, ts: i64) -> bool {
        match *self {
            Query::All => true,
            Query::After(after) => ts > after,
        }
    }
}

/// A store of signal records, queried ascending by timestamp.
#[async_trait]
pub trait RecordSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self, query: Query) -> Result<Vec<Record>, FeedError>;
}

/// Build the configured feed. Credentials are resolved and read here, once.
pub fn open_source(feed: &FeedConfig) -> Result<Box<dyn RecordSource>, FeedError> {
    match feed {
        FeedConfig::Firestore(fs) => {
            let path = credentials::resolve_path(fs.credentials_path.as_deref())?;
            let creds = Credentials::load(&path)?;
            Ok(Box::new(FirestoreSource::new(fs, creds)?))
        }
        FeedConfig::Jsonl(jl) => Ok(Box::new(JsonlSource::new(sigmap_core::expand_tilde(
            &jl.path,
        )))),
    }
}
