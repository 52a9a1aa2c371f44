use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures talking to the record feed.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FeedError {
    #[error("no credentials path configured (set credentialsPath or {0})")]
    NoCredentials(&'static str),

    #[error("failed to read credentials {path}")]
    Credentials {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("credentials file {0} holds no token")]
    EmptyCredentials(PathBuf),

    #[error("credentials file {0} is neither a service account key nor an access token")]
    UnrecognizedCredentials(PathBuf),

    #[error("invalid service account key {path}")]
    ServiceAccount {
        path: PathBuf,
        #[source]
        source: gcp_auth::Error,
    },

    #[error("failed to obtain an access token")]
    Auth(#[source] gcp_auth::Error),

    #[error("feed request failed")]
    Http(#[from] reqwest::Error),

    #[error("feed returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to decode feed response")]
    Decode(#[from] serde_json::Error),

    #[error("failed to read feed file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Anything a fetch-merge-publish cycle can fail with.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Core(#[from] sigmap_core::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn cause_is_reported_once() {
        let err = FeedError::Io {
            path: PathBuf::from("feed.jsonl"),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(err.to_string(), "failed to read feed file feed.jsonl");
        assert_eq!(err.source().unwrap().to_string(), "gone");

        let sync = SyncError::from(err);
        assert_eq!(sync.to_string(), "failed to read feed file feed.jsonl");
    }
}
