use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::artifact::OutputPaths;
use crate::error::{Error, Result};
use crate::grid::{DEFAULT_PRECISION, MAX_PRECISION};

pub const DEFAULT_COLLECTION: &str = "signal_logs";
pub const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 10;
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirestoreFeed {
    pub project_id: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default)]
    pub credentials_path: Option<String>,
    #[serde(default)]
    pub request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonlFeed {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FeedConfig {
    Firestore(FirestoreFeed),
    Jsonl(JsonlFeed),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub feed: FeedConfig,
    #[serde(default = "default_artifact_paths")]
    pub artifact_paths: Vec<String>,
    #[serde(default = "default_watermark_path")]
    pub watermark_path: String,
    #[serde(default = "default_precision")]
    pub precision: u32,
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: Config = serde_json::from_slice(&data).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.artifact_paths.iter().all(|p| p.trim().is_empty()) {
            return Err(Error::ConfigInvalid(
                "artifactPaths must include at least one path".into(),
            ));
        }
        if self.artifact_paths.iter().any(|p| p.trim().is_empty()) {
            return Err(Error::ConfigInvalid(
                "artifactPaths entries must be non-empty".into(),
            ));
        }
        if self.watermark_path.trim().is_empty() {
            return Err(Error::ConfigInvalid("watermarkPath must be non-empty".into()));
        }
        if self.precision > MAX_PRECISION {
            return Err(Error::ConfigInvalid(format!(
                "precision must be <= {}",
                MAX_PRECISION
            )));
        }
        if self.poll_interval_seconds == 0 {
            return Err(Error::ConfigInvalid("pollIntervalSeconds must be > 0".into()));
        }
        match &self.feed {
            FeedConfig::Firestore(feed) => {
                if feed.project_id.trim().is_empty() || feed.collection.trim().is_empty() {
                    return Err(Error::ConfigInvalid(
                        "firestore feed needs projectId and collection".into(),
                    ));
                }
            }
            FeedConfig::Jsonl(jl) => {
                if jl.path.trim().is_empty() {
                    return Err(Error::ConfigInvalid("jsonl feed needs a path".into()));
                }
            }
        }
        Ok(())
    }

    pub fn output_paths(&self) -> OutputPaths {
        OutputPaths {
            artifacts: self.artifact_paths.iter().map(|p| expand_tilde(p)).collect(),
            watermark: expand_tilde(&self.watermark_path),
        }
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Ok(home) = env::var("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

fn default_artifact_paths() -> Vec<String> {
    vec![
        "public/heatmap.json".to_string(),
        "web/public/heatmap.json".to_string(),
    ]
}

fn default_watermark_path() -> String {
    "public/last_timestamp.txt".to_string()
}

fn default_precision() -> u32 {
    DEFAULT_PRECISION
}

fn default_poll_interval_seconds() -> u64 {
    DEFAULT_POLL_INTERVAL_SECONDS
}

fn default_listen_addr() -> String {
    DEFAULT_LISTEN_ADDR.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_PROJECT: &str = "cellsignalmapper-test";

    fn parse(text: &str) -> Config {
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn minimal_firestore_config_gets_defaults() {
        let cfg = parse(&format!(
            r#"{{"feed":{{"kind":"firestore","projectId":"{}"}}}}"#,
            TEST_PROJECT
        ));
        cfg.validate().unwrap();
        match &cfg.feed {
            FeedConfig::Firestore(feed) => {
                assert_eq!(feed.project_id, TEST_PROJECT);
                assert_eq!(feed.collection, DEFAULT_COLLECTION);
                assert!(feed.credentials_path.is_none());
            }
            other => panic!("unexpected feed {:?}", other),
        }
        assert_eq!(cfg.precision, DEFAULT_PRECISION);
        assert_eq!(cfg.poll_interval_seconds, DEFAULT_POLL_INTERVAL_SECONDS);
        assert_eq!(cfg.listen_addr, DEFAULT_LISTEN_ADDR);
        let out = cfg.output_paths();
        assert_eq!(out.artifacts.len(), 2);
        assert_eq!(out.primary(), Some(Path::new("public/heatmap.json")));
        assert_eq!(out.watermark, PathBuf::from("public/last_timestamp.txt"));
    }

    #[test]
    fn jsonl_feed_parses() {
        let cfg = parse(
            r#"{"feed":{"kind":"jsonl","path":"logs.jsonl"},"artifactPaths":["out.json"],"precision":3}"#,
        );
        cfg.validate().unwrap();
        assert!(matches!(cfg.feed, FeedConfig::Jsonl(ref j) if j.path == "logs.jsonl"));
        assert_eq!(cfg.precision, 3);
    }

    #[test]
    fn rejects_bad_values() {
        let base = r#"{"feed":{"kind":"jsonl","path":"x"}"#;
        for extra in [
            r#","artifactPaths":[]}"#,
            r#","artifactPaths":["a",""]}"#,
            r#","precision":11}"#,
            r#","pollIntervalSeconds":0}"#,
            r#","watermarkPath":" "}"#,
        ] {
            let cfg = parse(&format!("{}{}", base, extra));
            assert!(
                matches!(cfg.validate(), Err(Error::ConfigInvalid(_))),
                "accepted {}",
                extra
            );
        }
        let cfg = parse(r#"{"feed":{"kind":"firestore","projectId":""}}"#);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Config::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, Error::ConfigRead { .. }));
    }

    #[test]
    fn expand_tilde_leaves_plain_paths() {
        assert_eq!(expand_tilde("public/a.json"), PathBuf::from("public/a.json"));
    }
}
