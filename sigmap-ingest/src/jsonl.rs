use std::path::PathBuf;

use async_trait::async_trait;
use sigmap_core::Record;
use tracing::debug;

use crate::error::FeedError;
use crate::{Query, RecordSource};

/// Records stored one JSON object per line.
#[derive(Debug, Clone)]
pub struct JsonlSource {
    path: PathBuf,
}

impl JsonlSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

pub fn parse_jsonl(text: &str) -> Vec<Record> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Record>(line) {
            Ok(rec) => out.push(rec),
            Err(err) => debug!("skipping line {}: {}", idx + 1, err),
        }
    }
    out
}

#[async_trait]
impl RecordSource for JsonlSource {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn fetch(&self, query: Query) -> Result<Vec<Record>, FeedError> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| FeedError::Io {
                path: self.path.clone(),
                source,
            })?;
        let mut records: Vec<Record> = parse_jsonl(&text)
            .into_iter()
            .filter(|rec| query.admits(rec.timestamp))
            .collect();
        records.sort_by_key(|rec| rec.timestamp);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TEST_LINES: &str = r#"{"latitude":1.0,"longitude":2.0,"signalDbm":-70,"timestamp":30,"id":"c"}

not a record
{"latitude":1.0,"longitude":2.0,"signalDbm":-60,"timestamp":10,"carrier":"a"}
{"latitude":1.0,"longitude":2.0,"signalDbm":-65,"timestamp":20}
{"latitude":"north","longitude":2.0,"signalDbm":-65,"timestamp":25}
"#;

    #[test]
    fn skips_blank_and_bad_lines() {
        let recs = parse_jsonl(TEST_LINES);
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[0].id.as_deref(), Some("c"));
        assert_eq!(recs[1].carrier, "a");
    }

    #[tokio::test]
    async fn fetch_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("feed.jsonl");
        std::fs::write(&path, TEST_LINES).unwrap();
        let source = JsonlSource::new(&path);

        let all = source.fetch(Query::All).await.unwrap();
        let ts: Vec<i64> = all.iter().map(|r| r.timestamp).collect();
        assert_eq!(ts, vec![10, 20, 30]);

        let after = source.fetch(Query::After(20)).await.unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].timestamp, 30);
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let source = JsonlSource::new("/no/such/feed.jsonl");
        assert!(matches!(
            source.fetch(Query::All).await,
            Err(FeedError::Io { .. })
        ));
    }
}
