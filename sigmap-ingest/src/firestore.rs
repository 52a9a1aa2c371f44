use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use sigmap_core::{FirestoreFeed, Record};
use tracing::debug;

use crate::credentials::Credentials;
use crate::error::FeedError;
use crate::{Query, RecordSource};

pub const FIRESTORE_API: &str = "https://firestore.googleapis.com/v1";

const FIELD_TIMESTAMP: &str = "timestamp";

/// Reads signal documents through the Firestore REST `runQuery` call.
#[derive(Debug, Clone)]
pub struct FirestoreSource {
    client: reqwest::Client,
    api_base: String,
    project_id: String,
    collection: String,
    credentials: Credentials,
}

#[derive(Debug, Deserialize)]
struct QueryItem {
    #[serde(default)]
    document: Option<Document>,
}

#[derive(Debug, Deserialize)]
struct Document {
    name: String,
    #[serde(default)]
    fields: HashMap<String, Value>,
}

impl FirestoreSource {
    pub fn new(feed: &FirestoreFeed, credentials: Credentials) -> Result<Self, FeedError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = feed.request_timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            client: builder.build()?,
            api_base: FIRESTORE_API.to_string(),
            project_id: feed.project_id.clone(),
            collection: feed.collection.clone(),
            credentials,
        })
    }

    /// Point at an emulator or proxy instead of the public API.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn run_query_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents:runQuery",
            self.api_base.trim_end_matches('/'),
            self.project_id
        )
    }
}

pub fn structured_query(collection: &str, query: Query) -> Value {
    let mut structured = json!({
        "from": [{ "collectionId": collection }],
        "orderBy": [{
            "field": { "fieldPath": FIELD_TIMESTAMP },
            "direction": "ASCENDING"
        }]
    });
    if let Query::After(ts) = query {
        structured["where"] = json!({
            "fieldFilter": {
                "field": { "fieldPath": FIELD_TIMESTAMP },
                "op": "GREATER_THAN",
                "value": { "integerValue": ts.to_string() }
            }
        });
    }
    json!({ "structuredQuery": structured })
}

enum FieldError {
    WrongType,
}

fn integer_field(fields: &HashMap<String, Value>, name: &str) -> Result<i64, FieldError> {
    let Some(value) = fields.get(name) else {
        return Ok(0);
    };
    if value.get("nullValue").is_some() {
        return Ok(0);
    }
    value
        .get("integerValue")
        .and_then(|v| match v {
            Value::String(s) => s.parse::<i64>().ok(),
            Value::Number(n) => n.as_i64(),
            _ => None,
        })
        .ok_or(FieldError::WrongType)
}

fn float_field(fields: &HashMap<String, Value>, name: &str) -> Result<f64, FieldError> {
    let Some(value) = fields.get(name) else {
        return Ok(0.0);
    };
    if value.get("nullValue").is_some() {
        return Ok(0.0);
    }
    if let Some(v) = value.get("doubleValue").and_then(Value::as_f64) {
        return Ok(v);
    }
    integer_field(fields, name).map(|v| v as f64)
}

fn string_field(fields: &HashMap<String, Value>, name: &str) -> Result<String, FieldError> {
    let Some(value) = fields.get(name) else {
        return Ok(String::new());
    };
    if value.get("nullValue").is_some() {
        return Ok(String::new());
    }
    value
        .get("stringValue")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(FieldError::WrongType)
}

fn try_decode(doc: &Document) -> Result<Record, FieldError> {
    let fields = &doc.fields;
    let signal = integer_field(fields, "signalDbm")?;
    Ok(Record {
        id: doc.name.rsplit('/').next().map(str::to_string),
        latitude: float_field(fields, "latitude")?,
        longitude: float_field(fields, "longitude")?,
        signal_dbm: i32::try_from(signal).map_err(|_| FieldError::WrongType)?,
        timestamp: integer_field(fields, FIELD_TIMESTAMP)?,
        carrier: string_field(fields, "carrier")?,
    })
}

/// Absent fields decode to zero values, which the record filter later drops.
/// A field present with the wrong type rejects the whole document.
fn decode_document(doc: &Document) -> Option<Record> {
    match try_decode(doc) {
        Ok(rec) => Some(rec),
        Err(FieldError::WrongType) => {
            debug!("skipping undecodable document {}", doc.name);
            None
        }
    }
}

pub fn decode_response(body: &[u8]) -> Result<Vec<Record>, FeedError> {
    let items: Vec<QueryItem> = serde_json::from_slice(body)?;
    Ok(items
        .iter()
        .filter_map(|item| item.document.as_ref())
        .filter_map(decode_document)
        .collect())
}

#[async_trait]
impl RecordSource for FirestoreSource {
    fn name(&self) -> &str {
        "firestore"
    }

    async fn fetch(&self, query: Query) -> Result<Vec<Record>, FeedError> {
        let token = self.credentials.bearer().await?;
        let resp = self
            .client
            .post(self.run_query_url())
            .bearer_auth(token)
            .json(&structured_query(&self.collection, query))
            .send()
            .await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        if !status.is_success() {
            return Err(FeedError::Status {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        decode_response(&body)
    }
}
