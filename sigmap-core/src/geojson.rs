use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::aggregate::AggregateState;
use crate::record::Record;

const FEATURE_COLLECTION: &str = "FeatureCollection";
const FEATURE: &str = "Feature";
const POINT: &str = "Point";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: String,
    pub geometry: Geometry,
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: String,
    /// `[longitude, latitude]`
    pub coordinates: [f64; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Properties {
    pub signal_dbm: i32,
    pub timestamp: i64,
    #[serde(default)]
    pub carrier: String,
}

impl FeatureCollection {
    /// One point per cell, placed at the quantized cell coordinates.
    pub fn from_state(state: &AggregateState) -> Self {
        let features = state
            .iter()
            .map(|(key, rec)| Feature {
                kind: FEATURE.to_string(),
                geometry: Geometry {
                    kind: POINT.to_string(),
                    coordinates: key.lon_lat(),
                },
                properties: Properties {
                    signal_dbm: rec.signal_dbm,
                    timestamp: rec.timestamp,
                    carrier: rec.carrier.clone(),
                },
            })
            .collect();
        Self {
            kind: FEATURE_COLLECTION.to_string(),
            features,
        }
    }
}

impl Feature {
    pub fn to_record(&self) -> Record {
        let [lon, lat] = self.geometry.coordinates;
        Record::new(lat, lon, self.properties.signal_dbm, self.properties.timestamp)
            .with_carrier(self.properties.carrier.clone())
    }
}

#[derive(Deserialize)]
struct LooseCollection {
    #[serde(default)]
    features: Option<Vec<Value>>,
}

/// Result of reading a previously written collection.
#[derive(Debug, Default)]
pub struct ParsedFeatures {
    pub records: Vec<Record>,
    pub skipped: usize,
}

/// Parse a collection, skipping individual features with the wrong shape.
/// `"features": null` reads as empty.
pub fn parse_features(bytes: &[u8]) -> serde_json::Result<ParsedFeatures> {
    let loose: LooseCollection = serde_json::from_slice(bytes)?;
    let mut out = ParsedFeatures::default();
    for value in loose.features.unwrap_or_default() {
        match serde_json::from_value::<Feature>(value) {
            Ok(feature) => out.records.push(feature.to_record()),
            Err(err) => {
                debug!("skipping malformed feature: {}", err);
                out.skipped += 1;
            }
        }
    }
    Ok(out)
}
