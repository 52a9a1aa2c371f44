use serde::{Deserialize, Serialize};

/// One signal observation as it comes off the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub signal_dbm: i32,
    pub timestamp: i64,
    #[serde(default)]
    pub carrier: String,
}

impl Record {
    pub fn new(latitude: f64, longitude: f64, signal_dbm: i32, timestamp: i64) -> Self {
        Self {
            id: None,
            latitude,
            longitude,
            signal_dbm,
            timestamp,
            carrier: String::new(),
        }
    }

    pub fn with_carrier(mut self, carrier: impl Into<String>) -> Self {
        self.carrier = carrier.into();
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Zero in any of latitude, longitude or signal marks a missing reading.
///
/// This also rejects genuine readings on the equator, on the prime meridian
/// and at exactly 0 dBm.
pub fn is_valid(rec: &Record) -> bool {
    !(rec.latitude == 0.0 || rec.longitude == 0.0 || rec.signal_dbm == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_any_zero_field() {
        assert!(is_valid(&Record::new(37.1, -122.5, -80, 1)));
        assert!(!is_valid(&Record::new(0.0, 10.0, -70, 1)));
        assert!(!is_valid(&Record::new(37.1, 0.0, -70, 1)));
        assert!(!is_valid(&Record::new(37.1, -122.5, 0, 1)));
        assert!(!is_valid(&Record::new(-0.0, 10.0, -70, 1)));
    }

    #[test]
    fn no_bounds_check() {
        assert!(is_valid(&Record::new(123.0, 500.0, 12, 1)));
    }

    #[test]
    fn decodes_without_carrier_or_id() {
        let rec: Record = serde_json::from_str(
            r#"{"latitude":1.5,"longitude":2.5,"signalDbm":-90,"timestamp":7}"#,
        )
        .unwrap();
        assert_eq!(rec, Record::new(1.5, 2.5, -90, 7));
        let text = serde_json::to_string(&rec).unwrap();
        assert!(!text.contains("\"id\""));
    }
}
