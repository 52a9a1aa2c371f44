//! Grid aggregation of signal-strength readings.
//!
//! Readings are snapped to a fixed-precision lat/lon grid. Each cell keeps its
//! strongest reading, and the newest timestamp seen is tracked so the next run
//! only fetches what arrived since. State round-trips through a GeoJSON
//! artifact plus a plain-text watermark file.

pub mod aggregate;
pub mod artifact;
pub mod config;
pub mod error;
pub mod geojson;
pub mod grid;
pub mod record;

pub use aggregate::{AggregateState, MergeStats};
pub use artifact::{load_prior, persist, publish, read_watermark, render_artifact, OutputPaths};
pub use config::{expand_tilde, Config, FeedConfig, FirestoreFeed, JsonlFeed};
pub use error::{Error, Result};
pub use geojson::{Feature, FeatureCollection};
pub use grid::{round_coord, CellKey, DEFAULT_PRECISION};
pub use record::{is_valid, Record};
