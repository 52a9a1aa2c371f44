use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Four decimal digits is roughly 11 m at the equator.
pub const DEFAULT_PRECISION: u32 = 4;
pub const MAX_PRECISION: u32 = 10;

fn scale(precision: u32) -> f64 {
    10f64.powi(precision as i32)
}

/// Round half away from zero to `precision` decimal digits.
pub fn round_coord(coord: f64, precision: u32) -> f64 {
    let factor = scale(precision);
    (coord * factor).round() / factor
}

/// Identity of a grid cell.
///
/// Holds the rounded coordinates themselves. Keys are equal exactly when the
/// rounded values are bit-identical, except that `-0.0` folds into `0.0`.
/// Ordering is the IEEE total order, so finite keys sort numerically.
#[derive(Debug, Clone, Copy)]
pub struct CellKey {
    lat: f64,
    lon: f64,
    precision: u32,
}

fn fold_zero(coord: f64) -> f64 {
    if coord == 0.0 {
        0.0
    } else {
        coord
    }
}

impl CellKey {
    pub fn from_coords(lat: f64, lon: f64, precision: u32) -> Self {
        Self {
            lat: fold_zero(round_coord(lat, precision)),
            lon: fold_zero(round_coord(lon, precision)),
            precision,
        }
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    /// GeoJSON order: longitude first.
    pub fn lon_lat(&self) -> [f64; 2] {
        [self.lon(), self.lat()]
    }
}

impl PartialEq for CellKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CellKey {}

impl PartialOrd for CellKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.lat
            .total_cmp(&other.lat)
            .then_with(|| self.lon.total_cmp(&other.lon))
            .then_with(|| self.precision.cmp(&other.precision))
    }
}

impl Hash for CellKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.lat.to_bits().hash(state);
        self.lon.to_bits().hash(state);
        self.precision.hash(state);
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.precision as usize;
        write!(f, "{:.p$},{:.p$}", self.lat(), self.lon(), p = p)
    }
}
