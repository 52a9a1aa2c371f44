use std::collections::btree_map::{self, Entry};
use std::collections::BTreeMap;

use serde::Serialize;

use crate::grid::{CellKey, DEFAULT_PRECISION};
use crate::record::{is_valid, Record};

/// Counters from one merge pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeStats {
    pub fetched: usize,
    pub rejected: usize,
    pub inserted: usize,
    pub replaced: usize,
    pub kept: usize,
}

impl MergeStats {
    pub fn accepted(&self) -> usize {
        self.fetched - self.rejected
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Inserted,
    Replaced,
    Kept,
}

/// Strongest record per grid cell plus the high-watermark.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateState {
    cells: BTreeMap<CellKey, Record>,
    watermark: i64,
    precision: u32,
}

impl Default for AggregateState {
    fn default() -> Self {
        Self::new(DEFAULT_PRECISION)
    }
}

impl AggregateState {
    pub fn new(precision: u32) -> Self {
        Self {
            cells: BTreeMap::new(),
            watermark: 0,
            precision,
        }
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    pub fn watermark(&self) -> i64 {
        self.watermark
    }

    /// Raise the watermark; lower values are ignored.
    pub fn advance_watermark(&mut self, ts: i64) {
        self.watermark = self.watermark.max(ts);
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, key: &CellKey) -> Option<&Record> {
        self.cells.get(key)
    }

    /// Cells in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, CellKey, Record> {
        self.cells.iter()
    }

    pub fn key_for(&self, rec: &Record) -> CellKey {
        CellKey::from_coords(rec.latitude, rec.longitude, self.precision)
    }

    /// Fold freshly fetched records in. Invalid records are dropped and do
    /// not move the watermark; every accepted record does, whether or not it
    /// wins its cell.
    pub fn merge<I>(&mut self, records: I) -> MergeStats
    where
        I: IntoIterator<Item = Record>,
    {
        let mut stats = MergeStats::default();
        for rec in records {
            stats.fetched += 1;
            if !is_valid(&rec) {
                stats.rejected += 1;
                continue;
            }
            match self.place(rec) {
                Placement::Inserted => stats.inserted += 1,
                Placement::Replaced => stats.replaced += 1,
                Placement::Kept => stats.kept += 1,
            }
        }
        stats
    }

    /// Put back a record recovered from a prior artifact. Skips the validity
    /// filter but still obeys strongest-wins.
    pub fn restore(&mut self, rec: Record) {
        self.place(rec);
    }

    fn place(&mut self, rec: Record) -> Placement {
        let key = self.key_for(&rec);
        let ts = rec.timestamp;
        let placement = match self.cells.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(rec);
                Placement::Inserted
            }
            Entry::Occupied(mut slot) => {
                if rec.signal_dbm > slot.get().signal_dbm {
                    slot.insert(rec);
                    Placement::Replaced
                } else {
                    Placement::Kept
                }
            }
        };
        self.advance_watermark(ts);
        placement
    }
}
