//! Snapshot Types
//!
//! A snapshot is the occupancy of every cell of the corridor at one step:
//! `-1` for a left-mover, `1` for a right-mover, `0` for an empty cell.

use serde::{Deserialize, Serialize};

/// Generates a snapshot ID with the given step number.
pub fn generate_snapshot_id(step: u64) -> String {
    format!("snap_{:06}", step)
}

/// Occupancy grid of the corridor after a step, stored row by row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatticeSnapshot {
    pub snapshot_id: String,
    /// Step after which the snapshot was taken (0 = initial state)
    pub step: u64,
    pub rows: usize,
    pub columns: usize,
    pub occupancy: Vec<Vec<i8>>,
}

impl LatticeSnapshot {
    /// Creates a snapshot from a row-major occupancy grid.
    pub fn new(step: u64, occupancy: Vec<Vec<i8>>) -> Self {
        let rows = occupancy.len();
        let columns = occupancy.first().map_or(0, Vec::len);
        Self {
            snapshot_id: generate_snapshot_id(step),
            step,
            rows,
            columns,
            occupancy,
        }
    }

    /// Occupancy value at `(row, column)`, if inside the grid.
    pub fn get(&self, row: usize, column: usize) -> Option<i8> {
        self.occupancy.get(row).and_then(|r| r.get(column)).copied()
    }

    /// Number of occupied cells.
    pub fn population(&self) -> usize {
        self.occupancy
            .iter()
            .flatten()
            .filter(|&&value| value != 0)
            .count()
    }

    /// Number of left-movers and right-movers, in that order.
    pub fn direction_counts(&self) -> (usize, usize) {
        self.occupancy
            .iter()
            .flatten()
            .fold((0, 0), |(left, right), &value| match value {
                -1 => (left + 1, right),
                1 => (left, right + 1),
                _ => (left, right),
            })
    }

    /// Serializes the snapshot to compact JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes a snapshot from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
