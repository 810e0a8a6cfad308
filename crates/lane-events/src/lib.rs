//! Shared output types for the corridor lane-formation simulation.
//!
//! This crate contains pure data structures with no simulation logic. The engine
//! in `lane-core` produces them; renderers, plotters and persistence layers
//! consume them.

pub mod report;
pub mod snapshot;

// Re-export snapshot types
pub use snapshot::{generate_snapshot_id, LatticeSnapshot};

// Re-export report types
pub use report::{generate_run_id, RunParameters, RunReport, StepRecord};
