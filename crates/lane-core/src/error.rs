//! Error Types
//!
//! Every condition here aborts a run: they signal a defect in the caller or in
//! the engine, never an expected outcome of a step.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised by the corridor engine.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("cannot place {agents} agents on a lattice with {cells} free cells")]
    TooManyAgents { agents: usize, cells: usize },

    #[error("cell ({x}, {y}) is already occupied")]
    CellOccupied { x: usize, y: usize },

    #[error("invalid direction value {0}, expected -1 or 1")]
    InvalidDirection(i8),

    #[error("invalid occupancy value {value} at ({x}, {y}), expected -1, 0 or 1")]
    InvalidOccupancy { x: usize, y: usize, value: i8 },

    #[error("cell ({x}, {y}) lies outside the {rows}x{columns} lattice")]
    OutOfBounds {
        x: usize,
        y: usize,
        rows: usize,
        columns: usize,
    },

    #[error("population changed during run: started with {expected}, ended with {found}")]
    PopulationChanged { expected: usize, found: usize },

    #[error("simulation already completed after {steps} steps")]
    AlreadyCompleted { steps: u64 },

    #[error("simulation halted by an earlier failure after {steps} steps")]
    Halted { steps: u64 },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, SimError>;
