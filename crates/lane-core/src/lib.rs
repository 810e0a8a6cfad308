//! Corridor lane-formation engine.
//!
//! A stochastic cellular automaton of two crowds walking in opposite
//! directions through a corridor whose ends recycle agents to the other side.
//! Agents descend an exit potential greedily; over time they self-organize
//! into same-direction lanes, which the order parameter in [`metric`] tracks.
//!
//! # Modules
//!
//! - [`lattice`]: grid, Moore neighbor graph, random placement
//! - [`cell`]: cell state and greedy target selection
//! - [`boundary`]: periodic re-entry at the corridor ends
//! - [`conflict`]: one winner per contested cell
//! - [`simulation`]: synchronous steps and full runs
//! - [`metric`]: order parameter and its random baseline
//! - [`config`]: TOML run configuration

pub mod boundary;
pub mod cell;
pub mod config;
pub mod conflict;
pub mod error;
pub mod lattice;
pub mod metric;
pub mod simulation;

pub use cell::{Cell, Coord, Direction};
pub use config::{Config, ConfigError};
pub use error::{Result, SimError};
pub use lattice::Lattice;
pub use simulation::{Phase, Simulation, SimulationOptions, POTENTIAL_DECAY};

pub use lane_events::{LatticeSnapshot, RunParameters, RunReport, StepRecord};
