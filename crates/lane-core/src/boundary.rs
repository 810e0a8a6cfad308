//! Periodic Boundary
//!
//! The corridor has one open end per side of the column axis. An agent
//! stepping out through its exit is recycled to the opposite end instead of
//! being removed, so the population never changes.

use rand::Rng;

use crate::cell::{Coord, Direction};
use crate::lattice::Lattice;

/// Where an agent wants to go this step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// No improving move, or no free re-entry cell
    Stay,
    /// Step to an adjacent cell
    Neighbor(Coord),
    /// Leave through the exit and re-enter at the opposite end
    Recycle(Coord),
}

impl Target {
    /// Destination for an agent currently at `source`.
    pub fn destination(self, source: Coord) -> Coord {
        match self {
            Target::Stay => source,
            Target::Neighbor(coord) | Target::Recycle(coord) => coord,
        }
    }

    pub fn crosses_boundary(self) -> bool {
        matches!(self, Target::Recycle(_))
    }
}

/// Column an agent heading in `direction` re-enters at.
pub fn re_entry_column(direction: Direction, len_y: usize) -> usize {
    match direction {
        Direction::Left => len_y - 1,
        Direction::Right => 0,
    }
}

/// Picks the target of the agent at `coord`, applying the periodic boundary.
///
/// Agents standing on their exit column look for a free cell at the other end
/// of the corridor; everyone else descends the potential field through
/// [`crate::cell::Cell::best_neighbor`].
pub fn find_target<R: Rng + ?Sized>(
    lattice: &Lattice,
    coord: Coord,
    p: f64,
    rng: &mut R,
) -> Target {
    let cell = lattice.cell(coord);
    let Some(direction) = cell.occupant() else {
        return Target::Stay;
    };

    if cell.is_leaving_left() || cell.is_leaving_right(lattice.len_y()) {
        let column = re_entry_column(direction, lattice.len_y());
        return lattice
            .random_empty_edge_cell(column, cell.x(), p, rng)
            .map_or(Target::Stay, Target::Recycle);
    }

    cell.best_neighbor(lattice, p, rng)
        .map_or(Target::Stay, Target::Neighbor)
}
