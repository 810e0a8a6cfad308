//! Cells and Target Selection
//!
//! A cell is one square of the corridor. It knows its fixed position, its
//! occupant (if any), the two exit potentials agents descend, and the
//! coordinates of its Moore neighbors.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{Result, SimError};
use crate::lattice::Lattice;

/// Grid coordinate as `(row, column)`.
pub type Coord = (usize, usize);

/// Heading of an agent along the corridor's exit axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    /// Walks toward column 0
    Left,
    /// Walks toward the last column
    Right,
}

impl Direction {
    /// Occupancy value used in snapshots: `-1` or `1`.
    pub fn value(self) -> i8 {
        match self {
            Direction::Left => -1,
            Direction::Right => 1,
        }
    }
}

impl TryFrom<i8> for Direction {
    type Error = SimError;

    fn try_from(value: i8) -> Result<Self> {
        match value {
            -1 => Ok(Direction::Left),
            1 => Ok(Direction::Right),
            other => Err(SimError::InvalidDirection(other)),
        }
    }
}

/// One square of the corridor.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    x: usize,
    y: usize,
    occupant: Option<Direction>,
    left_exit_distance: f64,
    right_exit_distance: f64,
    neighbors: Vec<Coord>,
}

impl Cell {
    /// Creates an empty cell with the given exit potentials.
    pub fn new(x: usize, y: usize, left_exit_distance: f64, right_exit_distance: f64) -> Self {
        Self {
            x,
            y,
            occupant: None,
            left_exit_distance,
            right_exit_distance,
            neighbors: Vec::with_capacity(8),
        }
    }

    pub fn x(&self) -> usize {
        self.x
    }

    pub fn y(&self) -> usize {
        self.y
    }

    pub fn position(&self) -> Coord {
        (self.x, self.y)
    }

    pub fn occupant(&self) -> Option<Direction> {
        self.occupant
    }

    /// Occupancy value: `0` empty, `-1` left-mover, `1` right-mover.
    pub fn value(&self) -> i8 {
        self.occupant.map_or(0, Direction::value)
    }

    pub fn is_empty(&self) -> bool {
        self.occupant.is_none()
    }

    /// A left-mover standing in the first column is about to leave the corridor.
    pub fn is_leaving_left(&self) -> bool {
        self.y == 0 && self.occupant == Some(Direction::Left)
    }

    /// A right-mover standing in the last column is about to leave the corridor.
    pub fn is_leaving_right(&self, len_y: usize) -> bool {
        self.y + 1 == len_y && self.occupant == Some(Direction::Right)
    }

    /// Places an agent in the cell. Fails if the cell already holds one.
    pub fn populate(&mut self, direction: Direction) -> Result<()> {
        if self.occupant.is_some() {
            return Err(SimError::CellOccupied {
                x: self.x,
                y: self.y,
            });
        }
        self.occupant = Some(direction);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.occupant = None;
    }

    pub fn neighbors(&self) -> &[Coord] {
        &self.neighbors
    }

    pub(crate) fn add_neighbor(&mut self, coord: Coord) {
        debug_assert!(self.neighbors.len() < 8, "max number of neighbors exceeded");
        self.neighbors.push(coord);
    }

    pub(crate) fn clear_neighbors(&mut self) {
        self.neighbors.clear();
    }

    pub fn left_exit_distance(&self) -> f64 {
        self.left_exit_distance
    }

    pub fn right_exit_distance(&self) -> f64 {
        self.right_exit_distance
    }

    /// Potential toward the exit an agent with `direction` is heading for.
    pub fn exit_distance(&self, direction: Direction) -> f64 {
        match direction {
            Direction::Left => self.left_exit_distance,
            Direction::Right => self.right_exit_distance,
        }
    }

    /// Same as [`Cell::exit_distance`] for a raw occupancy value.
    pub fn exit_distance_for_value(&self, value: i8) -> Result<f64> {
        Direction::try_from(value).map(|direction| self.exit_distance(direction))
    }

    /// Lowers the potential toward `direction`'s exit by `amount`, never below zero.
    ///
    /// Cells left behind by a moving agent become slightly cheaper, so later
    /// agents prefer to walk in someone's wake.
    pub(crate) fn lower_distance_to_exit(&mut self, direction: Direction, amount: f64) {
        let field = match direction {
            Direction::Left => &mut self.left_exit_distance,
            Direction::Right => &mut self.right_exit_distance,
        };
        *field = (*field - amount).max(0.0);
    }

    /// Picks the empty neighbor this cell's agent should step to.
    ///
    /// Candidates are empty neighbors with a strictly lower potential for the
    /// agent's own direction. A single candidate is returned outright. With
    /// several, each straight-ahead candidate (same row) is accepted with
    /// probability `p`; if none is accepted, one of the diagonal candidates is
    /// drawn uniformly. Returns `None` when the cell is empty or no neighbor
    /// improves on the current potential.
    pub fn best_neighbor<R: Rng + ?Sized>(
        &self,
        lattice: &Lattice,
        p: f64,
        rng: &mut R,
    ) -> Option<Coord> {
        let direction = self.occupant?;
        let current = self.exit_distance(direction);

        let empty: Vec<&Cell> = self
            .neighbors
            .iter()
            .map(|&coord| lattice.cell(coord))
            .filter(|neighbor| neighbor.is_empty())
            .collect();

        let min = empty
            .iter()
            .map(|neighbor| neighbor.exit_distance(direction))
            .fold(f64::INFINITY, f64::min);
        if min >= current {
            return None;
        }

        let improving: Vec<Coord> = empty
            .iter()
            .filter(|neighbor| neighbor.exit_distance(direction) < current)
            .map(|neighbor| neighbor.position())
            .collect();

        if let [only] = improving.as_slice() {
            return Some(*only);
        }

        let (straight, diagonal): (Vec<Coord>, Vec<Coord>) =
            improving.iter().partition(|&&(x, _)| x == self.x);

        for coord in straight {
            if rng.gen::<f64>() < p {
                return Some(coord);
            }
        }

        // Only reachable without a diagonal candidate if every straight move was rejected.
        diagonal
            .choose(rng)
            .or_else(|| improving.choose(rng))
            .copied()
    }
}
