//! Corridor Lattice
//!
//! Owns every cell of a `len_x × len_y` corridor and the Moore neighbor graph
//! between them. Agents walk along the column axis: left-movers toward column
//! 0, right-movers toward column `len_y - 1`. The graph has no wraparound
//! links; crossing an end is handled by [`crate::boundary`].

use std::fmt;

use lane_events::LatticeSnapshot;
use rand::seq::{index, SliceRandom};
use rand::Rng;

use crate::cell::{Cell, Coord, Direction};
use crate::error::{Result, SimError};

/// Returns the in-bounds coordinates around `(x, y)`, excluding itself.
pub fn neighbor_coords(x: usize, y: usize, len_x: usize, len_y: usize) -> Vec<Coord> {
    let mut coords = Vec::with_capacity(8);
    for nx in x.saturating_sub(1)..=(x + 1).min(len_x.saturating_sub(1)) {
        for ny in y.saturating_sub(1)..=(y + 1).min(len_y.saturating_sub(1)) {
            if (nx, ny) != (x, y) {
                coords.push((nx, ny));
            }
        }
    }
    coords
}

/// A rectangular corridor of cells, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Lattice {
    len_x: usize,
    len_y: usize,
    cells: Vec<Cell>,
}

impl Lattice {
    /// Creates an empty corridor with `len_x` rows and `len_y` columns.
    ///
    /// The potential toward the left exit is the column index, the potential
    /// toward the right exit is `len_y - column`.
    pub fn new(len_x: usize, len_y: usize) -> Result<Self> {
        if len_x == 0 || len_y == 0 {
            return Err(SimError::InvalidParameter(format!(
                "lattice dimensions must be positive, got {}x{}",
                len_x, len_y
            )));
        }

        let n_cells = len_x.checked_mul(len_y).ok_or_else(|| {
            SimError::InvalidParameter(format!(
                "lattice of {}x{} cells is too large",
                len_x, len_y
            ))
        })?;

        let mut cells = Vec::with_capacity(n_cells);
        for x in 0..len_x {
            for y in 0..len_y {
                cells.push(Cell::new(x, y, y as f64, (len_y - y) as f64));
            }
        }

        let mut lattice = Self { len_x, len_y, cells };
        lattice.load_neighbours();
        Ok(lattice)
    }

    /// Builds a corridor from an occupancy grid of `-1`, `0` and `1` values.
    pub fn from_occupancy(rows: &[Vec<i8>]) -> Result<Self> {
        let len_x = rows.len();
        let len_y = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().find(|row| row.len() != len_y) {
            return Err(SimError::InvalidParameter(format!(
                "ragged occupancy grid: expected {} columns, found a row with {}",
                len_y,
                bad.len()
            )));
        }

        let mut lattice = Self::new(len_x, len_y)?;
        for (x, row) in rows.iter().enumerate() {
            for (y, &value) in row.iter().enumerate() {
                if value == 0 {
                    continue;
                }
                let direction = Direction::try_from(value)
                    .map_err(|_| SimError::InvalidOccupancy { x, y, value })?;
                lattice.populate((x, y), direction)?;
            }
        }
        Ok(lattice)
    }

    /// Assigns every cell its neighbors. Called once after construction.
    fn load_neighbours(&mut self) {
        let (len_x, len_y) = (self.len_x, self.len_y);
        for cell in &mut self.cells {
            cell.clear_neighbors();
            for coord in neighbor_coords(cell.x(), cell.y(), len_x, len_y) {
                cell.add_neighbor(coord);
            }
        }
    }

    /// Number of rows.
    pub fn len_x(&self) -> usize {
        self.len_x
    }

    /// Number of columns; the exit axis.
    pub fn len_y(&self) -> usize {
        self.len_y
    }

    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn contains(&self, (x, y): Coord) -> bool {
        x < self.len_x && y < self.len_y
    }

    fn index(&self, (x, y): Coord) -> usize {
        x * self.len_y + y
    }

    pub(crate) fn check_bounds(&self, coord: Coord) -> Result<()> {
        if self.contains(coord) {
            Ok(())
        } else {
            Err(SimError::OutOfBounds {
                x: coord.0,
                y: coord.1,
                rows: self.len_x,
                columns: self.len_y,
            })
        }
    }

    /// Cell at `coord`.
    ///
    /// # Panics
    ///
    /// Panics if `coord` lies outside the lattice. Use [`Lattice::get`] for
    /// untrusted coordinates.
    pub fn cell(&self, coord: Coord) -> &Cell {
        &self.cells[self.index(coord)]
    }

    pub fn get(&self, coord: Coord) -> Option<&Cell> {
        if self.contains(coord) {
            Some(self.cell(coord))
        } else {
            None
        }
    }

    pub(crate) fn cell_mut(&mut self, coord: Coord) -> &mut Cell {
        let index = self.index(coord);
        &mut self.cells[index]
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    /// Places an agent heading in `direction` at `coord`.
    pub fn populate(&mut self, coord: Coord, direction: Direction) -> Result<()> {
        self.check_bounds(coord)?;
        self.cell_mut(coord).populate(direction)
    }

    /// Empties the cell at `coord`.
    pub fn clear(&mut self, coord: Coord) -> Result<()> {
        self.check_bounds(coord)?;
        self.cell_mut(coord).clear();
        Ok(())
    }

    /// Selects a cell uniformly at random.
    pub fn random_cell<R: Rng + ?Sized>(&self, rng: &mut R) -> &Cell {
        let x = rng.gen_range(0..self.len_x);
        let y = rng.gen_range(0..self.len_y);
        self.cell((x, y))
    }

    /// Finds where an agent leaving through one end re-enters at the other.
    ///
    /// With probability `p` the agent keeps its row if `(source_row,
    /// target_column)` is free. Otherwise the rows `source_row - 1 ..=
    /// source_row + 1` (clipped to the lattice) are tried in random order and
    /// the first empty cell of `target_column` wins. `None` means every
    /// candidate is occupied and the agent stays where it is.
    pub fn random_empty_edge_cell<R: Rng + ?Sized>(
        &self,
        target_column: usize,
        source_row: usize,
        p: f64,
        rng: &mut R,
    ) -> Option<Coord> {
        if !self.contains((source_row, target_column)) {
            return None;
        }

        let straight = (source_row, target_column);
        if rng.gen::<f64>() < p && self.cell(straight).is_empty() {
            return Some(straight);
        }

        let last_row = self.len_x - 1;
        let mut rows: Vec<usize> =
            (source_row.saturating_sub(1)..=(source_row + 1).min(last_row)).collect();
        rows.shuffle(rng);

        rows.into_iter()
            .map(|row| (row, target_column))
            .find(|&coord| self.cell(coord).is_empty())
    }

    /// Places `n` agents on distinct empty cells chosen uniformly at random.
    ///
    /// Directions are split evenly; with an odd `n` the extra agent is a
    /// right-mover.
    pub fn populate_corridor<R: Rng + ?Sized>(&mut self, n: usize, rng: &mut R) -> Result<()> {
        let empty: Vec<Coord> = self
            .cells
            .iter()
            .filter(|cell| cell.is_empty())
            .map(Cell::position)
            .collect();
        if n > empty.len() {
            return Err(SimError::TooManyAgents {
                agents: n,
                cells: empty.len(),
            });
        }

        for (i, pick) in index::sample(rng, empty.len(), n).into_iter().enumerate() {
            let direction = if i % 2 == 0 {
                Direction::Right
            } else {
                Direction::Left
            };
            self.populate(empty[pick], direction)?;
        }
        Ok(())
    }

    /// Coordinates of every occupied cell, in row-major order.
    pub fn populated_cells(&self) -> Vec<Coord> {
        self.cells
            .iter()
            .filter(|cell| !cell.is_empty())
            .map(Cell::position)
            .collect()
    }

    pub fn population(&self) -> usize {
        self.cells.iter().filter(|cell| !cell.is_empty()).count()
    }

    /// Fraction of occupied cells.
    pub fn density(&self) -> f64 {
        self.population() as f64 / self.n_cells() as f64
    }

    /// Occupancy values as rows of `-1`, `0`, `1`.
    pub fn occupancy(&self) -> Vec<Vec<i8>> {
        self.cells
            .chunks(self.len_y)
            .map(|row| row.iter().map(Cell::value).collect())
            .collect()
    }

    /// Captures the occupancy grid for renderers.
    pub fn snapshot(&self, step: u64) -> LatticeSnapshot {
        LatticeSnapshot::new(step, self.occupancy())
    }
}

impl fmt::Display for Lattice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.len_y) {
            let line: String = row
                .iter()
                .map(|cell| match cell.occupant() {
                    None => '.',
                    Some(Direction::Left) => '<',
                    Some(Direction::Right) => '>',
                })
                .collect();
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
