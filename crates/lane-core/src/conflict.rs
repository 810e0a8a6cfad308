//! Conflict Resolution
//!
//! Agents choose their targets independently, so several may claim the same
//! cell in one step. Exactly one claimant wins each contested cell; every
//! other claimant stays where it was.

use std::collections::BTreeMap;

use rand::Rng;

use crate::cell::{Coord, Direction};

/// A target an agent asked for during planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Proposal {
    pub source: Coord,
    pub destination: Coord,
    pub direction: Direction,
    pub crosses_boundary: bool,
}

impl Proposal {
    /// An agent that does not want to move.
    pub fn stay(source: Coord, direction: Direction) -> Self {
        Self {
            source,
            destination: source,
            direction,
            crosses_boundary: false,
        }
    }
}

/// A move granted by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub source: Coord,
    pub destination: Coord,
    pub direction: Direction,
    pub crosses_boundary: bool,
}

impl Move {
    pub fn is_stay(&self) -> bool {
        self.source == self.destination
    }
}

impl From<Proposal> for Move {
    fn from(proposal: Proposal) -> Self {
        Self {
            source: proposal.source,
            destination: proposal.destination,
            direction: proposal.direction,
            crosses_boundary: proposal.crosses_boundary,
        }
    }
}

/// Outcome of resolving one step's proposals.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// One move per proposing agent; destinations are pairwise distinct
    pub moves: Vec<Move>,
    /// Destinations claimed by more than one agent
    pub conflicts: usize,
}

impl Resolution {
    /// Number of agents that change cell.
    pub fn moved(&self) -> usize {
        self.moves.iter().filter(|m| !m.is_stay()).count()
    }

    pub fn boundary_crossings(&self) -> usize {
        self.moves.iter().filter(|m| m.crosses_boundary).count()
    }
}

/// Grants at most one claimant per destination.
///
/// Proposals are grouped by destination in coordinate order, so a seeded RNG
/// reproduces the same winners. An agent proposing to stay always keeps its own
/// cell; otherwise the winner of a contested cell is drawn uniformly.
pub fn resolve_conflicts<R: Rng + ?Sized>(proposals: &[Proposal], rng: &mut R) -> Resolution {
    let mut by_destination: BTreeMap<Coord, Vec<Proposal>> = BTreeMap::new();
    for proposal in proposals {
        by_destination
            .entry(proposal.destination)
            .or_default()
            .push(*proposal);
    }

    let mut resolution = Resolution {
        moves: Vec::with_capacity(proposals.len()),
        conflicts: 0,
    };

    for (_, claimants) in by_destination {
        if let [only] = claimants.as_slice() {
            resolution.moves.push(Move::from(*only));
            continue;
        }

        resolution.conflicts += 1;
        let winner = claimants
            .iter()
            .position(|p| p.source == p.destination)
            .unwrap_or_else(|| rng.gen_range(0..claimants.len()));

        for (i, claimant) in claimants.iter().enumerate() {
            if i == winner {
                resolution.moves.push(Move::from(*claimant));
            } else {
                resolution
                    .moves
                    .push(Move::from(Proposal::stay(claimant.source, claimant.direction)));
            }
        }
    }

    resolution
}
