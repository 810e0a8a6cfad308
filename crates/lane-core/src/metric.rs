//! Order Parameter
//!
//! Measures how strongly agents have segregated into same-direction lanes.
//! For each row with `c_L` left-movers and `c_R` right-movers,
//! `(c_L - c_R)² / (c_L + c_R)` is accumulated and the sum divided by the
//! population. Mixed rows contribute nothing; rows of a single direction
//! contribute their full share, so `phi` lies in `[0, 1]`.

use rand::Rng;
use tracing::warn;

use crate::cell::Direction;
use crate::error::{Result, SimError};
use crate::lattice::Lattice;

/// Number of random corridors averaged for the baseline.
pub const DEFAULT_BASELINE_TRIALS: usize = 100;

/// Left- and right-mover counts of every row.
pub fn row_counts(lattice: &Lattice) -> Vec<(usize, usize)> {
    let mut counts = vec![(0, 0); lattice.len_x()];
    for cell in lattice.cells() {
        let row = &mut counts[cell.x()];
        match cell.occupant() {
            Some(Direction::Left) => row.0 += 1,
            Some(Direction::Right) => row.1 += 1,
            None => {}
        }
    }
    counts
}

/// Raw order parameter `phi` of the current configuration.
pub fn order_parameter(lattice: &Lattice) -> f64 {
    let counts = row_counts(lattice);
    let population: usize = counts.iter().map(|(l, r)| l + r).sum();
    if population == 0 {
        return 0.0;
    }

    // Divide once so that fully separated rows sum to exactly N.
    let separation: f64 = counts
        .into_iter()
        .filter(|(l, r)| l + r > 0)
        .map(|(l, r)| {
            let diff = l as f64 - r as f64;
            diff * diff / (l + r) as f64
        })
        .sum();
    separation / population as f64
}

/// Mean `phi` of `trials` fresh random corridors with `agents` agents.
///
/// Each trial builds its own lattice, so no state is shared between trials or
/// with any running simulation.
pub fn baseline_phi<R: Rng + ?Sized>(
    len_x: usize,
    len_y: usize,
    agents: usize,
    trials: usize,
    rng: &mut R,
) -> Result<f64> {
    if trials == 0 {
        return Err(SimError::InvalidParameter(
            "baseline needs at least one trial".to_string(),
        ));
    }

    let mut total = 0.0;
    for _ in 0..trials {
        let mut corridor = Lattice::new(len_x, len_y)?;
        corridor.populate_corridor(agents, rng)?;
        total += order_parameter(&corridor);
    }
    Ok(total / trials as f64)
}

/// Normalizes `phi` against the random baseline: `(phi - phi_0) / (1 - phi_0)`.
///
/// Yields NaN only when `phi_0` is exactly 1, i.e. when even random placement
/// cannot mix rows (a single agent, or one agent per row). Any other baseline,
/// however close to 1, gives a finite value.
pub fn reduce(phi: f64, phi_0: f64) -> f64 {
    if phi_0 == 1.0 {
        return f64::NAN;
    }
    (phi - phi_0) / (1.0 - phi_0)
}

/// Logs when a baseline makes the reduced parameter meaningless.
pub(crate) fn check_baseline(phi_0: f64) {
    if phi_0 == 1.0 {
        warn!(phi_0, "degenerate baseline, reduced order parameter is undefined");
    }
}
