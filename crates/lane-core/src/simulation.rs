//! Simulation Loop
//!
//! Runs the corridor automaton one synchronous step at a time:
//!
//! 1. every agent picks a target from the same frozen configuration
//! 2. contested targets are resolved, one winner each
//! 3. granted moves are applied and the cells left behind decay
//! 4. the order parameter of the new configuration is recorded
//!
//! All randomness comes from the RNG the caller passes in, so a seeded RNG
//! reproduces a run exactly.

use std::collections::HashSet;

use lane_events::{RunParameters, RunReport, StepRecord};
use rand::Rng;
use tracing::{debug, error, info};

use crate::boundary::find_target;
use crate::cell::Coord;
use crate::conflict::{resolve_conflicts, Move, Proposal, Resolution};
use crate::error::{Result, SimError};
use crate::lattice::Lattice;
use crate::metric::{self, DEFAULT_BASELINE_TRIALS};

/// Potential decrement applied to a cell each time an agent leaves it.
pub const POTENTIAL_DECAY: f64 = 1e-5;

/// Upper bound on the step records reserved before a run starts.
const MAX_RESERVED_STEPS: usize = 4096;

/// Lifecycle of a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Lattice cloned and populated, no step taken yet
    Initialized,
    /// At least one step taken
    Running,
    /// A full run finished; no further steps are allowed
    Completed,
    /// A step or run failed; the lattice is left as it was before the failing
    /// step and no further steps are allowed
    Failed,
}

/// Tunable parameters of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOptions {
    /// Probability of preferring a straight-ahead move ("soberness")
    pub soberness: f64,
    /// Random corridors averaged for the `phi_0` baseline
    pub baseline_trials: usize,
    /// Record lattice snapshots during [`Simulation::run`]
    pub record_snapshots: bool,
    /// Record a snapshot every this many steps
    pub snapshot_interval: u64,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            soberness: 1.0,
            baseline_trials: DEFAULT_BASELINE_TRIALS,
            record_snapshots: true,
            snapshot_interval: 1,
        }
    }
}

impl SimulationOptions {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.soberness) {
            return Err(SimError::InvalidParameter(format!(
                "soberness must lie in [0, 1], got {}",
                self.soberness
            )));
        }
        if self.baseline_trials == 0 {
            return Err(SimError::InvalidParameter(
                "baseline_trials must be positive".to_string(),
            ));
        }
        if self.snapshot_interval == 0 {
            return Err(SimError::InvalidParameter(
                "snapshot_interval must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// A corridor simulation that exclusively owns its lattice.
#[derive(Debug)]
pub struct Simulation {
    corridor: Lattice,
    populated_cells: Vec<Coord>,
    population: usize,
    step: u64,
    phi_0: f64,
    options: SimulationOptions,
    phase: Phase,
}

impl Simulation {
    /// Starts a simulation on a private copy of `template`.
    ///
    /// The population is whatever `template` holds. The baseline `phi_0` is
    /// computed from fresh random corridors of the same size and population
    /// using `rng`.
    pub fn new<R: Rng + ?Sized>(
        template: &Lattice,
        options: SimulationOptions,
        rng: &mut R,
    ) -> Result<Self> {
        options.validate()?;
        let phi_0 = metric::baseline_phi(
            template.len_x(),
            template.len_y(),
            template.population(),
            options.baseline_trials,
            rng,
        )?;
        Self::with_baseline(template, options, phi_0)
    }

    /// Starts a simulation with an already known baseline.
    pub fn with_baseline(template: &Lattice, options: SimulationOptions, phi_0: f64) -> Result<Self> {
        options.validate()?;
        metric::check_baseline(phi_0);

        let corridor = template.clone();
        let populated_cells = corridor.populated_cells();
        let population = populated_cells.len();

        info!(
            rows = corridor.len_x(),
            columns = corridor.len_y(),
            agents = population,
            soberness = options.soberness,
            phi_0,
            "simulation initialized"
        );

        Ok(Self {
            corridor,
            populated_cells,
            population,
            step: 0,
            phi_0,
            options,
            phase: Phase::Initialized,
        })
    }

    /// Builds an empty `len_x × len_y` corridor, places `agents` at random and
    /// starts a simulation on it.
    pub fn populated<R: Rng + ?Sized>(
        len_x: usize,
        len_y: usize,
        agents: usize,
        options: SimulationOptions,
        rng: &mut R,
    ) -> Result<Self> {
        let mut template = Lattice::new(len_x, len_y)?;
        template.populate_corridor(agents, rng)?;
        Self::new(&template, options, rng)
    }

    pub fn lattice(&self) -> &Lattice {
        &self.corridor
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Population fixed at initialization.
    pub fn population(&self) -> usize {
        self.population
    }

    /// Steps taken so far.
    pub fn steps(&self) -> u64 {
        self.step
    }

    pub fn phi_0(&self) -> f64 {
        self.phi_0
    }

    pub fn options(&self) -> &SimulationOptions {
        &self.options
    }

    /// Occupied cells as of the last completed step.
    pub fn populated_cells(&self) -> &[Coord] {
        &self.populated_cells
    }

    /// Collects every agent's target from the current, unmodified corridor.
    fn plan<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Proposal> {
        self.populated_cells
            .iter()
            .filter_map(|&source| {
                let direction = self.corridor.cell(source).occupant()?;
                let target = find_target(&self.corridor, source, self.options.soberness, rng);
                Some(Proposal {
                    source,
                    destination: target.destination(source),
                    direction,
                    crosses_boundary: target.crosses_boundary(),
                })
            })
            .collect()
    }

    /// Rejects a move set that would lose or duplicate an agent.
    ///
    /// Each source must hold an agent of the move's direction and appear once.
    /// Each destination must be in bounds, claimed once, and either empty or
    /// vacated by another move of the same set.
    fn check_moves(&self, moves: &[Move]) -> Result<()> {
        let mut sources = HashSet::with_capacity(moves.len());
        for m in moves {
            self.corridor.check_bounds(m.source)?;
            if self.corridor.cell(m.source).occupant() != Some(m.direction) {
                return Err(SimError::InvalidParameter(format!(
                    "no {:?} agent at ({}, {}) to move",
                    m.direction, m.source.0, m.source.1
                )));
            }
            if !sources.insert(m.source) {
                return Err(SimError::InvalidParameter(format!(
                    "agent at ({}, {}) moved twice in one step",
                    m.source.0, m.source.1
                )));
            }
        }

        let mut claimed = HashSet::with_capacity(moves.len());
        for m in moves {
            self.corridor.check_bounds(m.destination)?;
            let (x, y) = m.destination;
            let held = !self.corridor.cell(m.destination).is_empty();
            if !claimed.insert(m.destination) || (held && !sources.contains(&m.destination)) {
                return Err(SimError::CellOccupied { x, y });
            }
        }
        Ok(())
    }

    /// Applies resolved moves: every source is vacated before any destination
    /// is filled, so the order of `moves` does not matter. Nothing is touched
    /// unless the whole set passes [`Self::check_moves`].
    fn execute(&mut self, moves: &[Move]) -> Result<()> {
        self.check_moves(moves)?;
        for m in moves {
            let source = self.corridor.cell_mut(m.source);
            if !m.is_stay() {
                source.lower_distance_to_exit(m.direction, POTENTIAL_DECAY);
            }
            source.clear();
        }
        for m in moves {
            self.corridor.populate(m.destination, m.direction)?;
        }
        Ok(())
    }

    /// Executes `moves`, halting the simulation if they cannot be applied.
    fn apply(&mut self, moves: &[Move]) -> Result<()> {
        if let Err(e) = self.execute(moves) {
            error!(step = self.step + 1, error = %e, "step could not be applied");
            self.phase = Phase::Failed;
            return Err(e);
        }
        Ok(())
    }

    fn ensure_steppable(&self) -> Result<()> {
        match self.phase {
            Phase::Completed => Err(SimError::AlreadyCompleted { steps: self.step }),
            Phase::Failed => Err(SimError::Halted { steps: self.step }),
            Phase::Initialized | Phase::Running => Ok(()),
        }
    }

    /// Advances the corridor by one synchronous step.
    ///
    /// A step either applies completely or not at all; a failed step halts
    /// the simulation.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<StepRecord> {
        self.ensure_steppable()?;
        self.phase = Phase::Running;

        let proposals = self.plan(rng);
        let resolution: Resolution = resolve_conflicts(&proposals, rng);
        self.apply(&resolution.moves)?;
        self.populated_cells = self.corridor.populated_cells();
        self.step += 1;

        let phi = metric::order_parameter(&self.corridor);
        let record = StepRecord {
            step: self.step,
            phi,
            phi_reduced: metric::reduce(phi, self.phi_0),
            moves: resolution.moved(),
            conflicts: resolution.conflicts,
            boundary_crossings: resolution.boundary_crossings(),
        };

        debug!(
            step = record.step,
            moves = record.moves,
            conflicts = record.conflicts,
            crossings = record.boundary_crossings,
            phi_reduced = record.phi_reduced,
            "step complete"
        );

        Ok(record)
    }

    /// Fails if the number of agents differs from the initial population.
    pub fn check_conservation(&self) -> Result<()> {
        let found = self.corridor.population();
        if found != self.population {
            error!(
                expected = self.population,
                found, "population changed during run"
            );
            return Err(SimError::PopulationChanged {
                expected: self.population,
                found,
            });
        }
        Ok(())
    }

    fn parameters(&self, iterations: u64) -> RunParameters {
        RunParameters {
            rows: self.corridor.len_x(),
            columns: self.corridor.len_y(),
            agents: self.population,
            soberness: self.options.soberness,
            iterations,
            baseline_trials: self.options.baseline_trials,
            seed: None,
        }
    }

    /// Runs exactly `iterations` steps and completes the simulation.
    ///
    /// The report holds one [`StepRecord`] per step and, when enabled, a
    /// snapshot every `snapshot_interval` steps plus the final configuration.
    pub fn run<R: Rng + ?Sized>(&mut self, iterations: u64, rng: &mut R) -> Result<RunReport> {
        self.ensure_steppable()?;

        let mut report = RunReport::new(self.parameters(iterations), self.phi_0);
        report.steps.reserve(reserved_steps(iterations));

        for _ in 0..iterations {
            let record = self.step(rng)?;
            if self.options.record_snapshots && record.step % self.options.snapshot_interval == 0 {
                report.snapshots.push(self.corridor.snapshot(record.step));
            }
            report.steps.push(record);
        }

        if self.options.record_snapshots
            && report.final_snapshot().map(|s| s.step) != Some(self.step)
        {
            report.snapshots.push(self.corridor.snapshot(self.step));
        }

        if let Err(e) = self.check_conservation() {
            self.phase = Phase::Failed;
            return Err(e);
        }
        self.phase = Phase::Completed;

        info!(
            run_id = %report.run_id,
            steps = self.step,
            final_phi_reduced = ?report.steps.last().map(|s| s.phi_reduced),
            "simulation completed"
        );

        Ok(report)
    }
}

/// Step records to reserve up front; longer runs grow the vector as they go.
fn reserved_steps(iterations: u64) -> usize {
    usize::try_from(iterations).map_or(MAX_RESERVED_STEPS, |n| n.min(MAX_RESERVED_STEPS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Direction;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn options(soberness: f64) -> SimulationOptions {
        SimulationOptions {
            soberness,
            baseline_trials: 10,
            ..SimulationOptions::default()
        }
    }

    #[test]
    fn test_options_validation() {
        assert!(options(0.5).validate().is_ok());
        assert!(options(1.5).validate().is_err());
        assert!(options(-0.1).validate().is_err());

        let mut bad = options(0.5);
        bad.snapshot_interval = 0;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_template_is_not_mutated() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut template = Lattice::new(6, 12).unwrap();
        template.populate_corridor(20, &mut rng).unwrap();
        let before = template.clone();

        let mut sim = Simulation::new(&template, options(0.8), &mut rng).unwrap();
        sim.run(10, &mut rng).unwrap();

        assert_eq!(template, before);
        assert_ne!(sim.lattice(), &before);
    }

    #[test]
    fn test_phase_transitions() {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut sim = Simulation::populated(4, 8, 6, options(1.0), &mut rng).unwrap();
        assert_eq!(sim.phase(), Phase::Initialized);

        sim.step(&mut rng).unwrap();
        assert_eq!(sim.phase(), Phase::Running);

        sim.run(3, &mut rng).unwrap();
        assert_eq!(sim.phase(), Phase::Completed);
        assert_eq!(sim.steps(), 4);

        assert!(matches!(
            sim.step(&mut rng),
            Err(SimError::AlreadyCompleted { steps: 4 })
        ));
        assert!(sim.run(1, &mut rng).is_err());
    }

    #[test]
    fn test_zero_iterations() {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut sim = Simulation::populated(4, 8, 6, options(1.0), &mut rng).unwrap();
        let report = sim.run(0, &mut rng).unwrap();
        assert!(report.steps.is_empty());
        assert_eq!(report.snapshots.len(), 1);
        assert_eq!(report.snapshots[0].step, 0);
        assert_eq!(sim.phase(), Phase::Completed);
    }

    #[test]
    fn test_too_many_agents() {
        let mut rng = SmallRng::seed_from_u64(1);
        assert!(matches!(
            Simulation::populated(2, 2, 5, options(1.0), &mut rng),
            Err(SimError::TooManyAgents { agents: 5, .. })
        ));
    }

    #[test]
    fn test_conservation_every_step() {
        let mut rng = SmallRng::seed_from_u64(77);
        let mut sim = Simulation::populated(8, 16, 50, options(0.6), &mut rng).unwrap();
        for _ in 0..50 {
            sim.step(&mut rng).unwrap();
            assert_eq!(sim.lattice().population(), 50);
            assert_eq!(sim.populated_cells().len(), 50);
        }
        assert!(sim.check_conservation().is_ok());
    }

    #[test]
    fn test_decay_on_real_move_only() {
        let template =
            Lattice::from_occupancy(&[vec![0, 0, 0], vec![1, 0, 0], vec![0, 0, 0]]).unwrap();
        let mut sim = Simulation::with_baseline(&template, options(1.0), 0.0).unwrap();
        let mut rng = SmallRng::seed_from_u64(2);

        let record = sim.step(&mut rng).unwrap();
        assert_eq!(record.moves, 1);
        let origin = sim.lattice().cell((1, 0));
        assert!(origin.is_empty());
        assert_eq!(origin.right_exit_distance(), 3.0 - POTENTIAL_DECAY);
        assert_eq!(origin.left_exit_distance(), 0.0);
        assert_eq!(sim.lattice().cell((1, 1)).occupant(), Some(Direction::Right));
    }

    #[test]
    fn test_blocked_agent_does_not_decay() {
        // Every lower-potential neighbor of the right-mover is occupied.
        let template =
            Lattice::from_occupancy(&[vec![0, -1, -1], vec![1, -1, -1], vec![0, -1, -1]]).unwrap();
        let mut sim = Simulation::with_baseline(&template, options(1.0), 0.0).unwrap();
        let mut rng = SmallRng::seed_from_u64(4);

        sim.step(&mut rng).unwrap();
        let origin = sim.lattice().cell((1, 0));
        assert_eq!(origin.occupant(), Some(Direction::Right));
        assert_eq!(origin.right_exit_distance(), 3.0);
        assert_eq!(sim.lattice().population(), 7);
    }

    #[test]
    fn test_run_records_snapshots_at_interval() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut opts = options(0.9);
        opts.snapshot_interval = 4;
        let mut sim = Simulation::populated(5, 10, 12, opts, &mut rng).unwrap();
        let report = sim.run(10, &mut rng).unwrap();

        let steps: Vec<u64> = report.snapshots.iter().map(|s| s.step).collect();
        assert_eq!(steps, vec![4, 8, 10]);
        assert_eq!(report.steps.len(), 10);
        assert_eq!(report.parameters.agents, 12);
        assert!(report.snapshots.iter().all(|s| s.population() == 12));
    }

    #[test]
    fn test_run_without_snapshots() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut opts = options(0.9);
        opts.record_snapshots = false;
        let mut sim = Simulation::populated(5, 10, 12, opts, &mut rng).unwrap();
        let report = sim.run(5, &mut rng).unwrap();
        assert!(report.snapshots.is_empty());
        assert_eq!(report.phi_reduced_series().len(), 5);
    }

    fn walk(source: Coord, destination: Coord, direction: Direction) -> Move {
        Move {
            source,
            destination,
            direction,
            crosses_boundary: false,
        }
    }

    #[test]
    fn test_colliding_moves_leave_lattice_untouched() {
        // The left-mover at (1, 2) stays put, but (1, 1) is sent onto it.
        let template =
            Lattice::from_occupancy(&[vec![1, 0, 0], vec![0, 1, -1], vec![0, 0, 0]]).unwrap();
        let mut sim = Simulation::with_baseline(&template, options(1.0), 0.0).unwrap();
        let before = sim.lattice().clone();

        let moves = vec![
            walk((0, 0), (0, 1), Direction::Right),
            walk((1, 1), (1, 2), Direction::Right),
            walk((1, 2), (1, 2), Direction::Left),
        ];
        assert!(matches!(
            sim.apply(&moves),
            Err(SimError::CellOccupied { x: 1, y: 2 })
        ));
        assert_eq!(sim.lattice(), &before);
        assert_eq!(sim.lattice().population(), 3);
        assert_eq!(sim.phase(), Phase::Failed);

        let mut rng = SmallRng::seed_from_u64(6);
        assert!(matches!(
            sim.step(&mut rng),
            Err(SimError::Halted { steps: 0 })
        ));
        assert!(matches!(
            sim.run(5, &mut rng),
            Err(SimError::Halted { .. })
        ));
        assert_eq!(sim.lattice(), &before);
    }

    #[test]
    fn test_rejects_unaccounted_moves() {
        let template =
            Lattice::from_occupancy(&[vec![1, 0, 0], vec![0, 0, 0], vec![1, 0, 0]]).unwrap();
        let sim = Simulation::with_baseline(&template, options(1.0), 0.0).unwrap();

        // Two agents granted the same empty cell.
        assert!(matches!(
            sim.check_moves(&[
                walk((0, 0), (1, 1), Direction::Right),
                walk((2, 0), (1, 1), Direction::Right),
            ]),
            Err(SimError::CellOccupied { x: 1, y: 1 })
        ));
        // Nobody at the source.
        assert!(sim
            .check_moves(&[walk((1, 0), (1, 1), Direction::Right)])
            .is_err());
        // Wrong heading for the agent at the source.
        assert!(sim
            .check_moves(&[walk((0, 0), (0, 1), Direction::Left)])
            .is_err());
        // Same agent moved twice.
        assert!(sim
            .check_moves(&[
                walk((0, 0), (0, 1), Direction::Right),
                walk((0, 0), (1, 1), Direction::Right),
            ])
            .is_err());
        assert!(matches!(
            sim.check_moves(&[walk((0, 0), (0, 3), Direction::Right)]),
            Err(SimError::OutOfBounds { x: 0, y: 3, .. })
        ));

        // Moves into empty cells alongside stays are fine.
        assert!(sim
            .check_moves(&[
                walk((0, 0), (0, 1), Direction::Right),
                walk((2, 0), (2, 0), Direction::Right),
            ])
            .is_ok());
    }

    #[test]
    fn test_lost_agent_fails_conservation() {
        let mut rng = SmallRng::seed_from_u64(9);
        let mut sim = Simulation::populated(4, 8, 6, options(1.0), &mut rng).unwrap();
        let lost = sim.populated_cells()[0];
        sim.corridor.clear(lost).unwrap();

        assert!(matches!(
            sim.check_conservation(),
            Err(SimError::PopulationChanged {
                expected: 6,
                found: 5
            })
        ));
        assert!(matches!(
            sim.run(3, &mut rng),
            Err(SimError::PopulationChanged {
                expected: 6,
                found: 5
            })
        ));
        assert_eq!(sim.phase(), Phase::Failed);
        assert!(matches!(
            sim.step(&mut rng),
            Err(SimError::Halted { steps: 3 })
        ));
    }

    #[test]
    fn test_reserved_steps_are_capped() {
        assert_eq!(reserved_steps(0), 0);
        assert_eq!(reserved_steps(300), 300);
        assert_eq!(reserved_steps(u64::MAX), MAX_RESERVED_STEPS);
        assert_eq!(reserved_steps(100_000_000_000), MAX_RESERVED_STEPS);
    }

    #[test]
    fn test_halted_simulation_rejects_long_run() {
        // (0, 2) is held by an agent with no move of its own.
        let template = Lattice::from_occupancy(&[vec![1, 0, -1], vec![0, 0, 0]]).unwrap();
        let mut sim = Simulation::with_baseline(&template, options(1.0), 0.0).unwrap();
        let mut rng = SmallRng::seed_from_u64(2);
        assert!(sim.apply(&[walk((0, 0), (0, 2), Direction::Right)]).is_err());
        assert!(matches!(
            sim.run(u64::MAX, &mut rng),
            Err(SimError::Halted { steps: 0 })
        ));
    }
}
