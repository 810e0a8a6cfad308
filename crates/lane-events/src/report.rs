//! Run Report Types
//!
//! Per-step records and the summary of a complete run. The `phi_reduced`
//! series is the segregation time series consumed by plotting and
//! persistence layers.

use serde::{Deserialize, Serialize};

use crate::LatticeSnapshot;

/// Generates a unique run ID.
pub fn generate_run_id() -> String {
    format!("run_{}", uuid::Uuid::new_v4().simple())
}

/// Parameters a run was executed with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunParameters {
    pub rows: usize,
    pub columns: usize,
    pub agents: usize,
    /// Probability of preferring a straight-ahead move
    pub soberness: f64,
    pub iterations: u64,
    pub baseline_trials: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl RunParameters {
    /// Fraction of cells occupied by agents.
    pub fn density(&self) -> f64 {
        let cells = self.rows * self.columns;
        if cells == 0 {
            0.0
        } else {
            self.agents as f64 / cells as f64
        }
    }
}

/// Outcome of a single synchronous step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// 1-based step index
    pub step: u64,
    /// Raw order parameter
    pub phi: f64,
    /// Order parameter normalized against the random baseline
    pub phi_reduced: f64,
    /// Agents that changed cell this step
    pub moves: usize,
    /// Destinations claimed by more than one agent
    pub conflicts: usize,
    /// Agents recycled from one corridor end to the other
    pub boundary_crossings: usize,
}

/// Everything a completed run emits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub parameters: RunParameters,
    /// Baseline order parameter of random configurations
    pub phi_0: f64,
    pub steps: Vec<StepRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub snapshots: Vec<LatticeSnapshot>,
}

impl RunReport {
    /// Creates an empty report for the given parameters.
    pub fn new(parameters: RunParameters, phi_0: f64) -> Self {
        Self {
            run_id: generate_run_id(),
            parameters,
            phi_0,
            steps: Vec::new(),
            snapshots: Vec::new(),
        }
    }

    /// The `phi_reduced` value of every step, in order.
    pub fn phi_reduced_series(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.phi_reduced).collect()
    }

    /// Mean `phi_reduced` over the last `window` steps (all steps if shorter).
    pub fn mean_phi_reduced(&self, window: usize) -> Option<f64> {
        let start = self.steps.len().saturating_sub(window);
        let tail = &self.steps[start..];
        if tail.is_empty() {
            return None;
        }
        Some(tail.iter().map(|s| s.phi_reduced).sum::<f64>() / tail.len() as f64)
    }

    /// Total number of cell changes over the run.
    pub fn total_moves(&self) -> usize {
        self.steps.iter().map(|s| s.moves).sum()
    }

    /// The most recent recorded snapshot.
    pub fn final_snapshot(&self) -> Option<&LatticeSnapshot> {
        self.snapshots.last()
    }

    /// Serializes the report to pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Serializes the report to compact JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes a report from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parameters() -> RunParameters {
        RunParameters {
            rows: 4,
            columns: 10,
            agents: 10,
            soberness: 0.8,
            iterations: 3,
            baseline_trials: 100,
            seed: Some(42),
        }
    }

    fn record(step: u64, phi_reduced: f64, moves: usize) -> StepRecord {
        StepRecord {
            step,
            phi: phi_reduced,
            phi_reduced,
            moves,
            conflicts: 0,
            boundary_crossings: 0,
        }
    }

    #[test]
    fn test_generate_run_id_is_unique() {
        let a = generate_run_id();
        let b = generate_run_id();
        assert!(a.starts_with("run_"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_density() {
        assert_eq!(parameters().density(), 0.25);

        let mut empty = parameters();
        empty.rows = 0;
        assert_eq!(empty.density(), 0.0);
    }

    #[test]
    fn test_series_and_means() {
        let mut report = RunReport::new(parameters(), 0.2);
        assert!(report.mean_phi_reduced(10).is_none());

        report.steps.push(record(1, 0.1, 5));
        report.steps.push(record(2, 0.3, 4));
        report.steps.push(record(3, 0.5, 3));

        assert_eq!(report.phi_reduced_series(), vec![0.1, 0.3, 0.5]);
        assert!((report.mean_phi_reduced(2).unwrap() - 0.4).abs() < 1e-12);
        assert!((report.mean_phi_reduced(100).unwrap() - 0.3).abs() < 1e-12);
        assert_eq!(report.total_moves(), 12);
        assert!(report.final_snapshot().is_none());
    }

    #[test]
    fn test_report_serialization() {
        let mut report = RunReport::new(parameters(), 0.2);
        report.steps.push(record(1, 0.25, 2));
        report
            .snapshots
            .push(LatticeSnapshot::new(1, vec![vec![1, 0], vec![0, -1]]));

        let json = report.to_json().unwrap();
        assert!(json.contains(&report.run_id));
        assert!(json.contains("\"soberness\":0.8"));

        let parsed = RunReport::from_json(&json).unwrap();
        assert_eq!(parsed.run_id, report.run_id);
        assert_eq!(parsed.steps, report.steps);
        assert_eq!(parsed.final_snapshot().unwrap().step, 1);
    }

    #[test]
    fn test_snapshots_omitted_when_empty() {
        let report = RunReport::new(parameters(), 0.0);
        let json = report.to_json().unwrap();
        assert!(!json.contains("snapshots"));
    }
}
