//! Run results and their persistence.
//!
//! A [`RunResult`] is produced once per run by the GA runner and never
//! changed afterwards. [`ResultSink`] is the seam to whatever stores it;
//! [`JsonDirSink`] writes one directory per run.

use crate::error::{Result, SimoptError};
use crate::ga::GaConfig;
use crate::named::{NamedValues, OutputRecord};
use crate::problem::Direction;
use log::info;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Why the run stopped.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Termination {
    /// The best fitness stopped moving for more than `patience` generations.
    Converged,
    /// `max_generation` generations were executed.
    MaxGenerations,
    /// The cancellation flag was raised.
    Cancelled,
    /// A fatal error stopped the run after the initial population.
    Aborted { reason: String },
}

/// Population statistics for one generation.
///
/// Computed over finite fitness values only; `invalid` counts the rest.
/// With no finite value the moments are NaN and serialize as `null`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub std: f64,
    pub invalid: usize,
}

impl GenerationStats {
    pub fn of(fitness: impl IntoIterator<Item = f64>) -> Self {
        let mut n = 0usize;
        let mut invalid = 0usize;
        let (mut min, mut max) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut sum, mut sum2) = (0.0, 0.0);
        for f in fitness {
            if !f.is_finite() {
                invalid += 1;
                continue;
            }
            n += 1;
            min = min.min(f);
            max = max.max(f);
            sum += f;
            sum2 += f * f;
        }
        if n == 0 {
            return Self {
                min: f64::NAN,
                max: f64::NAN,
                avg: f64::NAN,
                std: f64::NAN,
                invalid,
            };
        }
        let avg = sum / n as f64;
        Self {
            min,
            max,
            avg,
            std: (sum2 / n as f64 - avg * avg).abs().sqrt(),
            invalid,
        }
    }
}

/// Snapshot of one generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRecord {
    pub generation: usize,
    pub best_target: f64,
    pub best_individual: NamedValues<f64>,
    /// Absolute change of the generation best against the previous one.
    pub error: f64,
    pub stats: GenerationStats,
    /// Evaluated individuals per minute.
    pub rate: f64,
    pub evaluations: usize,
    /// Individuals in the population after replacement.
    pub population: usize,
    pub best_output: OutputRecord,
}

/// Outcome of a complete optimization run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    pub run_id: String,
    pub target: String,
    pub direction: Direction,
    /// Best target value seen over the whole run.
    pub best_target: f64,
    pub best_individual: NamedValues<f64>,
    pub best_output: OutputRecord,
    /// Generations executed after the initial population.
    pub generations: usize,
    /// Wall-clock seconds spent evolving.
    pub evolution_time: f64,
    /// Mean of the per-generation rates.
    pub avg_rate: f64,
    /// Solver round trips over the whole run.
    pub round_trips: usize,
    pub status: Termination,
    pub config: GaConfig,
    pub gen_history: Vec<GenerationRecord>,
}

impl RunResult {
    /// Compact JSON encoding.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(SimoptError::Encode)
    }

    /// Indented JSON encoding.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(SimoptError::Encode)
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.status, Termination::Aborted { .. })
    }

    /// Logs the headline numbers.
    pub fn log_summary(&self) {
        info!("---- optimization finished ({:?}) ----", self.status);
        info!("run id: {}", self.run_id);
        info!("best {}: {}", self.target, self.best_target);
        for (name, value) in self.best_individual.iter() {
            info!("  {name} = {value}");
        }
        info!(
            "{} generations in {:.1} s, {:.2} individuals/min on average, {} round trips",
            self.generations, self.evolution_time, self.avg_rate, self.round_trips
        );
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// Stores finished runs.
pub trait ResultSink {
    fn persist(&mut self, result: &RunResult) -> Result<()>;
}

/// Writes `<root>/<run_id>/results.json` and `readable-results.json`.
#[derive(Debug, Clone)]
pub struct JsonDirSink {
    root: PathBuf,
}

impl JsonDirSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root.join(run_id)
    }
}

impl ResultSink for JsonDirSink {
    fn persist(&mut self, result: &RunResult) -> Result<()> {
        let dir = self.run_dir(&result.run_id);
        fs::create_dir_all(&dir).map_err(SimoptError::Persist)?;
        write(&dir.join("results.json"), &result.to_json()?)?;
        write(&dir.join("readable-results.json"), &result.to_json_pretty()?)?;
        info!("results written to {}", dir.display());
        Ok(())
    }
}

fn write(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).map_err(SimoptError::Persist)
}

/// Keeps compact encodings in memory, keyed by run id.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub documents: BTreeMap<String, String>,
}

impl ResultSink for MemorySink {
    fn persist(&mut self, result: &RunResult) -> Result<()> {
        self.documents.insert(result.run_id.clone(), result.to_json()?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RunResult {
        let record = GenerationRecord {
            generation: 1,
            best_target: 5.0,
            best_individual: [("x", 2.0)].into_iter().collect(),
            error: 0.0,
            stats: GenerationStats::of([5.0, f64::NEG_INFINITY]),
            rate: 0.0,
            evaluations: 2,
            population: 2,
            best_output: [("y", 5.0)].into_iter().collect(),
        };
        RunResult {
            run_id: "1700000000".into(),
            target: "y".into(),
            direction: Direction::Maximize,
            best_target: 5.0,
            best_individual: [("x", 2.0)].into_iter().collect(),
            best_output: [("y", 5.0)].into_iter().collect(),
            generations: 1,
            evolution_time: 0.5,
            avg_rate: 0.0,
            round_trips: 4,
            status: Termination::Converged,
            config: GaConfig::default(),
            gen_history: vec![record],
        }
    }

    #[test]
    fn test_stats_skip_non_finite() {
        let stats = GenerationStats::of([1.0, 3.0, f64::NEG_INFINITY]);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 3.0);
        assert_eq!(stats.avg, 2.0);
        assert!((stats.std - 1.0).abs() < 1e-12);
        assert_eq!(stats.invalid, 1);
    }

    #[test]
    fn test_stats_all_invalid_serialize_as_null() {
        let stats = GenerationStats::of([f64::INFINITY]);
        let value = serde_json::to_value(stats).unwrap();
        assert!(value["avg"].is_null());
        assert_eq!(value["invalid"], 1);
    }

    #[test]
    fn test_json_shape() {
        let value: serde_json::Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();
        assert_eq!(value["run_id"], "1700000000");
        assert_eq!(value["direction"], "maximize");
        assert_eq!(value["status"]["kind"], "converged");
        assert_eq!(value["best_individual"]["x"], 2.0);
        assert_eq!(value["gen_history"][0]["best_output"]["y"], 5.0);
        assert_eq!(value["config"]["population"], 50);
    }

    #[test]
    fn test_aborted_status_carries_reason() {
        let mut result = sample();
        result.status = Termination::Aborted { reason: "boom".into() };
        assert!(result.is_aborted());
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"]["kind"], "aborted");
        assert_eq!(value["status"]["reason"], "boom");
    }

    #[test]
    fn test_json_dir_sink_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = JsonDirSink::new(dir.path());
        let result = sample();
        sink.persist(&result).unwrap();

        let run_dir = dir.path().join("1700000000");
        let compact = fs::read_to_string(run_dir.join("results.json")).unwrap();
        let pretty = fs::read_to_string(run_dir.join("readable-results.json")).unwrap();
        assert!(!compact.contains('\n'));
        assert!(pretty.contains('\n'));
        let a: serde_json::Value = serde_json::from_str(&compact).unwrap();
        let b: serde_json::Value = serde_json::from_str(&pretty).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_memory_sink() {
        let mut sink = MemorySink::default();
        sink.persist(&sample()).unwrap();
        assert!(sink.documents["1700000000"].contains("\"target\":\"y\""));
    }
}
