//! Evaluation results and options.

use crate::named::OutputRecord;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Outcome of scoring one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Target value, or the sentinel when the evaluation failed.
    pub fitness: f64,

    /// Every requested output. Empty when the engine was never contacted.
    pub outputs: Arc<OutputRecord>,

    /// Whether the engine solved the candidate (a round trip completed).
    pub solved: bool,
}

impl Evaluation {
    /// Evaluation that never reached the engine.
    pub fn rejected(sentinel: f64) -> Self {
        Self {
            fitness: sentinel,
            outputs: Arc::new(OutputRecord::new()),
            solved: false,
        }
    }

    pub fn solved(fitness: f64, outputs: OutputRecord) -> Self {
        Self {
            fitness,
            outputs: Arc::new(outputs),
            solved: true,
        }
    }
}

/// Tuning for how engine replies are judged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorOptions {
    /// Evaluations with more parse failures than this are discarded.
    #[serde(default = "default_max_parse_failures")]
    pub max_parse_failures: usize,

    /// Token the engine reports for a variable still at its guess value.
    ///
    /// Such tokens parse, but are counted as failures: the solve did not
    /// converge for that variable.
    #[serde(default = "default_guess_marker")]
    pub guess_marker: Option<String>,

    /// Consecutive channel failures that trigger a session restart.
    #[serde(default = "default_restart_after")]
    pub restart_after: u32,

    /// When set, candidates with any negative output score this value.
    #[serde(default)]
    pub infeasible_fitness: Option<f64>,
}

fn default_max_parse_failures() -> usize {
    3
}

fn default_guess_marker() -> Option<String> {
    Some("1.00000000E+00".to_string())
}

fn default_restart_after() -> u32 {
    3
}

impl Default for EvaluatorOptions {
    fn default() -> Self {
        Self {
            max_parse_failures: default_max_parse_failures(),
            guess_marker: default_guess_marker(),
            restart_after: default_restart_after(),
            infeasible_fitness: None,
        }
    }
}

impl EvaluatorOptions {
    pub fn with_max_parse_failures(mut self, n: usize) -> Self {
        self.max_parse_failures = n;
        self
    }

    pub fn with_guess_marker(mut self, marker: Option<String>) -> Self {
        self.guess_marker = marker;
        self
    }

    pub fn with_restart_after(mut self, n: u32) -> Self {
        self.restart_after = n.max(1);
        self
    }

    pub fn with_infeasible_fitness(mut self, value: f64) -> Self {
        self.infeasible_fitness = Some(value);
        self
    }
}

/// Counts consecutive channel failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureTracker {
    consecutive: u32,
    limit: u32,
}

impl FailureTracker {
    pub fn new(limit: u32) -> Self {
        Self {
            consecutive: 0,
            limit: limit.max(1),
        }
    }

    /// Records a failure. Returns `true` when the limit is reached, in
    /// which case the counter starts over.
    pub fn record_failure(&mut self) -> bool {
        self.consecutive += 1;
        if self.consecutive >= self.limit {
            self.consecutive = 0;
            true
        } else {
            false
        }
    }

    pub fn record_success(&mut self) {
        self.consecutive = 0;
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }
}
