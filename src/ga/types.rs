//! Core GA types.
//!
//! [`Individual`] is the candidate representation; [`FitnessOracle`] is the
//! contract between the generational loop and whatever scores candidates
//! (normally an [`Evaluator`](crate::evaluation::Evaluator) driving the
//! engine).

use crate::error::SimoptError;
use crate::evaluation::Evaluation;
use crate::named::OutputRecord;
use std::sync::Arc;

/// A candidate solution: one gene per decision variable.
///
/// Fitness is either unset or valid. Breeding through [`bred`](Self::bred)
/// produces a new individual whose fitness is unset whenever its genes
/// differ from the parent's.
#[derive(Debug, Clone, PartialEq)]
pub struct Individual {
    genes: Vec<f64>,
    fitness: Option<f64>,
    outputs: Option<Arc<OutputRecord>>,
}

impl Individual {
    /// Creates an unevaluated individual.
    pub fn new(genes: Vec<f64>) -> Self {
        Self {
            genes,
            fitness: None,
            outputs: None,
        }
    }

    pub fn genes(&self) -> &[f64] {
        &self.genes
    }

    pub fn fitness(&self) -> Option<f64> {
        self.fitness
    }

    pub fn is_evaluated(&self) -> bool {
        self.fitness.is_some()
    }

    /// Outputs reported by the engine when this individual was evaluated.
    pub fn outputs(&self) -> Option<&OutputRecord> {
        self.outputs.as_deref()
    }

    /// Stores the result of an evaluation.
    pub fn assign(&mut self, evaluation: Evaluation) {
        self.fitness = Some(evaluation.fitness);
        self.outputs = Some(evaluation.outputs);
    }

    /// Offspring carrying `genes`.
    ///
    /// The evaluation is inherited only if the genes are unchanged.
    pub fn bred(&self, genes: Vec<f64>) -> Self {
        if genes == self.genes {
            self.clone()
        } else {
            Self::new(genes)
        }
    }
}

/// Scores candidates for the GA.
pub trait FitnessOracle {
    /// Evaluates one decision vector.
    ///
    /// Recoverable failures are expected to be folded into a sentinel
    /// fitness; an `Err` aborts the run.
    fn evaluate(&mut self, genes: &[f64]) -> Result<Evaluation, SimoptError>;

    /// Solver round trips performed so far.
    fn round_trips(&self) -> usize {
        0
    }
}

/// Adapts a plain function into a [`FitnessOracle`].
///
/// ```
/// use u_simopt::ga::{FitnessOracle, FnOracle};
///
/// let mut oracle = FnOracle::new(|genes: &[f64]| genes.iter().sum::<f64>());
/// assert_eq!(oracle.evaluate(&[1.0, 2.0]).unwrap().fitness, 3.0);
/// assert_eq!(oracle.round_trips(), 1);
/// ```
pub struct FnOracle<F> {
    f: F,
    calls: usize,
}

impl<F: FnMut(&[f64]) -> f64> FnOracle<F> {
    pub fn new(f: F) -> Self {
        Self { f, calls: 0 }
    }
}

impl<F: FnMut(&[f64]) -> f64> FitnessOracle for FnOracle<F> {
    fn evaluate(&mut self, genes: &[f64]) -> Result<Evaluation, SimoptError> {
        self.calls += 1;
        Ok(Evaluation::solved((self.f)(genes), OutputRecord::new()))
    }

    fn round_trips(&self) -> usize {
        self.calls
    }
}
