//! Genetic Algorithm engine.
//!
//! A generational, real-valued GA over a bounded
//! [`DecisionSpace`](crate::problem::DecisionSpace). Candidates are scored
//! through a [`FitnessOracle`], normally an
//! [`Evaluator`](crate::evaluation::Evaluator) driving the simulation
//! engine, so evaluations are expensive and strictly sequential.
//!
//! # Key Types
//!
//! - [`Individual`]: genes plus an optional fitness and output record
//! - [`GaConfig`]: algorithm parameters with `{method, params}` operators
//! - [`GaRunner`]: executes the evolutionary loop
//! - [`Selection`], [`Crossover`], [`Mutation`]: resolved operators
//!
//! # Termination
//!
//! The run stops after `max_generation` generations, or earlier once the
//! generation-best fitness has changed by less than `cvrg_tolerance` for
//! more than `patience` consecutive generations.
//!
//! # References
//!
//! - Holland (1975), *Adaptation in Natural and Artificial Systems*
//! - Goldberg (1989), *Genetic Algorithms in Search, Optimization, and Machine Learning*
//! - Fortin et al. (2012), "DEAP: Evolutionary Algorithms Made Easy"

mod config;
pub mod operators;
mod runner;
mod selection;
mod types;

pub use config::{GaConfig, OperatorSpec, Operators, ParamValue, RatedOperator};
pub use operators::{Bounds, Crossover, Mutation};
pub use runner::GaRunner;
pub use selection::Selection;
pub use types::{FitnessOracle, FnOracle, Individual};
