//! Evaluation adapter.
//!
//! Turns a candidate decision vector into a fitness value by driving a
//! [`SolverSession`](crate::session::SolverSession): bounds check → input
//! merge → chunked import → solve → chunked export → parse.
//!
//! # Key Types
//!
//! - [`Evaluator`]: owns the session and the failure counter
//! - [`Evaluation`]: fitness plus the full output record
//! - [`EvaluatorOptions`]: parse-failure threshold, guess marker, feasibility
//! - [`FailureTracker`]: consecutive channel-failure counter

mod evaluator;
mod types;

pub use evaluator::{EvalStats, Evaluator};
pub use types::{Evaluation, EvaluatorOptions, FailureTracker};
