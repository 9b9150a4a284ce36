//! Simulation-based optimization with a genetic algorithm.
//!
//! Searches the decision variables of a model solved by an external
//! simulation engine. Each candidate is pushed into the engine, solved, and
//! scored by one of its output variables:
//!
//! - **Payload codec** ([`codec`]): splits name/value lists into chunks
//!   that fit the engine's command-length limit.
//! - **Solver session** ([`session`]): owns the engine process and the
//!   command channel; at most one live instance per process.
//! - **Evaluation adapter** ([`evaluation`]): bounds check, input merge,
//!   chunked import, solve, chunked export, parse. Failures become a
//!   sentinel fitness; repeated channel failures restart the engine.
//! - **Genetic algorithm** ([`ga`]): generational loop with configurable
//!   selection, crossover and mutation, stopping on convergence of the
//!   best fitness.
//! - **Study driver** ([`study`]): runs one study file end to end and
//!   persists the [`RunResult`](result::RunResult).
//!
//! # Architecture
//!
//! Leaves first: `codec` → `session` → `evaluation` → `ga` → `study`. The
//! GA sees the engine only through [`ga::FitnessOracle`], so it runs just
//! as well against a plain function.

pub mod codec;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod ga;
pub mod named;
pub mod problem;
pub mod result;
pub mod session;
pub mod study;

pub use error::{Result, SimoptError};
