//! Study driver.
//!
//! [`OptimizationStudy`] wires a session, an evaluator and the GA together
//! for one run. The session is closed on every exit path, and whatever the
//! GA produced (including an aborted run) is persisted before returning.

use crate::config::{timestamp_id, StudyConfig};
use crate::error::{ConfigError, Result};
use crate::evaluation::{EvalStats, Evaluator, EvaluatorOptions};
use crate::ga::{GaConfig, GaRunner};
use crate::problem::Problem;
use crate::result::{JsonDirSink, ResultSink, RunResult};
use crate::session::{ProcessSession, SolverSession};
use log::{info, warn};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// One optimization run over a solver session.
pub struct OptimizationStudy<S: SolverSession> {
    evaluator: Evaluator<S>,
    problem: Problem,
    ga: GaConfig,
    run_id: String,
    cancel: Option<Arc<AtomicBool>>,
}

impl<S: SolverSession> OptimizationStudy<S> {
    /// Validates the problem and GA configuration.
    pub fn new(
        session: S,
        problem: Problem,
        ga: GaConfig,
        options: EvaluatorOptions,
    ) -> std::result::Result<Self, ConfigError> {
        problem.validate()?;
        ga.operators(&problem.decision_variables)?;
        Ok(Self {
            evaluator: Evaluator::new(session, &problem, options),
            problem,
            ga,
            run_id: timestamp_id(),
            cancel: None,
        })
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    pub fn with_max_command_len(mut self, len: usize) -> Self {
        self.evaluator = self.evaluator.with_max_command_len(len);
        self
    }

    /// Stops the GA before the next generation once the flag is set.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn evaluator(&self) -> &Evaluator<S> {
        &self.evaluator
    }

    pub fn stats(&self) -> EvalStats {
        self.evaluator.stats()
    }

    /// Opens the session, runs the GA, closes the session and persists the
    /// result.
    pub fn run(&mut self, sink: &mut dyn ResultSink) -> Result<RunResult> {
        info!("opening solver session for run {}", self.run_id);
        let outcome = match self.evaluator.session_mut().open() {
            Ok(()) => GaRunner::run_with_cancel(
                &mut self.evaluator,
                &self.problem,
                &self.ga,
                &self.run_id,
                self.cancel.clone(),
            ),
            Err(e) => Err(e.into()),
        };
        self.evaluator.session_mut().close();

        let result = outcome?;
        if result.is_aborted() {
            warn!("run {} aborted; persisting partial result", result.run_id);
        }
        result.log_summary();
        let stats = self.evaluator.stats();
        info!(
            "{} candidates: {} rejected by bounds, {} unconverged, {} channel errors, {} restarts",
            stats.requested, stats.rejected, stats.unconverged, stats.channel_errors, stats.restarts
        );

        sink.persist(&result)?;
        Ok(result)
    }
}

/// Runs a study file against the real engine and writes the results under
/// its `results_dir`.
pub fn run_study(config: &StudyConfig) -> Result<RunResult> {
    config.validate()?;
    let session = ProcessSession::new(config.session.clone());
    let mut study = OptimizationStudy::new(
        session,
        config.problem(),
        config.ga.clone(),
        config.evaluation.clone(),
    )?
    .with_run_id(config.run_id())
    .with_max_command_len(config.session.max_command_len);

    let mut sink = JsonDirSink::new(&config.results_dir);
    study.run(&mut sink)
}
