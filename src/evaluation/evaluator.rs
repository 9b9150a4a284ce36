//! Candidate evaluation against the engine.

use super::types::{Evaluation, EvaluatorOptions, FailureTracker};
use crate::codec::{chunk_inputs, chunk_names, tokenize, DEFAULT_MAX_COMMAND_LEN};
use crate::error::{ChannelError, SimoptError};
use crate::ga::FitnessOracle;
use crate::named::OutputRecord;
use crate::problem::{DecisionSpace, Direction, Problem};
use crate::session::{Command, SolverSession};
use log::{debug, warn};

/// Counters kept across a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvalStats {
    /// Evaluations requested.
    pub requested: usize,
    /// Candidates rejected by the bounds check.
    pub rejected: usize,
    /// Solve round trips that completed.
    pub round_trips: usize,
    /// Evaluations lost to channel errors.
    pub channel_errors: usize,
    /// Evaluations whose replies could not be trusted.
    pub unconverged: usize,
    /// Session restarts performed.
    pub restarts: usize,
}

/// Scores candidates by running them through the engine.
pub struct Evaluator<S: SolverSession> {
    session: S,
    space: DecisionSpace,
    target: String,
    direction: Direction,
    base_inputs: Vec<(String, f64)>,
    /// For each base input, the gene that overrides it.
    overrides: Vec<Option<usize>>,
    outputs: Vec<String>,
    options: EvaluatorOptions,
    max_command_len: usize,
    failures: FailureTracker,
    stats: EvalStats,
}

impl<S: SolverSession> Evaluator<S> {
    /// Creates an evaluator over an already validated problem.
    pub fn new(session: S, problem: &Problem, options: EvaluatorOptions) -> Self {
        let space = problem.decision_variables.clone();
        let base_inputs = problem.base_inputs.clone().into_vec();
        let overrides = base_inputs
            .iter()
            .map(|(name, _)| space.index_of(name))
            .collect();

        Self {
            session,
            space,
            target: problem.target.clone(),
            direction: problem.direction,
            base_inputs,
            overrides,
            outputs: problem.outputs.clone(),
            failures: FailureTracker::new(options.restart_after),
            options,
            max_command_len: DEFAULT_MAX_COMMAND_LEN,
            stats: EvalStats::default(),
        }
    }

    /// Overrides the variable-list length used for chunking.
    pub fn with_max_command_len(mut self, len: usize) -> Self {
        self.max_command_len = len.max(1);
        self
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    pub fn into_session(self) -> S {
        self.session
    }

    pub fn stats(&self) -> EvalStats {
        self.stats
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.failures.consecutive()
    }

    pub fn sentinel(&self) -> f64 {
        self.direction.sentinel()
    }

    /// Evaluates one candidate.
    ///
    /// Channel errors propagate untouched; see [`evaluate_guarded`] for the
    /// recovering variant used by the GA.
    ///
    /// [`evaluate_guarded`]: Self::evaluate_guarded
    pub fn evaluate(&mut self, genes: &[f64]) -> Result<Evaluation, ChannelError> {
        self.stats.requested += 1;

        if !self.space.admits(genes) {
            self.stats.rejected += 1;
            debug!("candidate {genes:?} outside the decision space");
            return Ok(Evaluation::rejected(self.sentinel()));
        }

        let inputs = self.merge_inputs(genes);
        for chunk in chunk_inputs(&inputs, self.max_command_len) {
            let (names, values) = chunk.iter().cloned().unzip();
            self.session.execute(&Command::Import { names, values })?;
        }
        self.session.execute(&Command::Solve)?;

        let mut tokens = Vec::with_capacity(self.outputs.len());
        for chunk in chunk_names(&self.outputs, self.max_command_len) {
            let reply = self.session.execute(&Command::Export {
                names: chunk.to_vec(),
            })?;
            tokens.extend(tokenize(&reply).into_iter().map(str::to_string));
        }
        self.stats.round_trips += 1;

        Ok(self.judge(&tokens))
    }

    /// Evaluates one candidate, absorbing channel errors.
    ///
    /// A failed round trip scores the sentinel. After
    /// [`EvaluatorOptions::restart_after`] consecutive failures the session
    /// is restarted; a restart that cannot bring the engine back is fatal.
    pub fn evaluate_guarded(&mut self, genes: &[f64]) -> Result<Evaluation, SimoptError> {
        match self.evaluate(genes) {
            Ok(evaluation) => {
                if evaluation.solved {
                    self.failures.record_success();
                }
                Ok(evaluation)
            }
            Err(e) => {
                self.stats.channel_errors += 1;
                warn!(
                    "engine round trip failed ({e}); {} scored as {}",
                    self.target,
                    self.sentinel()
                );
                if self.failures.record_failure() {
                    warn!("channel keeps failing; restarting the engine");
                    self.session.restart()?;
                    self.stats.restarts += 1;
                }
                Ok(Evaluation::rejected(self.sentinel()))
            }
        }
    }

    /// Overlays the genes onto the base-case inputs.
    fn merge_inputs(&self, genes: &[f64]) -> Vec<(String, f64)> {
        self.base_inputs
            .iter()
            .zip(&self.overrides)
            .map(|((name, base), gene)| (name.clone(), gene.map_or(*base, |i| genes[i])))
            .collect()
    }

    /// Parses exported tokens and decides whether the solve can be trusted.
    fn judge(&mut self, tokens: &[String]) -> Evaluation {
        let mut record = OutputRecord::with_capacity(self.outputs.len());
        let mut failures = 0usize;
        let mut target_failed = false;

        for (i, name) in self.outputs.iter().enumerate() {
            let token = tokens.get(i).map(String::as_str);
            let parsed = token.and_then(|t| t.parse::<f64>().ok()).filter(|v| v.is_finite());
            let value = match parsed {
                Some(v) => {
                    if token == self.options.guess_marker.as_deref() {
                        failures += 1;
                    }
                    v
                }
                None => {
                    failures += 1;
                    if *name == self.target {
                        target_failed = true;
                    }
                    0.0
                }
            };
            record.insert(name.clone(), value);
        }

        if target_failed || failures > self.options.max_parse_failures {
            self.stats.unconverged += 1;
            warn!(
                "engine reported unusable values ({failures} unparsed or unconverged); candidate is invalid"
            );
            record.insert(self.target.clone(), self.sentinel());
            let sentinel = self.sentinel();
            return Evaluation::solved(sentinel, record);
        }

        let target = record.get(&self.target).copied().unwrap_or(self.sentinel());
        let fitness = match self.options.infeasible_fitness {
            Some(penalty) if record.iter().any(|(_, v)| *v < 0.0) => {
                debug!("candidate has negative outputs; penalized to {penalty}");
                penalty
            }
            _ => target,
        };

        Evaluation::solved(fitness, record)
    }
}

impl<S: SolverSession> FitnessOracle for Evaluator<S> {
    fn evaluate(&mut self, genes: &[f64]) -> Result<Evaluation, SimoptError> {
        self.evaluate_guarded(genes)
    }

    fn round_trips(&self) -> usize {
        self.stats.round_trips
    }
}
