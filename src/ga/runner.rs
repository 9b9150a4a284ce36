//! GA evolutionary loop execution.
//!
//! [`GaRunner`] orchestrates the complete evolutionary process:
//! initialization → evaluation → selection → crossover → mutation →
//! evaluation of changed offspring → replacement → convergence check.
//!
//! Evaluation is strictly sequential: the oracle normally drives a single
//! engine instance. Offspring replace the population wholesale; there is
//! no elitism.

use super::config::GaConfig;
use super::types::{FitnessOracle, Individual};
use crate::error::Result;
use crate::problem::{DecisionSpace, Direction, Problem};
use crate::result::{GenerationRecord, GenerationStats, RunResult, Termination};
use log::{debug, error, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Individuals listed in the per-generation debug ranking.
const TOP_LOGGED: usize = 15;

/// Executes the GA evolutionary loop.
///
/// # Usage
///
/// ```
/// use u_simopt::ga::{FnOracle, GaConfig, GaRunner};
/// use u_simopt::problem::{DecisionSpace, Direction, Problem};
///
/// let problem = Problem {
///     target: "y".into(),
///     direction: Direction::Minimize,
///     decision_variables: DecisionSpace::default().with("x", 0.1, 10.0),
///     base_inputs: [("x", 1.0)].into_iter().collect(),
///     outputs: vec!["y".into()],
/// };
/// let config = GaConfig::default().with_population(10).with_max_generation(5).with_seed(5);
/// let mut oracle = FnOracle::new(|g: &[f64]| (g[0] - 3.0).powi(2));
///
/// let result = GaRunner::run(&mut oracle, &problem, &config, "demo").unwrap();
/// assert!(result.generations <= 5);
/// ```
pub struct GaRunner;

impl GaRunner {
    /// Runs the GA optimization.
    ///
    /// Returns `Err` for an invalid configuration or when the initial
    /// population cannot be evaluated. A fatal error in a later generation
    /// ends the run with [`Termination::Aborted`] and the history gathered
    /// so far.
    pub fn run<O: FitnessOracle + ?Sized>(
        oracle: &mut O,
        problem: &Problem,
        config: &GaConfig,
        run_id: &str,
    ) -> Result<RunResult> {
        Self::run_with_cancel(oracle, problem, config, run_id, None)
    }

    /// Runs the GA with an optional cancellation token.
    ///
    /// The flag is checked before each generation.
    pub fn run_with_cancel<O: FitnessOracle + ?Sized>(
        oracle: &mut O,
        problem: &Problem,
        config: &GaConfig,
        run_id: &str,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<RunResult> {
        let space = &problem.decision_variables;
        space.validate()?;
        let ops = config.operators(space)?;
        let direction = problem.direction;
        let target = problem.target.as_str();

        let mut rng = StdRng::seed_from_u64(config.seed.unwrap_or_else(rand::random));
        let started = Instant::now();
        let trips_at_start = oracle.round_trips();

        info!("---- evolution started: run {run_id} ----");

        // 1. Initialize population
        let mut population: Vec<Individual> = (0..config.population)
            .map(|_| Individual::new(random_genes(space, &mut rng)))
            .collect();

        // 2. Evaluate initial population
        evaluate_pending(oracle, &mut population, space, target, config.verbose)?;

        // 3. Track best
        let initial = best_of(&population, direction);
        let mut best = initial.clone();
        let mut prev_best = fitness_of(initial, direction);
        info!(
            "generation 0: best {target} = {prev_best}, stats {:?}",
            stats_of(&population, direction)
        );

        let mut history: Vec<GenerationRecord> = Vec::with_capacity(config.max_generation);
        let mut stagnation = 0usize;
        let mut status = Termination::MaxGenerations;

        // 4. Evolutionary loop
        for gen in 1..=config.max_generation {
            if let Some(ref flag) = cancel {
                if flag.load(Ordering::Relaxed) {
                    status = Termination::Cancelled;
                    break;
                }
            }

            let gen_started = Instant::now();

            // Selection: mating pool of independent copies
            let keys: Vec<f64> = population
                .iter()
                .map(|ind| direction.key(fitness_of(ind, direction)))
                .collect();
            let mut offspring: Vec<Individual> = ops
                .selection
                .select_pool(&keys, config.population, &mut rng)
                .into_iter()
                .map(|i| population[i].clone())
                .collect();

            // Crossover on consecutive pairs
            for pair in offspring.chunks_exact_mut(2) {
                if rng.random::<f64>() < config.crossover.rate {
                    let (c1, c2) = ops.crossover.apply(pair[0].genes(), pair[1].genes(), &mut rng);
                    pair[0] = pair[0].bred(c1);
                    pair[1] = pair[1].bred(c2);
                }
            }

            // Mutation
            for ind in offspring.iter_mut() {
                if rng.random::<f64>() < config.mutation.rate {
                    let genes = ops.mutation.apply(ind.genes(), &mut rng);
                    *ind = ind.bred(genes);
                }
            }

            // Evaluate only what changed
            let evaluated =
                match evaluate_pending(oracle, &mut offspring, space, target, config.verbose) {
                    Ok(n) => n,
                    Err(e) => {
                        error!("generation {gen} aborted: {e}");
                        status = Termination::Aborted {
                            reason: e.to_string(),
                        };
                        break;
                    }
                };

            population = offspring;

            let gen_best = best_of(&population, direction);
            let best_fitness = fitness_of(gen_best, direction);
            let error = change(best_fitness, prev_best);
            prev_best = best_fitness;
            if direction.is_better(best_fitness, fitness_of(&best, direction)) {
                best = gen_best.clone();
            }

            let elapsed = gen_started.elapsed().as_secs_f64();
            let rate = if elapsed > 0.0 {
                evaluated as f64 / (elapsed / 60.0)
            } else {
                0.0
            };
            let stats = stats_of(&population, direction);

            info!(
                "generation {gen}: best {target} = {best_fitness}, error {error:.3e}, \
                 min {:.6} max {:.6} avg {:.6} std {:.6}, {evaluated} evaluated ({rate:.2}/min)",
                stats.min, stats.max, stats.avg, stats.std
            );
            log_ranking(&population, space, direction);

            history.push(GenerationRecord {
                generation: gen,
                best_target: best_fitness,
                best_individual: space.label(gen_best.genes()),
                error,
                stats,
                rate,
                evaluations: evaluated,
                population: population.len(),
                best_output: gen_best.outputs().cloned().unwrap_or_default(),
            });

            // Convergence check
            if error < config.cvrg_tolerance {
                stagnation += 1;
                if stagnation > config.patience {
                    info!("converged after {gen} generations");
                    status = Termination::Converged;
                    break;
                }
            } else {
                stagnation = 0;
            }
        }

        let avg_rate = if history.is_empty() {
            0.0
        } else {
            history.iter().map(|g| g.rate).sum::<f64>() / history.len() as f64
        };

        Ok(RunResult {
            run_id: run_id.to_string(),
            target: target.to_string(),
            direction,
            best_target: fitness_of(&best, direction),
            best_individual: space.label(best.genes()),
            best_output: best.outputs().cloned().unwrap_or_default(),
            generations: history.len(),
            evolution_time: started.elapsed().as_secs_f64(),
            avg_rate,
            round_trips: oracle.round_trips().saturating_sub(trips_at_start),
            status,
            config: config.clone(),
            gen_history: history,
        })
    }
}

/// Uniform genes within each variable's bounds.
fn random_genes<R: Rng>(space: &DecisionSpace, rng: &mut R) -> Vec<f64> {
    space
        .vars()
        .iter()
        .map(|var| rng.random_range(var.low..=var.high))
        .collect()
}

/// Evaluates every individual without a fitness. Returns how many.
fn evaluate_pending<O: FitnessOracle + ?Sized>(
    oracle: &mut O,
    population: &mut [Individual],
    space: &DecisionSpace,
    target: &str,
    verbose: bool,
) -> Result<usize> {
    let mut count = 0;
    for ind in population.iter_mut().filter(|ind| !ind.is_evaluated()) {
        let evaluation = oracle.evaluate(ind.genes())?;
        count += 1;
        if verbose {
            info!("No. {count} | {target} = {}", evaluation.fitness);
            info!("  {:?}", space.label(ind.genes()));
        }
        ind.assign(evaluation);
    }
    Ok(count)
}

fn fitness_of(ind: &Individual, direction: Direction) -> f64 {
    ind.fitness().unwrap_or_else(|| direction.sentinel())
}

fn compare(a: &Individual, b: &Individual, direction: Direction) -> CmpOrdering {
    let ka = direction.key(fitness_of(a, direction));
    let kb = direction.key(fitness_of(b, direction));
    ka.partial_cmp(&kb).unwrap_or(CmpOrdering::Equal)
}

/// The best individual; the first one on ties.
fn best_of(population: &[Individual], direction: Direction) -> &Individual {
    let mut best = &population[0];
    for ind in &population[1..] {
        if compare(ind, best, direction) == CmpOrdering::Less {
            best = ind;
        }
    }
    best
}

fn stats_of(population: &[Individual], direction: Direction) -> GenerationStats {
    GenerationStats::of(population.iter().map(|ind| fitness_of(ind, direction)))
}

/// Absolute change between two generation bests. Equal sentinels count as
/// no change.
fn change(current: f64, previous: f64) -> f64 {
    if current == previous {
        0.0
    } else {
        (current - previous).abs()
    }
}

fn log_ranking(population: &[Individual], space: &DecisionSpace, direction: Direction) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    let mut ranked: Vec<&Individual> = population.iter().collect();
    ranked.sort_by(|a, b| compare(a, b, direction));
    for (i, ind) in ranked.iter().take(TOP_LOGGED).enumerate() {
        debug!(
            "  #{:<2} {:>14.6} {:?}",
            i + 1,
            fitness_of(ind, direction),
            space.label(ind.genes())
        );
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ChannelError, SimoptError};
    use crate::evaluation::{Evaluation, Evaluator, EvaluatorOptions};
    use crate::ga::OperatorSpec;
    use crate::ga::FnOracle;
    use crate::named::OutputRecord;
    use crate::session::stub::ScriptedSession;

    fn problem(direction: Direction, space: DecisionSpace) -> Problem {
        let base_inputs = space.names().map(|n| (n.to_string(), 1.0)).collect();
        Problem {
            target: "y".into(),
            direction,
            decision_variables: space,
            base_inputs,
            outputs: vec!["y".into()],
        }
    }

    fn sphere_problem() -> Problem {
        problem(
            Direction::Minimize,
            DecisionSpace::default()
                .with("a", 0.1, 10.0)
                .with("b", 0.1, 10.0)
                .with("c", 0.1, 10.0),
        )
    }

    fn sphere(genes: &[f64]) -> f64 {
        genes.iter().map(|x| (x - 3.0).powi(2)).sum()
    }

    /// Counts calls, fails from call `fail_from` on.
    struct FailingOracle {
        calls: usize,
        fail_from: usize,
    }

    impl FitnessOracle for FailingOracle {
        fn evaluate(&mut self, _genes: &[f64]) -> Result<Evaluation> {
            self.calls += 1;
            if self.calls >= self.fail_from {
                Err(SimoptError::Channel(ChannelError::Disconnected))
            } else {
                Ok(Evaluation::solved(self.calls as f64, OutputRecord::new()))
            }
        }

        fn round_trips(&self) -> usize {
            self.calls
        }
    }

    #[test]
    fn test_constant_fitness_converges_after_patience() {
        let problem = problem(Direction::Maximize, DecisionSpace::default().with("x", 0.0, 10.0));
        let config = GaConfig::default()
            .with_population(4)
            .with_max_generation(20)
            .with_seed(5);
        let session = ScriptedSession::constant(5.0).opened();
        let mut evaluator = Evaluator::new(session, &problem, EvaluatorOptions::default());

        let result = GaRunner::run(&mut evaluator, &problem, &config, "t").unwrap();

        assert_eq!(result.status, Termination::Converged);
        assert_eq!(result.generations, 6);
        assert_eq!(result.best_target, 5.0);
        assert_eq!(result.gen_history.len(), 6);
        assert!(result.gen_history.iter().all(|g| g.error == 0.0));
        assert_eq!(result.best_output.get("y"), Some(&5.0));
    }

    #[test]
    fn test_small_run_stays_in_bounds() {
        let problem = problem(Direction::Maximize, DecisionSpace::default().with("x", 0.0, 10.0));
        let config = GaConfig::default()
            .with_population(4)
            .with_max_generation(10)
            .with_seed(5);
        let mut evaluator = Evaluator::new(
            ScriptedSession::constant(5.0).opened(),
            &problem,
            EvaluatorOptions::default(),
        );

        let result = GaRunner::run(&mut evaluator, &problem, &config, "t").unwrap();

        assert!(result.generations <= 7);
        assert_eq!(result.best_target, 5.0);
        let x = *result.best_individual.get("x").unwrap();
        assert!((0.0..=10.0).contains(&x));
    }

    #[test]
    fn test_max_generations_reached() {
        let config = GaConfig::default()
            .with_population(10)
            .with_max_generation(3)
            .with_tolerance(0.0)
            .with_seed(1);
        let mut oracle = FnOracle::new(sphere);
        let result = GaRunner::run(&mut oracle, &sphere_problem(), &config, "t").unwrap();
        assert_eq!(result.status, Termination::MaxGenerations);
        assert_eq!(result.generations, 3);
        assert_eq!(result.gen_history.len(), 3);
        assert_eq!(result.round_trips, oracle.round_trips());
    }

    #[test]
    fn test_population_size_constant() {
        for (selection, crossover) in [
            (OperatorSpec::new("tournament").with_param("tournsize", 3.0), "two-point"),
            (OperatorSpec::new("selBest"), "one-point"),
            (OperatorSpec::new("selStochasticUniversalSampling"), "two-point"),
            (OperatorSpec::new("rank"), "one-point"),
        ] {
            // odd size leaves one individual without a crossover partner
            let config = GaConfig::default()
                .with_population(7)
                .with_max_generation(5)
                .with_selection(selection)
                .with_crossover(1.0, OperatorSpec::new(crossover))
                .with_tolerance(0.0)
                .with_seed(3);
            let mut oracle = FnOracle::new(sphere);
            let result = GaRunner::run(&mut oracle, &sphere_problem(), &config, "t").unwrap();
            assert_eq!(result.gen_history.len(), 5);
            for g in &result.gen_history {
                assert_eq!(g.population, 7);
                assert_eq!(g.stats.invalid, 0);
                assert!(g.evaluations <= 7);
            }
            assert!(result.round_trips <= 7 * 6);
        }
    }

    #[test]
    fn test_unchanged_offspring_are_not_reevaluated() {
        let config = GaConfig::default()
            .with_population(6)
            .with_max_generation(4)
            .with_crossover(0.0, OperatorSpec::new("two-point"))
            .with_mutation(0.0, OperatorSpec::new("flip-bit").with_param("indpb", 0.5))
            .with_tolerance(0.0)
            .with_seed(9);
        let mut oracle = FnOracle::new(sphere);
        let result = GaRunner::run(&mut oracle, &sphere_problem(), &config, "t").unwrap();
        assert_eq!(oracle.round_trips(), 6);
        assert!(result.gen_history.iter().all(|g| g.evaluations == 0));
        assert!(result.gen_history.iter().all(|g| g.rate == 0.0));
    }

    #[test]
    fn test_improves_sphere() {
        let config = GaConfig::default()
            .with_population(30)
            .with_max_generation(30)
            .with_crossover(0.7, OperatorSpec::new("blend").with_param("alpha", 0.3))
            .with_mutation(
                0.3,
                OperatorSpec::new("polynomial-bounded")
                    .with_param("eta", 10.0)
                    .with_param("indpb", 0.3),
            )
            .with_tolerance(0.0)
            .with_seed(42);
        let mut oracle = FnOracle::new(sphere);
        let result = GaRunner::run(&mut oracle, &sphere_problem(), &config, "t").unwrap();
        let first = result.gen_history[0].best_target;
        assert!(result.best_target <= first);
        assert!(result.best_target < 1.0, "best = {}", result.best_target);
    }

    #[test]
    fn test_deterministic_with_seed() {
        let config = GaConfig::default()
            .with_population(8)
            .with_max_generation(5)
            .with_seed(77);
        let run = || {
            let mut oracle = FnOracle::new(sphere);
            GaRunner::run(&mut oracle, &sphere_problem(), &config, "t").unwrap()
        };
        let (a, b) = (run(), run());
        assert_eq!(a.best_individual, b.best_individual);
        assert_eq!(a.best_target, b.best_target);
        assert_eq!(a.generations, b.generations);
    }

    #[test]
    fn test_cancellation() {
        let config = GaConfig::default().with_population(4).with_seed(1);
        let flag = Arc::new(AtomicBool::new(true));
        let mut oracle = FnOracle::new(sphere);
        let result =
            GaRunner::run_with_cancel(&mut oracle, &sphere_problem(), &config, "t", Some(flag))
                .unwrap();
        assert_eq!(result.status, Termination::Cancelled);
        assert_eq!(result.generations, 0);
        assert_eq!(oracle.round_trips(), 4);
    }

    #[test]
    fn test_initial_failure_is_an_error() {
        let config = GaConfig::default().with_population(4).with_seed(1);
        let mut oracle = FailingOracle { calls: 0, fail_from: 2 };
        let err = GaRunner::run(&mut oracle, &sphere_problem(), &config, "t").unwrap_err();
        assert!(matches!(err, SimoptError::Channel(ChannelError::Disconnected)));
    }

    #[test]
    fn test_later_failure_aborts_with_partial_history() {
        // Every offspring is mutated, so the first evaluation of
        // generation 1 is the fifth call.
        let config = GaConfig::default()
            .with_population(4)
            .with_mutation(
                1.0,
                OperatorSpec::new("gaussian")
                    .with_param("sigma", 1.0)
                    .with_param("indpb", 1.0),
            )
            .with_seed(2);
        let mut oracle = FailingOracle { calls: 0, fail_from: 5 };
        let result = GaRunner::run(&mut oracle, &sphere_problem(), &config, "t").unwrap();
        assert!(result.is_aborted());
        assert!(result.gen_history.is_empty());
        assert_eq!(result.best_target, 1.0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = GaConfig::default().with_population(1);
        let mut oracle = FnOracle::new(sphere);
        assert!(GaRunner::run(&mut oracle, &sphere_problem(), &config, "t").is_err());
        assert_eq!(oracle.round_trips(), 0);
    }

    #[test]
    fn test_change_treats_equal_sentinels_as_still() {
        assert_eq!(change(f64::NEG_INFINITY, f64::NEG_INFINITY), 0.0);
        assert_eq!(change(5.0, f64::NEG_INFINITY), f64::INFINITY);
        assert_eq!(change(2.0, 5.0), 3.0);
    }
}
