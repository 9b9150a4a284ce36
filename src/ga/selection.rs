//! Selection strategies for the GA.
//!
//! Selection fills the mating pool from the current population. Strategies
//! work on **minimization keys** (lower = better); the runner converts
//! fitness through [`Direction::key`](crate::problem::Direction::key) so
//! the same code serves both directions. Infinite keys (sentinel fitness)
//! are legal and always lose.
//!
//! # References
//!
//! - Blickle & Thiele (1996), "A Comparison of Selection Schemes used in
//!   Evolutionary Algorithms"
//! - Baker (1987), "Reducing Bias and Inefficiency in the Selection
//!   Algorithm"

use super::config::OperatorSpec;
use crate::error::ConfigError;
use rand::Rng;
use std::cmp::Ordering;

/// Selection strategy for filling the mating pool.
///
/// # Examples
///
/// ```
/// use u_simopt::ga::Selection;
/// use rand::SeedableRng;
///
/// let mut rng = rand::rngs::StdRng::seed_from_u64(5);
/// let pool = Selection::Tournament(3).select_pool(&[4.0, 1.0, 3.0], 3, &mut rng);
/// assert_eq!(pool.len(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Pick `k` individuals at random, keep the best. Repeated per slot.
    Tournament(usize),

    /// The best individuals, in order.
    Best,

    /// Fitness-proportionate selection on inverted keys.
    Roulette,

    /// One spin, equally spaced pointers over the roulette wheel.
    StochasticUniversal,

    /// Linear ranking: weight `n - rank`.
    Rank,

    /// Uniform random choice.
    Random,
}

impl Default for Selection {
    fn default() -> Self {
        Selection::Tournament(3)
    }
}

impl Selection {
    /// Resolves a configured selection operator.
    ///
    /// Accepts both the plain names and the DEAP aliases (`selTournament`,
    /// `selBest`, ...).
    pub fn from_spec(spec: &OperatorSpec) -> Result<Self, ConfigError> {
        match spec.method.as_str() {
            "tournament" | "selTournament" => {
                let k = spec.param("tournsize")?;
                if k < 1.0 || k.fract() != 0.0 {
                    return Err(spec.invalid(format!("tournsize must be a positive integer, got {k}")));
                }
                Ok(Selection::Tournament(k as usize))
            }
            "best" | "selBest" => Ok(Selection::Best),
            "roulette" | "selRoulette" => Ok(Selection::Roulette),
            "stochastic-universal" | "selStochasticUniversalSampling" => {
                Ok(Selection::StochasticUniversal)
            }
            "rank" => Ok(Selection::Rank),
            "random" | "selRandom" => Ok(Selection::Random),
            other => Err(ConfigError::UnknownOperator {
                family: "selection",
                method: other.to_string(),
            }),
        }
    }

    /// Selects `n` indices into `keys`.
    ///
    /// Returns an empty pool when `keys` is empty.
    pub fn select_pool<R: Rng>(&self, keys: &[f64], n: usize, rng: &mut R) -> Vec<usize> {
        if keys.is_empty() {
            return Vec::new();
        }
        match self {
            Selection::Tournament(k) => (0..n).map(|_| tournament(keys, *k, rng)).collect(),
            Selection::Best => best(keys, n),
            Selection::Roulette => {
                let weights = inverse_weights(keys);
                (0..n).map(|_| spin(&weights, rng)).collect()
            }
            Selection::StochasticUniversal => stochastic_universal(keys, n, rng),
            Selection::Rank => rank(keys, n, rng),
            Selection::Random => (0..n).map(|_| rng.random_range(0..keys.len())).collect(),
        }
    }
}

fn by_key(keys: &[f64]) -> impl Fn(&usize, &usize) -> Ordering + '_ {
    |a, b| keys[*a].partial_cmp(&keys[*b]).unwrap_or(Ordering::Equal)
}

/// Tournament selection: pick k random individuals, return best.
fn tournament<R: Rng>(keys: &[f64], k: usize, rng: &mut R) -> usize {
    let n = keys.len();
    let mut best_idx = rng.random_range(0..n);
    for _ in 1..k.max(1) {
        let idx = rng.random_range(0..n);
        if keys[idx] < keys[best_idx] {
            best_idx = idx;
        }
    }
    best_idx
}

/// The `n` best indices; cycles through the ranking when `n` exceeds it.
fn best(keys: &[f64], n: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(by_key(keys));
    order.iter().copied().cycle().take(n).collect()
}

/// Roulette weights for minimization: `worst - key + epsilon`.
///
/// Only finite keys are considered; non-finite keys get zero weight.
fn inverse_weights(keys: &[f64]) -> Vec<f64> {
    let worst = keys
        .iter()
        .copied()
        .filter(|k| k.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    let epsilon = 1e-10;
    keys.iter()
        .map(|&k| if k.is_finite() { worst - k + epsilon } else { 0.0 })
        .collect()
}

fn spin<R: Rng>(weights: &[f64], rng: &mut R) -> usize {
    let total: f64 = weights.iter().sum();
    if !(total > 0.0) {
        return rng.random_range(0..weights.len());
    }
    let threshold = rng.random_range(0.0..total);
    let mut cumulative = 0.0;
    for (i, &w) in weights.iter().enumerate() {
        cumulative += w;
        if cumulative > threshold {
            return i;
        }
    }
    weights.len() - 1 // floating-point fallback
}

fn stochastic_universal<R: Rng>(keys: &[f64], n: usize, rng: &mut R) -> Vec<usize> {
    let weights = inverse_weights(keys);
    let total: f64 = weights.iter().sum();
    if !(total > 0.0) || n == 0 {
        return (0..n).map(|_| rng.random_range(0..keys.len())).collect();
    }

    let distance = total / n as f64;
    let start = rng.random_range(0.0..distance);
    let mut pool = Vec::with_capacity(n);
    let mut i = 0;
    let mut cumulative = weights[0];
    for p in 0..n {
        let point = start + p as f64 * distance;
        while cumulative <= point && i + 1 < weights.len() {
            i += 1;
            cumulative += weights[i];
        }
        pool.push(i);
    }
    pool
}

fn rank<R: Rng>(keys: &[f64], n: usize, rng: &mut R) -> Vec<usize> {
    let len = keys.len();
    let mut order: Vec<usize> = (0..len).collect();
    order.sort_by(by_key(keys));

    // rank 0 (best) gets weight len
    let weights: Vec<f64> = (0..len).map(|r| (len - r) as f64).collect();
    (0..n).map(|_| order[spin(&weights, rng)]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn counts(selection: Selection, keys: &[f64], draws: usize) -> Vec<u32> {
        let mut rng = StdRng::seed_from_u64(42);
        let mut counts = vec![0u32; keys.len()];
        for idx in selection.select_pool(keys, draws, &mut rng) {
            counts[idx] += 1;
        }
        counts
    }

    #[test]
    fn test_tournament_favors_best() {
        let counts = counts(Selection::Tournament(4), &[10.0, 5.0, 1.0, 8.0], 10000);
        assert!(
            counts[2] > 6000,
            "expected best to be selected >60% of the time, got {counts:?}"
        );
    }

    #[test]
    fn test_tournament_size_1_is_random() {
        let counts = counts(Selection::Tournament(1), &[10.0, 5.0, 1.0, 8.0], 10000);
        for &c in &counts {
            assert!(c > 1500, "expected uniform, got counts: {counts:?}");
        }
    }

    #[test]
    fn test_tournament_avoids_sentinels() {
        let inf = f64::INFINITY;
        let counts = counts(Selection::Tournament(3), &[inf, 2.0, inf, inf], 10000);
        assert!(counts[1] > counts[0]);
    }

    #[test]
    fn test_best_orders_and_cycles() {
        let mut rng = StdRng::seed_from_u64(1);
        let keys = [3.0, 1.0, 2.0];
        assert_eq!(Selection::Best.select_pool(&keys, 3, &mut rng), vec![1, 2, 0]);
        assert_eq!(
            Selection::Best.select_pool(&keys, 5, &mut rng),
            vec![1, 2, 0, 1, 2]
        );
    }

    #[test]
    fn test_roulette_favors_best() {
        let counts = counts(Selection::Roulette, &[100.0, 50.0, 1.0, 80.0], 10000);
        assert!(counts[2] > counts[0], "got {counts:?}");
    }

    #[test]
    fn test_roulette_never_picks_sentinel_when_finite_exist() {
        let counts = counts(Selection::Roulette, &[f64::INFINITY, 3.0, 1.0], 5000);
        assert_eq!(counts[0], 0);
    }

    #[test]
    fn test_roulette_all_sentinels_is_uniform() {
        let inf = f64::INFINITY;
        let counts = counts(Selection::Roulette, &[inf, inf, inf, inf], 10000);
        for &c in &counts {
            assert!(c > 1500, "got {counts:?}");
        }
    }

    #[test]
    fn test_stochastic_universal_spreads_pointers() {
        let mut rng = StdRng::seed_from_u64(7);
        // equal weights: one pointer lands in each slot
        let pool = Selection::StochasticUniversal.select_pool(&[5.0, 5.0, 5.0, 5.0], 4, &mut rng);
        assert_eq!(pool, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_stochastic_universal_favors_best() {
        let counts = counts(Selection::StochasticUniversal, &[100.0, 50.0, 1.0, 80.0], 1000);
        assert!(counts[2] > counts[0], "got {counts:?}");
    }

    #[test]
    fn test_rank_favors_best() {
        let counts = counts(Selection::Rank, &[100.0, 50.0, 1.0, 80.0], 10000);
        assert!(counts[2] > counts[0], "got {counts:?}");
    }

    #[test]
    fn test_single_individual() {
        let mut rng = StdRng::seed_from_u64(42);
        for s in [
            Selection::Tournament(3),
            Selection::Best,
            Selection::Roulette,
            Selection::StochasticUniversal,
            Selection::Rank,
            Selection::Random,
        ] {
            assert_eq!(s.select_pool(&[5.0], 3, &mut rng), vec![0, 0, 0]);
        }
    }

    #[test]
    fn test_empty_keys() {
        let mut rng = StdRng::seed_from_u64(42);
        assert!(Selection::Roulette.select_pool(&[], 3, &mut rng).is_empty());
    }

    #[test]
    fn test_from_spec_aliases() {
        let t = OperatorSpec::new("selTournament").with_param("tournsize", 3.0);
        assert_eq!(Selection::from_spec(&t).unwrap(), Selection::Tournament(3));
        assert_eq!(
            Selection::from_spec(&OperatorSpec::new("selBest")).unwrap(),
            Selection::Best
        );
        assert_eq!(
            Selection::from_spec(&OperatorSpec::new("roulette")).unwrap(),
            Selection::Roulette
        );
        assert!(Selection::from_spec(&OperatorSpec::new("tournament")).is_err());
        let bad = OperatorSpec::new("tournament").with_param("tournsize", 2.5);
        assert!(Selection::from_spec(&bad).is_err());
    }
}
