//! Real-valued genetic operators.
//!
//! Crossover and mutation for decision vectors of `f64` genes. Operators
//! are closed enums resolved once from an [`OperatorSpec`]; the bounded
//! variants capture the decision-variable bounds at resolution time.
//! Both families return new gene vectors and never touch their inputs.
//!
//! # Crossover Operators
//!
//! - [`Crossover::OnePoint`], [`Crossover::TwoPoint`]: segment exchange
//! - [`Crossover::Uniform`]: per-gene swap
//! - [`Crossover::Blend`]: BLX-α (Eshelman & Schaffer, 1993)
//! - [`Crossover::SimulatedBinaryBounded`]: SBX (Deb & Agrawal, 1995)
//!
//! # Mutation Operators
//!
//! - [`Mutation::Gaussian`]: additive normal noise
//! - [`Mutation::PolynomialBounded`]: Deb's polynomial mutation
//! - [`Mutation::UniformInt`]: integer resample within bounds
//! - [`Mutation::FlipBit`]: zero/non-zero toggle
//!
//! # References
//!
//! - Eshelman & Schaffer (1993), "Real-Coded Genetic Algorithms and
//!   Interval-Schemata"
//! - Deb & Agrawal (1995), "Simulated Binary Crossover for Continuous
//!   Search Space"
//! - Deb & Goyal (1996), "A Combined Genetic Adaptive Search (GeneAS) for
//!   Engineering Design"

use super::config::OperatorSpec;
use crate::error::ConfigError;
use crate::problem::DecisionSpace;
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Per-gene inclusive bounds, in gene order.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    pub low: Vec<f64>,
    pub high: Vec<f64>,
}

impl Bounds {
    pub fn of(space: &DecisionSpace) -> Self {
        Self {
            low: space.lows(),
            high: space.highs(),
        }
    }

    /// Bounds for an operator: its `low`/`up` parameters where given, the
    /// decision-variable bounds otherwise.
    pub fn from_spec(spec: &OperatorSpec, space: &DecisionSpace) -> Result<Self, ConfigError> {
        let dim = space.len();
        let low = spec.per_gene("low", dim)?.unwrap_or_else(|| space.lows());
        let high = spec.per_gene("up", dim)?.unwrap_or_else(|| space.highs());
        if let Some(i) = (0..dim).find(|&i| !(low[i] <= high[i])) {
            return Err(spec.invalid(format!(
                "low {} exceeds up {} for gene {i}",
                low[i], high[i]
            )));
        }
        Ok(Self { low, high })
    }
}

// ============================================================================
// Crossover operators
// ============================================================================

/// Crossover operator for a pair of parents.
#[derive(Debug, Clone, PartialEq)]
pub enum Crossover {
    /// Swap the tails after one random cut point.
    OnePoint,

    /// Swap the segment between two random cut points.
    TwoPoint,

    /// Swap each gene independently with probability `indpb`.
    Uniform { indpb: f64 },

    /// BLX-α: both children on the line through the parents, extended by
    /// `alpha` on each side.
    Blend { alpha: f64 },

    /// Bounded SBX with distribution index `eta`.
    ///
    /// High `eta` keeps children close to their parents.
    SimulatedBinaryBounded { eta: f64, bounds: Bounds },
}

impl Crossover {
    /// Resolves a configured crossover operator.
    ///
    /// Accepts both the plain names and the DEAP aliases (`cxTwoPoint`,
    /// `cxBlend`, ...).
    pub fn from_spec(spec: &OperatorSpec, space: &DecisionSpace) -> Result<Self, ConfigError> {
        match spec.method.as_str() {
            "one-point" | "cxOnePoint" => Ok(Crossover::OnePoint),
            "two-point" | "cxTwoPoint" => Ok(Crossover::TwoPoint),
            "uniform" | "cxUniform" => Ok(Crossover::Uniform {
                indpb: spec.probability("indpb")?,
            }),
            "blend" | "cxBlend" => {
                let alpha = spec.param("alpha")?;
                if !(alpha >= 0.0) {
                    return Err(spec.invalid(format!("alpha must be non-negative, got {alpha}")));
                }
                Ok(Crossover::Blend { alpha })
            }
            "simulated-binary-bounded" | "cxSimulatedBinaryBounded" => Ok(
                Crossover::SimulatedBinaryBounded {
                    eta: distribution_index(spec)?,
                    bounds: Bounds::from_spec(spec, space)?,
                },
            ),
            other => Err(ConfigError::UnknownOperator {
                family: "crossover",
                method: other.to_string(),
            }),
        }
    }

    /// Produces two children from two parents.
    ///
    /// Parents shorter than two genes pass through unchanged for the
    /// cut-point variants.
    pub fn apply<R: Rng>(&self, p1: &[f64], p2: &[f64], rng: &mut R) -> (Vec<f64>, Vec<f64>) {
        let mut c1 = p1.to_vec();
        let mut c2 = p2.to_vec();
        let size = c1.len().min(c2.len());

        match self {
            Crossover::OnePoint => {
                if size >= 2 {
                    let cx = rng.random_range(1..size);
                    c1[cx..size].swap_with_slice(&mut c2[cx..size]);
                }
            }
            Crossover::TwoPoint => {
                if size >= 2 {
                    let (a, b) = cut_points(size, rng);
                    c1[a..b].swap_with_slice(&mut c2[a..b]);
                }
            }
            Crossover::Uniform { indpb } => {
                for i in 0..size {
                    if rng.random::<f64>() < *indpb {
                        std::mem::swap(&mut c1[i], &mut c2[i]);
                    }
                }
            }
            Crossover::Blend { alpha } => {
                for i in 0..size {
                    let gamma = (1.0 + 2.0 * alpha) * rng.random::<f64>() - alpha;
                    let (x1, x2) = (c1[i], c2[i]);
                    c1[i] = (1.0 - gamma) * x1 + gamma * x2;
                    c2[i] = gamma * x1 + (1.0 - gamma) * x2;
                }
            }
            Crossover::SimulatedBinaryBounded { eta, bounds } => {
                for i in 0..size.min(bounds.low.len()) {
                    if rng.random::<f64>() > 0.5 {
                        continue;
                    }
                    if (c1[i] - c2[i]).abs() <= 1e-14 {
                        continue;
                    }
                    let (y1, y2) = sbx_pair(c1[i], c2[i], bounds.low[i], bounds.high[i], *eta, rng);
                    if rng.random::<f64>() <= 0.5 {
                        c1[i] = y2;
                        c2[i] = y1;
                    } else {
                        c1[i] = y1;
                        c2[i] = y2;
                    }
                }
            }
        }

        (c1, c2)
    }
}

/// Two distinct cut points `a < b` in `1..=size`.
fn cut_points<R: Rng>(size: usize, rng: &mut R) -> (usize, usize) {
    let a = rng.random_range(1..=size);
    let mut b = rng.random_range(1..size);
    if b >= a {
        b += 1;
        (a, b)
    } else {
        (b, a)
    }
}

/// One SBX spread for a single gene, clamped to `[low, high]`.
fn sbx_pair<R: Rng>(a: f64, b: f64, low: f64, high: f64, eta: f64, rng: &mut R) -> (f64, f64) {
    let (x1, x2) = if a < b { (a, b) } else { (b, a) };
    let u: f64 = rng.random();
    let exponent = 1.0 / (eta + 1.0);

    let spread = |beta: f64| {
        let alpha = 2.0 - beta.powf(-(eta + 1.0));
        if u <= 1.0 / alpha {
            (u * alpha).powf(exponent)
        } else {
            (1.0 / (2.0 - u * alpha)).powf(exponent)
        }
    };

    let beta_low = 1.0 + 2.0 * (x1 - low) / (x2 - x1);
    let y1 = 0.5 * (x1 + x2 - spread(beta_low) * (x2 - x1));
    let beta_high = 1.0 + 2.0 * (high - x2) / (x2 - x1);
    let y2 = 0.5 * (x1 + x2 + spread(beta_high) * (x2 - x1));

    (y1.clamp(low, high), y2.clamp(low, high))
}

// ============================================================================
// Mutation operators
// ============================================================================

/// Mutation operator for a single individual.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Add `N(mu, sigma)` to each gene with probability `indpb`.
    Gaussian { mu: f64, sigma: f64, indpb: f64 },

    /// Polynomial mutation within bounds, distribution index `eta`.
    PolynomialBounded { eta: f64, indpb: f64, bounds: Bounds },

    /// Replace a gene by a uniform integer within its bounds.
    UniformInt { indpb: f64, bounds: Bounds },

    /// Toggle a gene between zero and one.
    FlipBit { indpb: f64 },
}

impl Mutation {
    /// Resolves a configured mutation operator.
    ///
    /// Accepts both the plain names and the DEAP aliases (`mutGaussian`,
    /// `mutPolynomialBounded`, ...).
    pub fn from_spec(spec: &OperatorSpec, space: &DecisionSpace) -> Result<Self, ConfigError> {
        match spec.method.as_str() {
            "gaussian" | "mutGaussian" => {
                let sigma = spec.param("sigma")?;
                if !(sigma >= 0.0) || !sigma.is_finite() {
                    return Err(spec.invalid(format!("sigma must be finite and non-negative, got {sigma}")));
                }
                Ok(Mutation::Gaussian {
                    mu: spec.param_or("mu", 0.0)?,
                    sigma,
                    indpb: spec.probability("indpb")?,
                })
            }
            "polynomial-bounded" | "mutPolynomialBounded" => Ok(Mutation::PolynomialBounded {
                eta: distribution_index(spec)?,
                indpb: spec.probability("indpb")?,
                bounds: Bounds::from_spec(spec, space)?,
            }),
            "uniform-int" | "mutUniformInt" => Ok(Mutation::UniformInt {
                indpb: spec.probability("indpb")?,
                bounds: Bounds::from_spec(spec, space)?,
            }),
            "flip-bit" | "mutFlipBit" => Ok(Mutation::FlipBit {
                indpb: spec.probability("indpb")?,
            }),
            other => Err(ConfigError::UnknownOperator {
                family: "mutation",
                method: other.to_string(),
            }),
        }
    }

    /// Returns a mutated copy of `genes`.
    pub fn apply<R: Rng>(&self, genes: &[f64], rng: &mut R) -> Vec<f64> {
        let mut out = genes.to_vec();
        match self {
            Mutation::Gaussian { mu, sigma, indpb } => {
                // sigma is validated at resolution
                if let Ok(noise) = Normal::new(*mu, *sigma) {
                    for x in out.iter_mut() {
                        if rng.random::<f64>() < *indpb {
                            *x += noise.sample(rng);
                        }
                    }
                }
            }
            Mutation::PolynomialBounded { eta, indpb, bounds } => {
                for (i, x) in out.iter_mut().enumerate().take(bounds.low.len()) {
                    if rng.random::<f64>() <= *indpb {
                        *x = polynomial(*x, bounds.low[i], bounds.high[i], *eta, rng);
                    }
                }
            }
            Mutation::UniformInt { indpb, bounds } => {
                for (i, x) in out.iter_mut().enumerate().take(bounds.low.len()) {
                    if rng.random::<f64>() < *indpb {
                        let low = bounds.low[i].ceil();
                        let high = bounds.high[i].floor();
                        if low <= high {
                            *x = rng.random_range(low as i64..=high as i64) as f64;
                        }
                    }
                }
            }
            Mutation::FlipBit { indpb } => {
                for x in out.iter_mut() {
                    if rng.random::<f64>() < *indpb {
                        *x = if *x == 0.0 { 1.0 } else { 0.0 };
                    }
                }
            }
        }
        out
    }
}

/// Polynomial mutation of one gene.
fn polynomial<R: Rng>(x: f64, low: f64, high: f64, eta: f64, rng: &mut R) -> f64 {
    let span = high - low;
    if !(span > 0.0) {
        return x;
    }
    let delta_1 = (x - low) / span;
    let delta_2 = (high - x) / span;
    let u: f64 = rng.random();
    let power = 1.0 / (eta + 1.0);

    let delta_q = if u < 0.5 {
        let xy = 1.0 - delta_1;
        let val = 2.0 * u + (1.0 - 2.0 * u) * xy.powf(eta + 1.0);
        val.powf(power) - 1.0
    } else {
        let xy = 1.0 - delta_2;
        let val = 2.0 * (1.0 - u) + 2.0 * (u - 0.5) * xy.powf(eta + 1.0);
        1.0 - val.powf(power)
    };

    (x + delta_q * span).clamp(low, high)
}

fn distribution_index(spec: &OperatorSpec) -> Result<f64, ConfigError> {
    let eta = spec.param("eta")?;
    if eta >= 0.0 && eta.is_finite() {
        Ok(eta)
    } else {
        Err(spec.invalid(format!("eta must be finite and non-negative, got {eta}")))
    }
}

// ============================================================================
// Tests
// ============================================================================
