//! GA configuration.
//!
//! [`GaConfig`] holds all parameters that control the evolutionary loop.
//! Operators are named by `{method, params}` the way study files spell
//! them, and are resolved once into closed enums by
//! [`GaConfig::operators`].

use super::operators::{Crossover, Mutation};
use super::selection::Selection;
use crate::error::ConfigError;
use crate::problem::DecisionSpace;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A numeric operator parameter: a scalar, or one value per gene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Scalar(f64),
    List(Vec<f64>),
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Scalar(value)
    }
}

impl From<Vec<f64>> for ParamValue {
    fn from(values: Vec<f64>) -> Self {
        ParamValue::List(values)
    }
}

/// An operator named by method with numeric parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorSpec {
    pub method: String,
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
}

impl OperatorSpec {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Required scalar parameter.
    pub(crate) fn param(&self, key: &str) -> Result<f64, ConfigError> {
        match self.params.get(key) {
            Some(value) => self.scalar(key, value),
            None => Err(self.invalid(format!("missing parameter {key:?}"))),
        }
    }

    /// Optional scalar parameter with a default.
    pub(crate) fn param_or(&self, key: &str, default: f64) -> Result<f64, ConfigError> {
        match self.params.get(key) {
            Some(value) => self.scalar(key, value),
            None => Ok(default),
        }
    }

    /// Optional per-gene parameter; a scalar applies to every gene.
    pub(crate) fn per_gene(&self, key: &str, dim: usize) -> Result<Option<Vec<f64>>, ConfigError> {
        match self.params.get(key) {
            None => Ok(None),
            Some(ParamValue::Scalar(v)) => Ok(Some(vec![*v; dim])),
            Some(ParamValue::List(values)) if values.len() == dim => Ok(Some(values.clone())),
            Some(ParamValue::List(values)) => Err(self.invalid(format!(
                "{key} lists {} values for {dim} decision variables",
                values.len()
            ))),
        }
    }

    /// Required probability parameter in `[0, 1]`.
    pub(crate) fn probability(&self, key: &str) -> Result<f64, ConfigError> {
        let p = self.param(key)?;
        if (0.0..=1.0).contains(&p) {
            Ok(p)
        } else {
            Err(self.invalid(format!("{key} must be within [0, 1], got {p}")))
        }
    }

    pub(crate) fn invalid(&self, reason: String) -> ConfigError {
        ConfigError::OperatorParam {
            method: self.method.clone(),
            reason,
        }
    }

    fn scalar(&self, key: &str, value: &ParamValue) -> Result<f64, ConfigError> {
        match value {
            ParamValue::Scalar(v) => Ok(*v),
            ParamValue::List(_) => Err(self.invalid(format!("{key} must be a single number"))),
        }
    }
}

/// An operator applied with a given probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatedOperator {
    pub rate: f64,
    #[serde(flatten)]
    pub spec: OperatorSpec,
}

impl RatedOperator {
    pub fn new(rate: f64, spec: OperatorSpec) -> Self {
        Self {
            rate: rate.clamp(0.0, 1.0),
            spec,
        }
    }
}

/// Operators resolved from a [`GaConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct Operators {
    pub selection: Selection,
    pub crossover: Crossover,
    pub mutation: Mutation,
}

/// Configuration for the Genetic Algorithm.
///
/// # Defaults
///
/// ```
/// use u_simopt::ga::GaConfig;
///
/// let config = GaConfig::default();
/// assert_eq!(config.population, 50);
/// assert_eq!(config.max_generation, 40);
/// assert_eq!(config.patience, 5);
/// ```
///
/// # Builder Pattern
///
/// ```
/// use u_simopt::ga::{GaConfig, OperatorSpec};
///
/// let config = GaConfig::default()
///     .with_population(25)
///     .with_crossover(0.6, OperatorSpec::new("blend").with_param("alpha", 0.45))
///     .with_selection(OperatorSpec::new("tournament").with_param("tournsize", 3.0))
///     .with_seed(5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaConfig {
    /// Number of individuals in the population.
    pub population: usize,

    /// Crossover operator and the probability of crossing a pair.
    pub crossover: RatedOperator,

    /// Mutation operator and the probability of mutating an individual.
    pub mutation: RatedOperator,

    /// Selection operator.
    pub selection: OperatorSpec,

    /// Maximum number of generations after the initial population.
    pub max_generation: usize,

    /// Best-fitness change below which a generation counts as stagnant.
    pub cvrg_tolerance: f64,

    /// Stagnant generations tolerated; one more stops the run.
    pub patience: usize,

    /// Random seed for reproducibility. `None` draws one.
    pub seed: Option<u64>,

    /// Log every evaluated individual.
    pub verbose: bool,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population: 50,
            crossover: RatedOperator::new(0.5, OperatorSpec::new("two-point")),
            mutation: RatedOperator::new(
                0.15,
                OperatorSpec::new("polynomial-bounded")
                    .with_param("eta", 3.0)
                    .with_param("indpb", 0.05),
            ),
            selection: OperatorSpec::new("tournament").with_param("tournsize", 3.0),
            max_generation: 40,
            cvrg_tolerance: 1e-5,
            patience: 5,
            seed: None,
            verbose: false,
        }
    }
}

impl GaConfig {
    /// Sets the population size.
    pub fn with_population(mut self, n: usize) -> Self {
        self.population = n;
        self
    }

    /// Sets the maximum number of generations.
    pub fn with_max_generation(mut self, n: usize) -> Self {
        self.max_generation = n;
        self
    }

    /// Sets the crossover operator and rate.
    pub fn with_crossover(mut self, rate: f64, spec: OperatorSpec) -> Self {
        self.crossover = RatedOperator::new(rate, spec);
        self
    }

    /// Sets the mutation operator and rate.
    pub fn with_mutation(mut self, rate: f64, spec: OperatorSpec) -> Self {
        self.mutation = RatedOperator::new(rate, spec);
        self
    }

    /// Sets the selection operator.
    pub fn with_selection(mut self, spec: OperatorSpec) -> Self {
        self.selection = spec;
        self
    }

    /// Sets the convergence tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.cvrg_tolerance = tolerance.max(0.0);
        self
    }

    /// Sets how many stagnant generations are tolerated.
    pub fn with_patience(mut self, patience: usize) -> Self {
        self.patience = patience;
        self
    }

    /// Sets the random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Enables per-individual logging.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Validates the scalar parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Ga(msg.to_string()));
        if self.population < 2 {
            return invalid("population must be at least 2");
        }
        if self.max_generation == 0 {
            return invalid("max_generation must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.crossover.rate) {
            return invalid("crossover rate must be within [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.mutation.rate) {
            return invalid("mutation rate must be within [0, 1]");
        }
        if !(self.cvrg_tolerance >= 0.0) {
            return invalid("cvrg_tolerance must be non-negative");
        }
        Ok(())
    }

    /// Validates the configuration and resolves its operators.
    pub fn operators(&self, space: &DecisionSpace) -> Result<Operators, ConfigError> {
        self.validate()?;
        Ok(Operators {
            selection: Selection::from_spec(&self.selection)?,
            crossover: Crossover::from_spec(&self.crossover.spec, space)?,
            mutation: Mutation::from_spec(&self.mutation.spec, space)?,
        })
    }
}
