//! Optimization problem definition.
//!
//! A [`Problem`] describes what the GA searches and what the engine is
//! asked for: the decision variables and their bounds, the base-case model
//! inputs, the output variables to export, and the target variable whose
//! value is the fitness.

use crate::error::ConfigError;
use crate::named::NamedValues;
use serde::{Deserialize, Serialize};

/// Optimization direction for the target variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[serde(alias = "min")]
    Minimize,
    #[default]
    #[serde(alias = "max")]
    Maximize,
}

impl Direction {
    /// The worst possible fitness, substituted for failed evaluations.
    pub fn sentinel(self) -> f64 {
        match self {
            Direction::Minimize => f64::INFINITY,
            Direction::Maximize => f64::NEG_INFINITY,
        }
    }

    /// Maps a fitness to a minimization key (lower is better).
    pub fn key(self, fitness: f64) -> f64 {
        match self {
            Direction::Minimize => fitness,
            Direction::Maximize => -fitness,
        }
    }

    /// Whether `a` is strictly better than `b`.
    pub fn is_better(self, a: f64, b: f64) -> bool {
        self.key(a) < self.key(b)
    }
}

/// A named decision variable with inclusive bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionVariable {
    pub name: String,
    pub low: f64,
    pub high: f64,
}

impl DecisionVariable {
    pub fn new(name: impl Into<String>, low: f64, high: f64) -> Self {
        Self {
            name: name.into(),
            low,
            high,
        }
    }

    /// Whether `value` is acceptable for this variable.
    ///
    /// Values must lie within the bounds and be strictly positive: the
    /// engine's models treat zero or negative flows and temperatures as
    /// meaningless.
    pub fn admits(&self, value: f64) -> bool {
        value > 0.0 && value >= self.low && value <= self.high
    }
}

/// Ordered decision variables; the order is the gene layout.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "NamedValues<(f64, f64)>", into = "NamedValues<(f64, f64)>")]
pub struct DecisionSpace {
    vars: Vec<DecisionVariable>,
}

impl From<NamedValues<(f64, f64)>> for DecisionSpace {
    fn from(bounds: NamedValues<(f64, f64)>) -> Self {
        Self {
            vars: bounds
                .into_vec()
                .into_iter()
                .map(|(name, (low, high))| DecisionVariable { name, low, high })
                .collect(),
        }
    }
}

impl From<DecisionSpace> for NamedValues<(f64, f64)> {
    fn from(space: DecisionSpace) -> Self {
        space
            .vars
            .into_iter()
            .map(|v| (v.name, (v.low, v.high)))
            .collect()
    }
}

impl DecisionSpace {
    pub fn new(vars: Vec<DecisionVariable>) -> Self {
        Self { vars }
    }

    /// Appends a variable.
    pub fn with(mut self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.vars.push(DecisionVariable::new(name, low, high));
        self
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn vars(&self) -> &[DecisionVariable] {
        &self.vars
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.iter().map(|v| v.name.as_str())
    }

    pub fn lows(&self) -> Vec<f64> {
        self.vars.iter().map(|v| v.low).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.vars.iter().map(|v| v.high).collect()
    }

    /// Position of `name` in the gene layout.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.vars.iter().position(|v| v.name == name)
    }

    /// Whether every gene is admitted by its variable.
    pub fn admits(&self, genes: &[f64]) -> bool {
        genes.len() == self.vars.len()
            && self.vars.iter().zip(genes).all(|(var, &g)| var.admits(g))
    }

    /// Pairs each variable name with its gene.
    pub fn label(&self, genes: &[f64]) -> NamedValues<f64> {
        self.names()
            .zip(genes.iter().copied())
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vars.is_empty() {
            return Err(ConfigError::Ga("at least one decision variable is required".into()));
        }
        for (i, var) in self.vars.iter().enumerate() {
            let invalid = |reason: &str| ConfigError::DecisionVariable {
                name: var.name.clone(),
                reason: reason.to_string(),
            };
            if !var.low.is_finite() || !var.high.is_finite() {
                return Err(invalid("bounds must be finite"));
            }
            if var.low > var.high {
                return Err(invalid("lower bound exceeds upper bound"));
            }
            if self.vars[..i].iter().any(|v| v.name == var.name) {
                return Err(invalid("declared twice"));
            }
        }
        Ok(())
    }
}

/// Everything the evaluation layer needs to score a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    /// Output variable whose value is the fitness.
    pub target: String,

    #[serde(default)]
    pub direction: Direction,

    pub decision_variables: DecisionSpace,

    /// Default value of every model input; decision variables override these.
    pub base_inputs: NamedValues<f64>,

    /// Output variables exported after each solve. Must include the target.
    pub outputs: Vec<String>,
}

impl Problem {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.decision_variables.validate()?;
        if !self.outputs.iter().any(|o| *o == self.target) {
            return Err(ConfigError::TargetNotInOutputs(self.target.clone()));
        }
        if let Some(missing) = self
            .decision_variables
            .names()
            .find(|name| !self.base_inputs.contains(name))
        {
            return Err(ConfigError::MissingBaseInput(missing.to_string()));
        }
        Ok(())
    }
}
