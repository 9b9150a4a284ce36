//! Study file loading.
//!
//! A study file bundles everything one optimization run needs: how to
//! reach the engine, what to optimize, and how to search. TOML and JSON are
//! accepted, chosen by file extension.
//!
//! ```toml
//! target = "EUF_sys"
//! direction = "max"
//! outputs = ["W_net", "EUF_sys"]
//! results_dir = "results"
//!
//! [session]
//! executable = "C:/EES32/EES.exe"
//! model = "models/cogeneration.EES"
//!
//! [decision_variables]
//! "T[3]" = [400.0, 500.0]
//! rp = [2.0, 5.0]
//!
//! [base_inputs]
//! "T[1]" = 25.0
//! "T[3]" = 468.0
//! rp = 3.22
//!
//! [ga]
//! population = 50
//! seed = 5
//! ```

use crate::error::ConfigError;
use crate::evaluation::EvaluatorOptions;
use crate::ga::GaConfig;
use crate::named::NamedValues;
use crate::problem::{DecisionSpace, Direction, Problem};
use crate::session::SessionConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// One optimization study, as read from disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyConfig {
    pub session: SessionConfig,

    /// Output variable whose value is the fitness.
    pub target: String,

    #[serde(default)]
    pub direction: Direction,

    pub decision_variables: DecisionSpace,

    pub base_inputs: NamedValues<f64>,

    /// Output variables exported after each solve.
    pub outputs: Vec<String>,

    #[serde(default)]
    pub ga: GaConfig,

    #[serde(default)]
    pub evaluation: EvaluatorOptions,

    /// Directory receiving one sub-directory per run.
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,

    /// Fixed run id. Defaults to the launch time in unix seconds.
    #[serde(default)]
    pub run_id: Option<String>,
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

impl StudyConfig {
    /// Reads a study file, by extension: `.toml` or `.json`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&text),
            Some("json") => Self::from_json_str(&text),
            other => Err(ConfigError::UnsupportedFormat(other.unwrap_or("").to_string())),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// The problem definition shared by the evaluator and the GA.
    pub fn problem(&self) -> Problem {
        Problem {
            target: self.target.clone(),
            direction: self.direction,
            decision_variables: self.decision_variables.clone(),
            base_inputs: self.base_inputs.clone(),
            outputs: self.outputs.clone(),
        }
    }

    /// Checks the problem, the GA parameters and operators, and that the
    /// model file exists.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.problem().validate()?;
        self.ga.operators(&self.decision_variables)?;
        if !self.session.model.is_file() {
            return Err(ConfigError::ModelNotFound(
                self.session.model.display().to_string(),
            ));
        }
        Ok(())
    }

    /// The configured run id, or the current unix time in seconds.
    pub fn run_id(&self) -> String {
        self.run_id.clone().unwrap_or_else(timestamp_id)
    }
}

/// Current unix time in seconds.
pub fn timestamp_id() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    const STUDY: &str = r#"
target = "EUF_sys"
direction = "max"
outputs = ["W_net", "EUF_sys"]

[session]
executable = "engine"
model = "plant.model"
warmup = 2

[decision_variables]
"T[3]" = [400.0, 500.0]
rp = [2, 5]

[base_inputs]
"T[1]" = 25.0
"T[3]" = 468.0
rp = 3.22

[ga]
population = 20
seed = 5

[ga.crossover]
rate = 0.6
method = "cxBlend"
params = { alpha = 0.45 }

[evaluation]
infeasible_fitness = 0.0
"#;

    #[test]
    fn test_parse_toml_study() {
        let study = StudyConfig::from_toml_str(STUDY).unwrap();
        assert_eq!(study.target, "EUF_sys");
        assert_eq!(study.direction, Direction::Maximize);
        assert_eq!(study.session.warmup, Duration::from_secs(2));
        assert_eq!(study.session.args, vec!["/hide".to_string()]);

        let names: Vec<&str> = study.decision_variables.names().collect();
        assert_eq!(names, vec!["T[3]", "rp"]);
        assert_eq!(study.decision_variables.highs(), vec![500.0, 5.0]);
        assert_eq!(study.base_inputs.names().collect::<Vec<_>>(), vec!["T[1]", "T[3]", "rp"]);

        assert_eq!(study.ga.population, 20);
        assert_eq!(study.ga.seed, Some(5));
        assert_eq!(study.ga.crossover.spec.method, "cxBlend");
        assert_eq!(study.ga.max_generation, 40);
        assert_eq!(study.evaluation.infeasible_fitness, Some(0.0));
        assert_eq!(study.evaluation.max_parse_failures, 3);
        assert_eq!(study.results_dir, PathBuf::from("results"));
        assert!(study.run_id.is_none());
    }

    #[test]
    fn test_json_matches_toml() {
        let study = StudyConfig::from_toml_str(STUDY).unwrap();
        let json = serde_json::to_string(&study).unwrap();
        assert_eq!(StudyConfig::from_json_str(&json).unwrap(), study);
    }

    #[test]
    fn test_validate_requires_model_file() {
        let mut study = StudyConfig::from_toml_str(STUDY).unwrap();
        study.session.model = PathBuf::from("/definitely/not/here.model");
        assert!(matches!(study.validate(), Err(ConfigError::ModelNotFound(_))));

        let model = tempfile::NamedTempFile::new().unwrap();
        study.session.model = model.path().to_path_buf();
        study.validate().unwrap();
    }

    #[test]
    fn test_validate_target_in_outputs() {
        let mut study = StudyConfig::from_toml_str(STUDY).unwrap();
        study.outputs = vec!["W_net".into()];
        assert!(matches!(study.validate(), Err(ConfigError::TargetNotInOutputs(_))));
    }

    #[test]
    fn test_from_path_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = dir.path().join("study.toml");
        fs::File::create(&toml_path)
            .unwrap()
            .write_all(STUDY.as_bytes())
            .unwrap();
        assert_eq!(StudyConfig::from_path(&toml_path).unwrap().target, "EUF_sys");

        let yaml_path = dir.path().join("study.yaml");
        fs::write(&yaml_path, "target: x").unwrap();
        assert!(matches!(
            StudyConfig::from_path(&yaml_path),
            Err(ConfigError::UnsupportedFormat(ext)) if ext == "yaml"
        ));

        assert!(matches!(
            StudyConfig::from_path(dir.path().join("missing.toml")),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_run_id() {
        let mut study = StudyConfig::from_toml_str(STUDY).unwrap();
        assert!(study.run_id().parse::<u64>().is_ok());
        study.run_id = Some("baseline".into());
        assert_eq!(study.run_id(), "baseline");
    }
}
