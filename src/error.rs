//! Error taxonomy.
//!
//! Failures that cross module boundaries:
//!
//! - [`SessionStartError`]: the engine could not be launched or did not
//!   accept the handshake. Fatal to a run.
//! - [`ChannelError`]: a single command/response round trip failed.
//!   Transient; the evaluation layer substitutes the sentinel fitness and
//!   restarts the session after repeated failures.
//! - [`ConfigError`]: invalid study or GA configuration, caught before the
//!   engine is launched.
//!
//! Data-level conditions (a gene out of bounds, an unparsable output token)
//! are not errors; they are folded into the sentinel fitness.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// The engine could not be brought up.
#[derive(Debug, Error)]
#[error("failed to start solver session: {reason}")]
pub struct SessionStartError {
    pub reason: String,
    #[source]
    pub source: Option<ChannelError>,
}

impl SessionStartError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            source: None,
        }
    }

    pub fn with_source(reason: impl Into<String>, source: ChannelError) -> Self {
        Self {
            reason: reason.into(),
            source: Some(source),
        }
    }
}

/// Transient failure in a single command/response round trip.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("transport failure: {0}")]
    Transport(#[from] io::Error),

    #[error("malformed acknowledgment: {0:?}")]
    MalformedAck(String),

    #[error("engine rejected command: {0}")]
    Rejected(String),

    #[error("no reply within {0:?}")]
    Timeout(Duration),

    #[error("engine closed the channel")]
    Disconnected,

    #[error("solver session is not open")]
    NotOpen,

    #[error("command is {len} characters, limit is {max}")]
    CommandTooLong { len: usize, max: usize },
}

/// Invalid configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid GA configuration: {0}")]
    Ga(String),

    #[error("unknown {family} operator {method:?}")]
    UnknownOperator { family: &'static str, method: String },

    #[error("operator {method:?}: {reason}")]
    OperatorParam { method: String, reason: String },

    #[error("invalid decision variable {name:?}: {reason}")]
    DecisionVariable { name: String, reason: String },

    #[error("target variable {0:?} is not among the requested outputs")]
    TargetNotInOutputs(String),

    #[error("decision variable {0:?} has no base-case input")]
    MissingBaseInput(String),

    #[error("model file not found: {0}")]
    ModelNotFound(String),

    #[error("unsupported study file extension: {0:?}")]
    UnsupportedFormat(String),

    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Top-level error for a study run.
#[derive(Debug, Error)]
pub enum SimoptError {
    #[error(transparent)]
    SessionStart(#[from] SessionStartError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to persist run result: {0}")]
    Persist(#[source] io::Error),

    #[error("failed to encode run result: {0}")]
    Encode(#[source] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimoptError>;
