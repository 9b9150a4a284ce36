//! Session configuration.

use crate::codec::DEFAULT_MAX_COMMAND_LEN;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Settings for launching and talking to the engine.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use u_simopt::session::SessionConfig;
///
/// let config = SessionConfig::new("EES.exe", "models/plant.EES")
///     .with_warmup(Duration::from_secs(5))
///     .with_reply_timeout(Some(Duration::from_secs(120)));
/// assert_eq!(config.args, vec!["/hide".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Engine executable.
    pub executable: PathBuf,

    /// Model file loaded right after launch.
    pub model: PathBuf,

    /// Launch arguments. The default starts the engine hidden.
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Extra commands sent after the model is loaded (units, options, ...).
    #[serde(default)]
    pub setup_commands: Vec<String>,

    /// Time the engine needs after launch before it accepts commands.
    #[serde(default = "default_warmup", with = "secs")]
    pub warmup: Duration,

    /// Time given to the OS to release resources after shutdown.
    #[serde(default = "default_settle", with = "secs")]
    pub settle: Duration,

    /// Upper bound on a single round trip. `None` waits forever.
    #[serde(default = "default_reply_timeout", with = "opt_secs")]
    pub reply_timeout: Option<Duration>,

    /// Longest wait for the engine to acknowledge `[QUIT]` before it is
    /// terminated.
    #[serde(default = "default_quit_timeout", with = "secs")]
    pub quit_timeout: Duration,

    /// Usable length of the variable list in one `Import`/`Export`.
    #[serde(default = "default_max_command_len")]
    pub max_command_len: usize,
}

fn default_args() -> Vec<String> {
    vec!["/hide".to_string()]
}

fn default_warmup() -> Duration {
    Duration::from_secs(15)
}

fn default_settle() -> Duration {
    Duration::from_secs(10)
}

fn default_reply_timeout() -> Option<Duration> {
    Some(Duration::from_secs(600))
}

fn default_quit_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_command_len() -> usize {
    DEFAULT_MAX_COMMAND_LEN
}

impl SessionConfig {
    pub fn new(executable: impl Into<PathBuf>, model: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            model: model.into(),
            args: default_args(),
            setup_commands: Vec::new(),
            warmup: default_warmup(),
            settle: default_settle(),
            reply_timeout: default_reply_timeout(),
            quit_timeout: default_quit_timeout(),
            max_command_len: default_max_command_len(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_setup_command(mut self, command: impl Into<String>) -> Self {
        self.setup_commands.push(command.into());
        self
    }

    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn with_reply_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.reply_timeout = timeout;
        self
    }

    pub fn with_quit_timeout(mut self, timeout: Duration) -> Self {
        self.quit_timeout = timeout;
        self
    }

    pub fn with_max_command_len(mut self, len: usize) -> Self {
        self.max_command_len = len.max(1);
        self
    }
}

/// Durations as fractional seconds.
mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

mod opt_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&d.as_secs_f64()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Option::<f64>::deserialize(d)?
            .map(|secs| Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom))
            .transpose()
    }
}
