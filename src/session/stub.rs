//! Scripted in-memory session for tests.

use super::{Command, SolverSession};
use crate::error::{ChannelError, SessionStartError};
use std::collections::HashMap;

/// Something that happened to a [`ScriptedSession`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Event {
    Opened,
    Restarted,
    Closed,
    Executed(String),
    Failed(String),
}

type Model = Box<dyn FnMut(&HashMap<String, f64>) -> HashMap<String, String>>;

/// Session double whose "engine" is a closure over the imported inputs.
///
/// On `Solve` the closure maps the current inputs to output tokens;
/// `Export` replies with the tokens of the requested names, tab-separated.
/// Unknown names reply with a non-numeric token.
pub(crate) struct ScriptedSession {
    model: Model,
    inputs: HashMap<String, f64>,
    outputs: HashMap<String, String>,
    open: bool,
    /// Number of upcoming `Solve` commands that fail with a channel error.
    pub fail_solves: usize,
    pub fail_open: bool,
    /// Once this many solves succeeded, every further solve fails.
    pub healthy_solves: Option<usize>,
    pub fail_restart: bool,
    pub events: Vec<Event>,
    pub solves: usize,
    pub restarts: usize,
}

impl ScriptedSession {
    pub fn new(model: impl FnMut(&HashMap<String, f64>) -> HashMap<String, String> + 'static) -> Self {
        Self {
            model: Box::new(model),
            inputs: HashMap::new(),
            outputs: HashMap::new(),
            open: false,
            fail_solves: 0,
            fail_open: false,
            healthy_solves: None,
            fail_restart: false,
            events: Vec::new(),
            solves: 0,
            restarts: 0,
        }
    }

    /// Engine that reports the same value for every requested output.
    pub fn constant(value: f64) -> Self {
        Self::new(move |_| HashMap::new()).with_default_token(value.to_string())
    }

    /// Engine whose outputs are computed from the inputs.
    pub fn numeric(mut f: impl FnMut(&HashMap<String, f64>) -> Vec<(&'static str, f64)> + 'static) -> Self {
        Self::new(move |inputs| {
            f(inputs)
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        })
    }

    fn with_default_token(mut self, token: String) -> Self {
        let mut inner = std::mem::replace(&mut self.model, Box::new(|_| HashMap::new()));
        self.model = Box::new(move |inputs| {
            let mut out = inner(inputs);
            out.insert("*".to_string(), token.clone());
            out
        });
        self
    }

    pub fn opened(mut self) -> Self {
        self.open = true;
        self
    }

    pub fn input(&self, name: &str) -> Option<f64> {
        self.inputs.get(name).copied()
    }

    /// Commands executed so far, rendered.
    pub fn commands(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Executed(c) | Event::Failed(c) => Some(c.as_str()),
                _ => None,
            })
            .collect()
    }

    fn token(&self, name: &str) -> String {
        self.outputs
            .get(name)
            .or_else(|| self.outputs.get("*"))
            .cloned()
            .unwrap_or_else(|| "???".to_string())
    }
}

impl SolverSession for ScriptedSession {
    fn open(&mut self) -> Result<(), SessionStartError> {
        if self.fail_open {
            return Err(SessionStartError::new("scripted open failure"));
        }
        self.open = true;
        self.events.push(Event::Opened);
        Ok(())
    }

    fn execute(&mut self, command: &Command) -> Result<String, ChannelError> {
        if !self.open {
            return Err(ChannelError::NotOpen);
        }
        let rendered = command.render();
        match command {
            Command::Import { names, values } => {
                for (name, value) in names.iter().zip(values) {
                    self.inputs.insert(name.clone(), *value);
                }
            }
            Command::Solve => {
                let exhausted = self.healthy_solves.is_some_and(|n| self.solves >= n);
                if self.fail_solves > 0 || exhausted {
                    self.fail_solves = self.fail_solves.saturating_sub(1);
                    self.events.push(Event::Failed(rendered));
                    return Err(ChannelError::Disconnected);
                }
                self.solves += 1;
                self.outputs = (self.model)(&self.inputs);
            }
            Command::Export { names } => {
                self.events.push(Event::Executed(rendered));
                let tokens: Vec<String> = names.iter().map(|n| self.token(n)).collect();
                return Ok(tokens.join("\t"));
            }
            _ => {}
        }
        self.events.push(Event::Executed(rendered));
        Ok(String::new())
    }

    fn close(&mut self) {
        self.open = false;
        self.events.push(Event::Closed);
    }

    fn restart(&mut self) -> Result<(), SessionStartError> {
        self.restarts += 1;
        self.events.push(Event::Restarted);
        self.open = false;
        if self.fail_restart {
            return Err(SessionStartError::new("scripted restart failure"));
        }
        self.open()
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
