//! Engine automation commands.

use crate::codec::{join_names, join_values};

/// Engine dialogs that block headless execution unless hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    ErrorMessages,
    WarningMessages,
}

impl WindowKind {
    fn as_str(self) -> &'static str {
        match self {
            WindowKind::ErrorMessages => "ErrorMessages",
            WindowKind::WarningMessages => "WarningMessages",
        }
    }
}

/// A single command understood by the engine.
///
/// Values for `Import` travel as a payload next to the command rather than
/// inside it, so only variable names count against the command limit.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Load a model file.
    Open(String),
    /// Suppress an interactive dialog.
    HideWindow(WindowKind),
    /// Assign values to model inputs.
    Import { names: Vec<String>, values: Vec<f64> },
    /// Solve the loaded model.
    Solve,
    /// Report the current value of each named variable.
    Export { names: Vec<String> },
    /// Shut the engine down.
    Quit,
    /// Any other automation command, sent verbatim.
    Raw(String),
}

impl Command {
    /// Renders the textual command.
    ///
    /// ```
    /// use u_simopt::session::Command;
    ///
    /// let cmd = Command::Export { names: vec!["W_net".into(), "COP_1".into()] };
    /// assert_eq!(cmd.render(), "[Export 'Payload' W_net COP_1]");
    /// ```
    pub fn render(&self) -> String {
        match self {
            Command::Open(path) => format!("[Open {path}]"),
            Command::HideWindow(kind) => format!("[HideWindow {}]", kind.as_str()),
            Command::Import { names, .. } => format!("[Import 'Payload' {}]", join_names(names)),
            Command::Solve => "[SOLVE]".to_string(),
            Command::Export { names } => format!("[Export 'Payload' {}]", join_names(names)),
            Command::Quit => "[QUIT]".to_string(),
            Command::Raw(text) => text.clone(),
        }
    }

    /// Payload sent alongside the command, if any.
    pub fn payload(&self) -> Option<String> {
        match self {
            Command::Import { values, .. } => Some(join_values(values)),
            _ => None,
        }
    }

    /// Whether the command carries a variable list subject to the length limit.
    pub fn is_chunked(&self) -> bool {
        matches!(self, Command::Import { .. } | Command::Export { .. })
    }
}
