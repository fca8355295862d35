use neo6_protocols_lib::TerminalError;
use thiserror::Error;
use tracing::error;

use crate::ceci_screens::Screen;

/// Rejected variable names or values. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid variable name '{name}': must start with '&' followed by characters from [A-Za-z0-9@#]")]
    InvalidName { name: String },
    #[error("Variable name '{name}' is {length} characters, maximum is {max}")]
    NameTooLong { name: String, length: usize, max: usize },
    #[error("Value length {length} exceeds maximum {max} for variable type '{type_code}'")]
    ValueTooLongForType { length: usize, max: usize, type_code: String },
    #[error("Value length {length} exceeds maximum {max}")]
    ValueTooLong { length: usize, max: usize },
    #[error("Text value for variable '{name}' has a non-ASCII character at byte {position}")]
    NonAsciiValue { name: String, position: usize },
}

#[derive(Debug, Error)]
pub enum CeciError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The screen did not contain what the operation expected.
    #[error("{message}")]
    Protocol { message: String, screen: Option<String> },

    /// Navigation exhausted its bound or the session is not a CECI session.
    #[error("{0}")]
    Session(String),

    /// A label pattern failed to compile.
    #[error("Invalid screen pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// A wait for the keyboard failed; the message is the attempted action only.
    #[error("{action}")]
    Transport {
        action: String,
        #[source]
        source: TerminalError,
    },
}

impl CeciError {
    pub fn protocol(message: impl Into<String>, screen: &Screen) -> Self {
        CeciError::Protocol { message: message.into(), screen: Some(screen.text()) }
    }

    pub fn session(message: impl Into<String>) -> Self {
        CeciError::Session(message.into())
    }

    /// Screen text captured for protocol errors.
    pub fn screen(&self) -> Option<&str> {
        match self {
            CeciError::Protocol { screen, .. } => screen.as_deref(),
            _ => None,
        }
    }

    fn from_terminal(err: TerminalError, action: &str) -> Self {
        error!(error = %err, action, "terminal operation failed");
        match err {
            TerminalError::FieldNotFound { .. } => CeciError::Protocol {
                message: format!("Unable to enter data: {}", action),
                screen: None,
            },
            TerminalError::Interrupted | TerminalError::TimedOut => CeciError::Transport {
                action: action.to_string(),
                source: err,
            },
        }
    }
}

/// Attaches the action being attempted to terminal failures.
pub trait TerminalResultExt<T> {
    fn during(self, action: &str) -> Result<T, CeciError>;
}

impl<T> TerminalResultExt<T> for Result<T, TerminalError> {
    fn during(self, action: &str) -> Result<T, CeciError> {
        self.map_err(|err| CeciError::from_terminal(err, action))
    }
}
