//! Error types for the skirmish crate

use thiserror::Error;

/// Main error type for the skirmish crate
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid action '{value}' (expected ATTACK, DEFEND, CHARGE or 0-2)")]
    InvalidAction { value: String },

    #[error("invalid action '{value}' at step {step} of submitted episode")]
    InvalidSubmittedAction { step: usize, value: String },

    #[error("submitted episode has no steps")]
    EmptySubmission,

    #[error("submitted episode has {len} steps (maximum is {max})")]
    SubmissionTooLong { len: usize, max: usize },

    #[error("submitted episode continues after the game ended at step {step}")]
    StepsAfterTerminal { step: usize },

    #[error("invalid opponent '{input}'. Expected one of: {expected}")]
    ParseOpponent { input: String, expected: String },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("no table stored at '{location}'")]
    NotFound { location: String },

    #[error("failed to {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to {operation}: {message}")]
    SerializationContext { operation: String, message: String },

    #[error("progress bar template error: {message}")]
    ProgressBarTemplate { message: String },
}

/// Convenience type alias for Results using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Io {
            operation: "IO operation".to_string(),
            source,
        }
    }
}
