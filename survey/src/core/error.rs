//! Error taxonomy of the survey flow.
//!
//! Every error here is recoverable within the session: the controller reports
//! it as a notice and keeps its state. Question-set loading failures live in
//! `io::catalog` because they prevent a session from existing at all.

use thiserror::Error;

/// Intake form problems, reported before any question is shown.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputValidationError {
    #[error("respondent name is required")]
    MissingName,

    #[error("a question set must be selected")]
    MissingSet,

    #[error("question set '{0}' was not found")]
    UnknownSet(String),

    #[error("question set '{0}' has no questions")]
    EmptySet(String),
}

/// One or more questions lack a rating on at least one dimension.
///
/// `positions` are zero-based and ascending.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unanswered items remain at {}", describe_positions(.positions))]
pub struct IncompleteAnswersError {
    pub positions: Vec<usize>,
}

fn describe_positions(positions: &[usize]) -> String {
    positions
        .iter()
        .map(|position| format!("question {}", position + 1))
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_message(message: &Option<String>) -> String {
    match message {
        Some(message) => format!(": {message}"),
        None => String::new(),
    }
}

/// Delivery to the collection endpoint did not end in an explicit success.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    /// Connection, timeout or other transport-level failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Endpoint answered with a non-success HTTP status.
    #[error("endpoint returned HTTP {0}")]
    HttpStatus(u16),

    /// Endpoint answered but did not report success.
    #[error("endpoint rejected submission (status '{status}'){}", describe_message(.message))]
    Rejected {
        status: String,
        message: Option<String>,
    },

    /// Response body could not be interpreted.
    #[error("malformed endpoint response: {0}")]
    MalformedResponse(String),

    /// Payload could not be encoded for the wire.
    #[error("payload encoding failed: {0}")]
    Encoding(String),
}
