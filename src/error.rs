use crate::workflow::FormKind;
use std::fmt;
use thiserror::Error;

pub const MISSING_FILES_MESSAGE: &str = "Please upload both input and tracker files.";
pub const BAD_REQUEST_MESSAGE: &str = "Invalid request. Please check your input files.";
pub const NOT_FOUND_MESSAGE: &str = "Processing service not found. Please try again later.";
pub const SERVER_ERROR_MESSAGE: &str = "Server error. Try again in a few minutes.";
pub const UNEXPECTED_STATUS_MESSAGE: &str = "An unexpected error occurred. Please try again.";
pub const TRANSPORT_MESSAGE: &str = "Something went wrong";
pub const SAVE_FAILED_MESSAGE: &str = "Could not save the processed file.";
pub const BUSY_MESSAGE: &str = "Your files are still being processed.";

/// User facing text shown in a form's error box.
///
/// Never carries raw transport or status text; build it through [`WorkflowError::user_message`]
/// or [`status_message`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorMessage(String);

impl ErrorMessage {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for ErrorMessage {
    fn from(text: &'static str) -> Self {
        ErrorMessage(text.to_string())
    }
}

/// Friendly message for a non-success HTTP status.
pub fn status_message(status: u16) -> ErrorMessage {
    match status {
        400 => BAD_REQUEST_MESSAGE.into(),
        404 => NOT_FOUND_MESSAGE.into(),
        500 => SERVER_ERROR_MESSAGE.into(),
        _ => UNEXPECTED_STATUS_MESSAGE.into(),
    }
}

/// The request could not complete.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("processing service base URL is not configured")]
    MissingApiBase,

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{0}")]
    Unavailable(String),
}

/// Everything that can end a submission without a saved result.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("required files missing for the {0} form")]
    MissingFiles(FormKind),

    #[error("processing service responded with status {status}")]
    RemoteStatus { status: u16 },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("could not save {file_name}: {source}")]
    Save {
        file_name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("a submission is already in progress")]
    Busy,
}

impl WorkflowError {
    pub fn user_message(&self) -> ErrorMessage {
        match self {
            WorkflowError::MissingFiles(_) => MISSING_FILES_MESSAGE.into(),
            WorkflowError::RemoteStatus { status } => status_message(*status),
            WorkflowError::Transport(_) => TRANSPORT_MESSAGE.into(),
            WorkflowError::Save { .. } => SAVE_FAILED_MESSAGE.into(),
            WorkflowError::Busy => BUSY_MESSAGE.into(),
        }
    }
}

/// Failure reported by an overlay host.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("failed to create {what}: {reason}")]
    CreateNode { what: &'static str, reason: String },

    #[error("failed to register {event} listener: {reason}")]
    Listener { event: &'static str, reason: String },

    #[error("unknown element")]
    UnknownElement,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_table() {
        assert_eq!(status_message(400).as_str(), BAD_REQUEST_MESSAGE);
        assert_eq!(status_message(404).as_str(), NOT_FOUND_MESSAGE);
        assert_eq!(
            status_message(500).as_str(),
            "Server error. Try again in a few minutes."
        );
        for status in [401, 403, 418, 502, 503] {
            assert_eq!(status_message(status).as_str(), UNEXPECTED_STATUS_MESSAGE);
        }
    }

    #[test]
    fn transport_text_never_reaches_the_user() {
        let err = WorkflowError::from(TransportError::Unavailable(
            "connection reset by peer".to_string(),
        ));
        assert_eq!(err.user_message().as_str(), "Something went wrong");
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn busy_has_its_own_message() {
        let message = WorkflowError::Busy.user_message();
        assert_eq!(message.as_str(), BUSY_MESSAGE);
        assert_ne!(message.as_str(), UNEXPECTED_STATUS_MESSAGE);
    }
}
