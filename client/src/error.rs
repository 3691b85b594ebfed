use thiserror::Error;

/// Errors of the outbound actions, the only errors pages ever see
#[derive(Debug, Error)]
pub enum ActionError {
    /// A required field is missing, nothing was sent
    #[error("{0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    /// The backend answered with a non success status
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("request failed: {0:#}")]
    Network(#[source] anyhow::Error),
}

impl ActionError {
    pub fn validation(message: impl Into<String>) -> Self {
        ActionError::Validation(message.into())
    }
}
