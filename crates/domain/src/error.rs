//! Errors raised while building domain values from untrusted text.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value broke an invariant, e.g. an instance name with a `/` in it.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Text could not be read as the requested type, e.g. a time pattern
    /// with an unsupported letter.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}
