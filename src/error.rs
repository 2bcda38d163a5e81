//! The crate-wide error type.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BoxcarError {
    /// Bad construction arguments or configuration, such as an unknown entity.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generated code referenced an entity outside the visible set, or
    /// used a statement kind the execution context does not permit.
    #[error("Access violation: {0}")]
    AccessViolation(String),

    /// Any other failure while running a generated action.
    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Connection error: {0}")]
    Connection(String),

    /// The code generator could not produce a response.
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BoxcarError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn access_violation(msg: impl Into<String>) -> Self {
        Self::AccessViolation(msg.into())
    }

    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Short label used when reporting the error to a user.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "Configuration Error",
            Self::AccessViolation(_) => "Access Violation",
            Self::Execution(_) => "Execution Error",
            Self::Connection(_) => "Connection Error",
            Self::Llm(_) => "LLM Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns true for errors raised by the access policy at execution time.
    pub fn is_access_violation(&self) -> bool {
        matches!(self, Self::AccessViolation(_))
    }

    /// Prefixes the message with the position of the failing statement.
    ///
    /// The error kind is preserved.
    pub fn at_statement(self, position: usize) -> Self {
        let prefix = |msg: String| format!("statement {}: {}", position + 1, msg);
        match self {
            Self::Config(msg) => Self::Config(prefix(msg)),
            Self::AccessViolation(msg) => Self::AccessViolation(prefix(msg)),
            Self::Execution(msg) => Self::Execution(prefix(msg)),
            Self::Connection(msg) => Self::Connection(prefix(msg)),
            Self::Llm(msg) => Self::Llm(prefix(msg)),
            Self::Internal(msg) => Self::Internal(prefix(msg)),
        }
    }
}

pub type Result<T> = std::result::Result<T, BoxcarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_config() {
        let err = BoxcarError::config("requested entities must not be empty");
        assert_eq!(
            err.to_string(),
            "Configuration error: requested entities must not be empty"
        );
        assert_eq!(err.category(), "Configuration Error");
    }

    #[test]
    fn test_error_display_access_violation() {
        let err = BoxcarError::access_violation("relation 'comments' is not accessible");
        assert_eq!(
            err.to_string(),
            "Access violation: relation 'comments' is not accessible"
        );
        assert_eq!(err.category(), "Access Violation");
        assert!(err.is_access_violation());
    }

    #[test]
    fn test_error_display_execution() {
        let err = BoxcarError::execution("no such column: emal");
        assert_eq!(err.to_string(), "Execution error: no such column: emal");
        assert_eq!(err.category(), "Execution Error");
        assert!(!err.is_access_violation());
    }

    #[test]
    fn test_error_display_llm() {
        let err = BoxcarError::llm("Rate limited. Please wait.");
        assert_eq!(err.to_string(), "LLM error: Rate limited. Please wait.");
        assert_eq!(err.category(), "LLM Error");
    }

    #[test]
    fn test_at_statement_keeps_kind() {
        let err = BoxcarError::access_violation("relation 'comments' is not accessible")
            .at_statement(1);
        assert!(err.is_access_violation());
        assert_eq!(
            err.to_string(),
            "Access violation: statement 2: relation 'comments' is not accessible"
        );
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BoxcarError>();
    }
}
