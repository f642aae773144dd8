// src/utils/errors.rs
//! Error types for proxy construction and call dispatch

use thiserror::Error;

/// Boxed error carried through an invocation.
///
/// Errors returned by a real method are boxed as-is so the caller-facing
/// type can be recovered with `downcast`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, ProxyError>;

/// Errors raised by the proxy machinery itself
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{method} expects {expected} argument(s), got {actual}")]
    ArgumentCountMismatch {
        method: String,
        expected: usize,
        actual: usize,
    },

    #[error("Argument '{parameter}' of {method} must be of type {expected}")]
    ArgumentTypeMismatch {
        method: String,
        parameter: &'static str,
        expected: &'static str,
    },

    #[error("No argument named '{0}'")]
    UnknownArgument(String),

    #[error("Argument index {index} is out of range (argument count: {len})")]
    ArgumentIndexOutOfRange { index: usize, len: usize },

    #[error("Interceptor {interceptor} failed while handling {method}: {source}")]
    InterceptorFailed {
        interceptor: &'static str,
        method: String,
        #[source]
        source: BoxError,
    },

    #[error("{method} completed without a return value")]
    MissingReturnValue { method: String },

    #[error("Return value of {method} must be of type {expected}")]
    ReturnTypeMismatch {
        method: String,
        expected: &'static str,
    },

    #[error("'{0}' is not a registered contract")]
    NotAContract(String),

    #[error("Contract path '{0}' is already registered for a different trait")]
    ContractConflict(&'static str),

    #[error("Contract name '{name}' is ambiguous, use one of {candidates:?}")]
    AmbiguousContract {
        name: String,
        candidates: Vec<&'static str>,
    },

    #[error("Instance does not satisfy contract {contract}: expected {expected}")]
    ContractMismatch {
        contract: &'static str,
        expected: &'static str,
    },

    #[error("{method} failed: {source}")]
    Foreign {
        method: String,
        #[source]
        source: BoxError,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl ProxyError {
    /// True for the lookup errors raised by argument access
    pub fn is_range_error(&self) -> bool {
        matches!(
            self,
            ProxyError::UnknownArgument(_) | ProxyError::ArgumentIndexOutOfRange { .. }
        )
    }

    /// Name of the interceptor when this error reports interceptor failure
    pub fn failing_interceptor(&self) -> Option<&'static str> {
        match self {
            ProxyError::InterceptorFailed { interceptor, .. } => Some(*interceptor),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_range_errors() {
        assert!(ProxyError::UnknownArgument("x".into()).is_range_error());
        assert!(ProxyError::ArgumentIndexOutOfRange { index: 5, len: 2 }.is_range_error());
        assert!(!ProxyError::InvalidArgument("x".into()).is_range_error());
    }

    #[test]
    fn test_interceptor_failure_keeps_source() {
        let err = ProxyError::InterceptorFailed {
            interceptor: "my::Interceptor",
            method: "Calc::add".into(),
            source: "boom".into(),
        };

        assert_eq!(err.failing_interceptor(), Some("my::Interceptor"));
        assert_eq!(err.source().map(|s| s.to_string()), Some("boom".to_string()));
        assert!(err.to_string().contains("my::Interceptor"));
    }
}
