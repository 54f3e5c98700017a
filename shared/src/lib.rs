// shared/src/lib.rs

use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Error {
    #[error("{0}")]
    Connection(String),
    #[error("Request timed out after {0} ms")]
    Timeout(u64),
    #[error("Too many requests. Please try again later.")]
    RateLimited,
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    PlatformReconnect(String),
    #[error("{message}")]
    Http { status: u16, message: String },
    #[error("{0}")]
    Application(String),
    #[error("Invalid response from server: {0}")]
    Decode(String),
    #[error("{0}")]
    Validation(String),
    #[error("Request cancelled")]
    Cancelled,
    #[error("Request superseded by a newer request")]
    Superseded,
    #[error("not found")]
    NotFound,
    #[error("internal: {0}")]
    Internal(String),
}

/// Coarse classification of an [`Error`], stable across message rewording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Connection,
    Timeout,
    RateLimited,
    Unauthorized,
    PlatformReconnect,
    Http,
    Application,
    Decode,
    Validation,
    Cancelled,
    Superseded,
    NotFound,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Connection(_) => ErrorKind::Connection,
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::RateLimited => ErrorKind::RateLimited,
            Error::Unauthorized(_) => ErrorKind::Unauthorized,
            Error::PlatformReconnect(_) => ErrorKind::PlatformReconnect,
            Error::Http { .. } => ErrorKind::Http,
            Error::Application(_) => ErrorKind::Application,
            Error::Decode(_) => ErrorKind::Decode,
            Error::Validation(_) => ErrorKind::Validation,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Superseded => ErrorKind::Superseded,
            Error::NotFound => ErrorKind::NotFound,
            Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// HTTP status carried by the error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } => Some(*status),
            Error::RateLimited => Some(429),
            Error::Unauthorized(_) | Error::PlatformReconnect(_) => Some(401),
            _ => None,
        }
    }

    /// Replace an error whose message is blank with `fallback`.
    ///
    /// Errors that already carry a message are returned untouched.
    pub fn or_context(self, fallback: impl Into<String>) -> Self {
        if self.to_string().trim().is_empty() {
            Error::Application(fallback.into())
        } else {
            self
        }
    }

    /// Transport-level failures, as opposed to the server answering with an error.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Connection(_) | Error::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod config;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_context_keeps_existing_message() {
        let err = Error::Http {
            status: 500,
            message: "database offline".to_string(),
        };
        let wrapped = err.clone().or_context("Failed to fetch posts");
        assert_eq!(wrapped, err);
    }

    #[test]
    fn test_or_context_fills_blank_message() {
        let err = Error::Application(String::new()).or_context("Failed to fetch posts");
        assert_eq!(err.to_string(), "Failed to fetch posts");
        assert_eq!(err.kind(), ErrorKind::Application);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(Error::RateLimited.status(), Some(429));
        assert_eq!(Error::Unauthorized("x".into()).status(), Some(401));
        assert_eq!(Error::Connection("http://h".into()).status(), None);
        assert!(Error::Timeout(10).is_network());
        assert!(!Error::NotFound.is_network());
    }

    #[test]
    fn test_rate_limit_message() {
        assert_eq!(
            Error::RateLimited.to_string(),
            "Too many requests. Please try again later."
        );
    }
}
