//! Remote service boundary.
//!
//! # Responsibility
//! - Typed clients for services the cache consumes but does not own.
//!
//! # Invariants
//! - Transport and protocol failures surface as [`TransportError`]; no
//!   remote fault escapes as a panic.

pub mod assessment;

use std::error::Error;
use std::fmt::{Display, Formatter};

pub type TransportResult<T> = Result<T, TransportError>;

/// Remote call failure.
#[derive(Debug)]
pub enum TransportError {
    /// Connection, timeout, or body decode failure.
    Http(reqwest::Error),
    /// The service answered with a non-success status.
    Status { endpoint: String, status: u16 },
}

impl Display for TransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http(err) => write!(f, "{err}"),
            Self::Status { endpoint, status } => {
                write!(f, "`{endpoint}` answered with status {status}")
            }
        }
    }
}

impl Error for TransportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Http(err) => Some(err),
            Self::Status { .. } => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}
