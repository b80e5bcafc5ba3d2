//! Unified error handling for the chronodose crate
//!
//! Domain errors live in [`crate::utils::error`]; this module wraps them into a
//! single [`Error`] enum and classifies them so the worker loop and the binary can
//! decide whether a failure ends a poll cycle or the whole run.
//!
//! # Usage
//!
//! ```rust,ignore
//! use chronodose::error::{ChronodoseErrorTrait, Error};
//!
//! fn report(err: Error) {
//!     if err.is_recoverable() {
//!         tracing::warn!(category = ?err.category(), "cycle abandoned: {err}");
//!     } else {
//!         tracing::error!("fatal: {err}");
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

pub use crate::utils::error::{BookingError, ClientError, LocationError, SettingsError};

/// Common trait for all chronodose error types
pub trait ChronodoseErrorTrait: std::error::Error {
    /// Whether the next poll cycle may simply try again
    fn is_recoverable(&self) -> bool;

    /// Error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Transport failures, timeouts and unexpected statuses
    Network,
    /// Remote protocol violations (missing token, undecodable body)
    Protocol,
    /// Offering resolution and slot parsing
    Booking,
    /// Configuration and input files
    Config,
    /// Other/unknown errors
    Other,
}

impl ChronodoseErrorTrait for ClientError {
    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidInput(_) | Self::InvalidHeader(_))
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Http(_) | Self::Timeout { .. } | Self::Status { .. } => ErrorCategory::Network,
            Self::Decode { .. } | Self::MissingToken { .. } | Self::MissingAppointmentId { .. } => {
                ErrorCategory::Protocol
            }
            Self::InvalidInput(_) | Self::InvalidHeader(_) => ErrorCategory::Config,
        }
    }
}

impl ChronodoseErrorTrait for SettingsError {
    fn is_recoverable(&self) -> bool {
        true
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Client(e) => e.category(),
            _ => ErrorCategory::Booking,
        }
    }
}

impl ChronodoseErrorTrait for BookingError {
    fn is_recoverable(&self) -> bool {
        true
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Settings(e) => e.category(),
            Self::Client(e) => e.category(),
            Self::Abandoned { source, .. } => source.category(),
            _ => ErrorCategory::Booking,
        }
    }
}

/// Unified error type for the chronodose crate
#[derive(Error, Debug)]
pub enum Error {
    /// Remote service errors
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    /// Settings resolution errors
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Booking cycle errors
    #[error("Booking error: {0}")]
    Booking(#[from] BookingError),

    /// Location list errors
    #[error("Location error: {0}")]
    Location(#[from] LocationError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),
}

impl ChronodoseErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Client(e) => e.is_recoverable(),
            Self::Settings(e) => e.is_recoverable(),
            Self::Booking(e) => e.is_recoverable(),
            Self::Location(_) | Self::Io(_) | Self::Config(_) => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Client(e) => e.category(),
            Self::Settings(e) => e.category(),
            Self::Booking(e) => e.category(),
            Self::Location(_) | Self::Config(_) => ErrorCategory::Config,
            Self::Io(_) => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category() {
        let err = Error::Client(ClientError::MissingToken { operation: "login" });
        assert_eq!(err.category(), ErrorCategory::Protocol);

        let err = Error::Client(ClientError::Status {
            status: 503,
            url: "https://doctolib.fr/login.json".to_string(),
        });
        assert_eq!(err.category(), ErrorCategory::Network);
    }

    #[test]
    fn test_is_recoverable() {
        let err = Error::Booking(BookingError::NoKnownPatient);
        assert!(err.is_recoverable());

        let err = Error::config("workers must be between 1 and 16");
        assert!(!err.is_recoverable());
        assert_eq!(err.category(), ErrorCategory::Config);
    }

    #[test]
    fn test_abandoned_category_follows_source() {
        let inner = BookingError::Client(ClientError::Timeout {
            url: "/appointments.json".to_string(),
        });
        let err = inner.abandon(&crate::models::AppointmentId::new("42"));
        assert_eq!(err.category(), ErrorCategory::Network);
    }

    #[test]
    fn test_error_conversion() {
        let unified: Error = LocationError::Blank.into();
        assert!(matches!(unified, Error::Location(_)));
        assert!(!unified.is_recoverable());
    }
}
