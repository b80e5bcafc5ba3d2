//! Error types for the chronodose booker
//!
//! This module defines the domain error types used throughout the application.

use thiserror::Error;

use crate::models::{AppointmentId, Location};

/// Errors raised by a single call against the remote booking service
#[derive(Error, Debug)]
pub enum ClientError {
    /// HTTP transport failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Request timed out
    #[error("Request timeout: {url}")]
    Timeout { url: String },

    /// Non-success response status
    #[error("Unexpected status {status} for {url}")]
    Status { status: u16, url: String },

    /// Response body could not be decoded
    #[error("Cannot decode response of {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// Response carried no security token
    #[error("No security token in response of {operation}")]
    MissingToken { operation: &'static str },

    /// Appointment creation response carried no id
    #[error("No appointment id in response: {body}")]
    MissingAppointmentId { body: String },

    /// Caller supplied an unusable argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Header value could not be built
    #[error("Invalid header value: {0}")]
    InvalidHeader(String),
}

impl ClientError {
    /// Wrap a reqwest error, classifying timeouts
    pub fn from_transport(err: reqwest::Error, url: &str) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Http(err)
        }
    }
}

/// Errors that can occur while resolving the offering settings of a location
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Booking data could not be fetched
    #[error("Failed to fetch booking data: {0}")]
    Client(#[from] ClientError),

    /// No visit motive matches the target offering
    #[error("No visit motive named '{motive}' at {location}")]
    NoMatchingOffering { location: Location, motive: String },

    /// Several visit motives match the target offering
    #[error("{count} visit motives named '{motive}' at {location}")]
    AmbiguousOffering {
        location: Location,
        motive: String,
        count: usize,
    },

    /// Every agenda offering the motive is missing or disabled
    #[error("No bookable agenda for the offering at {location}")]
    NoEligibleAgenda { location: Location },
}

/// Errors that abort one booking cycle
#[derive(Error, Debug)]
pub enum BookingError {
    /// Settings resolution failed
    #[error("Settings resolution failed: {0}")]
    Settings(#[from] SettingsError),

    /// A remote call failed
    #[error("Remote call failed: {0}")]
    Client(#[from] ClientError),

    /// The first slot carries no follow-up step
    #[error("Slot {start_date} has no follow-up step")]
    MissingFollowUpStep { start_date: String },

    /// A slot datetime does not match the fixed format
    #[error("Invalid slot datetime '{value}': {source}")]
    InvalidSlotDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// The account has no saved patient to confirm for
    #[error("No known patient on the account")]
    NoKnownPatient,

    /// A step after the first creation failed; the first appointment is left unconfirmed
    #[error("Appointment {appointment_id} abandoned: {source}")]
    Abandoned {
        appointment_id: AppointmentId,
        #[source]
        source: Box<BookingError>,
    },
}

impl BookingError {
    /// Attach the id of the unconfirmed first appointment
    pub fn abandon(self, appointment_id: &AppointmentId) -> Self {
        Self::Abandoned {
            appointment_id: appointment_id.clone(),
            source: Box::new(self),
        }
    }

    /// True when the failure happened before any appointment was created
    pub fn is_before_booking(&self) -> bool {
        !matches!(self, Self::Abandoned { .. })
    }
}

/// Errors raised while loading the location list
#[derive(Error, Debug)]
pub enum LocationError {
    /// File could not be read
    #[error("Cannot read location file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// File contained no usable location
    #[error("No location found in {path}")]
    Empty { path: String },

    /// Empty location identifier
    #[error("Location identifier cannot be empty")]
    Blank,
}
