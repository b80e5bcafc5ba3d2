//! Remote booking service client
//!
//! [`BookingService`] is the seam between the booking workers and the remote
//! API: every operation takes the security token to present and returns the
//! fresh one in a [`Reply`]. [`DoctolibClient`] is the HTTP implementation;
//! tests plug in scripted fakes.

pub mod doctolib;
pub mod headers;
pub mod request;

use async_trait::async_trait;

use crate::models::{
    AppointmentId, AvailabilityWindow, Identity, Location, OfferingData, Patient, Reply,
    SecurityToken,
};
use crate::utils::error::ClientError;

pub use doctolib::{DoctolibClient, DEFAULT_BASE_URL};
pub use request::{AppointmentRequest, AvailabilityQuery};

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Operations of the remote booking API
///
/// Implementations are stateless apart from transport session state (cookies);
/// token threading is the caller's job, see [`crate::session::Session`].
#[async_trait]
pub trait BookingService: Send + Sync {
    /// Log in and open a session
    async fn authenticate(&self, username: &str, password: &str) -> ClientResult<Reply<Identity>>;

    /// Raw profile, visit motive and agenda data of a location
    async fn fetch_offering_settings(
        &self,
        location: &Location,
        token: &SecurityToken,
    ) -> ClientResult<Reply<OfferingData>>;

    /// Search first-dose or follow-up slots
    async fn query_availability(
        &self,
        query: &AvailabilityQuery,
        token: &SecurityToken,
    ) -> ClientResult<Reply<AvailabilityWindow>>;

    /// Create an unconfirmed appointment
    async fn create_appointment(
        &self,
        request: &AppointmentRequest,
        token: &SecurityToken,
    ) -> ClientResult<Reply<AppointmentId>>;

    /// Patient profiles saved on the account
    async fn list_known_patients(&self, token: &SecurityToken) -> ClientResult<Reply<Vec<Patient>>>;

    /// Confirm a created appointment for a patient
    ///
    /// Success means the request went through; the response body is not
    /// checked for an acceptance marker.
    async fn confirm_appointment(
        &self,
        appointment_id: &AppointmentId,
        start_date: &str,
        patient: &Patient,
        token: &SecurityToken,
    ) -> ClientResult<Reply<()>>;
}
