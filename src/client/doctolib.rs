//! HTTP implementation of the booking service
//!
//! Talks JSON to the booking API with a cookie-keeping reqwest client. Each
//! response must carry a fresh `x-csrf-token`; a missing one is an error for
//! the operation that received it.

use async_trait::async_trait;
use reqwest::{header::HeaderMap, Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use super::headers::{build_json_headers, build_page_headers, extract_token, DEFAULT_USER_AGENT};
use super::request::{
    AppointmentRequest, AvailabilityQuery, ConfirmAppointmentPayload, LoginPayload,
};
use super::{BookingService, ClientResult};
use crate::models::{
    AppointmentId, AvailabilityWindow, Identity, Location, OfferingData, Patient, Reply,
    SecurityToken,
};
use crate::utils::error::ClientError;

/// Root of the public booking API
pub const DEFAULT_BASE_URL: &str = "https://doctolib.fr";

#[derive(Deserialize)]
struct BookingResponse {
    data: OfferingData,
}

#[derive(Deserialize)]
struct CreateAppointmentResponse {
    #[serde(default)]
    id: Option<String>,
}

/// Booking API client
///
/// One instance holds one cookie jar, so one instance is one session.
pub struct DoctolibClient {
    /// HTTP client with cookie store and timeout
    client: Client,

    /// Service root, overridable for mock servers
    base_url: String,

    user_agent: String,
}

impl DoctolibClient {
    /// Create a client against the public service
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Http` if the HTTP client cannot be created
    pub fn new(timeout: Duration) -> Result<Self, ClientError> {
        Self::with_base_url(DEFAULT_BASE_URL, timeout)
    }

    /// Create a client against a custom root (mock servers, staging)
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        })
    }

    /// Override the user agent presented to the service
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn json_headers(&self, token: Option<&SecurityToken>) -> ClientResult<HeaderMap> {
        build_json_headers(&self.user_agent, token)
    }

    /// Send a request and return the fresh token and raw body
    async fn exchange(
        &self,
        request: RequestBuilder,
        url: &str,
        operation: &'static str,
    ) -> ClientResult<(SecurityToken, bytes::Bytes)> {
        tracing::debug!(url = %url, operation, "Calling booking service");

        let response = request
            .send()
            .await
            .map_err(|e| ClientError::from_transport(e, url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let token = extract_token(response.headers(), operation)?;
        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::from_transport(e, url))?;

        Ok((token, body))
    }

    fn decode<T: DeserializeOwned>(url: &str, body: &[u8]) -> ClientResult<T> {
        serde_json::from_slice(body).map_err(|source| ClientError::Decode {
            url: url.to_string(),
            source,
        })
    }

    /// Open a session page to obtain the first token and cookies
    async fn initial_token(&self) -> ClientResult<SecurityToken> {
        let url = self.url("/sessions/new");
        let request = self
            .client
            .get(&url)
            .headers(build_page_headers(&self.user_agent)?);

        let (token, _) = self.exchange(request, &url, "sessions/new").await?;
        Ok(token)
    }
}

#[async_trait]
impl BookingService for DoctolibClient {
    async fn authenticate(&self, username: &str, password: &str) -> ClientResult<Reply<Identity>> {
        if username.is_empty() || password.is_empty() {
            return Err(ClientError::InvalidInput(
                "username and password are required".to_string(),
            ));
        }

        let token = self.initial_token().await?;

        let url = self.url("/login.json");
        let request = self
            .client
            .post(&url)
            .headers(self.json_headers(Some(&token))?)
            .json(&LoginPayload::patient(username, password));

        let (token, body) = self.exchange(request, &url, "login").await?;
        let identity: Identity = Self::decode(&url, &body)?;

        Ok(Reply::new(identity, token))
    }

    async fn fetch_offering_settings(
        &self,
        location: &Location,
        token: &SecurityToken,
    ) -> ClientResult<Reply<OfferingData>> {
        let url = self.url(&format!("/booking/{location}.json"));
        let request = self.client.get(&url).headers(self.json_headers(Some(token))?);

        let (token, body) = self.exchange(request, &url, "booking").await?;
        let response: BookingResponse = Self::decode(&url, &body)?;

        Ok(Reply::new(response.data, token))
    }

    async fn query_availability(
        &self,
        query: &AvailabilityQuery,
        token: &SecurityToken,
    ) -> ClientResult<Reply<AvailabilityWindow>> {
        let url = self.url(query.path());
        let request = self
            .client
            .get(&url)
            .headers(self.json_headers(Some(token))?)
            .query(&query.query_pairs());

        let operation = if query.is_follow_up() {
            "second_shot_availabilities"
        } else {
            "availabilities"
        };
        let (token, body) = self.exchange(request, &url, operation).await?;
        let window: AvailabilityWindow = Self::decode(&url, &body)?;

        Ok(Reply::new(window, token))
    }

    async fn create_appointment(
        &self,
        request: &AppointmentRequest,
        token: &SecurityToken,
    ) -> ClientResult<Reply<AppointmentId>> {
        let url = self.url("/appointments.json");
        let http_request = self
            .client
            .post(&url)
            .headers(self.json_headers(Some(token))?)
            .json(&request.payload());

        let (token, body) = self.exchange(http_request, &url, "create appointment").await?;
        let response: CreateAppointmentResponse = Self::decode(&url, &body)?;

        match response.id.filter(|id| !id.is_empty()) {
            Some(id) => Ok(Reply::new(AppointmentId::new(id), token)),
            None => Err(ClientError::MissingAppointmentId {
                body: String::from_utf8_lossy(&body).into_owned(),
            }),
        }
    }

    async fn list_known_patients(&self, token: &SecurityToken) -> ClientResult<Reply<Vec<Patient>>> {
        let url = self.url("/account/master_patients.json");
        let request = self.client.get(&url).headers(self.json_headers(Some(token))?);

        let (token, body) = self.exchange(request, &url, "master patients").await?;
        let patients: Vec<Patient> = Self::decode(&url, &body)?;

        Ok(Reply::new(patients, token))
    }

    async fn confirm_appointment(
        &self,
        appointment_id: &AppointmentId,
        start_date: &str,
        patient: &Patient,
        token: &SecurityToken,
    ) -> ClientResult<Reply<()>> {
        let url = self.url(&format!("/appointments/{appointment_id}.json"));
        let request = self
            .client
            .put(&url)
            .headers(self.json_headers(Some(token))?)
            .json(&ConfirmAppointmentPayload::new(start_date, patient));

        let (token, _) = self.exchange(request, &url, "confirm appointment").await?;

        Ok(Reply::new((), token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = DoctolibClient::new(Duration::from_secs(5));
        assert!(client.is_ok());
        assert_eq!(client.unwrap().base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client =
            DoctolibClient::with_base_url("http://localhost:8080/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.url("/login.json"), "http://localhost:8080/login.json");
    }

    #[tokio::test]
    async fn test_authenticate_rejects_empty_credentials() {
        // Unroutable root: the check must fail before any request is issued
        let client = DoctolibClient::with_base_url("http://localhost:1", Duration::from_secs(1))
            .unwrap();

        let result = client.authenticate("", "secret").await;
        assert!(matches!(result, Err(ClientError::InvalidInput(_))));

        let result = client.authenticate("me@example.com", "").await;
        assert!(matches!(result, Err(ClientError::InvalidInput(_))));
    }
}
