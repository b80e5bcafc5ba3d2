//! Authenticated session and security token carry-forward
//!
//! The booking service rotates its security token on every call and expects
//! the latest one on the next request. All workers share one [`Session`], so
//! the token lives in a [`TokenCarrier`]: each remote call holds the carrier
//! from reading the token until the fresh one is stored. Calls on the shared
//! session are therefore serialized and every request presents the token
//! returned by the call that completed just before it.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::client::{AppointmentRequest, AvailabilityQuery, BookingService, ClientResult};
use crate::models::{
    AppointmentId, AvailabilityWindow, Identity, Location, OfferingData, Patient, Reply,
    SecurityToken,
};

/// Synchronized cell holding the latest security token
#[derive(Debug)]
pub struct TokenCarrier {
    cell: Mutex<SecurityToken>,

    /// Number of completed exchanges
    exchanges: AtomicU64,
}

impl TokenCarrier {
    pub fn new(initial: SecurityToken) -> Self {
        Self {
            cell: Mutex::new(initial),
            exchanges: AtomicU64::new(0),
        }
    }

    /// Snapshot of the token the next call will present
    pub async fn current(&self) -> SecurityToken {
        self.cell.lock().await.clone()
    }

    pub fn exchanges(&self) -> u64 {
        self.exchanges.load(Ordering::Relaxed)
    }

    /// Run one remote call with the current token and store the one it returns
    ///
    /// The carrier stays locked for the whole call. On failure the previous
    /// token is kept.
    pub async fn exchange<T, F, Fut>(&self, call: F) -> ClientResult<T>
    where
        F: FnOnce(SecurityToken) -> Fut,
        Fut: Future<Output = ClientResult<Reply<T>>>,
    {
        let mut current = self.cell.lock().await;
        let reply = call(current.clone()).await?;
        *current = reply.token;
        self.exchanges.fetch_add(1, Ordering::Relaxed);
        Ok(reply.value)
    }
}

/// One logged-in identity shared by every worker
pub struct Session {
    service: Arc<dyn BookingService>,
    identity: Identity,
    tokens: TokenCarrier,
}

impl Session {
    /// Authenticate against the service and open the session
    pub async fn login(
        service: Arc<dyn BookingService>,
        username: &str,
        password: &str,
    ) -> ClientResult<Self> {
        let reply = service.authenticate(username, password).await?;

        tracing::info!(
            identity_id = reply.value.id,
            name = %reply.value.full_name,
            "Logged in"
        );

        Ok(Self {
            service,
            identity: reply.value,
            tokens: TokenCarrier::new(reply.token),
        })
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn tokens(&self) -> &TokenCarrier {
        &self.tokens
    }

    pub async fn fetch_offering_settings(&self, location: &Location) -> ClientResult<OfferingData> {
        self.tokens
            .exchange(|token| async move {
                self.service.fetch_offering_settings(location, &token).await
            })
            .await
    }

    pub async fn query_availability(
        &self,
        query: &AvailabilityQuery,
    ) -> ClientResult<AvailabilityWindow> {
        self.tokens
            .exchange(|token| async move { self.service.query_availability(query, &token).await })
            .await
    }

    pub async fn create_appointment(
        &self,
        request: &AppointmentRequest,
    ) -> ClientResult<AppointmentId> {
        self.tokens
            .exchange(|token| async move { self.service.create_appointment(request, &token).await })
            .await
    }

    pub async fn list_known_patients(&self) -> ClientResult<Vec<Patient>> {
        self.tokens
            .exchange(|token| async move { self.service.list_known_patients(&token).await })
            .await
    }

    pub async fn confirm_appointment(
        &self,
        appointment_id: &AppointmentId,
        start_date: &str,
        patient: &Patient,
    ) -> ClientResult<()> {
        self.tokens
            .exchange(|token| async move {
                self.service
                    .confirm_appointment(appointment_id, start_date, patient, &token)
                    .await
            })
            .await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity)
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ClientError;

    #[tokio::test]
    async fn test_exchange_carries_token_forward() {
        let carrier = TokenCarrier::new(SecurityToken::new("t0"));

        let seen = carrier
            .exchange(|token| async move {
                Ok(Reply::new(token.as_str().to_string(), SecurityToken::new("t1")))
            })
            .await
            .unwrap();

        assert_eq!(seen, "t0");
        assert_eq!(carrier.current().await, SecurityToken::new("t1"));
        assert_eq!(carrier.exchanges(), 1);
    }

    #[tokio::test]
    async fn test_failed_exchange_keeps_previous_token() {
        let carrier = TokenCarrier::new(SecurityToken::new("t0"));

        let result: ClientResult<()> = carrier
            .exchange(|_| async { Err(ClientError::MissingToken { operation: "booking" }) })
            .await;

        assert!(result.is_err());
        assert_eq!(carrier.current().await, SecurityToken::new("t0"));
        assert_eq!(carrier.exchanges(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_exchanges_chain_tokens() {
        let carrier = Arc::new(TokenCarrier::new(SecurityToken::new("0")));
        let mut handles = Vec::new();

        for _ in 0..8 {
            let carrier = Arc::clone(&carrier);
            handles.push(tokio::spawn(async move {
                carrier
                    .exchange(|token| async move {
                        tokio::task::yield_now().await;
                        let next: u32 = token.as_str().parse().unwrap();
                        Ok(Reply::new((), SecurityToken::new((next + 1).to_string())))
                    })
                    .await
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // Each call saw the previous call's token, so none was lost
        assert_eq!(carrier.current().await, SecurityToken::new("8"));
    }
}
