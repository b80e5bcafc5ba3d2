//! Poller/booker worker
//!
//! Each worker pulls locations from the shared queue and runs one poll cycle
//! per location. Only the booking part of a cycle (create, create, confirm)
//! runs under the [`BookingLock`](super::BookingLock).

use chrono::Local;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use super::{BookingContext, StopReason, FIRST_DOSE_LIMIT, FOLLOW_UP_LIMIT};
use crate::client::{AppointmentRequest, AvailabilityQuery};
use crate::error::ChronodoseErrorTrait;
use crate::models::{
    parse_slot_datetime, AppointmentId, Booking, Location, OfferingSettings, Slot,
};
use crate::utils::error::BookingError;

/// Receiving end of the work queue, shared by all workers
pub type JobReceiver = Arc<Mutex<mpsc::Receiver<Location>>>;

/// How a poll cycle ended without error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No first-dose slot at this location
    Unavailable,

    /// First appointment created but no follow-up slot; left unconfirmed
    FollowUpUnavailable { appointment_id: AppointmentId },

    /// Confirmation issued; the run is over
    Booked(Booking),

    /// Stop signal seen after taking the booking lock
    Stopped,
}

/// What a worker did before exiting
#[derive(Debug, Clone)]
pub struct WorkerReport {
    pub name: String,
    pub cycles: u64,
    pub booking: Option<Booking>,
}

/// One polling worker
#[derive(Debug, Clone)]
pub struct Worker {
    name: String,
    ctx: Arc<BookingContext>,
}

impl Worker {
    /// Create worker number `id` (1-based)
    pub fn new(id: usize, ctx: Arc<BookingContext>) -> Self {
        Self {
            name: format!("Worker {id}"),
            ctx,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Consume locations until the queue closes, a booking is confirmed or
    /// the stop signal is seen
    pub async fn run(self, jobs: JobReceiver) -> WorkerReport {
        debug!(worker = %self.name, "Worker started");

        let mut cycles = 0;
        let mut booking = None;

        loop {
            let job = {
                let mut rx = jobs.lock().await;
                rx.recv().await
            };

            let Some(location) = job else {
                debug!(worker = %self.name, "Queue closed");
                break;
            };

            if self.ctx.stop.is_stopped() {
                info!(worker = %self.name, "Received stop signal");
                break;
            }

            info!(worker = %self.name, location = %location, "Checking location");
            cycles += 1;

            match self.poll_cycle(&location).await {
                Ok(CycleOutcome::Unavailable) => {
                    debug!(worker = %self.name, location = %location, "No availability");
                }
                Ok(CycleOutcome::FollowUpUnavailable { appointment_id }) => {
                    info!(
                        worker = %self.name,
                        location = %location,
                        appointment_id = %appointment_id,
                        "No follow-up slot, first appointment left unconfirmed"
                    );
                }
                Ok(CycleOutcome::Booked(confirmed)) => {
                    info!(
                        worker = %self.name,
                        location = %location,
                        appointment_id = %confirmed.appointment_id,
                        first_slot = %confirmed.first_slot,
                        follow_up_slot = %confirmed.follow_up_slot,
                        "Successfully booked"
                    );
                    booking = Some(confirmed);
                    break;
                }
                Ok(CycleOutcome::Stopped) => {
                    info!(worker = %self.name, "Received stop signal while waiting for booking lock");
                    break;
                }
                Err(e) => {
                    warn!(
                        worker = %self.name,
                        location = %location,
                        category = ?e.category(),
                        left_unconfirmed = !e.is_before_booking(),
                        error = %e,
                        "Poll cycle abandoned"
                    );
                }
            }
        }

        debug!(worker = %self.name, cycles, "Worker finished");

        WorkerReport {
            name: self.name,
            cycles,
            booking,
        }
    }

    /// Run one poll cycle against `location`
    ///
    /// Errors are recoverable: the caller logs them and moves on to the next
    /// location.
    pub async fn poll_cycle(&self, location: &Location) -> Result<CycleOutcome, BookingError> {
        let ctx = &self.ctx;

        if !ctx.pacing.is_zero() {
            tokio::time::sleep(ctx.pacing).await;
        }
        ctx.stats.record_poll();

        let settings = match ctx.resolver.fetch(&ctx.session, location).await {
            Ok(settings) => settings,
            Err(e) => {
                ctx.stats.record_settings_failure();
                return Err(e.into());
            }
        };

        let today = Local::now().date_naive();
        let tomorrow = today.succ_opt().unwrap_or(today);
        let query = AvailabilityQuery::first_dose(&settings, tomorrow, FIRST_DOSE_LIMIT);
        let window = ctx.session.query_availability(&query).await?;

        let Some(slot) = window.first_slot().cloned() else {
            ctx.stats.record_unavailable();
            return Ok(CycleOutcome::Unavailable);
        };

        info!(
            worker = %self.name,
            location = %location,
            slot = %slot.start_date,
            total = window.total,
            "First-dose slot available"
        );

        // Held until the cycle ends, including after the stop signal is set
        let _guard = ctx.lock.acquire().await;

        if ctx.stop.is_stopped() {
            return Ok(CycleOutcome::Stopped);
        }
        ctx.stats.record_lock_entry();

        self.book(location, &settings, &slot).await
    }

    /// Booking sequence; caller holds the booking lock
    async fn book(
        &self,
        location: &Location,
        settings: &OfferingSettings,
        slot: &Slot,
    ) -> Result<CycleOutcome, BookingError> {
        let ctx = &self.ctx;

        let first_id = ctx
            .session
            .create_appointment(&AppointmentRequest::new(settings, &slot.start_date))
            .await?;
        ctx.stats.record_first_created();

        info!(
            worker = %self.name,
            location = %location,
            appointment_id = %first_id,
            "Created first-dose appointment"
        );

        match self.complete(location, settings, slot, &first_id).await {
            Ok(CycleOutcome::FollowUpUnavailable { appointment_id }) => {
                ctx.stats.record_abandoned();
                Ok(CycleOutcome::FollowUpUnavailable { appointment_id })
            }
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                ctx.stats.record_abandoned();
                Err(e.abandon(&first_id))
            }
        }
    }

    async fn complete(
        &self,
        location: &Location,
        settings: &OfferingSettings,
        slot: &Slot,
        first_id: &AppointmentId,
    ) -> Result<CycleOutcome, BookingError> {
        let ctx = &self.ctx;

        let step = slot
            .follow_up_step()
            .ok_or_else(|| BookingError::MissingFollowUpStep {
                start_date: slot.start_date.clone(),
            })?;
        let follow_up_start = parse_slot_datetime(&step.start_date)?;
        let anchor = parse_slot_datetime(&slot.start_date)?;

        let query = AvailabilityQuery::follow_up(
            settings,
            follow_up_start.date_naive(),
            anchor,
            FOLLOW_UP_LIMIT,
        );
        let window = ctx.session.query_availability(&query).await?;

        let Some(follow_up) = window.first_slot() else {
            return Ok(CycleOutcome::FollowUpUnavailable {
                appointment_id: first_id.clone(),
            });
        };

        let request = AppointmentRequest::new(settings, &slot.start_date)
            .with_second_slot(&follow_up.start_date);
        let second_id = ctx.session.create_appointment(&request).await?;

        debug!(
            worker = %self.name,
            appointment_id = %second_id,
            follow_up_slot = %follow_up.start_date,
            "Created combined appointment"
        );

        let patients = ctx.session.list_known_patients().await?;
        let patient = patients.first().ok_or(BookingError::NoKnownPatient)?;

        ctx.session
            .confirm_appointment(first_id, &slot.start_date, patient)
            .await?;

        ctx.stop.trigger(StopReason::Booked);
        ctx.stats.record_confirmed();

        Ok(CycleOutcome::Booked(Booking {
            location: location.clone(),
            appointment_id: first_id.clone(),
            follow_up_appointment_id: second_id,
            first_slot: slot.start_date.clone(),
            follow_up_slot: follow_up.start_date.clone(),
            patient_id: patient.id,
        }))
    }
}
