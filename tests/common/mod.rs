//! Common test utilities
//!
//! A scripted in-memory [`BookingService`] that records every call, checks the
//! presented security token against the last one it issued and tracks how many
//! bookings are in progress at once.

#![allow(dead_code)]

use async_trait::async_trait;
use chronodose::booker::DEFAULT_VISIT_MOTIVE;
use chronodose::client::{AppointmentRequest, AvailabilityQuery, BookingService, ClientResult};
use chronodose::models::{
    format_query_date, format_slot_datetime, Agenda, AppointmentId, AvailabilityWindow,
    BookingProfile, DayAvailability, Identity, Location, OfferingData, Patient, Reply,
    SecurityToken, Slot, SlotStep, VisitMotive,
};
use chronodose::utils::error::ClientError;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

pub const FIRST_SLOT: &str = "2021-06-01T09:30:00.000+02:00";
pub const FOLLOW_UP_STEP: &str = "2021-07-06T09:30:00.000+02:00";
pub const FOLLOW_UP_SLOT: &str = "2021-07-06T10:00:00.000+02:00";

/// One recorded call, with the token it presented
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Authenticate,
    FetchSettings {
        location: String,
        token: String,
    },
    Query {
        follow_up: bool,
        start_date: String,
        anchor: Option<String>,
        limit: u32,
        token: String,
    },
    Create {
        start_date: String,
        second_slot: Option<String>,
        token: String,
    },
    Patients {
        token: String,
    },
    Confirm {
        appointment_id: String,
        start_date: String,
        patient_id: i64,
        token: String,
    },
}

impl Call {
    pub fn is_create(&self) -> bool {
        matches!(self, Self::Create { .. })
    }

    pub fn is_confirm(&self) -> bool {
        matches!(self, Self::Confirm { .. })
    }

    pub fn is_follow_up_query(&self) -> bool {
        matches!(self, Self::Query { follow_up: true, .. })
    }
}

/// Behaviour of the fake service
#[derive(Debug, Clone, Default)]
pub struct Script {
    /// Booking data per location slug; unknown slugs answer 404
    pub offerings: HashMap<String, OfferingData>,

    /// First-dose answers keyed by the first agenda id of the query
    pub first_dose: HashMap<i64, AvailabilityWindow>,

    /// Answer to every follow-up query once `empty_follow_ups` are used up
    pub follow_up: AvailabilityWindow,

    /// Number of follow-up queries answered with no slot
    pub empty_follow_ups: usize,

    pub patients: Vec<Patient>,

    /// Latency of create and confirm calls
    pub booking_delay: Duration,
}

impl Script {
    /// A location offering the default visit motive with one bookable slot
    pub fn with_bookable(mut self, location: &str, agenda_id: i64, slot: Slot) -> Self {
        self.offerings.insert(
            location.to_string(),
            offering(agenda_id, DEFAULT_VISIT_MOTIVE),
        );
        self.first_dose.insert(agenda_id, window(vec![slot]));
        self
    }

    /// A location whose only offering does not match the default visit motive
    pub fn with_unmatched(mut self, location: &str, agenda_id: i64) -> Self {
        self.offerings
            .insert(location.to_string(), offering(agenda_id, "Consultation"));
        self
    }

    /// A location offering the default visit motive with no slot
    pub fn with_unavailable(mut self, location: &str, agenda_id: i64) -> Self {
        self.offerings.insert(
            location.to_string(),
            offering(agenda_id, DEFAULT_VISIT_MOTIVE),
        );
        self.first_dose.insert(agenda_id, AvailabilityWindow::default());
        self
    }
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<Call>,
    issued: u64,
    token_mismatches: u64,
    created: u64,
    follow_up_queries: usize,
    in_flight: i64,
    max_in_flight: i64,
}

/// Scripted booking service
#[derive(Debug)]
pub struct FakeService {
    script: Script,
    state: Mutex<State>,
}

impl FakeService {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            state: Mutex::new(State::default()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn token_mismatches(&self) -> u64 {
        self.state.lock().unwrap().token_mismatches
    }

    pub fn max_in_flight(&self) -> i64 {
        self.state.lock().unwrap().max_in_flight
    }

    /// Check the presented token, record the call and issue the next token
    fn record(&self, presented: Option<&SecurityToken>, call: Call) -> SecurityToken {
        let mut state = self.state.lock().unwrap();

        if let Some(presented) = presented {
            let expected = format!("tok-{}", state.issued);
            if presented.as_str() != expected {
                state.token_mismatches += 1;
            }
        }

        state.calls.push(call);
        state.issued += 1;
        SecurityToken::new(format!("tok-{}", state.issued))
    }

    fn adjust_in_flight(&self, delta: i64) {
        let mut state = self.state.lock().unwrap();
        state.in_flight += delta;
        state.max_in_flight = state.max_in_flight.max(state.in_flight);
    }
}

#[async_trait]
impl BookingService for FakeService {
    async fn authenticate(&self, _username: &str, _password: &str) -> ClientResult<Reply<Identity>> {
        let token = self.record(None, Call::Authenticate);
        Ok(Reply::new(
            Identity {
                id: 1,
                full_name: "Jane Doe".to_string(),
            },
            token,
        ))
    }

    async fn fetch_offering_settings(
        &self,
        location: &Location,
        token: &SecurityToken,
    ) -> ClientResult<Reply<OfferingData>> {
        let next = self.record(
            Some(token),
            Call::FetchSettings {
                location: location.to_string(),
                token: token.as_str().to_string(),
            },
        );

        match self.script.offerings.get(location.as_str()) {
            Some(data) => Ok(Reply::new(data.clone(), next)),
            None => Err(ClientError::Status {
                status: 404,
                url: format!("/booking/{location}.json"),
            }),
        }
    }

    async fn query_availability(
        &self,
        query: &AvailabilityQuery,
        token: &SecurityToken,
    ) -> ClientResult<Reply<AvailabilityWindow>> {
        let next = self.record(
            Some(token),
            Call::Query {
                follow_up: query.is_follow_up(),
                start_date: format_query_date(query.start_date),
                anchor: query.anchor.as_ref().map(format_slot_datetime),
                limit: query.limit,
                token: token.as_str().to_string(),
            },
        );

        if !query.is_follow_up() {
            let window = query
                .agenda_ids
                .first()
                .and_then(|id| self.script.first_dose.get(id))
                .cloned()
                .unwrap_or_default();
            return Ok(Reply::new(window, next));
        }

        let empty = {
            let mut state = self.state.lock().unwrap();
            state.follow_up_queries += 1;
            state.follow_up_queries <= self.script.empty_follow_ups
        };

        if empty {
            // The booking in progress ends here
            self.adjust_in_flight(-1);
            Ok(Reply::new(AvailabilityWindow::default(), next))
        } else {
            Ok(Reply::new(self.script.follow_up.clone(), next))
        }
    }

    async fn create_appointment(
        &self,
        request: &AppointmentRequest,
        token: &SecurityToken,
    ) -> ClientResult<Reply<AppointmentId>> {
        if request.second_slot.is_none() {
            self.adjust_in_flight(1);
        }
        tokio::time::sleep(self.script.booking_delay).await;

        let next = self.record(
            Some(token),
            Call::Create {
                start_date: request.start_date.clone(),
                second_slot: request.second_slot.clone(),
                token: token.as_str().to_string(),
            },
        );

        let id = {
            let mut state = self.state.lock().unwrap();
            state.created += 1;
            format!("appt-{}", state.created)
        };

        Ok(Reply::new(AppointmentId::new(id), next))
    }

    async fn list_known_patients(&self, token: &SecurityToken) -> ClientResult<Reply<Vec<Patient>>> {
        let next = self.record(
            Some(token),
            Call::Patients {
                token: token.as_str().to_string(),
            },
        );
        Ok(Reply::new(self.script.patients.clone(), next))
    }

    async fn confirm_appointment(
        &self,
        appointment_id: &AppointmentId,
        start_date: &str,
        patient: &Patient,
        token: &SecurityToken,
    ) -> ClientResult<Reply<()>> {
        tokio::time::sleep(self.script.booking_delay).await;

        let next = self.record(
            Some(token),
            Call::Confirm {
                appointment_id: appointment_id.to_string(),
                start_date: start_date.to_string(),
                patient_id: patient.id,
                token: token.as_str().to_string(),
            },
        );
        self.adjust_in_flight(-1);

        Ok(Reply::new((), next))
    }
}

/// Booking data with one agenda offering `motive`
pub fn offering(agenda_id: i64, motive: &str) -> OfferingData {
    OfferingData {
        profile: BookingProfile { id: agenda_id * 10 },
        visit_motives: vec![VisitMotive {
            id: agenda_id + 1000,
            name: motive.to_string(),
        }],
        agendas: vec![Agenda {
            id: agenda_id,
            booking_disabled: false,
            booking_temporary_disabled: false,
            visit_motive_ids: vec![agenda_id + 1000],
            practice_id: agenda_id + 500,
        }],
    }
}

/// First-dose slot whose follow-up step starts at `follow_up_step`
pub fn two_step_slot(first: &str, follow_up_step: &str) -> Slot {
    Slot {
        start_date: first.to_string(),
        steps: vec![
            SlotStep {
                start_date: first.to_string(),
            },
            SlotStep {
                start_date: follow_up_step.to_string(),
            },
        ],
    }
}

pub fn bare_slot(start_date: &str) -> Slot {
    Slot {
        start_date: start_date.to_string(),
        steps: Vec::new(),
    }
}

/// Window with one day holding `slots`
pub fn window(slots: Vec<Slot>) -> AvailabilityWindow {
    AvailabilityWindow {
        total: slots.len() as u32,
        availabilities: vec![DayAvailability {
            date: "2021-06-01".to_string(),
            slots,
        }],
    }
}

pub fn patient(id: i64) -> Patient {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "first_name": "Jane",
        "last_name": "Doe"
    }))
    .unwrap()
}

/// Script with a working follow-up search and one known patient
pub fn base_script() -> Script {
    Script {
        follow_up: window(vec![bare_slot(FOLLOW_UP_SLOT)]),
        patients: vec![patient(5)],
        ..Script::default()
    }
}

pub fn location(slug: &str) -> Location {
    Location::new(slug).unwrap()
}
