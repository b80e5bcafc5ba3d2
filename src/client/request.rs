//! Request shapes sent to the booking service
//!
//! These types carry the query/payload rules of the remote API (endpoint
//! selection, id list encoding, optional second slot) so that every
//! [`BookingService`](super::BookingService) implementation shares them.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;

use crate::models::{
    format_query_date, format_slot_datetime, OfferingSettings, Patient,
};

/// Encode an id list the way the service expects it: `12-34-56`
pub fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join("-")
}

// ============================================================================
// Availability
// ============================================================================

/// Parameters of an availability search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityQuery {
    pub start_date: NaiveDate,

    /// First-dose datetime the follow-up search is tied to
    pub anchor: Option<DateTime<FixedOffset>>,

    pub visit_motive_ids: Vec<i64>,
    pub agenda_ids: Vec<i64>,
    pub practice_ids: Vec<i64>,
    pub limit: u32,
}

impl AvailabilityQuery {
    /// First-dose search; discards stale unconfirmed holds before searching
    pub fn first_dose(settings: &OfferingSettings, start_date: NaiveDate, limit: u32) -> Self {
        Self {
            start_date,
            anchor: None,
            visit_motive_ids: settings.visit_motive_ids.clone(),
            agenda_ids: settings.agenda_ids.clone(),
            practice_ids: settings.practice_ids.clone(),
            limit,
        }
    }

    /// Follow-up search anchored on a known first-dose datetime
    pub fn follow_up(
        settings: &OfferingSettings,
        start_date: NaiveDate,
        anchor: DateTime<FixedOffset>,
        limit: u32,
    ) -> Self {
        Self {
            anchor: Some(anchor),
            ..Self::first_dose(settings, start_date, limit)
        }
    }

    pub fn is_follow_up(&self) -> bool {
        self.anchor.is_some()
    }

    /// Endpoint path relative to the service root
    pub fn path(&self) -> &'static str {
        if self.is_follow_up() {
            "/second_shot_availabilities.json"
        } else {
            "/availabilities.json"
        }
    }

    /// Query string parameters, in the order the service documents them
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("start_date", format_query_date(self.start_date)),
            ("limit", self.limit.to_string()),
            ("visit_motive_ids", join_ids(&self.visit_motive_ids)),
            ("agenda_ids", join_ids(&self.agenda_ids)),
            ("practice_ids", join_ids(&self.practice_ids)),
            ("insurance_sector", "public".to_string()),
        ];

        match &self.anchor {
            Some(anchor) => pairs.push(("first_slot", format_slot_datetime(anchor))),
            None => pairs.push(("destroy_temporary", "true".to_string())),
        }

        pairs
    }
}

// ============================================================================
// Appointment creation
// ============================================================================

/// An appointment creation, with or without the follow-up slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentRequest {
    pub start_date: String,
    pub second_slot: Option<String>,
    pub visit_motive_ids: Vec<i64>,
    pub agenda_ids: Vec<i64>,
    pub practice_ids: Vec<i64>,
    pub profile_id: i64,
}

impl AppointmentRequest {
    pub fn new(settings: &OfferingSettings, start_date: impl Into<String>) -> Self {
        Self {
            start_date: start_date.into(),
            second_slot: None,
            visit_motive_ids: settings.visit_motive_ids.clone(),
            agenda_ids: settings.agenda_ids.clone(),
            practice_ids: settings.practice_ids.clone(),
            profile_id: settings.profile_id,
        }
    }

    pub fn with_second_slot(mut self, second_slot: impl Into<String>) -> Self {
        self.second_slot = Some(second_slot.into());
        self
    }

    pub fn payload(&self) -> CreateAppointmentPayload {
        CreateAppointmentPayload {
            agenda_ids: join_ids(&self.agenda_ids),
            practice_ids: self.practice_ids.clone(),
            appointment: AppointmentPayload {
                start_date: self.start_date.clone(),
                visit_motive_ids: join_ids(&self.visit_motive_ids),
                profile_id: self.profile_id,
                source_action: "profile",
            },
            second_slot: self.second_slot.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateAppointmentPayload {
    pub agenda_ids: String,
    pub practice_ids: Vec<i64>,
    pub appointment: AppointmentPayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub second_slot: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AppointmentPayload {
    pub start_date: String,
    pub visit_motive_ids: String,
    pub profile_id: i64,
    pub source_action: &'static str,
}

// ============================================================================
// Login and confirmation
// ============================================================================

#[derive(Debug, Serialize)]
pub struct LoginPayload<'a> {
    pub remember: bool,
    pub remember_username: bool,
    pub username: &'a str,
    pub password: &'a str,
    pub kind: &'static str,
}

impl<'a> LoginPayload<'a> {
    pub fn patient(username: &'a str, password: &'a str) -> Self {
        Self {
            remember: true,
            remember_username: true,
            username,
            password,
            kind: "patient",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConfirmAppointmentPayload {
    pub new_patient: bool,
    pub bypass_mandatory_relative_contact_info: bool,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub master_patient: Patient,
    pub patient: Option<Patient>,
    pub appointment: ConfirmedAppointment,
}

#[derive(Debug, Serialize)]
pub struct ConfirmedAppointment {
    pub qualification_answers: HashMap<String, String>,
    pub new_patient: bool,
    pub start_date: String,
    pub custom_fields_values: HashMap<String, String>,
    pub referrer_id: Option<i64>,
}

impl ConfirmAppointmentPayload {
    pub fn new(start_date: &str, patient: &Patient) -> Self {
        Self {
            new_patient: true,
            bypass_mandatory_relative_contact_info: false,
            phone_number: None,
            email: None,
            master_patient: patient.prepared_for_confirmation(),
            patient: None,
            appointment: ConfirmedAppointment {
                qualification_answers: HashMap::new(),
                new_patient: true,
                start_date: start_date.to_string(),
                custom_fields_values: HashMap::new(),
                referrer_id: None,
            },
        }
    }
}
