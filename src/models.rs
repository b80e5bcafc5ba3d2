//! Core data structures and types
//!
//! Identifiers, raw remote payloads and the resolved values that flow between the
//! client, the settings resolver and the booking workers.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::utils::error::{BookingError, LocationError};

/// Datetime format used by the remote service for slots, e.g. `2021-06-01T09:30:00.000+02:00`
pub const SLOT_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%:z";

/// Date format used for `start_date` query parameters
pub const QUERY_DATE_FORMAT: &str = "%Y-%m-%d";

/// Read an explicit `null` as the field's default, like a missing key
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

// ============================================================================
// Identifiers
// ============================================================================

/// Opaque slug naming a place to check
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Location(String);

impl Location {
    /// Create a location, rejecting blank identifiers
    pub fn new(slug: impl Into<String>) -> Result<Self, LocationError> {
        let slug = slug.into();
        let trimmed = slug.trim();
        if trimmed.is_empty() {
            return Err(LocationError::Blank);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Location {
    type Error = LocationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Location> for String {
    fn from(location: Location) -> Self {
        location.0
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-request security token rotated by the remote service on every call
#[derive(Clone, PartialEq, Eq, Default)]
pub struct SecurityToken(String);

impl SecurityToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecurityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only a short prefix ever reaches the logs
        let prefix: String = self.0.chars().take(4).collect();
        write!(f, "SecurityToken({prefix}…)")
    }
}

/// Server-assigned appointment identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppointmentId(String);

impl AppointmentId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppointmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A value returned by the remote service together with the token to present next
#[derive(Debug, Clone)]
pub struct Reply<T> {
    pub value: T,
    pub token: SecurityToken,
}

impl<T> Reply<T> {
    pub fn new(value: T, token: SecurityToken) -> Self {
        Self { value, token }
    }
}

// ============================================================================
// Identity and patients
// ============================================================================

/// Authenticated account identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub full_name: String,
}

/// Patient profile saved on the account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub first_name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub last_name: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub gender: Option<bool>,
    #[serde(default)]
    pub birthdate: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub is_complete: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub has_own_email: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub has_own_phone_number: bool,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(rename = "mismatchInsurance", default, deserialize_with = "null_default")]
    pub mismatch_insurance: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub consented: bool,

    /// Fields the service sends that we pass back untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Patient {
    /// Copy of this record with the flags the confirmation endpoint expects
    pub fn prepared_for_confirmation(&self) -> Self {
        Self {
            mismatch_insurance: false,
            consented: true,
            ..self.clone()
        }
    }
}

// ============================================================================
// Offering data
// ============================================================================

/// Raw booking data of a location
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OfferingData {
    pub profile: BookingProfile,
    #[serde(default, deserialize_with = "null_default")]
    pub visit_motives: Vec<VisitMotive>,
    #[serde(default, deserialize_with = "null_default")]
    pub agendas: Vec<Agenda>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingProfile {
    pub id: i64,
}

/// A bookable service offered at a location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitMotive {
    pub id: i64,
    pub name: String,
}

/// Remote calendar bound to one practice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agenda {
    pub id: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub booking_disabled: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub booking_temporary_disabled: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub visit_motive_ids: Vec<i64>,
    #[serde(default, deserialize_with = "null_default")]
    pub practice_id: i64,
}

impl Agenda {
    pub fn is_bookable(&self) -> bool {
        !self.booking_disabled && !self.booking_temporary_disabled
    }
}

/// Identifiers needed to query and create appointments for one offering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferingSettings {
    pub profile_id: i64,
    pub visit_motive_ids: Vec<i64>,
    pub agenda_ids: Vec<i64>,
    pub practice_ids: Vec<i64>,
}

// ============================================================================
// Availability
// ============================================================================

/// Result of an availability query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    #[serde(default, deserialize_with = "null_default")]
    pub availabilities: Vec<DayAvailability>,
    #[serde(default, deserialize_with = "null_default")]
    pub total: u32,
}

impl AvailabilityWindow {
    /// First slot in server order, skipping days without slots
    pub fn first_slot(&self) -> Option<&Slot> {
        if self.total == 0 {
            return None;
        }
        self.availabilities
            .iter()
            .find_map(|day| day.slots.first())
    }
}

/// Slots of a single day
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DayAvailability {
    #[serde(default, deserialize_with = "null_default")]
    pub date: String,
    #[serde(default, deserialize_with = "null_default")]
    pub slots: Vec<Slot>,
}

/// A bookable start time, optionally with the embedded steps of a multi-dose booking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SlotRepr")]
pub struct Slot {
    pub start_date: String,
    #[serde(default, deserialize_with = "null_default")]
    pub steps: Vec<SlotStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotStep {
    pub start_date: String,
}

/// Follow-up queries return bare datetimes, first-dose queries return objects
#[derive(Deserialize)]
#[serde(untagged)]
enum SlotRepr {
    Bare(String),
    Detailed {
        start_date: String,
        #[serde(default, deserialize_with = "null_default")]
        steps: Vec<SlotStep>,
    },
}

impl From<SlotRepr> for Slot {
    fn from(repr: SlotRepr) -> Self {
        match repr {
            SlotRepr::Bare(start_date) => Self {
                start_date,
                steps: Vec::new(),
            },
            SlotRepr::Detailed { start_date, steps } => Self { start_date, steps },
        }
    }
}

impl Slot {
    /// Step describing the follow-up dose (the second embedded step)
    pub fn follow_up_step(&self) -> Option<&SlotStep> {
        self.steps.get(1)
    }
}

/// Parse a slot datetime in the service's fixed format
pub fn parse_slot_datetime(value: &str) -> Result<DateTime<FixedOffset>, BookingError> {
    DateTime::parse_from_str(value, SLOT_DATETIME_FORMAT).map_err(|source| {
        BookingError::InvalidSlotDate {
            value: value.to_string(),
            source,
        }
    })
}

pub fn format_slot_datetime(datetime: &DateTime<FixedOffset>) -> String {
    datetime.format(SLOT_DATETIME_FORMAT).to_string()
}

pub fn format_query_date(date: NaiveDate) -> String {
    date.format(QUERY_DATE_FORMAT).to_string()
}

// ============================================================================
// Booking outcome
// ============================================================================

/// A confirmed two-dose booking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Booking {
    pub location: Location,
    pub appointment_id: AppointmentId,
    pub follow_up_appointment_id: AppointmentId,
    pub first_slot: String,
    pub follow_up_slot: String,
    pub patient_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_location_rejects_blank() {
        assert!(Location::new("  ").is_err());
        assert_eq!(Location::new(" center-a\n").unwrap().as_str(), "center-a");
    }

    #[test]
    fn test_parse_slot_datetime() {
        let dt = parse_slot_datetime("2021-06-01T09:30:00.000+02:00").unwrap();
        assert_eq!(dt.year(), 2021);
        assert_eq!(dt.hour(), 9);
        assert_eq!(dt.offset().local_minus_utc(), 7200);
        assert_eq!(format_slot_datetime(&dt), "2021-06-01T09:30:00.000+02:00");
    }

    #[test]
    fn test_parse_slot_datetime_rejects_other_formats() {
        assert!(parse_slot_datetime("2021-06-01").is_err());
        assert!(parse_slot_datetime("not a date").is_err());
    }

    #[test]
    fn test_first_slot_skips_empty_days() {
        let window: AvailabilityWindow = serde_json::from_value(serde_json::json!({
            "availabilities": [
                {"date": "2021-06-01", "slots": []},
                {"date": "2021-06-02", "slots": [
                    {"start_date": "2021-06-02T10:00:00.000+02:00", "steps": []}
                ]}
            ],
            "total": 1
        }))
        .unwrap();

        let slot = window.first_slot().unwrap();
        assert_eq!(slot.start_date, "2021-06-02T10:00:00.000+02:00");
    }

    #[test]
    fn test_first_slot_none_when_total_is_zero() {
        let window = AvailabilityWindow::default();
        assert!(window.first_slot().is_none());
    }

    #[test]
    fn test_slot_accepts_bare_datetime() {
        let day: DayAvailability = serde_json::from_value(serde_json::json!({
            "date": "2021-07-06",
            "slots": ["2021-07-06T14:00:00.000+02:00"]
        }))
        .unwrap();

        assert_eq!(day.slots[0].start_date, "2021-07-06T14:00:00.000+02:00");
        assert!(day.slots[0].follow_up_step().is_none());
    }

    #[test]
    fn test_patient_keeps_unknown_fields() {
        let patient: Patient = serde_json::from_value(serde_json::json!({
            "id": 7,
            "first_name": "Ada",
            "last_name": "Lovelace",
            "insurance_type": "public",
            "mismatchInsurance": true
        }))
        .unwrap();

        let prepared = patient.prepared_for_confirmation();
        assert!(prepared.consented);
        assert!(!prepared.mismatch_insurance);

        let json = serde_json::to_value(&prepared).unwrap();
        assert_eq!(json["insurance_type"], "public");
        assert_eq!(json["mismatchInsurance"], false);
    }

    #[test]
    fn test_patient_null_fields_read_as_defaults() {
        let patients: Vec<Patient> = serde_json::from_str(
            r#"[{"id":5,"first_name":null,"last_name":"Doe","is_complete":null,
                "has_own_email":null,"mismatchInsurance":null,"consented":null,"email":null}]"#,
        )
        .unwrap();

        assert_eq!(patients[0].id, 5);
        assert_eq!(patients[0].first_name, "");
        assert!(!patients[0].is_complete);
        assert!(!patients[0].mismatch_insurance);
        assert_eq!(patients[0].email, None);
    }

    #[test]
    fn test_offering_null_fields_read_as_defaults() {
        let data: OfferingData = serde_json::from_str(
            r#"{"profile":{"id":7},"visit_motives":null,"agendas":[
                {"id":1,"booking_disabled":null,"booking_temporary_disabled":false,
                 "visit_motive_ids":null,"practice_id":null},
                {"id":2,"visit_motive_ids":[3],"practice_id":50}]}"#,
        )
        .unwrap();

        assert!(data.visit_motives.is_empty());
        assert_eq!(data.agendas[0].practice_id, 0);
        assert!(data.agendas[0].is_bookable());
        assert!(data.agendas[0].visit_motive_ids.is_empty());
        assert_eq!(data.agendas[1].practice_id, 50);
    }

    #[test]
    fn test_availability_null_fields_read_as_defaults() {
        let window: AvailabilityWindow = serde_json::from_str(
            r#"{"total":null,"availabilities":[{"date":null,"slots":[
                {"start_date":"2021-06-01T09:30:00.000+02:00","steps":null}]}]}"#,
        )
        .unwrap();

        assert_eq!(window.total, 0);
        assert!(window.first_slot().is_none());
        assert!(window.availabilities[0].slots[0].steps.is_empty());

        let identity: Identity = serde_json::from_str(r#"{"id":42,"full_name":null}"#).unwrap();
        assert_eq!(identity.full_name, "");
    }

    #[test]
    fn test_security_token_debug_is_truncated() {
        let token = SecurityToken::new("abcdefghijkl");
        assert_eq!(format!("{token:?}"), "SecurityToken(abcd…)");
    }
}
