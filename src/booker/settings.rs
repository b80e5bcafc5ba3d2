//! Offering settings resolution
//!
//! Turns the raw booking data of a location into the identifiers needed to
//! search and book the target offering.

use crate::models::{Location, OfferingData, OfferingSettings};
use crate::session::Session;
use crate::utils::error::SettingsError;

/// Visit motive booked when none is configured
pub const DEFAULT_VISIT_MOTIVE: &str = "1re injection vaccin COVID-19 (Pfizer-BioNTech)";

/// Fetches and resolves offering settings for one target visit motive
#[derive(Debug, Clone)]
pub struct SettingsResolver {
    visit_motive: String,
}

impl Default for SettingsResolver {
    fn default() -> Self {
        Self::new(DEFAULT_VISIT_MOTIVE)
    }
}

impl SettingsResolver {
    pub fn new(visit_motive: impl Into<String>) -> Self {
        Self {
            visit_motive: visit_motive.into(),
        }
    }

    pub fn visit_motive(&self) -> &str {
        &self.visit_motive
    }

    /// Fetch fresh booking data and resolve it; nothing is cached between polls
    pub async fn fetch(
        &self,
        session: &Session,
        location: &Location,
    ) -> Result<OfferingSettings, SettingsError> {
        let data = session.fetch_offering_settings(location).await?;
        self.resolve(location, &data)
    }

    /// Resolve raw booking data
    ///
    /// Exactly one visit motive must carry the target name. Agendas offering it
    /// are kept unless disabled; practices are deduplicated in first-seen order.
    pub fn resolve(
        &self,
        location: &Location,
        data: &OfferingData,
    ) -> Result<OfferingSettings, SettingsError> {
        let mut matching = data
            .visit_motives
            .iter()
            .filter(|motive| motive.name == self.visit_motive);

        let visit_motive_id = match (matching.next(), matching.count()) {
            (Some(motive), 0) => motive.id,
            (Some(_), others) => {
                return Err(SettingsError::AmbiguousOffering {
                    location: location.clone(),
                    motive: self.visit_motive.clone(),
                    count: others + 1,
                })
            }
            (None, _) => {
                return Err(SettingsError::NoMatchingOffering {
                    location: location.clone(),
                    motive: self.visit_motive.clone(),
                })
            }
        };

        let mut agenda_ids = Vec::new();
        let mut practice_ids = Vec::new();

        for agenda in data
            .agendas
            .iter()
            .filter(|agenda| agenda.visit_motive_ids.contains(&visit_motive_id))
        {
            if !agenda.is_bookable() {
                tracing::warn!(
                    location = %location,
                    agenda_id = agenda.id,
                    "Agenda is disabled, skipping"
                );
                continue;
            }

            agenda_ids.push(agenda.id);
            if !practice_ids.contains(&agenda.practice_id) {
                practice_ids.push(agenda.practice_id);
            }
        }

        if agenda_ids.is_empty() {
            return Err(SettingsError::NoEligibleAgenda {
                location: location.clone(),
            });
        }

        Ok(OfferingSettings {
            profile_id: data.profile.id,
            visit_motive_ids: vec![visit_motive_id],
            agenda_ids,
            practice_ids,
        })
    }
}
