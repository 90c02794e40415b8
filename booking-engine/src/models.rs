//! Domain records for search, scheduling and booking
//!
//! Everything here is a plain serde value record; the invariants live in the
//! engines, not in the types. Bookings embed a snapshot of the slot they were
//! created against, so a slot never needs to exist independently of its
//! booking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Upper bound on the free-text booking reason, enforced before mutation.
pub const MAX_REASON_LEN: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsuranceClass {
    Public,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitModality {
    InPerson,
    Video,
}

/// Duration class of a bookable slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotLength {
    Min15,
    Min30,
}

impl SlotLength {
    pub fn minutes(self) -> i64 {
        match self {
            SlotLength::Min15 => 15,
            SlotLength::Min30 => 30,
        }
    }
}

/// Doctor reference data, provided by the directory collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub specialty: String,
    pub city: String,
    pub distance_km: f64,
    pub rating: f32,
    pub languages: Vec<String>,
    pub offers_video: bool,
    pub accepts_public_insurance: bool,
}

/// Patient reference data. Read-only within this core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientProfile {
    pub id: Uuid,
    pub display_name: String,
    pub insurance: InsuranceClass,
}

/// A discrete bookable time interval for a doctor.
///
/// The identifier is derived from the owning doctor and the start instant, so
/// regenerating the same week always yields the same ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentSlot {
    pub id: String,
    pub doctor_id: Uuid,
    pub start: DateTime<Utc>,
    pub length: SlotLength,
    pub modality: VisitModality,
}

impl AppointmentSlot {
    pub fn derive_id(doctor_id: Uuid, start: DateTime<Utc>) -> String {
        format!("{}-{}", doctor_id, start.timestamp_millis())
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.start + chrono::Duration::minutes(self.length.minutes())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
    Completed,
}

/// A durable booking record.
///
/// `status` only ever transitions `Confirmed -> Cancelled`; `Completed` is a
/// derived presentation status computed at read time and never written back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub slot: AppointmentSlot,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub confirmation_code: String,
    pub reason: Option<String>,
    /// Set when this booking was created to satisfy a reschedule; points at
    /// the booking it superseded.
    pub replaces_booking_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Soonest,
    Distance,
    Rating,
}

/// Search filter state. Serializable; round-trips through storage exactly,
/// and one [`SearchFilters::clear`] restores every default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    pub radius_km: f64,
    pub min_rating: f32,
    pub video_only: bool,
    pub public_only: bool,
    pub language: Option<String>,
    pub sort: SortKey,
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self {
            radius_km: 10.0,
            min_rating: 0.0,
            video_only: false,
            public_only: false,
            language: None,
            sort: SortKey::default(),
        }
    }
}

impl SearchFilters {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Free-text query fields of the search screen. Persisted separately from
/// the filter toggles so each restores independently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub specialty: String,
    pub city: String,
}

/// Typed navigation intent between slot selection and confirmation.
///
/// Screens stage the fields through transient storage markers; `confirm`
/// validates presence at the receiving end instead of trusting the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionDraft {
    pub doctor_id: Option<Uuid>,
    pub slot: Option<AppointmentSlot>,
    pub replaces_booking_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_round_trip_exactly() {
        let mut filters = SearchFilters::default();
        filters.radius_km = 25.0;
        filters.min_rating = 4.5;
        filters.public_only = true;
        filters.language = Some("de".to_string());
        filters.sort = SortKey::Rating;

        let encoded = serde_json::to_string(&filters).unwrap();
        let decoded: SearchFilters = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, filters);
    }

    #[test]
    fn clear_restores_all_defaults_in_one_call() {
        let mut filters = SearchFilters {
            radius_km: 3.0,
            min_rating: 4.0,
            video_only: true,
            public_only: true,
            language: Some("en".to_string()),
            sort: SortKey::Distance,
        };

        filters.clear();
        assert_eq!(filters, SearchFilters::default());
    }

    #[test]
    fn slot_id_derivation_is_stable() {
        let doctor = Uuid::nil();
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(
            AppointmentSlot::derive_id(doctor, start),
            AppointmentSlot::derive_id(doctor, start),
        );
    }
}
