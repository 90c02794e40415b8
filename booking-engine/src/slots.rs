//! Deterministic slot generation
//!
//! The week grid is a pure function of `(doctor_id, week_start, grid config)`.
//! Per-slot inclusion and duration class come from a SHA-256 digest of the
//! doctor id and start instant, so regenerating the same week is always
//! bit-identical — the offline path can rebuild slot data without ever having
//! transmitted it.

use crate::models::{AppointmentSlot, SlotLength, VisitModality};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Operating parameters for a doctor's bookable week.
#[derive(Debug, Clone)]
pub struct SlotGridConfig {
    /// Number of days from the week anchor (5 = Monday through Friday).
    pub days: u32,
    pub open_hour: u32,
    pub close_hour: u32,
    /// Minutes between consecutive slot starts.
    pub cadence_minutes: u32,
}

impl Default for SlotGridConfig {
    fn default() -> Self {
        Self {
            days: 5,
            open_hour: 9,
            close_hour: 17,
            cadence_minutes: 30,
        }
    }
}

/// Monday of the ISO week containing `date`; the anchor for cache envelopes
/// and slot generation.
pub fn week_start_for(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Generate the bookable slots for one doctor and one week.
pub fn generate_week_slots(
    doctor_id: Uuid,
    week_start: NaiveDate,
    config: &SlotGridConfig,
) -> Vec<AppointmentSlot> {
    let mut slots = Vec::new();
    let cadence = config.cadence_minutes.max(1);

    for day in 0..config.days {
        let date = week_start + Duration::days(i64::from(day));
        let mut minute = config.open_hour * 60;
        let close = config.close_hour * 60;

        while minute < close {
            let Some(naive) = date.and_hms_opt(minute / 60, minute % 60, 0) else {
                minute += cadence;
                continue;
            };
            let start = DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc);
            let digest = slot_digest(doctor_id, start);

            // Roughly 60% of grid positions are offered; the rest model the
            // doctor's existing commitments.
            if digest[0] < 154 {
                let length = if digest[1] % 2 == 0 {
                    SlotLength::Min30
                } else {
                    SlotLength::Min15
                };
                slots.push(AppointmentSlot {
                    id: AppointmentSlot::derive_id(doctor_id, start),
                    doctor_id,
                    start,
                    length,
                    modality: VisitModality::InPerson,
                });
            }

            minute += cadence;
        }
    }

    slots
}

/// Earliest start among `slots`, if any.
pub fn earliest_start(slots: &[AppointmentSlot]) -> Option<DateTime<Utc>> {
    slots.iter().map(|slot| slot.start).min()
}

fn slot_digest(doctor_id: Uuid, start: DateTime<Utc>) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(doctor_id.as_bytes());
    hasher.update(start.timestamp_millis().to_be_bytes());
    hasher.finalize().into()
}
