//! Durable booking records
//!
//! The bookings array under one storage key is the single source of truth
//! for every history and appointment view. The store is the only writer of
//! booking status; `Completed` is derived at read time and never persisted.

use crate::clock::Clock;
use crate::error::{BookingError, BookingResult};
use crate::models::{Booking, BookingStatus};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use storage_kv::{keys, KeyValueStore, StoreExt};
use uuid::Uuid;

/// The status a booking presents with at `now`: a still-confirmed booking
/// whose slot start has passed counts as completed. Derived only, never
/// persisted.
pub fn presented_status(booking: &Booking, now: DateTime<Utc>) -> BookingStatus {
    if booking.status == BookingStatus::Confirmed && booking.slot.start < now {
        BookingStatus::Completed
    } else {
        booking.status
    }
}

pub struct BookingStore {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl BookingStore {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// All stored bookings as persisted. Unreadable state degrades to an
    /// empty list rather than failing the read path.
    pub fn load(&self) -> Vec<Booking> {
        match self.store.get_json::<Vec<Booking>>(keys::BOOKINGS) {
            Ok(Some(bookings)) => bookings,
            Ok(None) => Vec::new(),
            Err(err) => {
                tracing::warn!(error = %err, "Bookings unreadable, treating as empty");
                Vec::new()
            }
        }
    }

    /// Bookings for one patient with the derived presentation status
    /// applied: a still-confirmed booking whose slot start has passed is
    /// reported as completed without writing that state back.
    pub fn list_for_patient(&self, patient_id: Uuid) -> Vec<Booking> {
        let now = self.clock.now();
        let mut bookings: Vec<Booking> = self
            .load()
            .into_iter()
            .filter(|booking| booking.patient_id == patient_id)
            .map(|mut booking| {
                booking.status = presented_status(&booking, now);
                booking
            })
            .collect();
        bookings.sort_by_key(|booking| booking.slot.start);
        bookings
    }

    pub fn find(&self, booking_id: Uuid) -> Option<Booking> {
        self.load().into_iter().find(|b| b.id == booking_id)
    }

    /// Whether a confirmed booking already occupies this (doctor, slot) pair.
    pub fn has_confirmed_for(&self, doctor_id: Uuid, slot_id: &str) -> bool {
        self.load().iter().any(|booking| {
            booking.status == BookingStatus::Confirmed
                && booking.doctor_id == doctor_id
                && booking.slot.id == slot_id
        })
    }

    /// Append one confirmed booking.
    pub fn append(&self, booking: Booking) -> BookingResult<Booking> {
        let mut all = self.load();
        all.push(booking.clone());
        self.save_all(&all)?;

        tracing::info!(booking_id = %booking.id, code = %booking.confirmation_code, "Booking recorded");
        Ok(booking)
    }

    /// Reschedule write: append the replacement and cancel the replaced
    /// booking in one persisted write. The replacement is added before the
    /// old record is touched, and both land in the same `save_all`, so no
    /// observable state ever has the old booking cancelled without the new
    /// one confirmed.
    pub fn append_and_cancel(
        &self,
        replacement: Booking,
        replaced_id: Uuid,
    ) -> BookingResult<Booking> {
        let mut all = self.load();
        let now = self.clock.now();

        let replaced_status = all
            .iter()
            .find(|b| b.id == replaced_id)
            .map(|b| presented_status(b, now))
            .ok_or(BookingError::NotFound(replaced_id))?;
        if replaced_status != BookingStatus::Confirmed {
            return Err(BookingError::InvalidTransition {
                from: replaced_status,
                to: BookingStatus::Cancelled,
            });
        }

        all.push(replacement.clone());
        for booking in all.iter_mut() {
            if booking.id == replaced_id {
                booking.status = BookingStatus::Cancelled;
            }
        }
        self.save_all(&all)?;

        tracing::info!(
            booking_id = %replacement.id,
            replaces = %replaced_id,
            "Reschedule recorded"
        );
        Ok(replacement)
    }

    /// Explicit user cancellation. Terminal: there is no undo, and a booking
    /// that already presents as completed cannot be cancelled either.
    pub fn cancel(&self, booking_id: Uuid) -> BookingResult<Booking> {
        let now = self.clock.now();
        let mut all = self.load();
        let booking = all
            .iter_mut()
            .find(|b| b.id == booking_id)
            .ok_or(BookingError::NotFound(booking_id))?;

        let status = presented_status(booking, now);
        if status != BookingStatus::Confirmed {
            return Err(BookingError::InvalidTransition {
                from: status,
                to: BookingStatus::Cancelled,
            });
        }

        booking.status = BookingStatus::Cancelled;
        let cancelled = booking.clone();
        self.save_all(&all)?;

        tracing::info!(booking_id = %booking_id, "Booking cancelled");
        Ok(cancelled)
    }

    fn save_all(&self, bookings: &[Booking]) -> BookingResult<()> {
        self.store.set_json(keys::BOOKINGS, bookings)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::{AppointmentSlot, SlotLength, VisitModality};
    use chrono::{DateTime, Duration, Utc};
    use storage_kv::MemoryStore;

    fn slot_at(doctor_id: Uuid, start: DateTime<Utc>) -> AppointmentSlot {
        AppointmentSlot {
            id: AppointmentSlot::derive_id(doctor_id, start),
            doctor_id,
            start,
            length: SlotLength::Min30,
            modality: VisitModality::InPerson,
        }
    }

    fn booking(patient_id: Uuid, start: DateTime<Utc>) -> Booking {
        let doctor_id = Uuid::new_v4();
        Booking {
            id: Uuid::new_v4(),
            doctor_id,
            patient_id,
            slot: slot_at(doctor_id, start),
            status: BookingStatus::Confirmed,
            created_at: start - Duration::days(1),
            confirmation_code: "AB-000001".to_string(),
            reason: None,
            replaces_booking_id: None,
        }
    }

    fn setup() -> (Arc<ManualClock>, BookingStore) {
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let store = BookingStore::new(
            Arc::new(MemoryStore::new()),
            clock.clone() as Arc<dyn Clock>,
        );
        (clock, store)
    }

    #[test]
    fn past_confirmed_booking_reads_as_completed_without_write() {
        let (clock, store) = setup();
        let patient = Uuid::new_v4();
        let recorded = store
            .append(booking(patient, clock.now() + Duration::hours(1)))
            .unwrap();

        clock.advance(Duration::hours(2));

        let listed = store.list_for_patient(patient);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, BookingStatus::Completed);

        // The stored record is untouched.
        let stored = store.find(recorded.id).unwrap();
        assert_eq!(stored.status, BookingStatus::Confirmed);
    }

    #[test]
    fn cancel_is_terminal() {
        let (clock, store) = setup();
        let patient = Uuid::new_v4();
        let recorded = store
            .append(booking(patient, clock.now() + Duration::hours(1)))
            .unwrap();

        store.cancel(recorded.id).unwrap();
        let err = store.cancel(recorded.id).unwrap_err();
        assert!(matches!(err, BookingError::InvalidTransition { .. }));
    }

    #[test]
    fn past_booking_presents_as_completed_and_cannot_be_cancelled() {
        let (clock, store) = setup();
        let patient = Uuid::new_v4();
        let recorded = store
            .append(booking(patient, clock.now() + Duration::hours(1)))
            .unwrap();

        clock.advance(Duration::hours(2));

        let err = store.cancel(recorded.id).unwrap_err();
        assert!(matches!(
            err,
            BookingError::InvalidTransition {
                from: BookingStatus::Completed,
                ..
            }
        ));
    }

    #[test]
    fn cancel_unknown_booking_is_not_found() {
        let (_clock, store) = setup();
        let err = store.cancel(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, BookingError::NotFound(_)));
    }

    #[test]
    fn reschedule_write_is_one_atomic_replacement() {
        let (clock, store) = setup();
        let patient = Uuid::new_v4();
        let old = store
            .append(booking(patient, clock.now() + Duration::hours(1)))
            .unwrap();

        let mut replacement = booking(patient, clock.now() + Duration::hours(3));
        replacement.replaces_booking_id = Some(old.id);
        let new = store.append_and_cancel(replacement, old.id).unwrap();

        let all = store.load();
        assert_eq!(all.len(), 2);
        let stored_old = store.find(old.id).unwrap();
        let stored_new = store.find(new.id).unwrap();
        assert_eq!(stored_old.status, BookingStatus::Cancelled);
        assert_eq!(stored_new.status, BookingStatus::Confirmed);
        assert_eq!(stored_new.replaces_booking_id, Some(old.id));
    }

    #[test]
    fn reschedule_of_cancelled_booking_is_rejected_without_side_effects() {
        let (clock, store) = setup();
        let patient = Uuid::new_v4();
        let old = store
            .append(booking(patient, clock.now() + Duration::hours(1)))
            .unwrap();
        store.cancel(old.id).unwrap();

        let replacement = booking(patient, clock.now() + Duration::hours(3));
        let err = store.append_and_cancel(replacement, old.id).unwrap_err();
        assert!(matches!(err, BookingError::InvalidTransition { .. }));
        assert_eq!(store.load().len(), 1);
    }

    #[test]
    fn failed_combined_write_leaves_old_booking_confirmed() {
        // A store whose writes start failing after setup: the combined
        // reschedule write must then change nothing observable.
        struct RejectingStore {
            inner: MemoryStore,
            reject: std::sync::atomic::AtomicBool,
        }

        impl KeyValueStore for RejectingStore {
            fn get(&self, key: &str) -> storage_kv::StorageResult<Option<serde_json::Value>> {
                self.inner.get(key)
            }
            fn set(&self, key: &str, value: serde_json::Value) -> storage_kv::StorageResult<()> {
                if self.reject.load(std::sync::atomic::Ordering::SeqCst) {
                    return Err(storage_kv::StorageError::Rejected("disk full".to_string()));
                }
                self.inner.set(key, value)
            }
            fn remove(&self, key: &str) -> storage_kv::StorageResult<()> {
                self.inner.remove(key)
            }
            fn entries(&self) -> storage_kv::StorageResult<Vec<(String, serde_json::Value)>> {
                self.inner.entries()
            }
        }

        let raw = Arc::new(RejectingStore {
            inner: MemoryStore::new(),
            reject: std::sync::atomic::AtomicBool::new(false),
        });
        let clock = Arc::new(ManualClock::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        ));
        let store = BookingStore::new(raw.clone(), clock.clone() as Arc<dyn Clock>);

        let patient = Uuid::new_v4();
        let old = store
            .append(booking(patient, clock.now() + Duration::hours(1)))
            .unwrap();

        raw.reject.store(true, std::sync::atomic::Ordering::SeqCst);
        let replacement = booking(patient, clock.now() + Duration::hours(3));
        assert!(store.append_and_cancel(replacement, old.id).is_err());

        // Neither half of the reschedule landed: the old booking is still
        // the one confirmed appointment.
        let all = store.load();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, BookingStatus::Confirmed);
    }
}
