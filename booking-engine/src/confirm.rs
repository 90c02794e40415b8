//! Booking confirmation and reschedule state machine
//!
//! Screens stage a selection through transient storage markers; `confirm`
//! validates the staged intent, checks availability, records the booking and
//! only then consumes the markers. A reschedule stages a replace-from
//! reference and re-runs this same confirm path, so there is no parallel
//! reschedule-confirm flow to drift from the primary invariants.

use crate::clock::Clock;
use crate::error::{BookingError, BookingResult};
use crate::models::{
    AppointmentSlot, Booking, BookingStatus, PatientProfile, SelectionDraft, MAX_REASON_LEN,
};
use crate::store::BookingStore;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use storage_kv::{keys, KeyValueStore, StoreExt};
use uuid::Uuid;

/// Real-time availability verdict for a slot, beyond the engine's own
/// double-booking rule. Production would consult a live calendar; demos and
/// tests inject deterministic or randomized stand-ins.
pub trait AvailabilityOracle: Send + Sync {
    fn slot_available(&self, doctor_id: Uuid, slot: &AppointmentSlot) -> bool;
}

/// Oracle that never reports contention.
pub struct AlwaysAvailable;

impl AvailabilityOracle for AlwaysAvailable {
    fn slot_available(&self, _doctor_id: Uuid, _slot: &AppointmentSlot) -> bool {
        true
    }
}

/// Simulated slot contention: reports "taken" with the configured
/// probability. Exists to exercise the retry path, not as business logic.
pub struct RandomContention {
    pub rate: f64,
}

impl AvailabilityOracle for RandomContention {
    fn slot_available(&self, _doctor_id: Uuid, _slot: &AppointmentSlot) -> bool {
        rand::thread_rng().gen::<f64>() >= self.rate
    }
}

pub struct ConfirmationEngine {
    bookings: Arc<BookingStore>,
    store: Arc<dyn KeyValueStore>,
    oracle: Box<dyn AvailabilityOracle>,
    clock: Arc<dyn Clock>,
    in_flight: AtomicBool,
}

impl ConfirmationEngine {
    pub fn new(
        bookings: Arc<BookingStore>,
        store: Arc<dyn KeyValueStore>,
        oracle: Box<dyn AvailabilityOracle>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            bookings,
            store,
            oracle,
            clock,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Stage the slot chosen on the schedule screen.
    pub fn select_slot(&self, slot: AppointmentSlot) -> BookingResult<()> {
        self.store.set_json(keys::SELECTED_DOCTOR, &slot.doctor_id)?;
        self.store.set_json(keys::SELECTED_SLOT, &slot)?;
        Ok(())
    }

    /// Stage a reschedule: records which booking a subsequent confirm will
    /// replace. Mutates no booking; the confirm path does the replacement.
    pub fn stage_reschedule(&self, booking_id: Uuid) -> BookingResult<()> {
        let booking = self
            .bookings
            .find(booking_id)
            .ok_or(BookingError::NotFound(booking_id))?;
        let status = crate::store::presented_status(&booking, self.clock.now());
        if status != BookingStatus::Confirmed {
            return Err(BookingError::InvalidTransition {
                from: status,
                to: BookingStatus::Cancelled,
            });
        }

        self.store.set_json(keys::RESCHEDULE_FROM, &booking_id)?;
        tracing::debug!(booking_id = %booking_id, "Reschedule staged");
        Ok(())
    }

    /// The currently staged selection, for screens that restore state.
    pub fn pending_selection(&self) -> SelectionDraft {
        SelectionDraft {
            doctor_id: self.read_marker(keys::SELECTED_DOCTOR),
            slot: self.read_marker(keys::SELECTED_SLOT),
            replaces_booking_id: self.read_marker(keys::RESCHEDULE_FROM),
        }
    }

    /// Drop all staged markers, e.g. when the user abandons the flow.
    pub fn clear_selection(&self) {
        for key in [keys::SELECTED_DOCTOR, keys::SELECTED_SLOT, keys::RESCHEDULE_FROM] {
            if let Err(err) = self.store.remove(key) {
                tracing::warn!(key, error = %err, "Failed to clear selection marker");
            }
        }
    }

    /// Turn the staged selection into a durable booking.
    ///
    /// Validation and availability run before any mutation; a rejected
    /// attempt leaves the staged selection intact so retry needs no re-entry.
    /// For a staged reschedule the replacement is appended and the old
    /// booking cancelled in one persisted write, and the markers are
    /// consumed only after that write succeeds.
    pub fn confirm(
        &self,
        patient: &PatientProfile,
        reason: Option<String>,
    ) -> BookingResult<Booking> {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;

        let draft = self.pending_selection();
        let doctor_id = draft
            .doctor_id
            .ok_or(BookingError::MissingSelection("doctor"))?;
        let slot = draft.slot.ok_or(BookingError::MissingSelection("slot"))?;
        if slot.doctor_id != doctor_id {
            return Err(BookingError::MissingSelection("slot"));
        }
        if let Some(text) = &reason {
            if text.chars().count() > MAX_REASON_LEN {
                return Err(BookingError::ReasonTooLong);
            }
        }

        if self.bookings.has_confirmed_for(doctor_id, &slot.id) {
            return Err(BookingError::SlotUnavailable);
        }
        if !self.oracle.slot_available(doctor_id, &slot) {
            tracing::info!(slot_id = %slot.id, "Availability oracle reported contention");
            return Err(BookingError::SlotUnavailable);
        }

        let booking = Booking {
            id: Uuid::new_v4(),
            doctor_id,
            patient_id: patient.id,
            slot,
            status: BookingStatus::Confirmed,
            created_at: self.clock.now(),
            confirmation_code: generate_confirmation_code(),
            reason,
            replaces_booking_id: draft.replaces_booking_id,
        };

        let recorded = match draft.replaces_booking_id {
            Some(replaced_id) => self.bookings.append_and_cancel(booking, replaced_id)?,
            None => self.bookings.append(booking)?,
        };

        // Markers are consumed only once the booking is durable; a repeat
        // confirm (double click) now fails validation instead of booking twice.
        self.clear_selection();

        Ok(recorded)
    }

    /// Explicit, user-confirmed cancellation. Callers present a confirmation
    /// overlay before invoking this; the engine itself never cancels
    /// silently as a side effect of anything but a staged reschedule.
    pub fn cancel(&self, booking_id: Uuid) -> BookingResult<Booking> {
        self.bookings.cancel(booking_id)
    }

    fn read_marker<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.store.get_json(key) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(key, error = %err, "Selection marker unreadable");
                None
            }
        }
    }
}

/// Re-entrancy guard around confirm. Acquired for the duration of one
/// attempt and released on every exit path.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> BookingResult<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| BookingError::ConfirmationInFlight)?;
        Ok(Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Presentable confirmation code: two letters plus a six-digit suffix.
/// Cosmetic only; uniqueness of bookings comes from their ids.
fn generate_confirmation_code() -> String {
    let mut rng = rand::thread_rng();
    let letters: String = (0..2).map(|_| rng.gen_range(b'A'..=b'Z') as char).collect();
    format!("{}-{:06}", letters, rng.gen_range(0..1_000_000))
}
