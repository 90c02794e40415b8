//! Offline-tolerant booking core for CareBook
//!
//! Provides:
//! - Search-result caching with a 5-minute validity window
//! - Deterministic slot generation for offline reconstruction
//! - Doctor filtering and ranking with insurance gating
//! - The booking confirmation and reschedule state machine
//! - Injected clock, connectivity and availability collaborators
//!
//! All expected failures are typed results; network absence is an input to
//! the search path, not an error, and storage failures degrade rather than
//! crash (see `storage-kv`).

pub mod cache;
pub mod clock;
pub mod confirm;
pub mod connectivity;
pub mod directory;
pub mod error;
pub mod models;
pub mod results;
pub mod slots;
pub mod store;

pub use cache::{CacheEnvelope, ResultsCache, ResultsCachePayload, RESULTS_CACHE_TTL_MS};
pub use clock::{Clock, ManualClock, SystemClock};
pub use confirm::{AlwaysAvailable, AvailabilityOracle, ConfirmationEngine, RandomContention};
pub use connectivity::ConnectivityMonitor;
pub use directory::{FixtureDirectory, ReferenceDirectory};
pub use error::{BookingError, BookingResult};
pub use models::{
    AppointmentSlot, Booking, BookingStatus, Doctor, InsuranceClass, PatientProfile,
    SearchFilters, SearchQuery, SelectionDraft, SlotLength, SortKey, VisitModality,
    MAX_REASON_LEN,
};
pub use results::{
    city_matches, filter_doctors, sort_doctors, specialty_matches, FilterOutcome, SearchEngine,
    SearchOutcome,
};
pub use slots::{earliest_start, generate_week_slots, week_start_for, SlotGridConfig};
pub use store::{presented_status, BookingStore};

use std::sync::Arc;
use storage_kv::KeyValueStore;

/// Facade wiring the search and confirmation engines to one storage layer,
/// clock, directory and availability oracle.
pub struct BookingEngine {
    search: SearchEngine,
    bookings: Arc<BookingStore>,
    confirmation: ConfirmationEngine,
}

impl BookingEngine {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        directory: Arc<dyn ReferenceDirectory>,
        clock: Arc<dyn Clock>,
        oracle: Box<dyn AvailabilityOracle>,
    ) -> Self {
        let bookings = Arc::new(BookingStore::new(store.clone(), clock.clone()));
        let search = SearchEngine::new(store.clone(), directory, clock.clone());
        let confirmation =
            ConfirmationEngine::new(bookings.clone(), store, oracle, clock);

        Self {
            search,
            bookings,
            confirmation,
        }
    }

    pub fn search(&self) -> &SearchEngine {
        &self.search
    }

    pub fn bookings(&self) -> &BookingStore {
        &self.bookings
    }

    pub fn confirmation(&self) -> &ConfirmationEngine {
        &self.confirmation
    }
}
