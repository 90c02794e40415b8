//! Results cache with a time-boxed validity window
//!
//! A successful online search writes one [`CacheEnvelope`] holding the week
//! anchor, the visible doctor ordering and the generated slots. Readers treat
//! the payload as absent once it is older than [`RESULTS_CACHE_TTL_MS`];
//! there is no partial or stale read past expiry. Envelopes are never mutated
//! in place — every write replaces the previous one wholesale.

use crate::clock::Clock;
use crate::models::AppointmentSlot;
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use storage_kv::{keys, KeyValueStore, StoreExt};
use uuid::Uuid;

/// Maximum age after which a cached payload must be treated as absent.
pub const RESULTS_CACHE_TTL_MS: i64 = 300_000;

/// Wraps a payload with its creation instant (epoch milliseconds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEnvelope<T> {
    pub created_at_ms: i64,
    pub payload: T,
}

impl<T> CacheEnvelope<T> {
    pub fn new(payload: T, now: DateTime<Utc>) -> Self {
        Self {
            created_at_ms: now.timestamp_millis(),
            payload,
        }
    }

    /// The payload is readable iff `now - created_at <= TTL`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now.timestamp_millis() - self.created_at_ms <= RESULTS_CACHE_TTL_MS
    }

    /// Consume the envelope, yielding the payload only while fresh.
    pub fn into_fresh(self, now: DateTime<Utc>) -> Option<T> {
        if self.is_fresh(now) {
            Some(self.payload)
        } else {
            None
        }
    }
}

/// What a search run leaves behind: the ordering that was visible and the
/// slot data for that week. Doctor records themselves are not duplicated —
/// only their identifiers — so mutable reference data has a single home.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsCachePayload {
    pub week_start: NaiveDate,
    pub visible_doctors: Vec<Uuid>,
    pub slots_by_doctor: HashMap<Uuid, Vec<AppointmentSlot>>,
}

pub struct ResultsCache {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl ResultsCache {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Replace the cached envelope, stamped with the current instant.
    pub fn write(&self, payload: ResultsCachePayload) -> storage_kv::StorageResult<()> {
        let envelope = CacheEnvelope::new(payload, self.clock.now());
        self.store.set_json(keys::RESULTS_CACHE, &envelope)?;
        tracing::debug!(created_at_ms = envelope.created_at_ms, "Results cache written");
        Ok(())
    }

    /// The cached payload, or `None` when no entry exists, the entry has
    /// expired, or the stored value is unreadable. Callers treat all three
    /// identically: re-fetch or show a no-cached-data state.
    pub fn read(&self) -> Option<ResultsCachePayload> {
        self.read_envelope::<ResultsCachePayload>()?
            .into_fresh(self.clock.now())
    }

    /// Cached slots for one doctor, only when the cached week anchor exactly
    /// matches the requested week.
    pub fn read_slots_for(
        &self,
        doctor_id: Uuid,
        week_start: NaiveDate,
    ) -> Option<Vec<AppointmentSlot>> {
        let payload = self.read()?;
        if payload.week_start != week_start {
            return None;
        }
        payload.slots_by_doctor.get(&doctor_id).cloned()
    }

    pub fn clear(&self) -> storage_kv::StorageResult<()> {
        self.store.remove(keys::RESULTS_CACHE)
    }

    fn read_envelope<T: DeserializeOwned>(&self) -> Option<CacheEnvelope<T>> {
        match self.store.get_json(keys::RESULTS_CACHE) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::warn!(error = %err, "Results cache unreadable, treating as absent");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::Duration;
    use storage_kv::MemoryStore;

    fn payload(week_start: NaiveDate) -> ResultsCachePayload {
        ResultsCachePayload {
            week_start,
            visible_doctors: vec![Uuid::new_v4()],
            slots_by_doctor: HashMap::new(),
        }
    }

    fn setup() -> (Arc<ManualClock>, ResultsCache) {
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let cache = ResultsCache::new(
            Arc::new(MemoryStore::new()),
            clock.clone() as Arc<dyn Clock>,
        );
        (clock, cache)
    }

    #[test]
    fn payload_is_readable_up_to_the_ttl_boundary() {
        let (clock, cache) = setup();
        let week = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        cache.write(payload(week)).unwrap();

        clock.advance(Duration::milliseconds(RESULTS_CACHE_TTL_MS));
        assert!(cache.read().is_some(), "payload at exactly TTL is still fresh");

        clock.advance(Duration::milliseconds(1));
        assert!(cache.read().is_none(), "payload past TTL reads as absent");
    }

    #[test]
    fn missing_entry_reads_as_none() {
        let (_clock, cache) = setup();
        assert!(cache.read().is_none());
    }

    #[test]
    fn slot_read_requires_exact_week_match() {
        let (_clock, cache) = setup();
        let week = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let doctor = Uuid::new_v4();

        let mut cached = payload(week);
        cached.slots_by_doctor.insert(doctor, vec![]);
        cache.write(cached).unwrap();

        assert!(cache.read_slots_for(doctor, week).is_some());

        let next_week = NaiveDate::from_ymd_opt(2024, 3, 11).unwrap();
        assert!(cache.read_slots_for(doctor, next_week).is_none());
    }

    #[test]
    fn write_replaces_wholesale() {
        let (_clock, cache) = setup();
        let week_a = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let week_b = NaiveDate::from_ymd_opt(2024, 3, 11).unwrap();

        cache.write(payload(week_a)).unwrap();
        cache.write(payload(week_b)).unwrap();

        assert_eq!(cache.read().unwrap().week_start, week_b);
    }
}
