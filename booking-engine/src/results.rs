//! Doctor filtering, ranking and the online/offline search path

use crate::cache::{ResultsCache, ResultsCachePayload};
use crate::clock::Clock;
use crate::directory::ReferenceDirectory;
use crate::models::{
    AppointmentSlot, Doctor, InsuranceClass, PatientProfile, SearchFilters, SearchQuery, SortKey,
};
use crate::slots::{earliest_start, generate_week_slots, SlotGridConfig};
use chrono::{DateTime, NaiveDate, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use storage_kv::{keys, KeyValueStore, StoreExt};
use uuid::Uuid;

/// Abbreviations accepted in the specialty query, mapped to the full
/// specialty name they stand for.
const SPECIALTY_SYNONYMS: &[(&str, &str)] = &[
    ("gp", "general medicine"),
    ("cardio", "cardiology"),
    ("derm", "dermatology"),
    ("ent", "otolaryngology"),
    ("gyn", "gynecology"),
    ("ortho", "orthopedics"),
    ("psych", "psychiatry"),
];

/// Split verdict of a filter run. Doctors excluded solely by the insurance
/// toggle are reported separately so the caller can explain the empty state
/// instead of showing a bare "no results".
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    pub visible: Vec<Doctor>,
    pub blocked_by_insurance: Vec<Doctor>,
}

/// Result of a search run.
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    /// Online path: freshly computed and cached.
    Fresh {
        visible: Vec<Doctor>,
        blocked_by_insurance: Vec<Doctor>,
        slots: HashMap<Uuid, Vec<AppointmentSlot>>,
    },
    /// Offline path: reproduced from a still-valid cache envelope for the
    /// same week, preserving the prior visible ordering.
    Cached {
        visible: Vec<Doctor>,
        slots: HashMap<Uuid, Vec<AppointmentSlot>>,
    },
    /// Offline with no usable cache. Distinguishable from "no matches" so
    /// the caller can render a no-data state rather than an empty list.
    Unavailable,
}

/// Case-insensitive specialty match. An empty query matches every doctor;
/// otherwise the query must be a substring of the specialty, or a known
/// abbreviation of it.
pub fn specialty_matches(query: &str, specialty: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }

    let specialty = specialty.to_lowercase();
    if specialty.contains(&query) {
        return true;
    }

    SPECIALTY_SYNONYMS
        .iter()
        .any(|(abbreviation, full)| *abbreviation == query && specialty.contains(full))
}

/// Case-insensitive city match; empty matches every doctor.
pub fn city_matches(query: &str, city: &str) -> bool {
    let query = query.trim().to_lowercase();
    query.is_empty() || city.to_lowercase().contains(&query)
}

/// Apply specialty, city, radius, rating, modality and language filters,
/// gating by insurance only when the searcher holds public insurance and
/// opted into "public only".
pub fn filter_doctors(
    all: &[Doctor],
    query: &SearchQuery,
    searcher_insurance: InsuranceClass,
    filters: &SearchFilters,
) -> FilterOutcome {
    let insurance_gate =
        searcher_insurance == InsuranceClass::Public && filters.public_only;

    let mut outcome = FilterOutcome::default();
    for doctor in all {
        if !specialty_matches(&query.specialty, &doctor.specialty) {
            continue;
        }
        if !city_matches(&query.city, &doctor.city) {
            continue;
        }
        if doctor.distance_km > filters.radius_km {
            continue;
        }
        if doctor.rating < filters.min_rating {
            continue;
        }
        if filters.video_only && !doctor.offers_video {
            continue;
        }
        if let Some(language) = &filters.language {
            if !doctor
                .languages
                .iter()
                .any(|spoken| spoken.eq_ignore_ascii_case(language))
            {
                continue;
            }
        }

        if insurance_gate && !doctor.accepts_public_insurance {
            outcome.blocked_by_insurance.push(doctor.clone());
        } else {
            outcome.visible.push(doctor.clone());
        }
    }

    outcome
}

/// Order doctors by the requested key. "Soonest" puts doctors with a known
/// slot first (earliest start ascending); doctors without slot data sort
/// after them, falling back to distance, and missing data never panics.
pub fn sort_doctors(
    doctors: &mut [Doctor],
    sort: SortKey,
    earliest_by_doctor: &HashMap<Uuid, DateTime<Utc>>,
) {
    match sort {
        SortKey::Distance => {
            doctors.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        }
        SortKey::Rating => {
            doctors.sort_by(|a, b| b.rating.total_cmp(&a.rating));
        }
        SortKey::Soonest => {
            doctors.sort_by(|a, b| {
                match (earliest_by_doctor.get(&a.id), earliest_by_doctor.get(&b.id)) {
                    (Some(left), Some(right)) => left
                        .cmp(right)
                        .then_with(|| a.distance_km.total_cmp(&b.distance_km)),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => a.distance_km.total_cmp(&b.distance_km),
                }
            });
        }
    }
}

/// Search orchestrator: online runs compute fresh results and replace the
/// cache envelope; offline runs replay the envelope while it is valid for
/// the requested week.
pub struct SearchEngine {
    directory: Arc<dyn ReferenceDirectory>,
    store: Arc<dyn KeyValueStore>,
    cache: ResultsCache,
    grid: SlotGridConfig,
}

impl SearchEngine {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        directory: Arc<dyn ReferenceDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            directory,
            cache: ResultsCache::new(store.clone(), clock),
            store,
            grid: SlotGridConfig::default(),
        }
    }

    pub fn with_grid(mut self, grid: SlotGridConfig) -> Self {
        self.grid = grid;
        self
    }

    pub fn cache(&self) -> &ResultsCache {
        &self.cache
    }

    pub fn search(
        &self,
        query: &SearchQuery,
        patient: &PatientProfile,
        filters: &SearchFilters,
        online: bool,
        week_start: NaiveDate,
    ) -> SearchOutcome {
        if online {
            self.search_online(query, patient, filters, week_start)
        } else {
            self.search_offline(week_start)
        }
    }

    fn search_online(
        &self,
        query: &SearchQuery,
        patient: &PatientProfile,
        filters: &SearchFilters,
        week_start: NaiveDate,
    ) -> SearchOutcome {
        let all = self.directory.all_doctors();
        let FilterOutcome {
            mut visible,
            blocked_by_insurance,
        } = filter_doctors(&all, query, patient.insurance, filters);

        let slots: HashMap<Uuid, Vec<AppointmentSlot>> = visible
            .iter()
            .map(|doctor| (doctor.id, generate_week_slots(doctor.id, week_start, &self.grid)))
            .collect();
        let earliest: HashMap<Uuid, DateTime<Utc>> = slots
            .iter()
            .filter_map(|(id, doctor_slots)| earliest_start(doctor_slots).map(|t| (*id, t)))
            .collect();

        sort_doctors(&mut visible, filters.sort, &earliest);

        let payload = ResultsCachePayload {
            week_start,
            visible_doctors: visible.iter().map(|doctor| doctor.id).collect(),
            slots_by_doctor: slots.clone(),
        };
        // Caching is best effort; a rejected write degrades the offline
        // experience, not the current search.
        if let Err(err) = self.cache.write(payload) {
            tracing::warn!(error = %err, "Failed to write results cache");
        }

        tracing::debug!(
            specialty = %query.specialty,
            city = %query.city,
            visible = visible.len(),
            blocked = blocked_by_insurance.len(),
            "Online search completed"
        );

        SearchOutcome::Fresh {
            visible,
            blocked_by_insurance,
            slots,
        }
    }

    fn search_offline(&self, week_start: NaiveDate) -> SearchOutcome {
        let Some(payload) = self.cache.read() else {
            return SearchOutcome::Unavailable;
        };
        if payload.week_start != week_start {
            return SearchOutcome::Unavailable;
        }

        let visible: Vec<Doctor> = payload
            .visible_doctors
            .iter()
            .filter_map(|id| self.directory.doctor(*id))
            .collect();

        tracing::debug!(visible = visible.len(), "Served search from cache");

        SearchOutcome::Cached {
            visible,
            slots: payload.slots_by_doctor,
        }
    }

    /// Persist filter state so it round-trips across sessions.
    pub fn persist_filters(&self, filters: &SearchFilters) -> storage_kv::StorageResult<()> {
        self.store.set_json(keys::SEARCH_FILTERS, filters)
    }

    /// Stored filter state, or defaults when nothing (readable) is stored.
    pub fn load_filters(&self) -> SearchFilters {
        match self.store.get_json(keys::SEARCH_FILTERS) {
            Ok(Some(filters)) => filters,
            Ok(None) => SearchFilters::default(),
            Err(err) => {
                tracing::warn!(error = %err, "Stored filters unreadable, using defaults");
                SearchFilters::default()
            }
        }
    }

    /// Persist the free-text query fields alongside the filters.
    pub fn persist_query(&self, query: &SearchQuery) -> storage_kv::StorageResult<()> {
        self.store.set_json(keys::SEARCH_QUERY, query)
    }

    pub fn load_query(&self) -> SearchQuery {
        match self.store.get_json(keys::SEARCH_QUERY) {
            Ok(Some(query)) => query,
            Ok(None) => SearchQuery::default(),
            Err(err) => {
                tracing::warn!(error = %err, "Stored query unreadable, using defaults");
                SearchQuery::default()
            }
        }
    }
}
