//! Namespaced key layout for the booking flows
//!
//! One key per logical field, namespaced by flow. The bookings array and the
//! results cache each live under a single key so that one `set` is the unit
//! of durability for them.

/// Array of booking records; the single source of truth for history screens.
pub const BOOKINGS: &str = "bookings";

/// One `CacheEnvelope<ResultsCachePayload>`.
pub const RESULTS_CACHE: &str = "results/cache";

/// Persisted search filter state.
pub const SEARCH_FILTERS: &str = "search/filters";

/// Persisted free-text search query fields.
pub const SEARCH_QUERY: &str = "search/query";

/// Transient marker: doctor chosen on the results screen.
pub const SELECTED_DOCTOR: &str = "selection/doctor";

/// Transient marker: slot chosen on the schedule screen.
pub const SELECTED_SLOT: &str = "selection/slot";

/// Transient marker: booking a pending confirm will replace.
pub const RESCHEDULE_FROM: &str = "selection/reschedule_from";

/// Key for an arbitrary field scoped to a named flow.
pub fn flow_key(flow: &str, field: &str) -> String {
    format!("{}/{}", flow, field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flow_key_is_namespaced() {
        assert_eq!(flow_key("search", "city"), "search/city");
    }
}
