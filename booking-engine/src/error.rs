//! Error types for the booking engine

use crate::models::{BookingStatus, MAX_REASON_LEN};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum BookingError {
    /// A required part of the pending selection is absent. Validation runs
    /// before any state mutation; retrying after completing the selection
    /// is always safe.
    #[error("selection missing: {0}")]
    MissingSelection(&'static str),

    /// The slot was taken between selection and confirmation. Retryable;
    /// callers route the user back to slot selection.
    #[error("slot no longer available")]
    SlotUnavailable,

    #[error("reason exceeds {MAX_REASON_LEN} characters")]
    ReasonTooLong,

    /// A confirmation is already settling; re-entry is rejected so a double
    /// click cannot create duplicate bookings.
    #[error("a confirmation is already in progress")]
    ConfirmationInFlight,

    #[error("booking not found: {0}")]
    NotFound(Uuid),

    #[error("illegal status transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("storage error: {0}")]
    Storage(#[from] storage_kv::StorageError),
}

pub type BookingResult<T> = Result<T, BookingError>;
