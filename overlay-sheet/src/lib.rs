//! Headless sheet/dialog overlay primitive for CareBook
//!
//! Provides:
//! - [`OverlayController`]: one state machine behind bottom sheets, centered
//!   dialogs and full-screen takeovers (enter/exit staging, dismissal
//!   policy, blocking mode)
//! - [`FocusTrap`]: Tab cycling constrained to the open overlay, with
//!   capture/restore of the previously focused element
//! - [`ScrollLock`]: scoped body-scroll lock with guaranteed release
//! - [`BiometricScan`]: the tick-driven simulated scan flow
//!
//! The crate has no business-logic coupling; booking and destructive-action
//! screens consume it as a pure interaction contract. Time is always
//! supplied by the caller, so every staged delay is testable with virtual
//! time and cancellable before it fires.

pub mod focus;
pub mod host;
pub mod overlay;
pub mod scan;
pub mod scroll;

pub use focus::FocusTrap;
pub use host::{MemoryHost, OverlayHost};
pub use overlay::{
    CloseReason, OverlayConfig, OverlayController, OverlayKey, OverlayPhase, OverlayVariant,
};
pub use scan::{BiometricScan, ScanConfig, ScanEvent, ScanPhase};
pub use scroll::ScrollLock;
