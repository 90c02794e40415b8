//! Overlay controller
//!
//! One state machine behind bottom sheets, centered dialogs and full-screen
//! takeovers; the variants differ only in presentation defaults. The caller
//! owns the logical open flag; the controller keeps itself mounted long
//! enough to finish the exit transition, driven by `tick` against
//! caller-supplied time.

use crate::focus::FocusTrap;
use crate::host::OverlayHost;
use crate::scroll::ScrollLock;
use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayVariant {
    BottomSheet,
    CenteredDialog,
    FullScreen,
}

impl OverlayVariant {
    /// Bottom-anchored sheets show a drag handle unless configured away.
    fn default_drag_handle(self) -> bool {
        matches!(self, OverlayVariant::BottomSheet)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayPhase {
    Closed,
    Entering,
    Open,
    Exiting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Escape,
    Backdrop,
    Programmatic,
}

/// Keys the overlay intercepts while open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKey {
    Escape,
    Tab { shift: bool },
}

#[derive(Debug, Clone)]
pub struct OverlayConfig {
    pub variant: OverlayVariant,
    pub close_on_escape: bool,
    pub close_on_backdrop: bool,
    pub lock_scroll: bool,
    /// Overrides the variant's drag-handle default when set.
    pub drag_handle: Option<bool>,
    /// Element to focus on open; falls back to the first focusable.
    pub initial_focus: Option<String>,
    pub enter_duration: Duration,
    pub exit_duration: Duration,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            variant: OverlayVariant::CenteredDialog,
            close_on_escape: true,
            close_on_backdrop: true,
            lock_scroll: true,
            drag_handle: None,
            initial_focus: None,
            enter_duration: Duration::milliseconds(150),
            exit_duration: Duration::milliseconds(200),
        }
    }
}

impl OverlayConfig {
    pub fn sheet() -> Self {
        Self {
            variant: OverlayVariant::BottomSheet,
            ..Self::default()
        }
    }

    pub fn fullscreen() -> Self {
        Self {
            variant: OverlayVariant::FullScreen,
            ..Self::default()
        }
    }
}

pub struct OverlayController<H: OverlayHost> {
    host: H,
    config: OverlayConfig,
    phase: OverlayPhase,
    deadline: Option<DateTime<Utc>>,
    blocking: bool,
    focus: FocusTrap,
    scroll: ScrollLock,
    last_close_reason: Option<CloseReason>,
}

impl<H: OverlayHost> OverlayController<H> {
    pub fn new(host: H, config: OverlayConfig) -> Self {
        Self {
            host,
            config,
            phase: OverlayPhase::Closed,
            deadline: None,
            blocking: false,
            focus: FocusTrap::new(),
            scroll: ScrollLock::new(),
            last_close_reason: None,
        }
    }

    pub fn phase(&self) -> OverlayPhase {
        self.phase
    }

    /// Logically open: visible and interactive (possibly still animating in).
    pub fn is_open(&self) -> bool {
        matches!(self.phase, OverlayPhase::Entering | OverlayPhase::Open)
    }

    /// Still needs to be rendered, including while animating out.
    pub fn is_mounted(&self) -> bool {
        self.phase != OverlayPhase::Closed
    }

    pub fn shows_drag_handle(&self) -> bool {
        self.config
            .drag_handle
            .unwrap_or_else(|| self.config.variant.default_drag_handle())
    }

    pub fn last_close_reason(&self) -> Option<CloseReason> {
        self.last_close_reason
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// While blocking (an async operation in flight), Escape and backdrop
    /// dismissal are suppressed until the condition clears.
    pub fn set_blocking(&mut self, blocking: bool) {
        self.blocking = blocking;
    }

    /// Caller-owned open flag. Opening from `Closed` runs the full open
    /// sequence; closing from any open phase starts the staged exit.
    pub fn set_open(&mut self, open: bool, now: DateTime<Utc>) {
        if open {
            if self.phase == OverlayPhase::Closed {
                self.open(now);
            }
        } else {
            self.begin_close(CloseReason::Programmatic, now);
        }
    }

    /// Advance staged transitions. Call whenever time passes; returns the
    /// phase after the step so render layers know whether to unmount.
    pub fn tick(&mut self, now: DateTime<Utc>) -> OverlayPhase {
        let due = self.deadline.map_or(false, |deadline| now >= deadline);
        match self.phase {
            OverlayPhase::Entering if due => {
                self.phase = OverlayPhase::Open;
                self.deadline = None;
            }
            OverlayPhase::Exiting if due => self.finish_close(),
            _ => {}
        }
        self.phase
    }

    pub fn handle_key(&mut self, key: OverlayKey, now: DateTime<Utc>) {
        if !self.is_open() {
            return;
        }

        match key {
            OverlayKey::Escape => {
                if self.config.close_on_escape && !self.blocking {
                    self.begin_close(CloseReason::Escape, now);
                }
            }
            OverlayKey::Tab { shift } => {
                let focused = self.host.focused();
                self.focus.sync(focused.as_deref());
                let target = if shift {
                    self.focus.prev()
                } else {
                    self.focus.next()
                };
                if let Some(target) = target {
                    self.host.set_focus(&target);
                }
            }
        }
    }

    pub fn backdrop_pressed(&mut self, now: DateTime<Utc>) {
        if !self.is_open() {
            return;
        }
        if self.config.close_on_backdrop && !self.blocking {
            self.begin_close(CloseReason::Backdrop, now);
        }
    }

    fn open(&mut self, now: DateTime<Utc>) {
        if self.config.lock_scroll {
            self.scroll.acquire(&mut self.host);
        }

        let previously_focused = self.host.focused();
        let focusables = self.host.focusables();
        let target = self.focus.activate(
            focusables,
            previously_focused,
            self.config.initial_focus.as_deref(),
        );
        if let Some(target) = target {
            self.host.set_focus(&target);
        }

        self.blocking = false;
        self.last_close_reason = None;
        self.phase = OverlayPhase::Entering;
        self.deadline = Some(now + self.config.enter_duration);
        tracing::debug!(variant = ?self.config.variant, "Overlay opened");
    }

    /// Every dismissal path (Escape, backdrop, programmatic) converges here:
    /// focus is restored immediately, and the overlay stays mounted until
    /// the exit transition deadline passes.
    fn begin_close(&mut self, reason: CloseReason, now: DateTime<Utc>) {
        if !self.is_open() {
            return;
        }

        self.last_close_reason = Some(reason);
        if let Some(target) = self.focus.release() {
            self.host.set_focus(&target);
        }
        self.phase = OverlayPhase::Exiting;
        self.deadline = Some(now + self.config.exit_duration);
        tracing::debug!(?reason, "Overlay closing");
    }

    fn finish_close(&mut self) {
        self.scroll.release(&mut self.host);
        self.phase = OverlayPhase::Closed;
        self.deadline = None;
    }
}

impl<H: OverlayHost> Drop for OverlayController<H> {
    /// Scoped resources survive abnormal teardown: an overlay dropped while
    /// mounted still unfixes the body and hands focus back.
    fn drop(&mut self) {
        self.scroll.release(&mut self.host);
        if let Some(target) = self.focus.release() {
            self.host.set_focus(&target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn dialog_host() -> MemoryHost {
        let mut host = MemoryHost::new(vec![
            "confirm".to_string(),
            "cancel".to_string(),
            "close".to_string(),
        ]);
        host.focused = Some("trigger".to_string());
        host
    }

    fn open_dialog(config: OverlayConfig) -> OverlayController<MemoryHost> {
        let mut overlay = OverlayController::new(dialog_host(), config);
        overlay.set_open(true, t0());
        overlay
    }

    #[test]
    fn open_moves_focus_to_first_focusable_and_locks_scroll() {
        let overlay = open_dialog(OverlayConfig::default());
        assert_eq!(overlay.host().focused.as_deref(), Some("confirm"));
        assert!(overlay.host().body_fixed);
        assert!(overlay.is_open());
        assert_eq!(overlay.phase(), OverlayPhase::Entering);
    }

    #[test]
    fn configured_initial_focus_wins() {
        let mut config = OverlayConfig::default();
        config.initial_focus = Some("cancel".to_string());
        let overlay = open_dialog(config);
        assert_eq!(overlay.host().focused.as_deref(), Some("cancel"));
    }

    #[test]
    fn tab_wraps_within_the_overlay() {
        let mut overlay = open_dialog(OverlayConfig::default());

        overlay.handle_key(OverlayKey::Tab { shift: false }, t0());
        overlay.handle_key(OverlayKey::Tab { shift: false }, t0());
        assert_eq!(overlay.host().focused.as_deref(), Some("close"));

        // Tab on the last focusable wraps to the first, never the document.
        overlay.handle_key(OverlayKey::Tab { shift: false }, t0());
        assert_eq!(overlay.host().focused.as_deref(), Some("confirm"));

        overlay.handle_key(OverlayKey::Tab { shift: true }, t0());
        assert_eq!(overlay.host().focused.as_deref(), Some("close"));
    }

    #[test]
    fn all_close_paths_restore_captured_focus() {
        let close_paths: [fn(&mut OverlayController<MemoryHost>); 3] = [
            |o| o.handle_key(OverlayKey::Escape, t0()),
            |o| o.backdrop_pressed(t0()),
            |o| o.set_open(false, t0()),
        ];
        for close in close_paths {
            let mut overlay = open_dialog(OverlayConfig::default());
            close(&mut overlay);
            assert_eq!(overlay.host().focused.as_deref(), Some("trigger"));
            assert!(!overlay.is_open());
        }
    }

    #[test]
    fn exit_transition_keeps_the_overlay_mounted_until_the_deadline() {
        let mut overlay = open_dialog(OverlayConfig::default());
        overlay.set_open(false, t0());

        assert!(!overlay.is_open());
        assert!(overlay.is_mounted());
        assert_eq!(overlay.phase(), OverlayPhase::Exiting);

        // Scroll stays locked while the sheet animates out.
        assert!(overlay.host().body_fixed);

        overlay.tick(t0() + Duration::milliseconds(100));
        assert!(overlay.is_mounted());

        overlay.tick(t0() + Duration::milliseconds(200));
        assert!(!overlay.is_mounted());
        assert!(!overlay.host().body_fixed);
    }

    #[test]
    fn escape_can_be_disabled() {
        let mut config = OverlayConfig::default();
        config.close_on_escape = false;
        let mut overlay = open_dialog(config);

        overlay.handle_key(OverlayKey::Escape, t0());
        assert!(overlay.is_open());

        // Backdrop still works independently.
        overlay.backdrop_pressed(t0());
        assert!(!overlay.is_open());
    }

    #[test]
    fn blocking_suppresses_both_dismissal_paths() {
        let mut overlay = open_dialog(OverlayConfig::default());
        overlay.set_blocking(true);

        overlay.handle_key(OverlayKey::Escape, t0());
        overlay.backdrop_pressed(t0());
        assert!(overlay.is_open());

        overlay.set_blocking(false);
        overlay.handle_key(OverlayKey::Escape, t0());
        assert!(!overlay.is_open());
        assert_eq!(overlay.last_close_reason(), Some(CloseReason::Escape));
    }

    #[test]
    fn scroll_lock_restores_recorded_offset_after_close() {
        let mut host = dialog_host();
        host.scroll_offset = 640.0;
        let mut overlay = OverlayController::new(host, OverlayConfig::default());

        overlay.set_open(true, t0());
        overlay.set_open(false, t0());
        overlay.tick(t0() + Duration::seconds(1));

        assert_eq!(overlay.host().scroll_offset, 640.0);
        assert!(!overlay.host().body_fixed);
    }

    #[test]
    fn scroll_lock_can_be_opted_out() {
        let mut config = OverlayConfig::sheet();
        config.lock_scroll = false;
        let overlay = open_dialog(config);
        assert!(!overlay.host().body_fixed);
    }

    #[test]
    fn drag_handle_defaults_follow_the_variant() {
        assert!(open_dialog(OverlayConfig::sheet()).shows_drag_handle());
        assert!(!open_dialog(OverlayConfig::default()).shows_drag_handle());
        assert!(!open_dialog(OverlayConfig::fullscreen()).shows_drag_handle());

        let mut config = OverlayConfig::default();
        config.drag_handle = Some(true);
        assert!(open_dialog(config).shows_drag_handle());
    }

    /// Host handle that lets the test observe state after the controller is
    /// dropped mid-flight.
    #[derive(Clone, Default)]
    struct SharedHost(Rc<RefCell<MemoryHost>>);

    impl OverlayHost for SharedHost {
        fn focused(&self) -> Option<String> {
            self.0.borrow().focused.clone()
        }
        fn set_focus(&mut self, target: &str) {
            self.0.borrow_mut().focused = Some(target.to_string());
        }
        fn focusables(&self) -> Vec<String> {
            self.0.borrow().focusables.clone()
        }
        fn scroll_offset(&self) -> f64 {
            self.0.borrow().scroll_offset
        }
        fn set_scroll_offset(&mut self, offset: f64) {
            self.0.borrow_mut().scroll_offset = offset;
        }
        fn set_body_fixed(&mut self, fixed: bool) {
            self.0.borrow_mut().body_fixed = fixed;
        }
    }

    #[test]
    fn dropping_a_mounted_overlay_releases_its_resources() {
        let shared = SharedHost::default();
        {
            let mut inner = shared.0.borrow_mut();
            inner.focusables = vec!["confirm".to_string()];
            inner.focused = Some("trigger".to_string());
            inner.scroll_offset = 120.0;
        }

        {
            let mut overlay = OverlayController::new(shared.clone(), OverlayConfig::default());
            overlay.set_open(true, t0());
            assert!(shared.0.borrow().body_fixed);
            // Dropped without ever being closed.
        }

        let inner = shared.0.borrow();
        assert!(!inner.body_fixed);
        assert_eq!(inner.scroll_offset, 120.0);
        assert_eq!(inner.focused.as_deref(), Some("trigger"));
    }
}
