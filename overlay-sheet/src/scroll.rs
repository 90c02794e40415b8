//! Body scroll lock
//!
//! Scoped resource: acquired when an overlay opens, released when it closes.
//! The prior scroll offset is recorded on acquire and restored on release,
//! and release is idempotent so an abnormal teardown can always call it.

use crate::host::OverlayHost;

#[derive(Debug, Default)]
pub struct ScrollLock {
    saved_offset: Option<f64>,
}

impl ScrollLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_held(&self) -> bool {
        self.saved_offset.is_some()
    }

    /// Fix the body and remember the current offset. A second acquire while
    /// held is a no-op, preserving the originally recorded offset.
    pub fn acquire(&mut self, host: &mut dyn OverlayHost) {
        if self.saved_offset.is_some() {
            return;
        }
        self.saved_offset = Some(host.scroll_offset());
        host.set_body_fixed(true);
    }

    /// Unfix the body and restore the recorded offset.
    pub fn release(&mut self, host: &mut dyn OverlayHost) {
        if let Some(offset) = self.saved_offset.take() {
            host.set_body_fixed(false);
            host.set_scroll_offset(offset);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;

    #[test]
    fn acquire_release_restores_prior_offset() {
        let mut host = MemoryHost::new(vec![]);
        host.scroll_offset = 420.0;

        let mut lock = ScrollLock::new();
        lock.acquire(&mut host);
        assert!(host.body_fixed);
        assert!(lock.is_held());

        // The page underneath may have been programmatically moved while fixed.
        host.scroll_offset = 0.0;

        lock.release(&mut host);
        assert!(!host.body_fixed);
        assert_eq!(host.scroll_offset, 420.0);
    }

    #[test]
    fn release_is_idempotent() {
        let mut host = MemoryHost::new(vec![]);
        let mut lock = ScrollLock::new();

        lock.acquire(&mut host);
        lock.release(&mut host);
        host.scroll_offset = 99.0;
        lock.release(&mut host);

        assert_eq!(host.scroll_offset, 99.0);
    }
}
