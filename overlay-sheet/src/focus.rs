//! Focus trap
//!
//! Constrains keyboard focus cycling to the overlay's focusable set while it
//! is open: Tab wraps last-to-first, Shift+Tab wraps first-to-last, and the
//! element focused before the overlay opened is remembered for restoration.

#[derive(Debug, Default)]
pub struct FocusTrap {
    order: Vec<String>,
    index: Option<usize>,
    restore_to: Option<String>,
}

impl FocusTrap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the trap. Remembers `previously_focused` for release and returns
    /// the element to focus now: `initial` when it is part of the set,
    /// otherwise the first focusable.
    pub fn activate(
        &mut self,
        order: Vec<String>,
        previously_focused: Option<String>,
        initial: Option<&str>,
    ) -> Option<String> {
        self.restore_to = previously_focused;
        self.index = match initial {
            Some(wanted) => order.iter().position(|id| id.as_str() == wanted).or(Some(0)),
            None => Some(0),
        }
        .filter(|_| !order.is_empty());
        self.order = order;

        self.current()
    }

    pub fn current(&self) -> Option<String> {
        self.index.and_then(|i| self.order.get(i).cloned())
    }

    /// Advance in tab order, wrapping last-to-first.
    pub fn next(&mut self) -> Option<String> {
        self.step(1)
    }

    /// Move back in tab order, wrapping first-to-last.
    pub fn prev(&mut self) -> Option<String> {
        self.step(self.order.len().saturating_sub(1))
    }

    /// Follow a focus move made outside the trap (e.g. pointer click on a
    /// focusable inside the overlay) so Tab continues from there.
    pub fn sync(&mut self, focused: Option<&str>) {
        if let Some(target) = focused {
            if let Some(position) = self.order.iter().position(|id| id.as_str() == target) {
                self.index = Some(position);
            }
        }
    }

    /// Disarm and yield the element focus should return to.
    pub fn release(&mut self) -> Option<String> {
        self.order.clear();
        self.index = None;
        self.restore_to.take()
    }

    fn step(&mut self, by: usize) -> Option<String> {
        let len = self.order.len();
        if len == 0 {
            return None;
        }
        let current = self.index.unwrap_or(0);
        self.index = Some((current + by) % len);
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn tab_wraps_last_to_first() {
        let mut trap = FocusTrap::new();
        trap.activate(ids(&["a", "b", "c"]), Some("trigger".to_string()), None);

        assert_eq!(trap.next().as_deref(), Some("b"));
        assert_eq!(trap.next().as_deref(), Some("c"));
        assert_eq!(trap.next().as_deref(), Some("a"));
    }

    #[test]
    fn shift_tab_wraps_first_to_last() {
        let mut trap = FocusTrap::new();
        trap.activate(ids(&["a", "b", "c"]), None, None);

        assert_eq!(trap.prev().as_deref(), Some("c"));
    }

    #[test]
    fn initial_target_wins_when_present() {
        let mut trap = FocusTrap::new();
        let target = trap.activate(ids(&["a", "b"]), None, Some("b"));
        assert_eq!(target.as_deref(), Some("b"));

        // Unknown initial target falls back to the first focusable.
        let target = trap.activate(ids(&["a", "b"]), None, Some("zz"));
        assert_eq!(target.as_deref(), Some("a"));
    }

    #[test]
    fn release_returns_the_captured_element() {
        let mut trap = FocusTrap::new();
        trap.activate(ids(&["a"]), Some("trigger".to_string()), None);

        assert_eq!(trap.release().as_deref(), Some("trigger"));
        assert_eq!(trap.release(), None);
    }

    #[test]
    fn empty_focusable_set_is_harmless() {
        let mut trap = FocusTrap::new();
        assert_eq!(trap.activate(vec![], None, None), None);
        assert_eq!(trap.next(), None);
        assert_eq!(trap.prev(), None);
    }

    #[test]
    fn sync_follows_pointer_focus() {
        let mut trap = FocusTrap::new();
        trap.activate(ids(&["a", "b", "c"]), None, None);

        trap.sync(Some("c"));
        assert_eq!(trap.next().as_deref(), Some("a"));
    }
}
