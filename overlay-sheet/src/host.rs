//! Host environment abstraction
//!
//! The overlay is headless: focus and body scrolling belong to whatever
//! surface renders it (a browser document, a test double). The controller
//! owns its host so scoped resources can be released even on abnormal drop.

/// Focus and scroll surface the overlay operates on. Focus targets are
/// opaque string identifiers in tab order.
pub trait OverlayHost {
    fn focused(&self) -> Option<String>;

    fn set_focus(&mut self, target: &str);

    /// Focusable descendants of the overlay, in tab order.
    fn focusables(&self) -> Vec<String>;

    fn scroll_offset(&self) -> f64;

    fn set_scroll_offset(&mut self, offset: f64);

    /// Fix or unfix the body while the overlay is open.
    fn set_body_fixed(&mut self, fixed: bool);
}

/// In-memory host for tests, demos and scripted flows.
#[derive(Debug, Default)]
pub struct MemoryHost {
    pub focused: Option<String>,
    pub focusables: Vec<String>,
    pub scroll_offset: f64,
    pub body_fixed: bool,
}

impl MemoryHost {
    pub fn new(focusables: Vec<String>) -> Self {
        Self {
            focusables,
            ..Self::default()
        }
    }
}

impl OverlayHost for MemoryHost {
    fn focused(&self) -> Option<String> {
        self.focused.clone()
    }

    fn set_focus(&mut self, target: &str) {
        self.focused = Some(target.to_string());
    }

    fn focusables(&self) -> Vec<String> {
        self.focusables.clone()
    }

    fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    fn set_scroll_offset(&mut self, offset: f64) {
        self.scroll_offset = offset;
    }

    fn set_body_fixed(&mut self, fixed: bool) {
        self.body_fixed = fixed;
    }
}
