//! Observable connectivity signal
//!
//! Connectivity is an external event source, not an error state: the search
//! path takes the current flag as an input, and listeners re-run reads when
//! the flag transitions. There is no polling.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

type Listener = Box<dyn Fn(bool) + Send + Sync>;

pub struct ConnectivityMonitor {
    online: AtomicBool,
    listeners: Mutex<Vec<Listener>>,
}

impl ConnectivityMonitor {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Update the flag; listeners fire only on an actual transition.
    pub fn set_online(&self, online: bool) {
        let previous = self.online.swap(online, Ordering::SeqCst);
        if previous == online {
            return;
        }

        tracing::info!(online, "Connectivity changed");
        for listener in self.listeners.lock().iter() {
            listener(online);
        }
    }

    pub fn on_change(&self, listener: impl Fn(bool) + Send + Sync + 'static) {
        self.listeners.lock().push(Box::new(listener));
    }
}
