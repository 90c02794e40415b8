//! Simulated biometric scan flow
//!
//! An explicit finite-state machine with one transition function, driven by
//! `tick` against caller-supplied time so tests advance virtual time instead
//! of waiting on real timers. The verdict is injected at start; the scan
//! itself only models the staged delays. A pending scan cancels cleanly if
//! the user dismisses the prompt mid-flight, and a dropped deadline never
//! fires afterwards.

use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Idle,
    Scanning,
    /// Verdict shown briefly before the flow completes.
    Success,
    Failed,
}

/// Emitted by [`BiometricScan::tick`] when a staged delay elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanEvent {
    Succeeded,
    Failed,
    /// The success hold elapsed; the surrounding flow may proceed.
    Finished,
}

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub scan_duration: Duration,
    pub success_hold: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            scan_duration: Duration::milliseconds(1_500),
            success_hold: Duration::milliseconds(800),
        }
    }
}

pub struct BiometricScan {
    config: ScanConfig,
    phase: ScanPhase,
    deadline: Option<DateTime<Utc>>,
    verdict: bool,
}

impl BiometricScan {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            phase: ScanPhase::Idle,
            deadline: None,
            verdict: false,
        }
    }

    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    /// Whether the hosting overlay should be in blocking mode.
    pub fn is_in_flight(&self) -> bool {
        self.phase == ScanPhase::Scanning
    }

    /// Begin scanning with the injected verdict. Allowed from `Idle` and
    /// from `Failed` (retry); ignored while a scan is already staged.
    pub fn start(&mut self, will_succeed: bool, now: DateTime<Utc>) {
        if matches!(self.phase, ScanPhase::Scanning | ScanPhase::Success) {
            return;
        }
        self.verdict = will_succeed;
        self.phase = ScanPhase::Scanning;
        self.deadline = Some(now + self.config.scan_duration);
        tracing::debug!(will_succeed, "Biometric scan started");
    }

    /// Abort a pending scan, e.g. when the prompt is dismissed mid-flight.
    /// Drops the staged deadline so nothing fires later.
    pub fn cancel(&mut self) {
        self.phase = ScanPhase::Idle;
        self.deadline = None;
    }

    /// The single transition function.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<ScanEvent> {
        let due = self.deadline.map_or(false, |deadline| now >= deadline);
        if !due {
            return None;
        }

        match self.phase {
            ScanPhase::Scanning if self.verdict => {
                self.phase = ScanPhase::Success;
                self.deadline = Some(now + self.config.success_hold);
                Some(ScanEvent::Succeeded)
            }
            ScanPhase::Scanning => {
                self.phase = ScanPhase::Failed;
                self.deadline = None;
                Some(ScanEvent::Failed)
            }
            ScanPhase::Success => {
                self.phase = ScanPhase::Idle;
                self.deadline = None;
                Some(ScanEvent::Finished)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn scan() -> BiometricScan {
        BiometricScan::new(ScanConfig::default())
    }

    #[test]
    fn successful_scan_holds_then_finishes() {
        let mut scan = scan();
        scan.start(true, t0());
        assert_eq!(scan.phase(), ScanPhase::Scanning);
        assert!(scan.is_in_flight());

        assert_eq!(scan.tick(t0() + Duration::seconds(1)), None);

        let after_scan = t0() + Duration::milliseconds(1_500);
        assert_eq!(scan.tick(after_scan), Some(ScanEvent::Succeeded));
        assert_eq!(scan.phase(), ScanPhase::Success);

        let after_hold = after_scan + Duration::milliseconds(800);
        assert_eq!(scan.tick(after_hold), Some(ScanEvent::Finished));
        assert_eq!(scan.phase(), ScanPhase::Idle);
    }

    #[test]
    fn failed_scan_allows_retry() {
        let mut scan = scan();
        scan.start(false, t0());

        let after_scan = t0() + Duration::seconds(2);
        assert_eq!(scan.tick(after_scan), Some(ScanEvent::Failed));
        assert_eq!(scan.phase(), ScanPhase::Failed);

        scan.start(true, after_scan);
        assert_eq!(scan.phase(), ScanPhase::Scanning);
    }

    #[test]
    fn cancel_mid_flight_drops_the_staged_deadline() {
        let mut scan = scan();
        scan.start(true, t0());
        scan.cancel();
        assert_eq!(scan.phase(), ScanPhase::Idle);

        // Well past the original deadline: the cancelled scan never fires.
        assert_eq!(scan.tick(t0() + Duration::minutes(5)), None);
        assert_eq!(scan.phase(), ScanPhase::Idle);
    }

    #[test]
    fn start_is_ignored_while_a_scan_is_staged() {
        let mut scan = scan();
        scan.start(true, t0());
        let original_deadline = t0() + Duration::milliseconds(1_500);

        // A second press must not reset the running scan.
        scan.start(false, t0() + Duration::seconds(1));
        assert_eq!(scan.tick(original_deadline), Some(ScanEvent::Succeeded));
    }
}
