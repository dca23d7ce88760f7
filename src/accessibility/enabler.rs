//! One-time accessibility opt-in for hosts that ship their AX tree
//! disabled.
//!
//! Chromium-based browsers and Electron apps build their accessibility
//! tree lazily: until something sets `AXManualAccessibility` (Electron)
//! or `AXEnhancedUserInterface` (Chromium) on the application element,
//! focused-element and value queries return stale or empty results. The
//! enabling write is costly for the target process, so the outcome is
//! cached per pid for the life of that process.

use std::collections::HashMap;

use tracing::debug;

/// Owns the per-process "already enabled" cache. Not shared; the engine
/// holds exactly one of these and drives it from its single control
/// thread.
#[derive(Debug, Default)]
pub struct AccessibilityEnabler {
    enabled: HashMap<i32, bool>,
}

impl AccessibilityEnabler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send the opt-in signal to `pid` unless this instance already did.
    /// Returns whether the process is (believed) enabled.
    pub fn ensure_enabled(&mut self, pid: i32) -> bool {
        self.ensure_enabled_with(pid, signal_process)
    }

    fn ensure_enabled_with(&mut self, pid: i32, signal: impl FnOnce(i32) -> bool) -> bool {
        if let Some(&outcome) = self.enabled.get(&pid) {
            return outcome;
        }
        let outcome = signal(pid);
        debug!(pid, outcome, "Sent accessibility enable signal");
        self.enabled.insert(pid, outcome);
        outcome
    }

    /// Forget every cached outcome, e.g. after the user relaunches apps.
    pub fn clear(&mut self) {
        self.enabled.clear();
    }

    pub fn cached_processes(&self) -> usize {
        self.enabled.len()
    }
}

#[cfg(target_os = "macos")]
fn signal_process(pid: i32) -> bool {
    super::macos::enable_enhanced_accessibility(pid)
}

#[cfg(not(target_os = "macos"))]
fn signal_process(_pid: i32) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn signal_fires_once_per_pid() {
        let calls = Cell::new(0);
        let mut enabler = AccessibilityEnabler::new();

        for _ in 0..3 {
            let enabled = enabler.ensure_enabled_with(42, |_| {
                calls.set(calls.get() + 1);
                true
            });
            assert!(enabled);
        }
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn failed_signal_is_cached_too() {
        // A process that rejected the signal once is not retried; the
        // cache holds the negative outcome until cleared.
        let calls = Cell::new(0);
        let mut enabler = AccessibilityEnabler::new();

        for _ in 0..2 {
            let enabled = enabler.ensure_enabled_with(7, |_| {
                calls.set(calls.get() + 1);
                false
            });
            assert!(!enabled);
        }
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn distinct_pids_signal_independently() {
        let calls = Cell::new(0);
        let mut enabler = AccessibilityEnabler::new();
        for pid in [1, 2, 3] {
            enabler.ensure_enabled_with(pid, |_| {
                calls.set(calls.get() + 1);
                true
            });
        }
        assert_eq!(calls.get(), 3);
        assert_eq!(enabler.cached_processes(), 3);
    }

    #[test]
    fn clear_forgets_cached_outcomes() {
        let calls = Cell::new(0);
        let mut enabler = AccessibilityEnabler::new();
        enabler.ensure_enabled_with(9, |_| {
            calls.set(calls.get() + 1);
            true
        });
        enabler.clear();
        enabler.ensure_enabled_with(9, |_| {
            calls.set(calls.get() + 1);
            true
        });
        assert_eq!(calls.get(), 2);
    }
}
