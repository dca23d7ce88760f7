//! User-visible feedback capability.
//!
//! The core never owns UI: permission and no-text conditions surface
//! through this injected interface. The system implementation beeps and,
//! for the permission case, points the user at the Accessibility privacy
//! pane; insertion failure is deliberately silent (the user sees no
//! change and retries).

use tracing::warn;

pub trait Presenter {
    /// Nothing extractable under the cursor.
    fn signal_no_context(&self);
    /// Accessibility permission is missing; guide the user to grant it.
    fn signal_permission_required(&self);
}

/// Audible cue through the system alert sound.
#[cfg(target_os = "macos")]
pub fn beep() {
    #[link(name = "AppKit", kind = "framework")]
    extern "C" {
        fn NSBeep();
    }
    unsafe { NSBeep() };
}

/// Stub for non-macOS platforms.
#[cfg(not(target_os = "macos"))]
pub fn beep() {}

/// Default presenter: beep, and open System Settings for the permission
/// case.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPresenter;

impl Presenter for SystemPresenter {
    fn signal_no_context(&self) {
        beep();
    }

    fn signal_permission_required(&self) {
        beep();
        warn!("Accessibility permission required; opening the privacy pane");
        if let Err(e) = crate::permissions::open_accessibility_settings() {
            warn!("Could not open Accessibility settings: {}", e);
        }
    }
}

/// Presenter that swallows every signal; used by tests and one-shot CLI
/// commands that report through their own output.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentPresenter;

impl Presenter for SilentPresenter {
    fn signal_no_context(&self) {}
    fn signal_permission_required(&self) {}
}
