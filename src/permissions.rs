//! macOS permission checking utilities
//!
//! Accessibility permission gates everything this tool does: reading the
//! focused element, injecting keystrokes, and hit-testing under the
//! pointer all require the process to be trusted. Checks run at the
//! start of every extraction and insertion so revocation at runtime
//! degrades gracefully instead of crashing mid-operation.

#[cfg(target_os = "macos")]
use tracing::debug;

/// The permission/authorization boundary, injectable so tests and the
/// engine's callers can substitute their own gate.
pub trait PermissionGate {
    fn is_granted(&self) -> bool;
    /// Check, and if not granted, ask the system to show its (modal)
    /// grant prompt. Returns the post-prompt state, which on macOS is
    /// still false until the user toggles the setting and usually
    /// relaunches the app.
    fn request_if_needed(&self) -> bool;
}

/// The real system gate.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPermissions;

impl PermissionGate for SystemPermissions {
    fn is_granted(&self) -> bool {
        check_accessibility_permission()
    }

    fn request_if_needed(&self) -> bool {
        if check_accessibility_permission() {
            return true;
        }
        prompt_accessibility_permission()
    }
}

/// Check if the app has accessibility permission on macOS.
///
/// This calls `AXIsProcessTrusted()` from ApplicationServices.framework.
/// Returns true if granted, false otherwise.
#[cfg(target_os = "macos")]
pub fn check_accessibility_permission() -> bool {
    #[link(name = "ApplicationServices", kind = "framework")]
    extern "C" {
        // macOS Boolean is actually u8 (unsigned char), not Rust bool
        fn AXIsProcessTrusted() -> u8;
    }

    let result = unsafe { AXIsProcessTrusted() };
    let is_trusted = result != 0;
    debug!("Accessibility permission check: {} (raw: {})", is_trusted, result);
    is_trusted
}

/// Check with the system prompt option set, so macOS shows its grant
/// dialog when the process is not yet trusted.
#[cfg(target_os = "macos")]
pub fn prompt_accessibility_permission() -> bool {
    use core_foundation::base::TCFType;
    use core_foundation::boolean::CFBoolean;
    use core_foundation::dictionary::CFDictionary;
    use core_foundation::string::CFString;

    #[link(name = "ApplicationServices", kind = "framework")]
    extern "C" {
        fn AXIsProcessTrustedWithOptions(
            options: core_foundation::dictionary::CFDictionaryRef,
        ) -> u8;
    }

    let key = CFString::new("AXTrustedCheckOptionPrompt");
    let options =
        CFDictionary::from_CFType_pairs(&[(key.as_CFType(), CFBoolean::true_value().as_CFType())]);

    let result = unsafe { AXIsProcessTrustedWithOptions(options.as_concrete_TypeRef()) };
    debug!("Accessibility permission prompt issued (raw: {})", result);
    result != 0
}

/// Open System Settings to the Accessibility privacy pane
#[cfg(target_os = "macos")]
pub fn open_accessibility_settings() -> Result<(), String> {
    std::process::Command::new("open")
        .arg("x-apple.systempreferences:com.apple.preference.security?Privacy_Accessibility")
        .spawn()
        .map_err(|e| format!("Failed to open Accessibility settings: {}", e))?;
    Ok(())
}

// Stub implementations for non-macOS platforms
#[cfg(not(target_os = "macos"))]
pub fn check_accessibility_permission() -> bool {
    true // Assume always granted on non-macOS
}

#[cfg(not(target_os = "macos"))]
pub fn prompt_accessibility_permission() -> bool {
    true
}

#[cfg(not(target_os = "macos"))]
pub fn open_accessibility_settings() -> Result<(), String> {
    Ok(()) // No-op on non-macOS
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A gate with a fixed answer.
    struct FixedGate(bool);

    impl PermissionGate for FixedGate {
        fn is_granted(&self) -> bool {
            self.0
        }

        fn request_if_needed(&self) -> bool {
            self.0
        }
    }

    #[test]
    fn fixed_gate_reports_its_answer() {
        assert!(FixedGate(true).is_granted());
        assert!(!FixedGate(false).is_granted());
    }
}
