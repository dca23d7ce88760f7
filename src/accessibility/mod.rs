//! macOS Accessibility API integration for text context capture.
//!
//! Uses AXUIElement to read the focused element's text, selection, and
//! cursor position from the currently focused application, falling back
//! to hit-testing under the pointer for hosts (mostly browsers) that
//! never report a focused element.

mod enabler;
mod text;

#[cfg(target_os = "macos")]
pub(crate) mod macos;

pub use enabler::AccessibilityEnabler;
#[cfg(target_os = "macos")]
pub use macos::extract_text_context;
pub use text::{SelectedRange, TextContext};
#[cfg(target_os = "macos")]
pub(crate) use text::utf16_offset_of_char;

use crate::geometry::ScreenPoint;

/// Where the extracted context came from. Drives the last-resort
/// clipboard tier of the insertion engine, which only applies when no
/// element was ever located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextSource {
    /// The host reported a focused UI element directly.
    FocusedElement,
    /// The element was found by hit-testing under the pointer.
    PointerElement,
    /// No element could be located; the context is a best-effort shell.
    Unlocated,
}

/// Extraction failure taxonomy. All non-fatal: the caller signals the
/// user and moves on.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExtractError {
    #[error("accessibility permission has not been granted")]
    PermissionDenied,
    #[error("no focused element could be resolved")]
    NoFocusedElement,
    #[error("no element found at accessibility point ({x:.1}, {y:.1})")]
    ElementNotFoundAtPosition { x: f64, y: f64 },
}

/// Everything the rest of the engine needs from one extraction pass.
#[derive(Debug)]
pub struct Extraction {
    pub context: TextContext,
    pub source: ContextSource,
    /// Pointer position at extraction time, accessibility-space. Kept for
    /// diagnostics and as the resolver's unconditional fallback input.
    pub pointer: ScreenPoint,
    #[cfg(target_os = "macos")]
    pub(crate) element: Option<macos::AxElement>,
}

/// Stub for non-macOS platforms.
#[cfg(not(target_os = "macos"))]
pub fn extract_text_context(
    _gate: &dyn crate::permissions::PermissionGate,
    _enabler: &mut AccessibilityEnabler,
    _app: &crate::app_class::FrontmostApp,
    _class: crate::app_class::AppClass,
    _input: &crate::input::InputInjector,
    _board: &mut dyn crate::clipboard::Pasteboard,
) -> Result<Extraction, ExtractError> {
    Err(ExtractError::NoFocusedElement)
}
