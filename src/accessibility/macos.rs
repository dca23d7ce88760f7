//! macOS-specific context capture using Accessibility (AXUIElement) API.
//!
//! This module reads text, selection range, and cursor position from
//! the focused application, hit-tests under the pointer when the host
//! exposes no focused element, and writes values and selection ranges
//! back for the direct-rewrite insertion tier.

use core_foundation::base::{CFGetTypeID, CFRelease, CFRetain, CFTypeRef, TCFType};
use core_foundation::string::{CFString, CFStringGetTypeID, CFStringRef};
use tracing::{debug, info, warn};

use super::text::utf16_to_char_floor;
use super::{
    AccessibilityEnabler, ContextSource, ExtractError, Extraction, SelectedRange, TextContext,
};
use crate::app_class::{AppClass, FrontmostApp};
use crate::clipboard::{ClipboardTransaction, Pasteboard};
use crate::geometry::ScreenPoint;
use crate::input::InputInjector;
use crate::permissions::PermissionGate;
use crate::position::CaretRect;

// ─── AXUIElement FFI ────────────────────────────────────────────────

// These types mirror Apple's ApplicationServices / HIServices definitions.
// AXUIElementRef is an opaque CFTypeRef.
type AXUIElementRef = CFTypeRef;
type AXError = i32;

const K_AX_ERROR_SUCCESS: AXError = 0;
const K_AX_ERROR_NO_VALUE: AXError = -25212;

#[link(name = "ApplicationServices", kind = "framework")]
extern "C" {
    fn AXUIElementCreateSystemWide() -> AXUIElementRef;
    fn AXUIElementCreateApplication(pid: i32) -> AXUIElementRef;
    fn AXUIElementCopyAttributeValue(
        element: AXUIElementRef,
        attribute: CFStringRef,
        value: *mut CFTypeRef,
    ) -> AXError;
    fn AXUIElementCopyParameterizedAttributeValue(
        element: AXUIElementRef,
        attribute: CFStringRef,
        parameter: CFTypeRef,
        value: *mut CFTypeRef,
    ) -> AXError;
    fn AXUIElementSetAttributeValue(
        element: AXUIElementRef,
        attribute: CFStringRef,
        value: CFTypeRef,
    ) -> AXError;
    fn AXUIElementCopyElementAtPosition(
        application: AXUIElementRef,
        x: f32,
        y: f32,
        element: *mut AXUIElementRef,
    ) -> AXError;
}

// Attribute name constants
fn ax_focused_application() -> CFString {
    CFString::new("AXFocusedApplication")
}
fn ax_focused_ui_element() -> CFString {
    CFString::new("AXFocusedUIElement")
}
fn ax_selected_text() -> CFString {
    CFString::new("AXSelectedText")
}
fn ax_value() -> CFString {
    CFString::new("AXValue")
}
fn ax_title() -> CFString {
    CFString::new("AXTitle")
}
fn ax_selected_text_range() -> CFString {
    CFString::new("AXSelectedTextRange")
}
fn ax_bounds_for_range() -> CFString {
    CFString::new("AXBoundsForRange")
}
fn ax_position() -> CFString {
    CFString::new("AXPosition")
}
fn ax_manual_accessibility() -> CFString {
    CFString::new("AXManualAccessibility")
}
fn ax_enhanced_user_interface() -> CFString {
    CFString::new("AXEnhancedUserInterface")
}

// ─── CFRange / AXValue helpers ──────────────────────────────────────

/// An NSRange / CFRange equivalent. AX selection ranges are expressed in
/// UTF-16 code units.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub(crate) struct CFRange {
    pub location: i64,
    pub length: i64,
}

/// A CGRect-like struct for reading bounds via AXValue.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct AXRect {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

/// A CGPoint-like struct for reading AXPosition.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct AXPoint {
    x: f64,
    y: f64,
}

// AXValueType constants (from HIServices/AXValue.h)
const K_AX_VALUE_TYPE_CG_POINT: u32 = 1;
const K_AX_VALUE_TYPE_CG_RECT: u32 = 3;
const K_AX_VALUE_TYPE_CF_RANGE: u32 = 4;

#[link(name = "ApplicationServices", kind = "framework")]
extern "C" {
    fn AXValueGetValue(value: CFTypeRef, value_type: u32, out: *mut std::ffi::c_void) -> bool;
    fn AXValueCreate(value_type: u32, data: *const std::ffi::c_void) -> CFTypeRef;
}

// ─── Element handle ─────────────────────────────────────────────────

/// Owning handle for an AXUIElementRef. Releases on drop; cloning
/// retains.
pub(crate) struct AxElement(CFTypeRef);

impl AxElement {
    fn wrap(ptr: CFTypeRef) -> Option<Self> {
        if ptr.is_null() {
            None
        } else {
            Some(Self(ptr))
        }
    }

    fn as_ptr(&self) -> CFTypeRef {
        self.0
    }
}

impl Clone for AxElement {
    fn clone(&self) -> Self {
        unsafe { CFRetain(self.0) };
        Self(self.0)
    }
}

impl Drop for AxElement {
    fn drop(&mut self) {
        unsafe { CFRelease(self.0) };
    }
}

impl std::fmt::Debug for AxElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AxElement({:p})", self.0)
    }
}

// ─── Core queries ───────────────────────────────────────────────────

/// Get the AXUIElement for the focused UI element across all apps.
fn focused_element() -> Result<AxElement, String> {
    unsafe {
        let system_wide = match AxElement::wrap(AXUIElementCreateSystemWide()) {
            Some(el) => el,
            None => {
                warn!("AXUIElementCreateSystemWide returned null");
                return Err("Failed to create system-wide AX element".to_string());
            }
        };

        // First get the focused app
        let mut focused_app: CFTypeRef = std::ptr::null();
        let err = AXUIElementCopyAttributeValue(
            system_wide.as_ptr(),
            ax_focused_application().as_concrete_TypeRef(),
            &mut focused_app,
        );
        let focused_app = match AxElement::wrap(focused_app) {
            Some(el) if err == K_AX_ERROR_SUCCESS => el,
            _ => {
                let msg = format!("Failed to get focused application (AXError: {})", err);
                debug!("{}", msg);
                return Err(msg);
            }
        };

        // Then get the focused UI element within that app
        let mut focused: CFTypeRef = std::ptr::null();
        let err = AXUIElementCopyAttributeValue(
            focused_app.as_ptr(),
            ax_focused_ui_element().as_concrete_TypeRef(),
            &mut focused,
        );

        match AxElement::wrap(focused) {
            Some(el) if err == K_AX_ERROR_SUCCESS => {
                debug!("Got focused UI element");
                Ok(el)
            }
            _ => {
                let msg = format!("Failed to get focused UI element (AXError: {})", err);
                debug!("{}", msg);
                Err(msg)
            }
        }
    }
}

/// Hit-test the accessibility tree at an accessibility-space point.
/// `Ok(None)` means the API answered "nothing there"; `Err` is an actual
/// API failure.
fn element_at_position(x: f64, y: f64) -> Result<Option<AxElement>, String> {
    unsafe {
        let system_wide = AxElement::wrap(AXUIElementCreateSystemWide())
            .ok_or_else(|| "Failed to create system-wide AX element".to_string())?;

        let mut element: CFTypeRef = std::ptr::null();
        let err = AXUIElementCopyElementAtPosition(
            system_wide.as_ptr(),
            x as f32,
            y as f32,
            &mut element,
        );

        match err {
            K_AX_ERROR_SUCCESS => Ok(AxElement::wrap(element)),
            K_AX_ERROR_NO_VALUE => Ok(None),
            other => Err(format!(
                "AXUIElementCopyElementAtPosition failed (AXError: {})",
                other
            )),
        }
    }
}

/// Read a string-valued attribute, guarding the CF type before casting.
/// Some apps return AXValue or CFNumber where a string is expected,
/// which would segfault on a blind cast.
fn string_attribute(element: &AxElement, attribute: CFString) -> Option<String> {
    unsafe {
        let mut value: CFTypeRef = std::ptr::null();
        let err = AXUIElementCopyAttributeValue(
            element.as_ptr(),
            attribute.as_concrete_TypeRef(),
            &mut value,
        );
        if err != K_AX_ERROR_SUCCESS || value.is_null() {
            return None;
        }
        if CFGetTypeID(value) != CFStringGetTypeID() {
            warn!(
                type_id = CFGetTypeID(value),
                expected = CFStringGetTypeID(),
                "AX attribute returned non-CFString type, skipping"
            );
            CFRelease(value);
            return None;
        }
        let cf_string = CFString::wrap_under_create_rule(value as CFStringRef);
        Some(cf_string.to_string())
    }
}

/// Read the full AXValue (the entire text content of the element).
fn full_text(element: &AxElement) -> Option<String> {
    let text = string_attribute(element, ax_value());
    if let Some(ref t) = text {
        debug!(chars = t.len(), "Got full text from AX");
    }
    text
}

/// Read the AXSelectedText attribute (the currently selected text).
fn selected_text(element: &AxElement) -> Option<String> {
    string_attribute(element, ax_selected_text()).filter(|s| !s.is_empty())
}

/// Read the AXSelectedTextRange → CFRange (location + length of the
/// selection/cursor, in UTF-16 units).
fn selected_text_range(element: &AxElement) -> Option<CFRange> {
    unsafe {
        let mut value: CFTypeRef = std::ptr::null();
        let err = AXUIElementCopyAttributeValue(
            element.as_ptr(),
            ax_selected_text_range().as_concrete_TypeRef(),
            &mut value,
        );
        if err != K_AX_ERROR_SUCCESS || value.is_null() {
            debug!("Failed to get AXSelectedTextRange (AXError: {})", err);
            return None;
        }
        let mut range = CFRange {
            location: 0,
            length: 0,
        };
        let ok = AXValueGetValue(
            value,
            K_AX_VALUE_TYPE_CF_RANGE,
            &mut range as *mut CFRange as *mut std::ffi::c_void,
        );
        CFRelease(value);
        if ok {
            Some(range)
        } else {
            warn!("AXValueGetValue failed for CFRange");
            None
        }
    }
}

/// Pixel bounds of the character range at the caret via AXBoundsForRange.
/// Uses a length-1 range at the selection start; several hosts return a
/// zero rect for zero-length ranges.
pub(crate) fn caret_bounds(element: &AxElement) -> Option<CaretRect> {
    let range = selected_text_range(element)?;
    let caret_range = CFRange {
        location: range.location,
        length: range.length.max(1),
    };
    bounds_for_range(element, caret_range)
}

fn bounds_for_range(element: &AxElement, range: CFRange) -> Option<CaretRect> {
    unsafe {
        // Create an AXValue wrapping the CFRange
        let range_value = AXValueCreate(
            K_AX_VALUE_TYPE_CF_RANGE,
            &range as *const CFRange as *const std::ffi::c_void,
        );
        if range_value.is_null() {
            warn!("AXValueCreate for range failed");
            return None;
        }

        let mut bounds_value: CFTypeRef = std::ptr::null();
        let err = AXUIElementCopyParameterizedAttributeValue(
            element.as_ptr(),
            ax_bounds_for_range().as_concrete_TypeRef(),
            range_value,
            &mut bounds_value,
        );
        CFRelease(range_value);

        if err != K_AX_ERROR_SUCCESS || bounds_value.is_null() {
            debug!("AXBoundsForRange failed (AXError: {})", err);
            return None;
        }

        let mut rect = AXRect {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
        };
        let ok = AXValueGetValue(
            bounds_value,
            K_AX_VALUE_TYPE_CG_RECT,
            &mut rect as *mut AXRect as *mut std::ffi::c_void,
        );
        CFRelease(bounds_value);

        if ok {
            debug!(x = rect.x, y = rect.y, w = rect.width, h = rect.height, "Got bounds for range");
            Some(CaretRect {
                x: rect.x,
                y: rect.y,
                width: rect.width,
                height: rect.height,
            })
        } else {
            warn!("AXValueGetValue failed for CGRect bounds");
            None
        }
    }
}

/// The focused element's own top-left origin (accessibility space).
pub(crate) fn element_origin(element: &AxElement) -> Option<(f64, f64)> {
    unsafe {
        let mut value: CFTypeRef = std::ptr::null();
        let err = AXUIElementCopyAttributeValue(
            element.as_ptr(),
            ax_position().as_concrete_TypeRef(),
            &mut value,
        );
        if err != K_AX_ERROR_SUCCESS || value.is_null() {
            debug!("Failed to get AXPosition (AXError: {})", err);
            return None;
        }
        let mut point = AXPoint { x: 0.0, y: 0.0 };
        let ok = AXValueGetValue(
            value,
            K_AX_VALUE_TYPE_CG_POINT,
            &mut point as *mut AXPoint as *mut std::ffi::c_void,
        );
        CFRelease(value);
        ok.then_some((point.x, point.y))
    }
}

// ─── Mutation (direct-rewrite tier) ─────────────────────────────────

/// Overwrite the element's entire text value.
pub(crate) fn set_value_text(element: &AxElement, text: &str) -> Result<(), String> {
    unsafe {
        let value = CFString::new(text);
        let err = AXUIElementSetAttributeValue(
            element.as_ptr(),
            ax_value().as_concrete_TypeRef(),
            value.as_CFTypeRef(),
        );
        if err == K_AX_ERROR_SUCCESS {
            Ok(())
        } else {
            Err(format!("AXValue write rejected (AXError: {})", err))
        }
    }
}

/// Place the caret: a zero-length selection at a UTF-16 offset.
pub(crate) fn set_caret_utf16(element: &AxElement, location_utf16: usize) -> Result<(), String> {
    let range = CFRange {
        location: i64::try_from(location_utf16)
            .map_err(|_| "Caret offset exceeds supported AX range".to_string())?,
        length: 0,
    };
    unsafe {
        let range_value = AXValueCreate(
            K_AX_VALUE_TYPE_CF_RANGE,
            &range as *const CFRange as *const std::ffi::c_void,
        );
        if range_value.is_null() {
            return Err("Failed to create AXValue for range".to_string());
        }
        let err = AXUIElementSetAttributeValue(
            element.as_ptr(),
            ax_selected_text_range().as_concrete_TypeRef(),
            range_value,
        );
        CFRelease(range_value);
        if err == K_AX_ERROR_SUCCESS {
            Ok(())
        } else {
            Err(format!("AXSelectedTextRange write rejected (AXError: {})", err))
        }
    }
}

// ─── Accessibility enabling ─────────────────────────────────────────

/// Opt a process into building its accessibility tree. Electron honors
/// `AXManualAccessibility`, Chromium honors `AXEnhancedUserInterface`;
/// setting both costs one extra attribute write and covers hybrids.
pub(crate) fn enable_enhanced_accessibility(pid: i32) -> bool {
    use core_foundation::boolean::CFBoolean;

    unsafe {
        let app = match AxElement::wrap(AXUIElementCreateApplication(pid)) {
            Some(el) => el,
            None => {
                warn!(pid, "AXUIElementCreateApplication returned null");
                return false;
            }
        };

        let yes = CFBoolean::true_value();
        let manual = AXUIElementSetAttributeValue(
            app.as_ptr(),
            ax_manual_accessibility().as_concrete_TypeRef(),
            yes.as_CFTypeRef(),
        );
        let enhanced = AXUIElementSetAttributeValue(
            app.as_ptr(),
            ax_enhanced_user_interface().as_concrete_TypeRef(),
            yes.as_CFTypeRef(),
        );

        let enabled = manual == K_AX_ERROR_SUCCESS || enhanced == K_AX_ERROR_SUCCESS;
        debug!(pid, manual, enhanced, enabled, "Accessibility enable signal sent");
        enabled
    }
}

// ─── Pointer ────────────────────────────────────────────────────────

/// Current pointer location via CGEvent, in accessibility space
/// (CoreGraphics global coordinates).
pub(crate) fn mouse_position() -> ScreenPoint {
    use core_graphics::event::CGEvent;
    use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};

    let source = CGEventSource::new(CGEventSourceStateID::CombinedSessionState);
    match source {
        Ok(src) => match CGEvent::new(src) {
            Ok(event) => {
                let loc = event.location();
                ScreenPoint::new(loc.x, loc.y)
            }
            Err(_) => {
                warn!("Failed to create CGEvent for mouse position");
                ScreenPoint::new(0.0, 0.0)
            }
        },
        Err(_) => {
            warn!("Failed to create CGEventSource for mouse position");
            ScreenPoint::new(0.0, 0.0)
        }
    }
}

// ─── Element location with retries ──────────────────────────────────

/// Pointer coordinates have ±3-5 units of slop and element hit-boxes may
/// exclude their own border, so a miss at the pointer retries at eight
/// neighboring offsets before giving up.
const NEIGHBOR_OFFSETS: [(f64, f64); 8] = [
    (-5.0, 0.0),
    (5.0, 0.0),
    (0.0, -5.0),
    (0.0, 5.0),
    (-5.0, -5.0),
    (5.0, -5.0),
    (-5.0, 5.0),
    (5.0, 5.0),
];

fn element_under_pointer(pointer: ScreenPoint) -> Result<AxElement, ExtractError> {
    match element_at_position(pointer.x, pointer.y) {
        Ok(Some(element)) => return Ok(element),
        Ok(None) => {}
        Err(e) => {
            warn!("Element-at-position query failed: {}", e);
            return Err(ExtractError::ElementNotFoundAtPosition {
                x: pointer.x,
                y: pointer.y,
            });
        }
    }

    for (dx, dy) in NEIGHBOR_OFFSETS {
        if let Ok(Some(element)) = element_at_position(pointer.x + dx, pointer.y + dy) {
            debug!(dx, dy, "Found element at neighboring offset");
            return Ok(element);
        }
    }

    Err(ExtractError::ElementNotFoundAtPosition {
        x: pointer.x,
        y: pointer.y,
    })
}

// ─── Clipboard-mediated capture ─────────────────────────────────────

/// Last-ditch capture for hosts whose elements expose no readable text
/// attribute: copy the current selection through the clipboard and
/// restore the user's contents afterwards. Never used for
/// Terminal-class hosts; the guard lives in the caller.
fn capture_selection_via_clipboard(
    input: &InputInjector,
    board: &mut dyn Pasteboard,
    settle: std::time::Duration,
) -> Option<String> {
    info!("Text attributes unreadable, attempting clipboard capture");

    let mut txn = ClipboardTransaction::begin(board);
    if let Err(e) = input.send_copy_chord() {
        warn!("Failed to send copy chord: {}", e);
        return None;
    }
    std::thread::sleep(settle);
    let captured = txn.board().text().filter(|t| !t.is_empty());
    txn.restore_now();

    if let Some(ref text) = captured {
        debug!(chars = text.len(), "Captured selection via clipboard");
    }
    captured
}

// ─── Public extraction entry point ──────────────────────────────────

/// Capture the text context from the currently focused application.
///
/// Strategy:
/// 1. Bail immediately without accessibility permission.
/// 2. For Browser/Electron hosts, send the accessibility enable signal
///    before any query (queries before enabling come back stale or
///    empty on those hosts).
/// 3. Ask for the focused element directly; browsers frequently expose
///    none, so fall back to hit-testing under the pointer.
/// 4. Read value/selection/title, derive the cursor offset, and build
///    the word at the cursor.
pub fn extract_text_context(
    gate: &dyn PermissionGate,
    enabler: &mut AccessibilityEnabler,
    app: &FrontmostApp,
    class: AppClass,
    input: &InputInjector,
    board: &mut dyn Pasteboard,
) -> Result<Extraction, ExtractError> {
    if !gate.is_granted() {
        warn!("Accessibility permission not granted");
        return Err(ExtractError::PermissionDenied);
    }

    if matches!(class, AppClass::Browser | AppClass::Electron) {
        enabler.ensure_enabled(app.pid);
    }

    let pointer = mouse_position();

    let (element, source) = match focused_element() {
        Ok(el) => (el, ContextSource::FocusedElement),
        Err(e) => {
            debug!("No focused element ({}), hit-testing under pointer", e);
            let el = element_under_pointer(pointer)?;
            (el, ContextSource::PointerElement)
        }
    };

    let value = full_text(&element);
    let selection = selected_text(&element);
    let range = selected_text_range(&element);

    // Some read-only elements expose their text via AXSelectedText or
    // AXTitle only; try those, in order, before declaring the element
    // unreadable.
    let text = value
        .or_else(|| selection.clone())
        .or_else(|| string_attribute(&element, ax_title()));

    let Some(text) = text else {
        if class == AppClass::Terminal {
            // Terminals translate the synthetic events any further
            // probing would send into raw escape sequences and spray
            // them into the scrollback. Empty context instead.
            info!("Terminal host with unreadable text, returning empty context");
            return Ok(Extraction {
                context: TextContext::empty(),
                source,
                pointer,
                element: Some(element),
            });
        }
        let Some(captured) = capture_selection_via_clipboard(
            input,
            board,
            std::time::Duration::from_millis(100),
        ) else {
            info!("No readable text anywhere, returning empty context");
            return Ok(Extraction {
                context: TextContext::empty(),
                source,
                pointer,
                element: Some(element),
            });
        };
        let cursor = captured.chars().count();
        let context = TextContext::new(
            captured.clone(),
            cursor,
            Some(captured),
            Some(SelectedRange {
                location: 0,
                length: cursor,
            }),
        );
        return Ok(Extraction {
            context,
            source,
            pointer,
            element: Some(element),
        });
    };

    // AXSelectedTextRange reports UTF-16 units; cursor defaults to 0
    // when the host reports no selection at all.
    let cursor = range
        .map(|r| utf16_to_char_floor(&text, r.location.max(0) as usize))
        .unwrap_or(0);
    let selected_range = range.and_then(|r| {
        (r.location >= 0 && r.length >= 0).then(|| {
            let start = utf16_to_char_floor(&text, r.location as usize);
            let end = utf16_to_char_floor(&text, (r.location + r.length) as usize);
            SelectedRange {
                location: start,
                length: end.saturating_sub(start),
            }
        })
    });

    let context = TextContext::new(text, cursor, selection, selected_range);
    info!(
        word = %context.word_at_cursor,
        cursor = context.cursor_position,
        chars = context.full_text.chars().count(),
        ?source,
        "Context capture complete"
    );

    Ok(Extraction {
        context,
        source,
        pointer,
        element: Some(element),
    })
}

/// Re-resolve the focused element for the insertion engine; extraction
/// and insertion are not atomic and focus may have moved.
pub(crate) fn refetch_focused_element() -> Option<AxElement> {
    focused_element().ok()
}

/// Current text value of an element, for the insertion engine's
/// defensive clamping.
pub(crate) fn current_value(element: &AxElement) -> Option<String> {
    full_text(element)
}
