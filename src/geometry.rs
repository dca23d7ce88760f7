//! Screen geometry: the two macOS coordinate systems and the displays
//! that anchor conversions between them.
//!
//! Accessibility (and CoreGraphics global) coordinates put the origin at
//! the top-left of the main display with Y growing downward. Cocoa screen
//! coordinates put the origin at the bottom-left with Y growing upward.
//! Every conversion needs to know which physical display contains the
//! point, so the flip uses that display's own height and origin rather
//! than a single global constant.

use tracing::warn;

/// A point in one of the two screen coordinate systems. Which system a
/// value is in is a documentation-level contract: points crossing module
/// boundaries are screen-space (bottom-left origin) unless the API says
/// otherwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One connected display, described in both coordinate systems.
///
/// `ax_origin_*` is the display's top-left corner in accessibility space
/// (absolute, main display at (0, 0)); `flipped_origin_y` is the same
/// display's bottom edge in screen space. X values are shared between the
/// two systems.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayFrame {
    pub id: u32,
    pub ax_origin_x: f64,
    pub ax_origin_y: f64,
    pub flipped_origin_y: f64,
    pub width: f64,
    pub height: f64,
}

impl DisplayFrame {
    /// A display at the accessibility-space origin, useful as a fallback
    /// and in tests.
    pub fn primary(width: f64, height: f64) -> Self {
        Self {
            id: 0,
            ax_origin_x: 0.0,
            ax_origin_y: 0.0,
            flipped_origin_y: 0.0,
            width,
            height,
        }
    }
}

/// Convert an accessibility-space point to screen space using the
/// containing display's frame. X is unchanged; Y is flipped around the
/// display's own vertical extent.
pub fn to_screen_space(point: ScreenPoint, display: &DisplayFrame) -> ScreenPoint {
    ScreenPoint {
        x: point.x,
        y: display.flipped_origin_y + (display.height - (point.y - display.ax_origin_y)),
    }
}

/// Inverse of [`to_screen_space`]. Composing the two is the identity up
/// to floating-point error.
pub fn to_accessibility_space(point: ScreenPoint, display: &DisplayFrame) -> ScreenPoint {
    ScreenPoint {
        x: point.x,
        y: display.ax_origin_y + (display.height - (point.y - display.flipped_origin_y)),
    }
}

/// Find the display whose bounds contain an accessibility-space point:
/// absolute on the X axis, `[0, height)` relative to the display's top
/// edge on the Y axis. Linear scan, first match wins; `None` when the
/// point is off every screen.
pub fn find_containing_display<'a>(
    point: ScreenPoint,
    displays: &'a [DisplayFrame],
) -> Option<&'a DisplayFrame> {
    displays.iter().find(|d| {
        let relative_y = point.y - d.ax_origin_y;
        point.x >= d.ax_origin_x
            && point.x < d.ax_origin_x + d.width
            && relative_y >= 0.0
            && relative_y < d.height
    })
}

/// Enumerate the connected displays.
#[cfg(target_os = "macos")]
pub fn active_displays() -> Vec<DisplayFrame> {
    use core_graphics::display::CGDisplay;

    let main_height = CGDisplay::main().bounds().size.height;
    let ids = match CGDisplay::active_displays() {
        Ok(ids) => ids,
        Err(err) => {
            warn!("CGGetActiveDisplayList failed (CGError: {:?})", err);
            return Vec::new();
        }
    };

    ids.into_iter()
        .map(|id| {
            let bounds = CGDisplay::new(id).bounds();
            DisplayFrame {
                id,
                ax_origin_x: bounds.origin.x,
                ax_origin_y: bounds.origin.y,
                // Cocoa Y of this display's bottom edge, measured from the
                // main display's bottom-left origin.
                flipped_origin_y: main_height - (bounds.origin.y + bounds.size.height),
                width: bounds.size.width,
                height: bounds.size.height,
            }
        })
        .collect()
}

/// Stub for non-macOS platforms.
#[cfg(not(target_os = "macos"))]
pub fn active_displays() -> Vec<DisplayFrame> {
    Vec::new()
}

/// Convert an accessibility-space point to screen space against the live
/// display list, falling back to the first display (and then to the raw
/// point) when the point is off every screen.
pub fn ax_point_to_screen(point: ScreenPoint) -> ScreenPoint {
    let displays = active_displays();
    if let Some(display) = find_containing_display(point, &displays) {
        return to_screen_space(point, display);
    }
    if let Some(display) = displays.first() {
        warn!(
            x = point.x,
            y = point.y,
            "Point is off every display, flipping against the first"
        );
        return to_screen_space(point, display);
    }
    point
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn approx(a: ScreenPoint, b: ScreenPoint) -> bool {
        (a.x - b.x).abs() < EPSILON && (a.y - b.y).abs() < EPSILON
    }

    fn two_display_layout() -> Vec<DisplayFrame> {
        vec![
            DisplayFrame::primary(1920.0, 1080.0),
            // A display to the right, 120 units lower than the main one.
            DisplayFrame {
                id: 1,
                ax_origin_x: 1920.0,
                ax_origin_y: 120.0,
                flipped_origin_y: 1080.0 - (120.0 + 900.0),
                width: 1440.0,
                height: 900.0,
            },
        ]
    }

    #[test]
    fn flip_on_primary_display() {
        let display = DisplayFrame::primary(1920.0, 1080.0);
        let screen = to_screen_space(ScreenPoint::new(100.0, 80.0), &display);
        assert!(approx(screen, ScreenPoint::new(100.0, 1000.0)));
    }

    #[test]
    fn round_trip_is_identity_on_every_display() {
        let displays = two_display_layout();
        let samples = [
            (0.0, 0.0),
            (1.0, 1.0),
            (959.5, 540.25),
            (1919.0, 1079.0),
            (2000.0, 300.0),
            (3359.9, 1019.9),
            (-4.5, 17.0),
            (123.456, 789.012),
        ];
        for display in &displays {
            for &(x, y) in &samples {
                let p = ScreenPoint::new(x, y);
                let there_and_back =
                    to_accessibility_space(to_screen_space(p, display), display);
                assert!(
                    approx(p, there_and_back),
                    "round trip drifted for {:?} on display {}",
                    p,
                    display.id
                );
            }
        }
    }

    #[test]
    fn containing_display_prefers_first_match() {
        let displays = two_display_layout();
        let hit = find_containing_display(ScreenPoint::new(500.0, 500.0), &displays);
        assert_eq!(hit.map(|d| d.id), Some(0));
    }

    #[test]
    fn containing_display_finds_secondary() {
        let displays = two_display_layout();
        let hit = find_containing_display(ScreenPoint::new(2500.0, 400.0), &displays);
        assert_eq!(hit.map(|d| d.id), Some(1));
    }

    #[test]
    fn containing_display_rejects_offscreen_point() {
        let displays = two_display_layout();
        assert!(find_containing_display(ScreenPoint::new(-50.0, 200.0), &displays).is_none());
        assert!(find_containing_display(ScreenPoint::new(500.0, 2000.0), &displays).is_none());
        // Above the secondary display's top edge but within its X range.
        assert!(find_containing_display(ScreenPoint::new(2500.0, 60.0), &displays).is_none());
    }

    #[test]
    fn secondary_display_flip_uses_its_own_frame() {
        let displays = two_display_layout();
        let p = ScreenPoint::new(2500.0, 120.0); // top edge of the secondary
        let screen = to_screen_space(p, &displays[1]);
        // Top of the secondary display sits at its flipped origin + height.
        assert!(approx(
            screen,
            ScreenPoint::new(2500.0, displays[1].flipped_origin_y + 900.0)
        ));
    }
}
