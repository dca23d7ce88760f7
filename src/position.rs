//! Cursor position resolution: an ordered chain of fallback strategies.
//!
//! BoundsForRange asks the host for the pixel bounds of the current
//! selection range and is the only strategy that reflects the actual
//! caret. ElementPosition approximates the caret as the focused
//! element's own origin. MousePosition is the pointer location: always
//! available, least accurate. The chain tries each in order and stops at
//! the first hit; it never backtracks and, because the pointer has no
//! preconditions, the resolver as a whole cannot fail.
//!
//! For Browser and Electron hosts ElementPosition is skipped entirely:
//! those hosts report the container's corner as the element origin,
//! which would park the popup nowhere near the caret. Falling straight
//! through to the pointer is strictly better there.

use tracing::debug;

use crate::geometry::ScreenPoint;

/// A caret bounding rectangle in accessibility space, as reported by the
/// host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaretRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

const SUSPICIOUS_ELEMENT_WIDTH: f64 = 100.0;
const COORDINATE_FLOOR: f64 = -10_000.0;
const DIMENSION_CEILING: f64 = 10_000.0;
const DEGENERATE_DIMENSION: f64 = 0.5;

/// Whether a rect returned by BoundsForRange can plausibly be a caret.
///
/// Rejected shapes, each symptomatic of a misbehaving host:
/// - origin exactly (0,0) with width over 100 units: the host handed
///   back element bounds instead of caret bounds;
/// - a coordinate below -10000 or a dimension above 10000: garbage;
/// - both dimensions under 0.5: a degenerate/empty rect.
pub fn caret_rect_is_plausible(rect: &CaretRect) -> bool {
    if rect.x == 0.0 && rect.y == 0.0 && rect.width > SUSPICIOUS_ELEMENT_WIDTH {
        return false;
    }
    if rect.x < COORDINATE_FLOOR || rect.y < COORDINATE_FLOOR {
        return false;
    }
    if rect.width > DIMENSION_CEILING || rect.height > DIMENSION_CEILING {
        return false;
    }
    if rect.width < DEGENERATE_DIMENSION && rect.height < DEGENERATE_DIMENSION {
        return false;
    }
    true
}

/// One position-finding strategy. Implementations return a screen-space
/// point or `None` to fall through to the next strategy.
pub trait PositionStrategy {
    fn name(&self) -> &'static str;
    fn try_resolve(&mut self) -> Option<ScreenPoint>;
}

/// The ordered chain. Strategies are tried front to back; the first
/// `Some` wins.
pub struct PositionResolver {
    strategies: Vec<Box<dyn PositionStrategy>>,
}

impl PositionResolver {
    pub fn with_strategies(strategies: Vec<Box<dyn PositionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Resolve a position unconditionally. If a custom chain exhausts
    /// without a hit, the pointer location is the terminal fallback, so
    /// this never fails regardless of input.
    pub fn resolve(&mut self) -> ScreenPoint {
        for strategy in &mut self.strategies {
            if let Some(point) = strategy.try_resolve() {
                debug!(
                    strategy = strategy.name(),
                    x = point.x,
                    y = point.y,
                    "Resolved cursor position"
                );
                return point;
            }
            debug!(strategy = strategy.name(), "Position strategy fell through");
        }
        let fallback = pointer_position();
        debug!(
            x = fallback.x,
            y = fallback.y,
            "All strategies fell through, using pointer position"
        );
        fallback
    }
}

/// Pointer position in screen space.
#[cfg(target_os = "macos")]
fn pointer_position() -> ScreenPoint {
    crate::geometry::ax_point_to_screen(crate::accessibility::macos::mouse_position())
}

#[cfg(not(target_os = "macos"))]
fn pointer_position() -> ScreenPoint {
    ScreenPoint::new(0.0, 0.0)
}

#[cfg(target_os = "macos")]
pub use macos_strategies::resolver_for_class;

#[cfg(target_os = "macos")]
mod macos_strategies {
    use super::*;
    use crate::accessibility::macos::{self, AxElement};
    use crate::app_class::AppClass;
    use crate::geometry::ax_point_to_screen;

    /// Build the default chain for an application class. `None` for the
    /// element collapses the chain to the pointer strategy alone.
    pub fn resolver_for_class(class: AppClass, element: Option<&AxElement>) -> PositionResolver {
        let mut strategies: Vec<Box<dyn PositionStrategy>> = Vec::new();
        if let Some(element) = element {
            strategies.push(Box::new(BoundsForRange {
                element: element.clone(),
            }));
            // Browser/Electron element origins are container corners, not
            // caret positions; skip straight to the pointer for those.
            if !matches!(class, AppClass::Browser | AppClass::Electron) {
                strategies.push(Box::new(ElementPosition {
                    element: element.clone(),
                }));
            }
        }
        strategies.push(Box::new(MousePosition));
        PositionResolver::with_strategies(strategies)
    }

    struct BoundsForRange {
        element: AxElement,
    }

    impl PositionStrategy for BoundsForRange {
        fn name(&self) -> &'static str {
            "bounds_for_range"
        }

        fn try_resolve(&mut self) -> Option<ScreenPoint> {
            let rect = macos::caret_bounds(&self.element)?;
            if !caret_rect_is_plausible(&rect) {
                debug!(?rect, "Rejected implausible caret bounds");
                return None;
            }
            // Bottom-left of the caret rect: a good anchor for a popup
            // hanging below the insertion point.
            Some(ax_point_to_screen(ScreenPoint::new(
                rect.x,
                rect.y + rect.height,
            )))
        }
    }

    struct ElementPosition {
        element: AxElement,
    }

    impl PositionStrategy for ElementPosition {
        fn name(&self) -> &'static str {
            "element_position"
        }

        fn try_resolve(&mut self) -> Option<ScreenPoint> {
            let (x, y) = macos::element_origin(&self.element)?;
            Some(ax_point_to_screen(ScreenPoint::new(x, y)))
        }
    }

    struct MousePosition;

    impl PositionStrategy for MousePosition {
        fn name(&self) -> &'static str {
            "mouse_position"
        }

        fn try_resolve(&mut self) -> Option<ScreenPoint> {
            Some(ax_point_to_screen(macos::mouse_position()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct AlwaysFails {
        calls: Rc<Cell<usize>>,
    }

    impl PositionStrategy for AlwaysFails {
        fn name(&self) -> &'static str {
            "always_fails"
        }

        fn try_resolve(&mut self) -> Option<ScreenPoint> {
            self.calls.set(self.calls.get() + 1);
            None
        }
    }

    struct AlwaysSucceeds {
        point: ScreenPoint,
        calls: Rc<Cell<usize>>,
    }

    impl PositionStrategy for AlwaysSucceeds {
        fn name(&self) -> &'static str {
            "always_succeeds"
        }

        fn try_resolve(&mut self) -> Option<ScreenPoint> {
            self.calls.set(self.calls.get() + 1);
            Some(self.point)
        }
    }

    #[test]
    fn chain_stops_at_first_success_and_never_backtracks() {
        let first = Rc::new(Cell::new(0));
        let second = Rc::new(Cell::new(0));
        let third = Rc::new(Cell::new(0));

        let mut resolver = PositionResolver::with_strategies(vec![
            Box::new(AlwaysFails {
                calls: first.clone(),
            }),
            Box::new(AlwaysSucceeds {
                point: ScreenPoint::new(100.0, 200.0),
                calls: second.clone(),
            }),
            Box::new(AlwaysSucceeds {
                point: ScreenPoint::new(999.0, 999.0),
                calls: third.clone(),
            }),
        ]);

        let point = resolver.resolve();
        assert_eq!(point, ScreenPoint::new(100.0, 200.0));
        assert_eq!(first.get(), 1);
        assert_eq!(second.get(), 1);
        assert_eq!(third.get(), 0, "later strategies must never be called");
    }

    #[test]
    fn resolver_never_fails_even_with_an_empty_chain() {
        let mut resolver = PositionResolver::with_strategies(Vec::new());
        let _point = resolver.resolve(); // must not panic or error
    }

    #[test]
    fn resolver_never_fails_when_every_strategy_falls_through() {
        let calls = Rc::new(Cell::new(0));
        let mut resolver = PositionResolver::with_strategies(vec![
            Box::new(AlwaysFails {
                calls: calls.clone(),
            }),
            Box::new(AlwaysFails {
                calls: calls.clone(),
            }),
        ]);
        let _point = resolver.resolve();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn rejects_element_bounds_masquerading_as_caret() {
        // A browser reporting element bounds: origin (0,0), width 150.
        let rect = CaretRect {
            x: 0.0,
            y: 0.0,
            width: 150.0,
            height: 20.0,
        };
        assert!(!caret_rect_is_plausible(&rect));
    }

    #[test]
    fn accepts_a_normal_caret_rect() {
        let rect = CaretRect {
            x: 431.0,
            y: 220.5,
            width: 1.0,
            height: 18.0,
        };
        assert!(caret_rect_is_plausible(&rect));
    }

    #[test]
    fn accepts_a_zero_origin_caret_with_small_width() {
        // Origin (0,0) alone is fine; only the wide variant is the
        // element-bounds symptom.
        let rect = CaretRect {
            x: 0.0,
            y: 0.0,
            width: 2.0,
            height: 16.0,
        };
        assert!(caret_rect_is_plausible(&rect));
    }

    #[test]
    fn rejects_deeply_negative_coordinates() {
        let rect = CaretRect {
            x: -20_000.0,
            y: 100.0,
            width: 1.0,
            height: 18.0,
        };
        assert!(!caret_rect_is_plausible(&rect));
        let rect = CaretRect {
            x: 100.0,
            y: -10_001.0,
            width: 1.0,
            height: 18.0,
        };
        assert!(!caret_rect_is_plausible(&rect));
    }

    #[test]
    fn accepts_moderately_negative_coordinates() {
        // Displays left of or above the main screen produce negative
        // coordinates legitimately.
        let rect = CaretRect {
            x: -1500.0,
            y: -200.0,
            width: 1.5,
            height: 18.0,
        };
        assert!(caret_rect_is_plausible(&rect));
    }

    #[test]
    fn rejects_oversized_dimensions() {
        let rect = CaretRect {
            x: 10.0,
            y: 10.0,
            width: 10_001.0,
            height: 18.0,
        };
        assert!(!caret_rect_is_plausible(&rect));
    }

    #[test]
    fn rejects_degenerate_rect() {
        let rect = CaretRect {
            x: 10.0,
            y: 10.0,
            width: 0.1,
            height: 0.2,
        };
        assert!(!caret_rect_is_plausible(&rect));
    }

    #[test]
    fn one_substantial_dimension_is_enough() {
        // A hairline caret: zero width but real height.
        let rect = CaretRect {
            x: 10.0,
            y: 10.0,
            width: 0.0,
            height: 18.0,
        };
        assert!(caret_rect_is_plausible(&rect));
    }
}
