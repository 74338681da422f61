use tracing::warn;

use crate::common::config::GapSettings;
use crate::sys::geometry::{EPSILON, Rect, Round};

/// The frame a window gets for a leaf rectangle. Edges on the display
/// boundary move in by the outer gap, interior edges by half the inner gap
/// so that neighbours end up a full inner gap apart.
///
/// Gaps that would leave nothing of the leaf are ignored for that leaf.
pub fn apply_gaps(rect: Rect, bounds: Rect, gaps: &GapSettings) -> Rect {
    let on_edge = |a: f64, b: f64| (a - b).abs() <= EPSILON;

    let top = if on_edge(rect.min_y(), bounds.min_y()) {
        gaps.outer.top
    } else {
        gaps.inner.vertical / 2.0
    };
    let bottom = if on_edge(rect.max_y(), bounds.max_y()) {
        gaps.outer.bottom
    } else {
        gaps.inner.vertical / 2.0
    };
    let left = if on_edge(rect.min_x(), bounds.min_x()) {
        gaps.outer.left
    } else {
        gaps.inner.horizontal / 2.0
    };
    let right = if on_edge(rect.max_x(), bounds.max_x()) {
        gaps.outer.right
    } else {
        gaps.inner.horizontal / 2.0
    };

    let framed = rect.inset(top, left, bottom, right).round();
    if framed.is_degenerate() {
        warn!(%rect, "Gaps leave no room for the window, ignoring them");
        return rect.round();
    }
    framed
}
