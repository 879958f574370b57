//! Active-item scroll resolution.
//!
//! Pure functions over the geometry of a snap-scrolling single-column list
//! where every item is exactly one viewport tall.

use serde::Serialize;

/// Screens of lookahead below the viewport that trigger a prefetch.
pub const PREFETCH_SCREENS: f64 = 2.0;

/// Scroll container geometry, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScrollGeometry {
    /// Distance scrolled from the top.
    pub offset: f64,
    /// Height of the visible area (one item).
    pub viewport_height: f64,
    /// Total scrollable height.
    pub total_height: f64,
}

impl ScrollGeometry {
    /// Build a geometry value.
    #[must_use]
    pub const fn new(offset: f64, viewport_height: f64, total_height: f64) -> Self {
        Self {
            offset,
            viewport_height,
            total_height,
        }
    }

    /// Geometry of a list of `items` scrolled to `index`.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn at_item(index: usize, items: usize, viewport_height: f64) -> Self {
        Self::new(
            index as f64 * viewport_height,
            viewport_height,
            items as f64 * viewport_height,
        )
    }
}

/// Pager-side conditions for loading more.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadGate {
    /// Latest page carries a cursor.
    pub has_next_page: bool,
    /// A fetch is already running for the feed.
    pub is_fetching: bool,
}

/// What the session should do after a scroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ScrollDecision {
    /// New active index, when it moved. A move also resets progress.
    pub index_change: Option<usize>,
    /// Whether the next page should be requested.
    pub load_more: bool,
}

/// Index of the item under the viewport: `round(offset / viewport_height)`.
///
/// Degenerate geometry (non-positive viewport, negative or non-finite offset)
/// resolves to the first item.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[must_use]
pub fn active_index(geometry: &ScrollGeometry) -> usize {
    let ScrollGeometry {
        offset,
        viewport_height,
        ..
    } = *geometry;
    if !offset.is_finite() || !viewport_height.is_finite() || viewport_height <= 0.0 || offset <= 0.0
    {
        return 0;
    }
    (offset / viewport_height).round() as usize
}

/// Whether fewer than two screens remain below the viewport.
#[must_use]
pub fn near_end(geometry: &ScrollGeometry) -> bool {
    geometry.offset + geometry.viewport_height
        >= PREFETCH_SCREENS.mul_add(-geometry.viewport_height, geometry.total_height)
}

/// Resolves scroll geometry into index changes and load-more signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollResolver {
    infinite_scroll: bool,
}

impl ScrollResolver {
    /// Create a resolver; static feeds pass `infinite_scroll = false`.
    #[must_use]
    pub const fn new(infinite_scroll: bool) -> Self {
        Self { infinite_scroll }
    }

    /// Whether this resolver may request more pages at all.
    #[must_use]
    pub const fn infinite_scroll(&self) -> bool {
        self.infinite_scroll
    }

    /// All of: infinite scroll on, next page exists, nothing in flight, near the end.
    #[must_use]
    pub fn should_load_more(&self, geometry: &ScrollGeometry, gate: LoadGate) -> bool {
        self.infinite_scroll && gate.has_next_page && !gate.is_fetching && near_end(geometry)
    }

    /// Resolve one scroll observation against the current active index.
    #[must_use]
    pub fn resolve(
        &self,
        geometry: &ScrollGeometry,
        current_active: usize,
        gate: LoadGate,
    ) -> ScrollDecision {
        let index = active_index(geometry);
        ScrollDecision {
            index_change: (index != current_active).then_some(index),
            load_more: self.should_load_more(geometry, gate),
        }
    }
}
