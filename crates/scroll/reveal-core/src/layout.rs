//! Layout mode selection (grid vs. carousel) and carousel navigation state.

use serde::{Deserialize, Serialize};

use crate::breakpoint::{BreakpointState, Bucket};
use crate::error::RevealError;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayoutMode {
    Grid,
    Carousel,
}

/// Fixed geometry of a grid row, used to derive the carousel threshold.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridMetrics {
    /// Items laid out side by side in one grid row.
    pub columns: u32,
    pub item_width: f32,
    pub gap: f32,
    /// Horizontal padding on each side of the container.
    pub padding: f32,
}

impl GridMetrics {
    /// Narrowest content width at which the grid still fits.
    pub fn min_content_width(&self) -> f32 {
        let cols = self.columns.max(1) as f32;
        cols * self.item_width + (cols - 1.0) * self.gap + 2.0 * self.padding
    }
}

/// Pick the layout for a container. Mobile always gets the carousel; other
/// buckets switch when the content is narrower than the grid needs.
pub fn decide_mode(
    breakpoint: &BreakpointState,
    content_width: f32,
    metrics: &GridMetrics,
) -> LayoutMode {
    if breakpoint.bucket == Bucket::Mobile || content_width < metrics.min_content_width() {
        LayoutMode::Carousel
    } else {
        LayoutMode::Grid
    }
}

/// Index-based carousel position. `current_index` is always in `[0, item_count)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarouselState {
    current_index: usize,
    item_count: usize,
}

impl CarouselState {
    pub fn new(item_count: usize) -> Result<Self, RevealError> {
        if item_count == 0 {
            return Err(RevealError::EmptyCarousel);
        }
        Ok(Self {
            current_index: 0,
            item_count,
        })
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn item_count(&self) -> usize {
        self.item_count
    }

    pub fn next(&mut self) -> usize {
        self.current_index = (self.current_index + 1) % self.item_count;
        self.current_index
    }

    pub fn previous(&mut self) -> usize {
        self.current_index = (self.current_index + self.item_count - 1) % self.item_count;
        self.current_index
    }
}

/// Per-container layout state owned by the stage.
#[derive(Debug)]
pub struct LayoutSwitcher {
    metrics: GridMetrics,
    item_count: usize,
    mode: LayoutMode,
    carousel: Option<CarouselState>,
    /// Set while a teardown+rebuild is in flight for this container.
    transitioning: bool,
}

impl LayoutSwitcher {
    pub fn new(
        metrics: GridMetrics,
        item_count: usize,
        initial: LayoutMode,
    ) -> Result<Self, RevealError> {
        if item_count == 0 {
            return Err(RevealError::EmptyCarousel);
        }
        let carousel = match initial {
            LayoutMode::Carousel => Some(CarouselState::new(item_count)?),
            LayoutMode::Grid => None,
        };
        Ok(Self {
            metrics,
            item_count,
            mode: initial,
            carousel,
            transitioning: false,
        })
    }

    pub fn mode(&self) -> LayoutMode {
        self.mode
    }

    pub fn metrics(&self) -> &GridMetrics {
        &self.metrics
    }

    pub fn carousel(&self) -> Option<&CarouselState> {
        self.carousel.as_ref()
    }

    pub fn carousel_mut(&mut self) -> Option<&mut CarouselState> {
        self.carousel.as_mut()
    }

    pub fn is_transitioning(&self) -> bool {
        self.transitioning
    }

    /// The mode this container should switch to, or `None` if it is already there
    /// (or a transition is in flight).
    pub fn pending_switch(&self, breakpoint: &BreakpointState, content_width: f32) -> Option<LayoutMode> {
        if self.transitioning {
            return None;
        }
        let wanted = decide_mode(breakpoint, content_width, &self.metrics);
        (wanted != self.mode).then_some(wanted)
    }

    /// Mark the start of a transition. Returns false if one is already running.
    pub fn begin(&mut self) -> bool {
        if self.transitioning {
            return false;
        }
        self.transitioning = true;
        true
    }

    /// Commit the new mode: carousel state is created fresh on entry and
    /// discarded on exit. The transition stays open until [`Self::finish`].
    pub fn commit(&mut self, mode: LayoutMode) -> Result<(), RevealError> {
        self.carousel = match mode {
            LayoutMode::Carousel => Some(CarouselState::new(self.item_count)?),
            LayoutMode::Grid => None,
        };
        self.mode = mode;
        Ok(())
    }

    /// Close a transition once the new context has been created.
    pub fn finish(&mut self) {
        self.transitioning = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakpoint::{BreakpointState, Viewport};

    fn metrics_1456() -> GridMetrics {
        GridMetrics {
            columns: 5,
            item_width: 256.0,
            gap: 24.0,
            padding: 40.0,
        }
    }

    #[test]
    fn threshold_is_items_gaps_and_padding() {
        assert_eq!(metrics_1456().min_content_width(), 1456.0);
    }

    #[test]
    fn narrow_viewport_selects_carousel_at_index_zero() {
        let bp = BreakpointState::from_viewport(&Viewport::new(400.0, 800.0));
        assert_eq!(decide_mode(&bp, 400.0, &metrics_1456()), LayoutMode::Carousel);

        let sw = LayoutSwitcher::new(metrics_1456(), 14, LayoutMode::Carousel).unwrap();
        assert_eq!(sw.carousel().unwrap().current_index(), 0);
    }

    #[test]
    fn wide_desktop_selects_grid() {
        let bp = BreakpointState::from_viewport(&Viewport::new(1600.0, 900.0));
        assert_eq!(decide_mode(&bp, 1600.0, &metrics_1456()), LayoutMode::Grid);
        assert_eq!(decide_mode(&bp, 1455.0, &metrics_1456()), LayoutMode::Carousel);
    }

    #[test]
    fn fourteen_nexts_wrap_to_start() {
        let mut c = CarouselState::new(14).unwrap();
        let mut seen = Vec::new();
        for _ in 0..14 {
            seen.push(c.current_index());
            c.next();
        }
        assert_eq!(c.current_index(), 0);
        seen.sort_unstable();
        assert_eq!(seen, (0..14).collect::<Vec<_>>());
    }

    #[test]
    fn next_and_previous_are_inverse() {
        for count in 1..8 {
            for start in 0..count {
                let mut c = CarouselState::new(count).unwrap();
                for _ in 0..start {
                    c.next();
                }
                c.next();
                c.previous();
                assert_eq!(c.current_index(), start);
                c.previous();
                c.next();
                assert_eq!(c.current_index(), start);
            }
        }
    }

    #[test]
    fn previous_from_zero_wraps_to_last() {
        let mut c = CarouselState::new(5).unwrap();
        assert_eq!(c.previous(), 4);
    }

    #[test]
    fn empty_carousel_is_rejected() {
        assert_eq!(CarouselState::new(0), Err(RevealError::EmptyCarousel));
    }

    #[test]
    fn switcher_discards_carousel_when_leaving() {
        let mut sw = LayoutSwitcher::new(metrics_1456(), 3, LayoutMode::Carousel).unwrap();
        sw.carousel_mut().unwrap().next();
        assert!(sw.begin());
        assert!(!sw.begin());
        sw.commit(LayoutMode::Grid).unwrap();
        assert!(sw.carousel().is_none());
        assert!(sw.is_transitioning());
        sw.finish();
        assert!(sw.begin());
        sw.commit(LayoutMode::Carousel).unwrap();
        sw.finish();
        assert_eq!(sw.carousel().unwrap().current_index(), 0);
    }

    #[test]
    fn empty_gallery_is_rejected_in_either_mode() {
        for mode in [LayoutMode::Grid, LayoutMode::Carousel] {
            assert_eq!(
                LayoutSwitcher::new(metrics_1456(), 0, mode).unwrap_err(),
                RevealError::EmptyCarousel
            );
        }
    }
}
