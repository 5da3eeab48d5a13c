//! "Stuck" bucket header tracking for the scrolling sidebar.
//!
//! Coordinates are relative to the top of the scroll container's visible
//! area, growing downwards. A header counts as scrolled away once its box is
//! entirely above `viewport.top_inset`.

use super::categorize::TimeBucket;

/// Layout of one bucket header and the section below it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeaderGeometry {
    pub bucket: TimeBucket,
    pub header_top: f64,
    pub header_bottom: f64,
    /// Bottom edge of the bucket's last item.
    pub section_bottom: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Distance from the container top at which headers count as hidden.
    pub top_inset: f64,
    pub height: f64,
}

impl Viewport {
    pub const DEFAULT_TOP_INSET: f64 = 60.0;

    pub fn new(height: f64) -> Self {
        Self {
            top_inset: Self::DEFAULT_TOP_INSET,
            height,
        }
    }

    fn intersects(&self, top: f64, bottom: f64) -> bool {
        bottom > self.top_inset && top < self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StickyChange {
    Stuck(TimeBucket),
    Unstuck(TimeBucket),
}

/// Remembers which bucket header, if any, is stuck.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StickyTracker {
    stuck: Option<TimeBucket>,
}

impl StickyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stuck(&self) -> Option<TimeBucket> {
        self.stuck
    }

    pub fn is_stuck(&self, bucket: TimeBucket) -> bool {
        self.stuck == Some(bucket)
    }

    /// Re-evaluates every header against the viewport, in order.
    ///
    /// The last header to trigger wins, so with headers in display order the
    /// lowest header that has scrolled away ends up stuck.
    pub fn evaluate(&mut self, headers: &[HeaderGeometry], viewport: &Viewport) -> Vec<StickyChange> {
        let mut changes = Vec::new();
        for header in headers {
            let Some(change) = decide(header, viewport, self.stuck) else {
                continue;
            };
            self.stuck = match change {
                StickyChange::Stuck(bucket) => {
                    // at most one header is stuck; release the one it replaces
                    if let Some(previous) = self.stuck.filter(|b| *b != bucket) {
                        changes.push(StickyChange::Unstuck(previous));
                    }
                    Some(bucket)
                }
                StickyChange::Unstuck(_) => None,
            };
            changes.push(change);
        }
        changes
    }
}

/// Decision for one header given the currently stuck bucket.
pub fn decide(
    header: &HeaderGeometry,
    viewport: &Viewport,
    stuck: Option<TimeBucket>,
) -> Option<StickyChange> {
    let above = header.header_bottom <= viewport.top_inset;
    let items_visible = header.section_bottom > viewport.top_inset;
    let is_stuck = stuck == Some(header.bucket);

    if above && items_visible {
        return (!is_stuck).then_some(StickyChange::Stuck(header.bucket));
    }
    let returned = viewport.intersects(header.header_top, header.header_bottom);
    if is_stuck && (returned || above) {
        return Some(StickyChange::Unstuck(header.bucket));
    }
    None
}

/// Source of layout measurements, e.g. a terminal list widget.
pub trait LayoutSource {
    fn headers(&self) -> Vec<HeaderGeometry>;
    fn viewport(&self) -> Viewport;
}

/// Tracker bound to a layout source. Once disconnected it ignores events.
pub struct StickyObserver<S> {
    source: Option<S>,
    tracker: StickyTracker,
}

impl<S: LayoutSource> StickyObserver<S> {
    pub fn new(source: S) -> Self {
        Self {
            source: Some(source),
            tracker: StickyTracker::new(),
        }
    }

    pub fn tracker(&self) -> &StickyTracker {
        &self.tracker
    }

    pub fn is_connected(&self) -> bool {
        self.source.is_some()
    }

    /// Scroll or layout happened.
    pub fn on_layout(&mut self) -> Vec<StickyChange> {
        let Some(source) = &self.source else {
            return vec![];
        };
        let headers = source.headers();
        let viewport = source.viewport();
        self.tracker.evaluate(&headers, &viewport)
    }

    /// Releases the source. Returns false if already disconnected.
    pub fn disconnect(&mut self) -> bool {
        self.source.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    const HEADER: f64 = 24.0;

    /// Two sections laid out one after another, scrolled by `offset`.
    fn layout(offset: f64) -> Vec<HeaderGeometry> {
        let today_top = 60.0 - offset;
        let week_top = today_top + HEADER + 200.0;
        vec![
            HeaderGeometry {
                bucket: TimeBucket::Today,
                header_top: today_top,
                header_bottom: today_top + HEADER,
                section_bottom: week_top,
            },
            HeaderGeometry {
                bucket: TimeBucket::Last7Days,
                header_top: week_top,
                header_bottom: week_top + HEADER,
                section_bottom: week_top + HEADER + 400.0,
            },
        ]
    }

    fn viewport() -> Viewport {
        Viewport::new(500.0)
    }

    #[test]
    fn test_nothing_stuck_at_top() {
        let mut tracker = StickyTracker::new();
        assert!(tracker.evaluate(&layout(0.0), &viewport()).is_empty());
        assert_eq!(tracker.stuck(), None);
    }

    #[test]
    fn test_header_sticks_when_scrolled_above_inset() {
        let mut tracker = StickyTracker::new();

        let changes = tracker.evaluate(&layout(30.0), &viewport());

        assert_eq!(changes, vec![StickyChange::Stuck(TimeBucket::Today)]);
        assert!(tracker.is_stuck(TimeBucket::Today));
        assert!(tracker.evaluate(&layout(40.0), &viewport()).is_empty());
    }

    #[test]
    fn test_scrolling_back_clears_stuck() {
        let mut tracker = StickyTracker::new();
        tracker.evaluate(&layout(30.0), &viewport());

        let changes = tracker.evaluate(&layout(0.0), &viewport());

        assert_eq!(changes, vec![StickyChange::Unstuck(TimeBucket::Today)]);
        assert_eq!(tracker.stuck(), None);
    }

    #[test]
    fn test_next_header_takes_over() {
        let mut tracker = StickyTracker::new();
        tracker.evaluate(&layout(30.0), &viewport());

        // Today's items are gone and the week header is above the inset.
        let changes = tracker.evaluate(&layout(260.0), &viewport());

        assert_eq!(
            changes,
            vec![
                StickyChange::Unstuck(TimeBucket::Today),
                StickyChange::Stuck(TimeBucket::Last7Days)
            ]
        );
        assert!(tracker.is_stuck(TimeBucket::Last7Days));
    }

    #[test]
    fn test_earlier_header_retaking_the_slot_releases_the_previous_one() {
        let mut tracker = StickyTracker::new();
        assert_eq!(
            tracker.evaluate(&layout(260.0), &viewport()),
            vec![StickyChange::Stuck(TimeBucket::Last7Days)]
        );

        // Back up until Today's items are visible again under its hidden header.
        let changes = tracker.evaluate(&layout(100.0), &viewport());

        assert_eq!(
            changes,
            vec![
                StickyChange::Unstuck(TimeBucket::Last7Days),
                StickyChange::Stuck(TimeBucket::Today)
            ]
        );
        assert!(tracker.is_stuck(TimeBucket::Today));
    }

    #[test]
    fn test_custom_inset() {
        let mut tracker = StickyTracker::new();
        let viewport = Viewport {
            top_inset: 0.0,
            height: 500.0,
        };
        assert!(tracker.evaluate(&layout(70.0), &viewport).is_empty());
        assert_eq!(
            tracker.evaluate(&layout(90.0), &viewport),
            vec![StickyChange::Stuck(TimeBucket::Today)]
        );
    }

    struct FakeLayout {
        offset: Rc<Cell<f64>>,
    }

    impl LayoutSource for FakeLayout {
        fn headers(&self) -> Vec<HeaderGeometry> {
            layout(self.offset.get())
        }

        fn viewport(&self) -> Viewport {
            viewport()
        }
    }

    #[test]
    fn test_disconnect_is_idempotent_and_silences_events() {
        let offset = Rc::new(Cell::new(30.0));
        let mut observer = StickyObserver::new(FakeLayout {
            offset: Rc::clone(&offset),
        });
        assert_eq!(observer.on_layout().len(), 1);

        assert!(observer.disconnect());
        assert!(!observer.disconnect());

        offset.set(0.0);
        assert!(observer.on_layout().is_empty());
        assert!(observer.tracker().is_stuck(TimeBucket::Today));
        assert!(!observer.is_connected());
    }
}
