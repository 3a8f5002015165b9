//! Scroll-depth milestone tracking.

use crate::analytics::EventTracker;
use crate::dom::Document;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Default milestones, in percent
pub const DEFAULT_MILESTONES: [u8; 4] = [25, 50, 75, 100];

/// Scroll position snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrollMetrics {
    /// Vertical scroll offset
    pub scroll_y: f64,
    /// Full scrollable height
    pub document_height: f64,
    /// Viewport height
    pub viewport_height: f64,
}

impl ScrollMetrics {
    /// Snapshot the document's current scroll state
    #[must_use]
    pub fn of(doc: &Document) -> Self {
        let viewport = doc.viewport();
        Self {
            scroll_y: viewport.scroll_y,
            document_height: doc.document_height(),
            viewport_height: viewport.height,
        }
    }

    /// Percentage scrolled, rounded and clamped to `[0, 100]`
    ///
    /// Pages that cannot scroll report 0.
    #[must_use]
    pub fn percent(&self) -> u8 {
        let scrollable = self.document_height - self.viewport_height;
        if scrollable <= 0.0 || !scrollable.is_finite() || !self.scroll_y.is_finite() {
            return 0;
        }
        let percent = (self.scroll_y / scrollable * 100.0).round();
        percent.clamp(0.0, 100.0) as u8
    }
}

/// Fires each milestone at most once per page session
#[derive(Debug, Clone)]
pub struct ScrollDepthTracker {
    milestones: Vec<u8>,
    fired: BTreeSet<u8>,
    max_scroll_seen: u8,
}

impl Default for ScrollDepthTracker {
    fn default() -> Self {
        Self::new(&DEFAULT_MILESTONES)
    }
}

impl ScrollDepthTracker {
    /// Track `milestones` (sorted, de-duplicated, capped at 100)
    #[must_use]
    pub fn new(milestones: &[u8]) -> Self {
        let milestones: BTreeSet<u8> = milestones.iter().map(|m| (*m).min(100)).collect();
        Self {
            milestones: milestones.into_iter().collect(),
            fired: BTreeSet::new(),
            max_scroll_seen: 0,
        }
    }

    /// Record a scroll position; returns newly reached milestones, ascending
    ///
    /// Milestones are only checked when the position goes past the deepest
    /// point seen so far, so nothing fires at 0%.
    pub fn record(&mut self, metrics: ScrollMetrics) -> Vec<u8> {
        let percent = metrics.percent();
        if percent <= self.max_scroll_seen {
            return Vec::new();
        }
        self.max_scroll_seen = percent;

        let reached: Vec<u8> = self
            .milestones
            .iter()
            .copied()
            .filter(|m| *m <= percent && !self.fired.contains(m))
            .collect();
        self.fired.extend(reached.iter().copied());
        reached
    }

    /// Record a scroll position and track every new milestone as
    /// `("Scroll", "Depth", "<m>%")`
    pub fn on_scroll(&mut self, metrics: ScrollMetrics, tracker: &mut EventTracker) -> Vec<u8> {
        let reached = self.record(metrics);
        for milestone in &reached {
            tracker.track("Scroll", "Depth", &format!("{milestone}%"), None);
        }
        reached
    }

    /// Highest percentage seen so far
    #[must_use]
    pub const fn max_scroll_seen(&self) -> u8 {
        self.max_scroll_seen
    }

    /// Milestones already fired, ascending
    #[must_use]
    pub fn fired(&self) -> Vec<u8> {
        self.fired.iter().copied().collect()
    }

    /// Milestones being tracked, ascending
    #[must_use]
    pub fn milestones(&self) -> &[u8] {
        &self.milestones
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(scroll_y: f64) -> ScrollMetrics {
        ScrollMetrics {
            scroll_y,
            document_height: 1800.0,
            viewport_height: 800.0,
        }
    }

    #[test]
    fn test_percent_rounding_and_clamping() {
        assert_eq!(at(0.0).percent(), 0);
        assert_eq!(at(250.0).percent(), 25);
        assert_eq!(at(254.0).percent(), 25);
        assert_eq!(at(244.0).percent(), 24);
        assert_eq!(at(1000.0).percent(), 100);
        assert_eq!(at(1400.0).percent(), 100);
        assert_eq!(at(-50.0).percent(), 0);
    }

    #[test]
    fn test_unscrollable_page_is_zero() {
        let flat = ScrollMetrics {
            scroll_y: 10.0,
            document_height: 600.0,
            viewport_height: 800.0,
        };
        assert_eq!(flat.percent(), 0);

        let exact = ScrollMetrics {
            scroll_y: 0.0,
            document_height: 800.0,
            viewport_height: 800.0,
        };
        assert_eq!(exact.percent(), 0);
    }

    #[test]
    fn test_milestones_fire_once_in_order() {
        let mut tracker = ScrollDepthTracker::default();

        assert_eq!(tracker.record(at(100.0)), Vec::<u8>::new());
        assert_eq!(tracker.record(at(800.0)), vec![25, 50, 75]);
        assert_eq!(tracker.record(at(200.0)), Vec::<u8>::new());
        assert_eq!(tracker.record(at(800.0)), Vec::<u8>::new());
        assert_eq!(tracker.record(at(1000.0)), vec![100]);
        assert_eq!(tracker.record(at(1000.0)), Vec::<u8>::new());

        assert_eq!(tracker.fired(), vec![25, 50, 75, 100]);
        assert_eq!(tracker.max_scroll_seen(), 100);
    }

    #[test]
    fn test_on_scroll_tracks_labels() {
        let mut depth = ScrollDepthTracker::default();
        let mut tracker = EventTracker::new();

        depth.on_scroll(at(500.0), &mut tracker);

        let labels: Vec<&str> = tracker
            .logged("Scroll", "Depth")
            .into_iter()
            .map(|e| e.label.as_str())
            .collect();
        assert_eq!(labels, vec!["25%", "50%"]);
    }

    #[test]
    fn test_zero_milestone_waits_for_scrolling() {
        let mut tracker = ScrollDepthTracker::new(&[0, 25]);
        let flat = ScrollMetrics {
            scroll_y: 0.0,
            document_height: 800.0,
            viewport_height: 800.0,
        };

        assert_eq!(tracker.record(flat), Vec::<u8>::new());
        assert_eq!(tracker.record(at(0.0)), Vec::<u8>::new());
        assert_eq!(tracker.record(at(100.0)), vec![0]);
        assert_eq!(tracker.record(at(300.0)), vec![25]);
    }

    #[test]
    fn test_custom_milestones_normalized() {
        let tracker = ScrollDepthTracker::new(&[90, 10, 10, 200]);
        assert_eq!(tracker.milestones(), &[10, 90, 100]);
    }
}
