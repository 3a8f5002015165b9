//! Visibility watching (`IntersectionObserver` semantics).
//!
//! The watcher keeps a list of registered elements and, on every [`check`],
//! recomputes each element's intersection with the viewport. Callbacks fire
//! only on transitions across the registration's threshold.
//!
//! Registrations without an exit callback are one-shot: they fire once on
//! entering and are dropped. Registrations with an exit callback toggle for as
//! long as the watcher lives.
//!
//! [`check`]: VisibilityWatcher::check

use crate::dom::{Document, ElementId, Intersection, RootMargin};
use std::fmt;

/// Callback run on a visibility transition
pub type VisibilityCallback = Box<dyn FnMut(&mut Document, ElementId)>;

/// Threshold and root margin for a registration
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WatchOptions {
    /// Visible fraction required to count as inside (0 = any contact)
    pub threshold: f64,
    /// Margin applied to the viewport
    pub root_margin: RootMargin,
}

impl WatchOptions {
    /// Options with `threshold` and no margin
    #[must_use]
    pub const fn threshold(threshold: f64) -> Self {
        Self {
            threshold,
            root_margin: RootMargin::ZERO,
        }
    }

    /// Set the root margin
    #[must_use]
    pub const fn with_root_margin(mut self, root_margin: RootMargin) -> Self {
        self.root_margin = root_margin;
        self
    }
}

/// Which side of the threshold an element is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Crossed into view
    Enter,
    /// Crossed out of view
    Exit,
}

struct TrackedElement {
    element: ElementId,
    options: WatchOptions,
    on_enter: VisibilityCallback,
    on_exit: Option<VisibilityCallback>,
    // `None` until the first check.
    inside: Option<bool>,
}

/// Observes elements and fires callbacks on visibility transitions
#[derive(Default)]
pub struct VisibilityWatcher {
    tracked: Vec<TrackedElement>,
}

impl fmt::Debug for VisibilityWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisibilityWatcher")
            .field("tracked", &self.tracked.len())
            .finish()
    }
}

impl VisibilityWatcher {
    /// Create an empty watcher
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `element`
    ///
    /// With `on_exit` the registration toggles; without it, it is dropped
    /// after the first enter. Unknown elements are skipped and `false` is
    /// returned.
    pub fn observe(
        &mut self,
        doc: &Document,
        element: ElementId,
        options: WatchOptions,
        on_enter: VisibilityCallback,
        on_exit: Option<VisibilityCallback>,
    ) -> bool {
        if doc.element(element).is_none() {
            return false;
        }
        self.tracked.push(TrackedElement {
            element,
            options,
            on_enter,
            on_exit,
            inside: None,
        });
        true
    }

    /// Register a one-shot enter callback
    pub fn observe_once<F>(
        &mut self,
        doc: &Document,
        element: ElementId,
        options: WatchOptions,
        on_enter: F,
    ) -> bool
    where
        F: FnMut(&mut Document, ElementId) + 'static,
    {
        self.observe(doc, element, options, Box::new(on_enter), None)
    }

    /// Register a toggling enter/exit pair
    pub fn observe_toggle<F, G>(
        &mut self,
        doc: &Document,
        element: ElementId,
        options: WatchOptions,
        on_enter: F,
        on_exit: G,
    ) -> bool
    where
        F: FnMut(&mut Document, ElementId) + 'static,
        G: FnMut(&mut Document, ElementId) + 'static,
    {
        self.observe(
            doc,
            element,
            options,
            Box::new(on_enter),
            Some(Box::new(on_exit)),
        )
    }

    /// Drop every registration for `element`
    pub fn unobserve(&mut self, element: ElementId) {
        self.tracked.retain(|t| t.element != element);
    }

    /// Whether `element` is still registered
    #[must_use]
    pub fn is_observing(&self, element: ElementId) -> bool {
        self.tracked.iter().any(|t| t.element == element)
    }

    /// Number of live registrations
    #[must_use]
    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    /// Whether nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    /// Recompute visibility against the current viewport and fire callbacks
    ///
    /// The first check of a toggling registration reports its initial state,
    /// so an element that starts outside gets its exit callback once. Returns
    /// the transitions that fired, in registration order.
    pub fn check(&mut self, doc: &mut Document) -> Vec<(ElementId, Transition)> {
        let viewport = doc.viewport();
        let mut fired = Vec::new();

        for tracked in &mut self.tracked {
            let inside = doc.is_connected(tracked.element)
                && doc.rect(tracked.element).is_some_and(|rect| {
                    let root = viewport.root_rect(&tracked.options.root_margin);
                    Intersection::compute(&rect, &root).meets(tracked.options.threshold)
                });

            let transition = match (tracked.inside, inside) {
                (None | Some(false), true) => Some(Transition::Enter),
                (None, false) if tracked.on_exit.is_some() => Some(Transition::Exit),
                (Some(true), false) => Some(Transition::Exit),
                _ => None,
            };
            tracked.inside = Some(inside);

            match transition {
                Some(Transition::Enter) => {
                    (tracked.on_enter)(doc, tracked.element);
                    fired.push((tracked.element, Transition::Enter));
                }
                Some(Transition::Exit) => {
                    if let Some(on_exit) = tracked.on_exit.as_mut() {
                        on_exit(doc, tracked.element);
                        fired.push((tracked.element, Transition::Exit));
                    }
                }
                None => {}
            }
        }

        // One-shot registrations are consumed by their first enter.
        self.tracked
            .retain(|t| t.on_exit.is_some() || t.inside != Some(true));

        fired
    }
}
