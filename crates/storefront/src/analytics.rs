//! Analytics event fan-out.
//!
//! [`EventTracker::track`] hands each event to the always-on debug log and to
//! every configured sink. Delivery is fire-and-forget: a sink that is absent or
//! fails is logged and skipped, and the caller never sees the outcome.
//!
//! External analytics libraries expose themselves as page globals (`gtag`,
//! `fbq`) that may appear or disappear at any time. They are modeled by a
//! shared [`HookRegistry`] that sinks consult on every send.

use crate::config::AnalyticsConfig;
use crate::result::{StorefrontError, StorefrontResult};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;

/// Global hook used by Google Analytics 4
pub const GTAG_HOOK: &str = "gtag";
/// Global hook used by the Facebook Pixel
pub const FBQ_HOOK: &str = "fbq";

/// A semantic analytics event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedEvent {
    /// Event category (`"CTA"`, `"Scroll"`, ...)
    pub category: String,
    /// Action within the category
    pub action: String,
    /// Free-form label
    pub label: String,
    /// Optional numeric value
    pub value: Option<f64>,
}

impl TrackedEvent {
    /// Create an event
    #[must_use]
    pub fn new(category: &str, action: &str, label: &str, value: Option<f64>) -> Self {
        Self {
            category: category.to_string(),
            action: action.to_string(),
            label: label.to_string(),
            value,
        }
    }
}

/// One invocation of a global analytics hook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookCall {
    /// First positional argument (`"event"`, `"trackCustom"`)
    pub command: String,
    /// Second positional argument (event name)
    pub name: String,
    /// Parameters object
    pub payload: serde_json::Value,
}

/// Callable installed under a global name
pub type HookFn = Rc<dyn Fn(&HookCall) -> Result<(), String>>;

/// Shared table of page globals that analytics libraries install
///
/// Cloning yields another handle to the same table, so the host can install
/// or remove hooks after the tracker is built.
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: Rc<RefCell<HashMap<String, HookFn>>>,
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self.hooks.borrow().keys().cloned().collect();
        names.sort();
        f.debug_struct("HookRegistry").field("hooks", &names).finish()
    }
}

impl HookRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install (or replace) a global hook
    pub fn install<F>(&self, name: &str, hook: F)
    where
        F: Fn(&HookCall) -> Result<(), String> + 'static,
    {
        self.hooks
            .borrow_mut()
            .insert(name.to_string(), Rc::new(hook));
    }

    /// Remove a global hook
    pub fn remove(&self, name: &str) {
        self.hooks.borrow_mut().remove(name);
    }

    /// Whether a hook is currently installed
    #[must_use]
    pub fn is_present(&self, name: &str) -> bool {
        self.hooks.borrow().contains_key(name)
    }

    /// Look up a hook
    #[must_use]
    pub fn get(&self, name: &str) -> Option<HookFn> {
        self.hooks.borrow().get(name).cloned()
    }
}

/// Outcome of a single sink delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The sink accepted the event
    Delivered,
    /// The sink was not available; nothing was sent
    Skipped,
}

/// A destination for tracked events
pub trait AnalyticsSink {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Deliver one event
    fn send(&mut self, event: &TrackedEvent) -> StorefrontResult<Delivery>;
}

fn call_hook(
    hooks: &HookRegistry,
    hook_name: &str,
    call: impl FnOnce() -> HookCall,
) -> StorefrontResult<Delivery> {
    let Some(hook) = hooks.get(hook_name) else {
        return Ok(Delivery::Skipped);
    };
    hook(&call()).map_err(|message| StorefrontError::Sink {
        sink: hook_name.to_string(),
        message,
    })?;
    Ok(Delivery::Delivered)
}

/// Google Analytics 4 via `gtag('event', action, {...})`
#[derive(Debug, Clone)]
pub struct GoogleAnalyticsSink {
    hooks: HookRegistry,
}

impl GoogleAnalyticsSink {
    /// Create a sink reading the `gtag` hook from `hooks`
    #[must_use]
    pub fn new(hooks: HookRegistry) -> Self {
        Self { hooks }
    }
}

impl AnalyticsSink for GoogleAnalyticsSink {
    fn name(&self) -> &str {
        GTAG_HOOK
    }

    fn send(&mut self, event: &TrackedEvent) -> StorefrontResult<Delivery> {
        call_hook(&self.hooks, GTAG_HOOK, || HookCall {
            command: "event".to_string(),
            name: event.action.clone(),
            payload: json!({
                "event_category": event.category,
                "event_label": event.label,
                "value": event.value,
            }),
        })
    }
}

/// Facebook Pixel via `fbq('trackCustom', 'Category_Action', {...})`
#[derive(Debug, Clone)]
pub struct FacebookPixelSink {
    hooks: HookRegistry,
}

impl FacebookPixelSink {
    /// Create a sink reading the `fbq` hook from `hooks`
    #[must_use]
    pub fn new(hooks: HookRegistry) -> Self {
        Self { hooks }
    }
}

impl AnalyticsSink for FacebookPixelSink {
    fn name(&self) -> &str {
        FBQ_HOOK
    }

    fn send(&mut self, event: &TrackedEvent) -> StorefrontResult<Delivery> {
        call_hook(&self.hooks, FBQ_HOOK, || HookCall {
            command: "trackCustom".to_string(),
            name: format!("{}_{}", event.category, event.action),
            payload: json!({
                "label": event.label,
                "value": event.value,
            }),
        })
    }
}

/// Local record of tracked events, oldest first
#[derive(Debug, Clone)]
pub struct DebugLog {
    entries: VecDeque<TrackedEvent>,
    capacity: usize,
}

impl DebugLog {
    /// Create a log keeping at most `capacity` events
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
        }
    }

    fn record(&mut self, event: &TrackedEvent) {
        tracing::info!(
            category = %event.category,
            action = %event.action,
            label = %event.label,
            value = ?event.value,
            "event tracked"
        );
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(event.clone());
    }

    /// Retained events
    pub fn entries(&self) -> impl Iterator<Item = &TrackedEvent> {
        self.entries.iter()
    }

    /// Number of retained events
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was retained
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Fans tracked events out to the debug log and every sink
pub struct EventTracker {
    debug_log: DebugLog,
    sinks: Vec<Box<dyn AnalyticsSink>>,
}

impl fmt::Debug for EventTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sinks: Vec<&str> = self.sinks.iter().map(|s| s.name()).collect();
        f.debug_struct("EventTracker")
            .field("logged", &self.debug_log.len())
            .field("sinks", &sinks)
            .finish()
    }
}

impl Default for EventTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl EventTracker {
    /// Tracker with only the debug log
    #[must_use]
    pub fn new() -> Self {
        Self {
            debug_log: DebugLog::new(AnalyticsConfig::default().debug_log_capacity),
            sinks: Vec::new(),
        }
    }

    /// Tracker with the sinks enabled in `config`, reading hooks from `hooks`
    #[must_use]
    pub fn from_config(config: &AnalyticsConfig, hooks: &HookRegistry) -> Self {
        let mut tracker = Self {
            debug_log: DebugLog::new(config.debug_log_capacity),
            sinks: Vec::new(),
        };
        if config.google_analytics {
            tracker.add_sink(GoogleAnalyticsSink::new(hooks.clone()));
        }
        if config.facebook_pixel {
            tracker.add_sink(FacebookPixelSink::new(hooks.clone()));
        }
        tracker
    }

    /// Append a sink; sinks receive events in the order they were added
    pub fn add_sink<S: AnalyticsSink + 'static>(&mut self, sink: S) {
        self.sinks.push(Box::new(sink));
    }

    /// Add a sink, builder style
    #[must_use]
    pub fn with_sink<S: AnalyticsSink + 'static>(mut self, sink: S) -> Self {
        self.add_sink(sink);
        self
    }

    /// Names of configured sinks
    #[must_use]
    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    /// Track `(category, action, label, value)`
    pub fn track(&mut self, category: &str, action: &str, label: &str, value: Option<f64>) {
        self.track_event(&TrackedEvent::new(category, action, label, value));
    }

    /// Track a prepared event
    pub fn track_event(&mut self, event: &TrackedEvent) {
        for sink in &mut self.sinks {
            match sink.send(event) {
                Ok(Delivery::Delivered) => {
                    tracing::trace!(sink = sink.name(), "event delivered");
                }
                Ok(Delivery::Skipped) => {
                    tracing::trace!(sink = sink.name(), "sink not present, skipped");
                }
                Err(e) => {
                    tracing::warn!(sink = sink.name(), error = %e, "analytics sink failed");
                }
            }
        }
        self.debug_log.record(event);
    }

    /// Local debug log
    #[must_use]
    pub const fn debug_log(&self) -> &DebugLog {
        &self.debug_log
    }

    /// Logged events with `category` and `action`
    #[must_use]
    pub fn logged(&self, category: &str, action: &str) -> Vec<&TrackedEvent> {
        self.debug_log
            .entries()
            .filter(|e| e.category == category && e.action == action)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording_hook(registry: &HookRegistry, name: &str) -> Rc<RefCell<Vec<HookCall>>> {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&calls);
        registry.install(name, move |call| {
            sink.borrow_mut().push(call.clone());
            Ok(())
        });
        calls
    }

    #[test]
    fn test_track_without_hooks_logs_locally() {
        let hooks = HookRegistry::new();
        let mut tracker = EventTracker::from_config(&AnalyticsConfig::default(), &hooks);

        tracker.track("Page", "View", "/products/arm-trainer", None);

        assert_eq!(tracker.debug_log().len(), 1);
        let logged = tracker.logged("Page", "View");
        assert_eq!(logged[0].label, "/products/arm-trainer");
    }

    #[test]
    fn test_gtag_payload_shape() {
        let hooks = HookRegistry::new();
        let calls = recording_hook(&hooks, GTAG_HOOK);
        let mut tracker = EventTracker::from_config(&AnalyticsConfig::default(), &hooks);

        tracker.track("Ecommerce", "Add to Cart", "Bundle of 2", Some(49.99));

        let calls = calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].command, "event");
        assert_eq!(calls[0].name, "Add to Cart");
        assert_eq!(
            calls[0].payload,
            json!({"event_category": "Ecommerce", "event_label": "Bundle of 2", "value": 49.99})
        );
    }

    #[test]
    fn test_fbq_payload_shape() {
        let hooks = HookRegistry::new();
        let calls = recording_hook(&hooks, FBQ_HOOK);
        let mut tracker = EventTracker::from_config(&AnalyticsConfig::default(), &hooks);

        tracker.track("CTA", "Click", "Buy Now", None);

        let calls = calls.borrow();
        assert_eq!(calls[0].command, "trackCustom");
        assert_eq!(calls[0].name, "CTA_Click");
        assert_eq!(calls[0].payload, json!({"label": "Buy Now", "value": null}));
    }

    #[test]
    fn test_hook_presence_checked_at_call_time() {
        let hooks = HookRegistry::new();
        let mut tracker = EventTracker::from_config(&AnalyticsConfig::default(), &hooks);

        tracker.track("Page", "View", "/", None);
        let calls = recording_hook(&hooks, GTAG_HOOK);
        tracker.track("Page", "View", "/", None);
        hooks.remove(GTAG_HOOK);
        tracker.track("Page", "View", "/", None);

        assert_eq!(calls.borrow().len(), 1);
        assert_eq!(tracker.debug_log().len(), 3);
    }

    #[test]
    fn test_failing_hook_does_not_block_others() {
        let hooks = HookRegistry::new();
        hooks.install(GTAG_HOOK, |_| Err("blocked by extension".to_string()));
        let pixel = recording_hook(&hooks, FBQ_HOOK);
        let mut tracker = EventTracker::from_config(&AnalyticsConfig::default(), &hooks);

        tracker.track("FAQ", "Toggle", "Is it portable?", None);

        assert_eq!(pixel.borrow().len(), 1);
        assert_eq!(tracker.debug_log().len(), 1);
    }

    #[test]
    fn test_disabled_sinks_are_not_built() {
        let hooks = HookRegistry::new();
        let calls = recording_hook(&hooks, FBQ_HOOK);
        let config = AnalyticsConfig {
            facebook_pixel: false,
            ..AnalyticsConfig::default()
        };
        let mut tracker = EventTracker::from_config(&config, &hooks);

        tracker.track("CTA", "Click", "Buy", None);

        assert_eq!(tracker.sink_names(), vec![GTAG_HOOK]);
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_debug_log_capacity() {
        let config = AnalyticsConfig {
            debug_log_capacity: 2,
            ..AnalyticsConfig::default()
        };
        let mut tracker = EventTracker::from_config(&config, &HookRegistry::new());
        for label in ["a", "b", "c"] {
            tracker.track("Scroll", "Depth", label, None);
        }
        let labels: Vec<&str> = tracker
            .debug_log()
            .entries()
            .map(|e| e.label.as_str())
            .collect();
        assert_eq!(labels, vec!["b", "c"]);
    }

    #[test]
    fn test_custom_sink() {
        struct Counting(Rc<RefCell<usize>>);
        impl AnalyticsSink for Counting {
            fn name(&self) -> &str {
                "counting"
            }
            fn send(&mut self, _event: &TrackedEvent) -> StorefrontResult<Delivery> {
                *self.0.borrow_mut() += 1;
                Ok(Delivery::Delivered)
            }
        }

        let count = Rc::new(RefCell::new(0));
        let mut tracker = EventTracker::new().with_sink(Counting(Rc::clone(&count)));
        tracker.track("Video", "Play", "Product Demo", None);
        tracker.track("Video", "Complete", "Product Demo", None);

        assert_eq!(*count.borrow(), 2);
    }
}
