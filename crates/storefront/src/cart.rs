//! Add-to-cart interaction with a simulated cart request.
//!
//! Each click runs `Idle -> Submitting -> {Succeeded, Failed} -> Idle`:
//!
//! - the control is disabled and relabeled synchronously on click;
//! - after the configured latency the descriptor is submitted to the
//!   [`CartBackend`] and the outcome is shown on the control;
//! - after the reset delay the control is re-enabled and relabeled,
//!   whichever way the request went.
//!
//! Delays are tasks on the page [`Scheduler`], so the controller never blocks.

use crate::analytics::EventTracker;
use crate::clock::Scheduler;
use crate::config::CartConfig;
use crate::dom::{Document, ElementId, Selector};
use crate::result::{StorefrontError, StorefrontResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// Bundle identifier used when a control carries none
pub const DEFAULT_BUNDLE: &str = "single";

/// Attribute naming a control's bundle
pub const BUNDLE_ATTRIBUTE: &str = "data-bundle";

fn inline_action_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"addToCart\('(.+?)'\)").expect("inline action pattern is a valid regex")
    })
}

/// Quantity implied by a bundle identifier
#[must_use]
pub fn quantity_for_bundle(bundle: &str) -> u32 {
    match bundle {
        "bundle2" => 2,
        "bundle3" => 3,
        _ => 1,
    }
}

/// Bundle identifier configured on a control
///
/// Read from `data-bundle`, else from an inline `addToCart('<id>')` action,
/// else [`DEFAULT_BUNDLE`].
#[must_use]
pub fn bundle_identifier(doc: &Document, control: ElementId) -> String {
    if let Some(bundle) = doc.attribute(control, BUNDLE_ATTRIBUTE) {
        if !bundle.trim().is_empty() {
            return bundle.trim().to_string();
        }
    }
    doc.attribute(control, "onclick")
        .and_then(|action| inline_action_pattern().captures(action))
        .and_then(|captures| captures.get(1))
        .map_or_else(|| DEFAULT_BUNDLE.to_string(), |m| m.as_str().to_string())
}

/// Parse a displayed price such as `"$29.99"` or `"€1.299,00"` into a number
///
/// The last `.` or `,` is the decimal separator when at most two digits
/// follow it; every other separator is digit grouping.
#[must_use]
pub fn parse_price(text: &str) -> Option<f64> {
    let digits: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    let decimal = digits
        .rfind(|c: char| c == '.' || c == ',')
        .filter(|pos| digits.len() - pos - 1 <= 2);

    let normalized = match decimal {
        Some(pos) => {
            let whole: String = digits[..pos].chars().filter(char::is_ascii_digit).collect();
            format!("{whole}.{}", &digits[pos + 1..])
        }
        None => digits.chars().filter(char::is_ascii_digit).collect(),
    };
    normalized.parse().ok()
}

/// What is being added, read from the markup around the clicked control
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDescriptor {
    /// Bundle identifier
    pub id: String,
    /// Product title
    pub title: String,
    /// Displayed price
    pub price: String,
    /// Units implied by the bundle
    pub quantity: u32,
    /// Control label before the interaction
    pub original_label: String,
}

impl ProductDescriptor {
    /// Derive a descriptor from `control` and its enclosing product card
    #[must_use]
    pub fn from_control(doc: &Document, control: ElementId, config: &CartConfig) -> Self {
        let id = bundle_identifier(doc, control);
        let card = Selector::parse(&config.card_selector)
            .ok()
            .and_then(|selector| doc.closest(control, &selector));
        let lookup = |selector: &str| {
            let card = card?;
            let selector = Selector::parse(selector).ok()?;
            let found = doc.query_within(card, &selector)?;
            let text = doc.text_content(found).trim().to_string();
            (!text.is_empty()).then_some(text)
        };

        Self {
            quantity: quantity_for_bundle(&id),
            title: lookup(&config.title_selector)
                .unwrap_or_else(|| config.fallback_title.clone()),
            price: lookup(&config.price_selector)
                .unwrap_or_else(|| config.fallback_price.clone()),
            original_label: doc.text_content(control),
            id,
        }
    }

    /// Numeric price, when the displayed price parses
    #[must_use]
    pub fn price_value(&self) -> Option<f64> {
        parse_price(&self.price)
    }
}

/// Destination of simulated cart requests
pub trait CartBackend {
    /// Submit one line item
    fn add_item(&mut self, item: &ProductDescriptor) -> StorefrontResult<()>;
}

/// Backend that accepts every item
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedCartApi;

impl CartBackend for SimulatedCartApi {
    fn add_item(&mut self, item: &ProductDescriptor) -> StorefrontResult<()> {
        tracing::debug!(id = %item.id, quantity = item.quantity, "simulated cart accepted item");
        Ok(())
    }
}

/// Backend that rejects every item, for exercising the failure path
#[derive(Debug, Clone, Default)]
pub struct RejectingCartApi {
    /// Message carried by the rejection
    pub message: String,
}

impl CartBackend for RejectingCartApi {
    fn add_item(&mut self, _item: &ProductDescriptor) -> StorefrontResult<()> {
        Err(StorefrontError::cart_request(self.message.clone()))
    }
}

/// Identifier of one add-to-cart interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperationId(u64);

/// Where an interaction currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CartPhase {
    /// No interaction in progress
    Idle,
    /// Request in flight
    Submitting,
    /// Request accepted; waiting for reset
    Succeeded,
    /// Request rejected; waiting for reset
    Failed,
}

/// Deferred cart work scheduled on the page clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartTask {
    /// Simulated latency elapsed; submit the item
    Complete(OperationId),
    /// Reset delay elapsed; restore the control
    Reset(OperationId),
}

#[derive(Debug)]
struct Operation {
    control: ElementId,
    descriptor: ProductDescriptor,
    phase: CartPhase,
}

/// Owns the cart contents and drives add-to-cart interactions
pub struct CartController {
    config: CartConfig,
    backend: Box<dyn CartBackend>,
    items: Vec<ProductDescriptor>,
    operations: HashMap<OperationId, Operation>,
    next_id: u64,
}

impl fmt::Debug for CartController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartController")
            .field("items", &self.items.len())
            .field("operations", &self.operations.len())
            .finish()
    }
}

impl CartController {
    /// Controller backed by [`SimulatedCartApi`]
    #[must_use]
    pub fn new(config: CartConfig) -> Self {
        Self::with_backend(config, SimulatedCartApi)
    }

    /// Controller with a custom backend
    #[must_use]
    pub fn with_backend<B: CartBackend + 'static>(config: CartConfig, backend: B) -> Self {
        Self {
            config,
            backend: Box::new(backend),
            items: Vec::new(),
            operations: HashMap::new(),
            next_id: 0,
        }
    }

    /// Cart contents, in the order they were added
    #[must_use]
    pub fn items(&self) -> &[ProductDescriptor] {
        &self.items
    }

    /// Configuration in use
    #[must_use]
    pub const fn config(&self) -> &CartConfig {
        &self.config
    }

    /// Phase of an interaction; finished interactions are idle
    #[must_use]
    pub fn phase(&self, id: OperationId) -> CartPhase {
        self.operations.get(&id).map_or(CartPhase::Idle, |op| op.phase)
    }

    /// Phase of the interaction currently attached to `control`
    #[must_use]
    pub fn control_phase(&self, control: ElementId) -> CartPhase {
        self.operations
            .values()
            .find(|op| op.control == control)
            .map_or(CartPhase::Idle, |op| op.phase)
    }

    /// Descriptor of an interaction in progress
    #[must_use]
    pub fn descriptor(&self, id: OperationId) -> Option<&ProductDescriptor> {
        self.operations.get(&id).map(|op| &op.descriptor)
    }

    /// Start an interaction for `control`
    ///
    /// Returns `None` when the control is missing or already disabled; a
    /// disabled control is the only double-submit guard.
    pub fn add_to_cart<T: From<CartTask>>(
        &mut self,
        doc: &mut Document,
        control: ElementId,
        scheduler: &mut Scheduler<T>,
    ) -> Option<OperationId> {
        if doc.element(control).is_none() || doc.is_disabled(control) {
            return None;
        }

        let descriptor = ProductDescriptor::from_control(doc, control, &self.config);
        doc.set_disabled(control, true);
        doc.set_text_content(control, &self.config.working_label);

        let id = OperationId(self.next_id);
        self.next_id += 1;
        tracing::debug!(
            operation = id.0,
            bundle = %descriptor.id,
            title = %descriptor.title,
            "add to cart started"
        );
        self.operations.insert(
            id,
            Operation {
                control,
                descriptor,
                phase: CartPhase::Submitting,
            },
        );
        scheduler.schedule(self.config.latency_ms, CartTask::Complete(id).into());
        Some(id)
    }

    /// Run a scheduled cart task
    pub fn run_task<T: From<CartTask>>(
        &mut self,
        task: CartTask,
        doc: &mut Document,
        tracker: &mut EventTracker,
        scheduler: &mut Scheduler<T>,
    ) {
        match task {
            CartTask::Complete(id) => self.complete(id, doc, tracker, scheduler),
            CartTask::Reset(id) => self.reset(id, doc),
        }
    }

    fn complete<T: From<CartTask>>(
        &mut self,
        id: OperationId,
        doc: &mut Document,
        tracker: &mut EventTracker,
        scheduler: &mut Scheduler<T>,
    ) {
        let Some(op) = self.operations.get_mut(&id) else {
            return;
        };
        if op.phase != CartPhase::Submitting {
            return;
        }

        match self.backend.add_item(&op.descriptor) {
            Ok(()) => {
                self.items.push(op.descriptor.clone());
                op.phase = CartPhase::Succeeded;
                doc.set_text_content(op.control, &self.config.success_label);
                doc.set_style(op.control, "background-color", &self.config.success_background);
                tracker.track(
                    "Ecommerce",
                    "Add to Cart",
                    &op.descriptor.title,
                    op.descriptor.price_value(),
                );
            }
            Err(error) => {
                op.phase = CartPhase::Failed;
                doc.set_text_content(op.control, &self.config.error_label);
                doc.set_style(op.control, "background-color", &self.config.error_background);
                tracing::error!(operation = id.0, error = %error, "add to cart error");
            }
        }

        scheduler.schedule(self.config.reset_delay_ms, CartTask::Reset(id).into());
    }

    fn reset(&mut self, id: OperationId, doc: &mut Document) {
        let Some(op) = self.operations.remove(&id) else {
            return;
        };
        doc.set_disabled(op.control, false);
        doc.set_text_content(op.control, &op.descriptor.original_label);
        doc.set_style(op.control, "background-color", "");
        tracing::debug!(operation = id.0, outcome = ?op.phase, "add to cart control reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Element;
    use pretty_assertions::assert_eq;

    fn bundle_page(onclick: Option<&str>) -> (Document, ElementId) {
        let mut doc = Document::new();
        let body = doc.body();
        let card = doc.append(body, Element::new("div").with_class("bundle-card"));
        doc.append(
            card,
            Element::new("h3")
                .with_class("bundle-card__title")
                .with_text(" Double Pack "),
        );
        doc.append(
            card,
            Element::new("span")
                .with_class("bundle-card__price-current")
                .with_text("$49.99"),
        );
        let mut button = Element::new("button")
            .with_class("bundle-card__cta")
            .with_text("Add to Cart");
        if let Some(onclick) = onclick {
            button = button.with_attribute("onclick", onclick);
        }
        let button = doc.append(card, button);
        (doc, button)
    }

    #[test]
    fn test_quantity_for_bundle() {
        assert_eq!(quantity_for_bundle("bundle3"), 3);
        assert_eq!(quantity_for_bundle("bundle2"), 2);
        assert_eq!(quantity_for_bundle("single"), 1);
        assert_eq!(quantity_for_bundle("bundle4"), 1);
        assert_eq!(quantity_for_bundle(""), 1);
    }

    #[test]
    fn test_bundle_identifier_sources() {
        let (doc, button) = bundle_page(Some("addToCart('bundle3')"));
        assert_eq!(bundle_identifier(&doc, button), "bundle3");

        let (mut doc, button) = bundle_page(Some("addToCart('bundle3')"));
        doc.set_attribute(button, BUNDLE_ATTRIBUTE, "bundle2");
        assert_eq!(bundle_identifier(&doc, button), "bundle2");

        let (doc, button) = bundle_page(Some("trackClick()"));
        assert_eq!(bundle_identifier(&doc, button), DEFAULT_BUNDLE);

        let (doc, button) = bundle_page(None);
        assert_eq!(bundle_identifier(&doc, button), DEFAULT_BUNDLE);
    }

    #[test]
    fn test_descriptor_from_card() {
        let (doc, button) = bundle_page(Some("addToCart('bundle2')"));
        let descriptor = ProductDescriptor::from_control(&doc, button, &CartConfig::default());

        assert_eq!(
            descriptor,
            ProductDescriptor {
                id: "bundle2".to_string(),
                title: "Double Pack".to_string(),
                price: "$49.99".to_string(),
                quantity: 2,
                original_label: "Add to Cart".to_string(),
            }
        );
        assert_eq!(descriptor.price_value(), Some(49.99));
    }

    #[test]
    fn test_descriptor_fallbacks_outside_card() {
        let mut doc = Document::new();
        let body = doc.body();
        let button = doc.append(
            body,
            Element::new("button")
                .with_class("add-to-cart")
                .with_text("Buy"),
        );
        let descriptor = ProductDescriptor::from_control(&doc, button, &CartConfig::default());

        assert_eq!(descriptor.title, "Portable Arm Trainer");
        assert_eq!(descriptor.price, "$29.99");
        assert_eq!(descriptor.quantity, 1);
        assert_eq!(descriptor.id, DEFAULT_BUNDLE);
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("$29.99"), Some(29.99));
        assert_eq!(parse_price("$1,299.00"), Some(1299.0));
        assert_eq!(parse_price("€1.299,00"), Some(1299.0));
        assert_eq!(parse_price("12,50 €"), Some(12.5));
        assert_eq!(parse_price("Free"), None);
    }

    #[test]
    fn test_success_cycle() {
        let (mut doc, button) = bundle_page(Some("addToCart('bundle2')"));
        let mut cart = CartController::new(CartConfig::default());
        let mut tracker = EventTracker::new();
        let mut scheduler: Scheduler<CartTask> = Scheduler::new();

        let id = cart.add_to_cart(&mut doc, button, &mut scheduler).unwrap();
        assert_eq!(doc.text_content(button), "Adding...");
        assert!(doc.is_disabled(button));
        assert_eq!(cart.phase(id), CartPhase::Submitting);
        assert!(cart.add_to_cart(&mut doc, button, &mut scheduler).is_none());

        let task = scheduler.pop_due(1000).unwrap();
        cart.run_task(task, &mut doc, &mut tracker, &mut scheduler);
        assert_eq!(doc.text_content(button), "✓ Added to Cart!");
        assert_eq!(
            doc.style(button, "background-color"),
            Some("var(--color-success)")
        );
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 2);
        let conversions = tracker.logged("Ecommerce", "Add to Cart");
        let conversion = conversions[0];
        assert_eq!(conversion.label, "Double Pack");
        assert_eq!(conversion.value, Some(49.99));

        assert!(scheduler.pop_due(2999).is_none());
        let task = scheduler.pop_due(3000).unwrap();
        cart.run_task(task, &mut doc, &mut tracker, &mut scheduler);
        assert_eq!(doc.text_content(button), "Add to Cart");
        assert!(!doc.is_disabled(button));
        assert_eq!(cart.phase(id), CartPhase::Idle);
    }

    #[test]
    fn test_failure_cycle_still_resets() {
        let (mut doc, button) = bundle_page(None);
        let mut cart = CartController::with_backend(
            CartConfig::default(),
            RejectingCartApi {
                message: "service unavailable".to_string(),
            },
        );
        let mut tracker = EventTracker::new();
        let mut scheduler: Scheduler<CartTask> = Scheduler::new();

        let id = cart.add_to_cart(&mut doc, button, &mut scheduler).unwrap();
        while let Some(task) = scheduler.pop_due(1000) {
            cart.run_task(task, &mut doc, &mut tracker, &mut scheduler);
        }
        assert_eq!(cart.phase(id), CartPhase::Failed);
        assert_eq!(doc.text_content(button), "Error - Try Again");
        assert_eq!(
            doc.style(button, "background-color"),
            Some("var(--color-error)")
        );
        assert!(cart.items().is_empty());
        assert!(tracker.logged("Ecommerce", "Add to Cart").is_empty());

        while let Some(task) = scheduler.pop_due(3000) {
            cart.run_task(task, &mut doc, &mut tracker, &mut scheduler);
        }
        assert_eq!(doc.text_content(button), "Add to Cart");
        assert!(!doc.is_disabled(button));
        assert_eq!(doc.style(button, "background-color"), None);
    }

    #[test]
    fn test_items_append_in_order() {
        let (mut doc, first) = bundle_page(Some("addToCart('bundle3')"));
        let body = doc.body();
        let second = doc.append(
            body,
            Element::new("button").with_class("add-to-cart").with_text("Buy"),
        );
        let mut cart = CartController::new(CartConfig::default());
        let mut tracker = EventTracker::new();
        let mut scheduler: Scheduler<CartTask> = Scheduler::new();

        cart.add_to_cart(&mut doc, first, &mut scheduler);
        scheduler.settle(500);
        cart.add_to_cart(&mut doc, second, &mut scheduler);
        while let Some(task) = scheduler.pop_due(10_000) {
            cart.run_task(task, &mut doc, &mut tracker, &mut scheduler);
        }

        let ids: Vec<&str> = cart.items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["bundle3", "single"]);
    }
}
