//! Page entry point.
//!
//! [`Storefront`] owns the document model and every behavior. [`Storefront::init`]
//! binds behaviors to the elements present at that moment; afterwards the host
//! forwards page events through [`Storefront::dispatch`] and moves virtual time
//! with [`Storefront::advance_time`].

use crate::analytics::{EventTracker, HookRegistry};
use crate::cart::{CartBackend, CartController, CartTask, OperationId};
use crate::clock::{Debouncer, Scheduler, Throttler};
use crate::config::StorefrontConfig;
use crate::dom::{Document, Element, ElementId, ReadyState, RootMargin, Selector};
use crate::forms::{FormValidator, SubmitOutcome};
use crate::scroll_depth::{ScrollDepthTracker, ScrollMetrics};
use crate::service_worker::{register_quietly, ServiceWorkerRegistrar};
use crate::visibility::{Transition, VisibilityWatcher, WatchOptions};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Deferred work on the page clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageTask {
    /// Cart latency or reset timer
    Cart(CartTask),
    /// Resizing stopped; re-check visibility
    ResizeSettled,
}

impl From<CartTask> for PageTask {
    fn from(task: CartTask) -> Self {
        Self::Cart(task)
    }
}

/// Event forwarded by the host
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PageEvent {
    /// `DOMContentLoaded`
    DomContentLoaded,
    /// Window `load`
    Load,
    /// The page scrolled to `scroll_y`
    Scroll {
        /// New vertical offset
        scroll_y: f64,
    },
    /// The viewport changed size
    Resize {
        /// New width
        width: f64,
        /// New height
        height: f64,
    },
    /// Click on an element; bubbles to its ancestors
    Click(ElementId),
    /// Form submission
    Submit(ElementId),
    /// A media element started playing outside of autoplay
    MediaPlay(ElementId),
    /// A media element played to the end
    MediaEnded(ElementId),
}

/// What the page did with an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventOutcome {
    /// The browser's default action must be suppressed
    pub default_prevented: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClickAction {
    TrackStickyCta,
    TrackCta,
    TrackFaq,
    SmoothScroll,
    AddToCart,
}

/// A product page with all of its behaviors
pub struct Storefront {
    document: Document,
    config: StorefrontConfig,
    tracker: EventTracker,
    scheduler: Scheduler<PageTask>,
    cart: CartController,
    validator: FormValidator,
    scroll_depth: ScrollDepthTracker,
    scroll_throttle: Throttler,
    resize_debounce: Debouncer,
    watcher: VisibilityWatcher,
    click_actions: HashMap<ElementId, Vec<ClickAction>>,
    forms: HashSet<ElementId>,
    videos: Vec<ElementId>,
    service_worker: Option<Box<dyn ServiceWorkerRegistrar>>,
    initialized: bool,
    dom_ready: bool,
    service_worker_attempted: bool,
}

impl fmt::Debug for Storefront {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storefront")
            .field("initialized", &self.initialized)
            .field("dom_ready", &self.dom_ready)
            .field("now_ms", &self.scheduler.now_ms())
            .field("watcher", &self.watcher)
            .field("cart", &self.cart)
            .finish_non_exhaustive()
    }
}

impl Storefront {
    /// Create a page over `document`; analytics sinks read hooks from `hooks`
    #[must_use]
    pub fn new(document: Document, config: StorefrontConfig, hooks: &HookRegistry) -> Self {
        Self {
            tracker: EventTracker::from_config(&config.analytics, hooks),
            cart: CartController::new(config.cart.clone()),
            scroll_depth: ScrollDepthTracker::new(&config.scroll.milestones),
            scroll_throttle: Throttler::new(config.scroll.throttle_ms),
            resize_debounce: Debouncer::new(config.scroll.resize_debounce_ms),
            document,
            config,
            scheduler: Scheduler::new(),
            validator: FormValidator::new(),
            watcher: VisibilityWatcher::new(),
            click_actions: HashMap::new(),
            forms: HashSet::new(),
            videos: Vec::new(),
            service_worker: None,
            initialized: false,
            dom_ready: false,
            service_worker_attempted: false,
        }
    }

    /// Submit cart items to `backend` instead of the simulated API
    #[must_use]
    pub fn with_cart_backend<B: CartBackend + 'static>(mut self, backend: B) -> Self {
        self.cart = CartController::with_backend(self.config.cart.clone(), backend);
        self
    }

    /// Register a service worker through `registrar` on window load
    #[must_use]
    pub fn with_service_worker<R: ServiceWorkerRegistrar + 'static>(mut self, registrar: R) -> Self {
        self.service_worker = Some(Box::new(registrar));
        self
    }

    /// Bind every behavior to the current markup
    ///
    /// DOM-ready work (lazy images, forms, page view) runs now unless the
    /// document is still loading, in which case it waits for
    /// [`PageEvent::DomContentLoaded`]. Calling `init` twice does nothing.
    pub fn init(&mut self) {
        if self.initialized {
            return;
        }
        self.initialized = true;

        // Per-element click handlers run in this registration order.
        self.init_scroll_animations();
        self.init_sticky_cta();
        self.init_video_autoplay();
        self.init_click_tracking();
        self.init_smooth_scrolling();
        self.init_cart_controls();

        if self.document.ready_state() == ReadyState::Loading {
            tracing::debug!("document still loading, deferring DOM-ready setup");
        } else {
            self.on_dom_ready();
        }
        self.refresh_visibility();

        tracing::info!(
            observed = self.watcher.len(),
            click_targets = self.click_actions.len(),
            videos = self.videos.len(),
            sinks = ?self.tracker.sink_names(),
            "storefront initialized"
        );
    }

    /// Handle one host event
    pub fn dispatch(&mut self, event: PageEvent) -> EventOutcome {
        let mut outcome = EventOutcome::default();
        match event {
            PageEvent::DomContentLoaded => {
                if self.document.ready_state() == ReadyState::Loading {
                    self.document.set_ready_state(ReadyState::Interactive);
                }
                if self.initialized {
                    self.on_dom_ready();
                    self.refresh_visibility();
                }
            }
            PageEvent::Load => {
                self.document.set_ready_state(ReadyState::Complete);
                if self.initialized {
                    self.on_dom_ready();
                    self.refresh_visibility();
                }
                self.register_service_worker();
            }
            PageEvent::Scroll { scroll_y } => {
                self.document.set_scroll_y(scroll_y);
                self.handle_scroll();
            }
            PageEvent::Resize { width, height } => {
                self.document.set_viewport_size(width, height);
                if self.initialized {
                    self.resize_debounce
                        .call(&mut self.scheduler, PageTask::ResizeSettled);
                }
            }
            PageEvent::Click(target) => outcome.default_prevented = self.handle_click(target),
            PageEvent::Submit(form) => outcome.default_prevented = self.handle_submit(form),
            PageEvent::MediaPlay(video) => self.track_video(video, "Play"),
            PageEvent::MediaEnded(video) => self.track_video(video, "Complete"),
        }
        outcome
    }

    /// Move virtual time forward by `ms`, running every task that falls due
    ///
    /// Tasks scheduled while draining run in the same call if they fall due
    /// before the new time.
    pub fn advance_time(&mut self, ms: u64) {
        let deadline = self.scheduler.now_ms().saturating_add(ms);
        while let Some(task) = self.scheduler.pop_due(deadline) {
            self.run_task(task);
        }
        self.scheduler.settle(deadline);
    }

    /// Start an add-to-cart interaction for `control`
    pub fn add_to_cart(&mut self, control: ElementId) -> Option<OperationId> {
        self.cart
            .add_to_cart(&mut self.document, control, &mut self.scheduler)
    }

    /// Log an error and report it as `("Error", "JavaScript", "<context>: <error>")`
    pub fn report_error(&mut self, error: &dyn fmt::Display, context: &str) {
        let context = if context.is_empty() { "Unknown" } else { context };
        tracing::error!(context, error = %error, "storefront error");
        self.tracker
            .track("Error", "JavaScript", &format!("{context}: {error}"), None);
    }

    /// Append `<link rel="preload" as="image">` to `head` for each critical image
    pub fn preload_critical_resources(&mut self) {
        let head = self.document.head();
        for src in &self.config.lifecycle.critical_images {
            self.document.append(
                head,
                Element::new("link")
                    .with_attribute("rel", "preload")
                    .with_attribute("as", "image")
                    .with_attribute("href", src),
            );
        }
    }

    /// The page model
    #[must_use]
    pub const fn document(&self) -> &Document {
        &self.document
    }

    /// The page model, for host-side edits (layout, new values, autoplay policy)
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Configuration in use
    #[must_use]
    pub const fn config(&self) -> &StorefrontConfig {
        &self.config
    }

    /// Event tracker
    #[must_use]
    pub const fn tracker(&self) -> &EventTracker {
        &self.tracker
    }

    /// Cart controller
    #[must_use]
    pub const fn cart(&self) -> &CartController {
        &self.cart
    }

    /// Scroll-depth state
    #[must_use]
    pub const fn scroll_depth(&self) -> &ScrollDepthTracker {
        &self.scroll_depth
    }

    /// Current virtual time
    #[must_use]
    pub const fn now_ms(&self) -> u64 {
        self.scheduler.now_ms()
    }

    /// Number of scheduled tasks
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.scheduler.pending()
    }

    /// Whether DOM-ready setup has run
    #[must_use]
    pub const fn is_dom_ready(&self) -> bool {
        self.dom_ready
    }

    // ----- wiring -----

    fn select_for(&self, feature: &str, selector: &str) -> Vec<ElementId> {
        match self.document.select_all(selector) {
            Ok(found) => found,
            Err(error) => {
                tracing::warn!(feature, error = %error, "selector rejected, feature disabled");
                Vec::new()
            }
        }
    }

    fn on_click(&mut self, element: ElementId, action: ClickAction) {
        self.click_actions.entry(element).or_default().push(action);
    }

    fn init_scroll_animations(&mut self) {
        let reveal = self.config.reveal.clone();
        let root_margin = RootMargin::parse(&reveal.root_margin).unwrap_or_else(|error| {
            tracing::warn!(error = %error, "reveal root margin rejected, using none");
            RootMargin::ZERO
        });
        let options = WatchOptions::threshold(reveal.threshold).with_root_margin(root_margin);

        for element in self.select_for("reveal", &reveal.selector) {
            let class_name = reveal.class_name.clone();
            self.watcher
                .observe_once(&self.document, element, options, move |doc, el| {
                    doc.add_class(el, &class_name);
                });
        }
    }

    fn init_sticky_cta(&mut self) {
        let sticky = self.config.sticky_cta.clone();
        let bar = self.select_for("sticky CTA", &sticky.bar_selector).first().copied();
        let anchor = self
            .select_for("sticky CTA", &sticky.anchor_selector)
            .first()
            .copied();
        let (Some(bar), Some(anchor)) = (bar, anchor) else {
            tracing::debug!("sticky CTA markup missing, skipped");
            return;
        };

        self.watcher.observe_toggle(
            &self.document,
            anchor,
            WatchOptions::threshold(sticky.threshold),
            move |doc, _| doc.set_style(bar, "transform", "translateY(100%)"),
            move |doc, _| doc.set_style(bar, "transform", "translateY(0)"),
        );
        self.on_click(bar, ClickAction::TrackStickyCta);
    }

    fn init_video_autoplay(&mut self) {
        let video = self.config.video.clone();
        for element in self.select_for("video", &video.selector) {
            self.watcher.observe_toggle(
                &self.document,
                element,
                WatchOptions::threshold(video.threshold),
                |doc, el| {
                    if let Err(error) = doc.play(el) {
                        tracing::info!(video = %el, error = %error, "video autoplay prevented");
                    }
                },
                |doc, el| doc.pause(el),
            );
            self.videos.push(element);
        }
    }

    fn init_click_tracking(&mut self) {
        let tracking = self.config.tracking.clone();
        for button in self.select_for("CTA tracking", &tracking.cta_selector) {
            self.on_click(button, ClickAction::TrackCta);
        }
        for toggle in self.select_for("FAQ tracking", &tracking.faq_toggle_selector) {
            self.on_click(toggle, ClickAction::TrackFaq);
        }
    }

    fn init_smooth_scrolling(&mut self) {
        let selector = self.config.scroll.anchor_link_selector.clone();
        for link in self.select_for("smooth scrolling", &selector) {
            self.on_click(link, ClickAction::SmoothScroll);
        }
    }

    fn init_cart_controls(&mut self) {
        let selector = self.config.cart.control_selector.clone();
        for control in self.select_for("cart", &selector) {
            self.on_click(control, ClickAction::AddToCart);
        }
    }

    fn on_dom_ready(&mut self) {
        if self.dom_ready {
            return;
        }
        self.dom_ready = true;
        self.init_lazy_loading();
        self.init_form_validation();
        self.track_page_view();
    }

    fn init_lazy_loading(&mut self) {
        let lazy = self.config.lazy_images.clone();
        for image in self.select_for("lazy images", &lazy.selector) {
            let source_attribute = lazy.source_attribute.clone();
            let placeholder = lazy.placeholder_class.clone();
            self.watcher.observe_once(
                &self.document,
                image,
                WatchOptions::threshold(0.0),
                move |doc, img| {
                    if let Some(src) = doc.attribute(img, &source_attribute).map(str::to_string) {
                        doc.set_attribute(img, "src", &src);
                    }
                    doc.remove_class(img, &placeholder);
                },
            );
        }
    }

    fn init_form_validation(&mut self) {
        self.forms = self.select_for("forms", "form").into_iter().collect();
    }

    fn track_page_view(&mut self) {
        let path = self.document.location_path().to_string();
        self.tracker.track("Page", "View", &path, None);
    }

    fn register_service_worker(&mut self) {
        if self.service_worker_attempted || self.config.lifecycle.service_worker_path.is_empty() {
            return;
        }
        if let Some(registrar) = self.service_worker.as_deref_mut() {
            self.service_worker_attempted = true;
            register_quietly(registrar, &self.config.lifecycle.service_worker_path);
        }
    }

    // ----- event handling -----

    fn run_task(&mut self, task: PageTask) {
        match task {
            PageTask::Cart(task) => self.cart.run_task(
                task,
                &mut self.document,
                &mut self.tracker,
                &mut self.scheduler,
            ),
            PageTask::ResizeSettled => {
                self.resize_debounce.fired();
                self.refresh_visibility();
            }
        }
    }

    // Autoplay started by the watcher counts as a play event.
    fn refresh_visibility(&mut self) {
        for (element, transition) in self.watcher.check(&mut self.document) {
            if transition == Transition::Enter
                && self.videos.contains(&element)
                && self.document.is_playing(element)
            {
                self.track_video(element, "Play");
            }
        }
    }

    fn handle_scroll(&mut self) {
        if !self.initialized {
            return;
        }
        self.refresh_visibility();
        if self.scroll_throttle.try_pass(self.scheduler.now_ms()) {
            self.scroll_depth
                .on_scroll(ScrollMetrics::of(&self.document), &mut self.tracker);
        }
    }

    fn handle_click(&mut self, target: ElementId) -> bool {
        if !self.initialized || self.document.element(target).is_none() {
            return false;
        }
        if self.document.is_disabled(target) {
            tracing::trace!(target = %target, "click on disabled element ignored");
            return false;
        }

        let path: Vec<ElementId> = std::iter::once(target)
            .chain(self.document.ancestors(target))
            .collect();
        let mut prevented = false;
        for element in path {
            let Some(actions) = self.click_actions.get(&element).cloned() else {
                continue;
            };
            for action in actions {
                prevented |= self.run_click_action(action, element);
            }
        }
        prevented
    }

    fn run_click_action(&mut self, action: ClickAction, element: ElementId) -> bool {
        match action {
            ClickAction::TrackStickyCta => {
                self.tracker
                    .track("CTA", "Sticky Mobile Click", "Buy Now", None);
                false
            }
            ClickAction::TrackCta => {
                let text = self.document.text_content(element).trim().to_string();
                self.tracker.track("CTA", "Click", &text, None);
                false
            }
            ClickAction::TrackFaq => {
                let question = Selector::parse(&self.config.tracking.faq_question_selector)
                    .ok()
                    .and_then(|selector| self.document.query_within(element, &selector))
                    .unwrap_or(element);
                let text = self.document.text_content(question).trim().to_string();
                self.tracker.track("FAQ", "Toggle", &text, None);
                false
            }
            ClickAction::SmoothScroll => self.smooth_scroll(element),
            ClickAction::AddToCart => {
                self.add_to_cart(element);
                true
            }
        }
    }

    fn smooth_scroll(&mut self, link: ElementId) -> bool {
        let Some(href) = self.document.attribute(link, "href").map(str::to_string) else {
            return false;
        };
        if href == "#" {
            return false;
        }
        let Some(target) = Selector::parse(&href)
            .ok()
            .and_then(|selector| self.document.query(&selector))
        else {
            tracing::debug!(href = %href, "anchor target missing");
            return false;
        };

        let header_height = Selector::parse(&self.config.scroll.header_selector)
            .ok()
            .and_then(|selector| self.document.query(&selector))
            .and_then(|header| self.document.rect(header))
            .map_or(0.0, |rect| rect.height);
        let top = self.document.rect(target).map_or(0.0, |rect| rect.y);
        let offset = f64::from(self.config.scroll.anchor_offset);
        self.document.scroll_to(top - header_height - offset);

        self.tracker.track("Navigation", "Smooth Scroll", &href, None);
        self.handle_scroll();
        true
    }

    fn handle_submit(&mut self, form: ElementId) -> bool {
        if !self.forms.contains(&form) {
            return false;
        }
        let outcome = self
            .validator
            .handle_submit(&mut self.document, form, &mut self.tracker);
        outcome == SubmitOutcome::Prevented
    }

    fn track_video(&mut self, video: ElementId, action: &str) {
        if self.videos.contains(&video) {
            self.tracker
                .track("Video", action, &self.config.video.label, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Rect;
    use crate::result::{StorefrontError, StorefrontResult};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn labels(page: &Storefront, category: &str, action: &str) -> Vec<String> {
        page.tracker()
            .logged(category, action)
            .into_iter()
            .map(|e| e.label.clone())
            .collect()
    }

    fn tall_page() -> Document {
        let mut doc = Document::new().with_location("/products/arm-trainer");
        doc.set_viewport_size(400.0, 800.0);
        let body = doc.body();
        doc.append(
            body,
            Element::new("main").with_rect(Rect::new(0.0, 0.0, 400.0, 4800.0)),
        );
        doc
    }

    #[test]
    fn test_init_is_idempotent_and_tracks_page_view() {
        let mut page = Storefront::new(tall_page(), StorefrontConfig::default(), &HookRegistry::new());
        page.init();
        page.init();
        assert_eq!(labels(&page, "Page", "View"), vec!["/products/arm-trainer"]);
        assert!(page.is_dom_ready());
    }

    #[test]
    fn test_dom_ready_waits_for_content_loaded() {
        let mut doc = Document::loading();
        let body = doc.body();
        let image = doc.append(
            body,
            Element::new("img")
                .with_class("lazy")
                .with_attribute("loading", "lazy")
                .with_attribute("data-src", "/assets/review.jpg")
                .with_rect(Rect::new(0.0, 100.0, 200.0, 100.0)),
        );
        let mut page = Storefront::new(doc, StorefrontConfig::default(), &HookRegistry::new());

        page.init();
        assert!(!page.is_dom_ready());
        assert!(page.tracker().logged("Page", "View").is_empty());
        assert_eq!(page.document().attribute(image, "src"), None);

        page.dispatch(PageEvent::DomContentLoaded);
        assert!(page.is_dom_ready());
        assert_eq!(page.document().ready_state(), ReadyState::Interactive);
        assert_eq!(page.document().attribute(image, "src"), Some("/assets/review.jpg"));
        assert!(!page.document().has_class(image, "lazy"));
        assert_eq!(page.tracker().logged("Page", "View").len(), 1);
    }

    #[test]
    fn test_events_before_init_are_inert() {
        let mut doc = tall_page();
        let body = doc.body();
        let button = doc.append(
            body,
            Element::new("button")
                .with_class("add-to-cart")
                .with_text("Buy"),
        );
        let mut page = Storefront::new(doc, StorefrontConfig::default(), &HookRegistry::new());

        let outcome = page.dispatch(PageEvent::Click(button));
        page.dispatch(PageEvent::Scroll { scroll_y: 4000.0 });

        assert!(!outcome.default_prevented);
        assert!(page.tracker().debug_log().is_empty());
        assert_eq!(page.document().text_content(button), "Buy");
    }

    #[test]
    fn test_resize_rechecks_visibility_after_quiet_period() {
        let mut doc = tall_page();
        let body = doc.body();
        let card = doc.append(
            body,
            Element::new("div")
                .with_class("review-card")
                .with_rect(Rect::new(0.0, 900.0, 400.0, 200.0)),
        );
        let mut page = Storefront::new(doc, StorefrontConfig::default(), &HookRegistry::new());
        page.init();
        assert!(!page.document().has_class(card, "animate-on-scroll"));

        page.dispatch(PageEvent::Resize {
            width: 400.0,
            height: 1000.0,
        });
        page.advance_time(100);
        page.dispatch(PageEvent::Resize {
            width: 400.0,
            height: 1200.0,
        });
        page.advance_time(100);
        assert!(!page.document().has_class(card, "animate-on-scroll"));
        assert_eq!(page.pending_tasks(), 1);

        page.advance_time(50);
        assert!(page.document().has_class(card, "animate-on-scroll"));
        assert_eq!(page.pending_tasks(), 0);
    }

    #[test]
    fn test_unscrollable_page_fires_no_milestone() {
        let config = StorefrontConfig::from_json(r#"{"scroll":{"milestones":[0,25]}}"#).unwrap();
        let mut doc = Document::new();
        doc.set_viewport_size(400.0, 800.0);
        let mut page = Storefront::new(doc, config, &HookRegistry::new());
        page.init();

        page.dispatch(PageEvent::Scroll { scroll_y: 0.0 });
        page.dispatch(PageEvent::Scroll { scroll_y: 0.0 });

        assert!(page.tracker().logged("Scroll", "Depth").is_empty());
        assert_eq!(page.scroll_depth().max_scroll_seen(), 0);
    }

    #[test]
    fn test_report_error() {
        let mut page = Storefront::new(tall_page(), StorefrontConfig::default(), &HookRegistry::new());
        let error = StorefrontError::cart_request("timeout");

        page.report_error(&error, "cart");
        page.report_error(&"boom", "");

        assert_eq!(
            labels(&page, "Error", "JavaScript"),
            vec!["cart: Cart request failed: timeout", "Unknown: boom"]
        );
    }

    #[test]
    fn test_preload_critical_resources() {
        let mut page = Storefront::new(tall_page(), StorefrontConfig::default(), &HookRegistry::new());
        page.preload_critical_resources();

        let links = page.document().select_all("head > link[rel=preload]").unwrap();
        let hrefs: Vec<&str> = links
            .iter()
            .filter_map(|link| page.document().attribute(*link, "href"))
            .collect();
        assert_eq!(
            hrefs,
            vec![
                "/assets/hero-product-image.jpg",
                "/assets/product-demo-thumbnail.jpg"
            ]
        );
        assert_eq!(page.document().attribute(links[0], "as"), Some("image"));
    }

    struct CountingRegistrar {
        calls: Rc<RefCell<Vec<String>>>,
        fail: bool,
    }

    impl ServiceWorkerRegistrar for CountingRegistrar {
        fn register(&mut self, script_path: &str) -> StorefrontResult<String> {
            self.calls.borrow_mut().push(script_path.to_string());
            if self.fail {
                return Err(StorefrontError::ServiceWorker {
                    message: "unsupported".to_string(),
                });
            }
            Ok("/".to_string())
        }
    }

    #[test]
    fn test_service_worker_registers_once_on_load() {
        for fail in [false, true] {
            let calls = Rc::new(RefCell::new(Vec::new()));
            let mut page =
                Storefront::new(tall_page(), StorefrontConfig::default(), &HookRegistry::new())
                    .with_service_worker(CountingRegistrar {
                        calls: Rc::clone(&calls),
                        fail,
                    });
            page.init();
            assert!(calls.borrow().is_empty());

            page.dispatch(PageEvent::Load);
            page.dispatch(PageEvent::Load);
            assert_eq!(*calls.borrow(), vec!["/sw.js"]);
        }
    }

    #[test]
    fn test_invalid_selector_disables_feature_only() {
        let mut config = StorefrontConfig::default();
        config.tracking.cta_selector = "button[".to_string();
        let mut doc = tall_page();
        let body = doc.body();
        let button = doc.append(
            body,
            Element::new("button")
                .with_class("button--primary")
                .with_text("Shop"),
        );
        let mut page = Storefront::new(doc, config, &HookRegistry::new());
        page.init();

        page.dispatch(PageEvent::Click(button));
        assert!(page.tracker().logged("CTA", "Click").is_empty());
        assert_eq!(page.tracker().logged("Page", "View").len(), 1);
    }
}
