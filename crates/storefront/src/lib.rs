//! Storefront: client-side behaviors for a single-product landing page
//!
//! Scroll-triggered reveals, a sticky mobile call-to-action, lazy images,
//! video autoplay, form validation, analytics fan-out, smooth in-page
//! navigation and a simulated add-to-cart flow, all running against an
//! in-memory page model so they can be driven without a browser.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  host (wasm glue / test / headless driver)                   │
//! │     │ PageEvent, advance_time                                 │
//! │     ▼                                                         │
//! │  ┌────────────┐   ┌──────────────────┐   ┌────────────────┐  │
//! │  │ Storefront │──►│ VisibilityWatcher│──►│ Document (DOM) │  │
//! │  │            │──►│ CartController   │──►│                │  │
//! │  │            │──►│ FormValidator    │──►│                │  │
//! │  │            │──►│ ScrollDepth      │   └────────────────┘  │
//! │  └────────────┘   └────────┬─────────┘                       │
//! │        │ Scheduler         ▼                                  │
//! │        │            ┌──────────────┐   gtag / fbq hooks      │
//! │        └───────────►│ EventTracker │──► debug log            │
//! │                     └──────────────┘                          │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use storefront::{Document, Element, HookRegistry, PageEvent, Storefront, StorefrontConfig};
//!
//! let mut doc = Document::new();
//! let body = doc.body();
//! let buy = doc.append(body, Element::new("button").with_class("add-to-cart").with_text("Buy"));
//!
//! let mut page = Storefront::new(doc, StorefrontConfig::default(), &HookRegistry::new());
//! page.init();
//! page.dispatch(PageEvent::Click(buy));
//! assert_eq!(page.document().text_content(buy), "Adding...");
//!
//! page.advance_time(3_000);
//! assert_eq!(page.document().text_content(buy), "Buy");
//! assert_eq!(page.cart().items().len(), 1);
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod analytics;
pub mod cart;
pub mod clock;
pub mod config;
pub mod dom;
pub mod forms;
mod result;
pub mod scroll_depth;
pub mod service_worker;
mod storefront;
/// Native logging setup
#[cfg(not(target_arch = "wasm32"))]
pub mod telemetry;
pub mod visibility;

pub use analytics::{
    AnalyticsSink, Delivery, DebugLog, EventTracker, FacebookPixelSink, GoogleAnalyticsSink,
    HookCall, HookRegistry, TrackedEvent, FBQ_HOOK, GTAG_HOOK,
};
pub use cart::{
    CartBackend, CartController, CartPhase, CartTask, OperationId, ProductDescriptor,
    RejectingCartApi, SimulatedCartApi,
};
pub use clock::{Debouncer, Scheduler, Throttler, TimerId};
pub use config::{
    AnalyticsConfig, CartConfig, LazyImageConfig, LifecycleConfig, RevealConfig, ScrollConfig,
    StickyCtaConfig, StorefrontConfig, TrackingConfig, VideoConfig,
};
pub use dom::{
    Document, Element, ElementId, Intersection, MediaState, ReadyState, Rect, RootMargin,
    Selector, Viewport,
};
pub use forms::{is_valid_email, FieldIssue, FormValidator, SubmitOutcome, ValidationReport};
pub use result::{StorefrontError, StorefrontResult};
pub use scroll_depth::{ScrollDepthTracker, ScrollMetrics, DEFAULT_MILESTONES};
pub use service_worker::ServiceWorkerRegistrar;
pub use storefront::{EventOutcome, PageEvent, PageTask, Storefront};
#[cfg(not(target_arch = "wasm32"))]
pub use telemetry::{init_logging, LogFormat};
pub use visibility::{Transition, VisibilityWatcher, WatchOptions};
