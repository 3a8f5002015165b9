//! Page behavior configuration.
//!
//! Every section has defaults matching the product page markup, so an empty
//! YAML or JSON document yields a working configuration.

use crate::result::{StorefrontError, StorefrontResult};
use serde::{Deserialize, Serialize};

/// Analytics sink selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Forward events to the `gtag` hook
    pub google_analytics: bool,
    /// Forward events to the `fbq` hook
    pub facebook_pixel: bool,
    /// Events retained by the debug log
    pub debug_log_capacity: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            google_analytics: true,
            facebook_pixel: true,
            debug_log_capacity: 1000,
        }
    }
}

/// Scroll-reveal animations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    /// Elements to reveal
    pub selector: String,
    /// Visible fraction that triggers the reveal
    pub threshold: f64,
    /// Root margin in CSS shorthand
    pub root_margin: String,
    /// Class added on reveal
    pub class_name: String,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            selector: ".benefit-card, .review-card, .bundle-card, .faq-item".to_string(),
            threshold: 0.1,
            root_margin: "0px 0px -50px 0px".to_string(),
            class_name: "animate-on-scroll".to_string(),
        }
    }
}

/// Sticky mobile call-to-action bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StickyCtaConfig {
    /// The sticky bar
    pub bar_selector: String,
    /// Section that hides the bar while visible
    pub anchor_selector: String,
    /// Visible fraction of the anchor that hides the bar
    pub threshold: f64,
}

impl Default for StickyCtaConfig {
    fn default() -> Self {
        Self {
            bar_selector: ".sticky-mobile-cta".to_string(),
            anchor_selector: "#buy-now".to_string(),
            threshold: 0.1,
        }
    }
}

/// Video autoplay and engagement tracking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Autoplaying videos
    pub selector: String,
    /// Visible fraction that starts playback
    pub threshold: f64,
    /// Analytics label for video events
    pub label: String,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            selector: "video[autoplay]".to_string(),
            threshold: 0.5,
            label: "Product Demo".to_string(),
        }
    }
}

/// Lazy image loading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LazyImageConfig {
    /// Images to load on first visibility
    pub selector: String,
    /// Attribute holding the deferred source
    pub source_attribute: String,
    /// Placeholder class removed on load
    pub placeholder_class: String,
}

impl Default for LazyImageConfig {
    fn default() -> Self {
        Self {
            selector: "img[loading=\"lazy\"]".to_string(),
            source_attribute: "data-src".to_string(),
            placeholder_class: "lazy".to_string(),
        }
    }
}

/// Scrolling, navigation and viewport handling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    /// Scroll-depth milestones in percent
    pub milestones: Vec<u8>,
    /// Minimum interval between scroll-depth checks (0 = every event)
    pub throttle_ms: u64,
    /// Quiet period after the last resize before visibility is re-checked
    pub resize_debounce_ms: u64,
    /// In-page anchor links
    pub anchor_link_selector: String,
    /// Fixed header whose height offsets anchor targets
    pub header_selector: String,
    /// Extra gap above anchor targets, in px
    pub anchor_offset: u32,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            milestones: vec![25, 50, 75, 100],
            throttle_ms: 0,
            resize_debounce_ms: 150,
            anchor_link_selector: "a[href^=\"#\"]".to_string(),
            header_selector: ".header".to_string(),
            anchor_offset: 20,
        }
    }
}

/// Add-to-cart controls and the simulated cart request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartConfig {
    /// Add-to-cart controls
    pub control_selector: String,
    /// Product card surrounding a control
    pub card_selector: String,
    /// Product title inside the card
    pub title_selector: String,
    /// Displayed price inside the card
    pub price_selector: String,
    /// Title used when the card has none
    pub fallback_title: String,
    /// Price used when the card has none
    pub fallback_price: String,
    /// Simulated request latency
    pub latency_ms: u64,
    /// Delay before a control returns to idle
    pub reset_delay_ms: u64,
    /// Label while the request is in flight
    pub working_label: String,
    /// Label after success
    pub success_label: String,
    /// Label after failure
    pub error_label: String,
    /// Background applied on success
    pub success_background: String,
    /// Background applied on failure
    pub error_background: String,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            control_selector: ".add-to-cart, .bundle-card__cta".to_string(),
            card_selector: ".bundle-card".to_string(),
            title_selector: ".bundle-card__title".to_string(),
            price_selector: ".bundle-card__price-current".to_string(),
            fallback_title: "Portable Arm Trainer".to_string(),
            fallback_price: "$29.99".to_string(),
            latency_ms: 1000,
            reset_delay_ms: 2000,
            working_label: "Adding...".to_string(),
            success_label: "\u{2713} Added to Cart!".to_string(),
            error_label: "Error - Try Again".to_string(),
            success_background: "var(--color-success)".to_string(),
            error_background: "var(--color-error)".to_string(),
        }
    }
}

/// Click tracking for calls to action and FAQ toggles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Calls to action tracked by their text
    pub cta_selector: String,
    /// FAQ toggles
    pub faq_toggle_selector: String,
    /// Question text inside a toggle
    pub faq_question_selector: String,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            cta_selector: ".button--primary, .bundle-card__cta".to_string(),
            faq_toggle_selector: "[data-faq-toggle]".to_string(),
            faq_question_selector: ".faq-item__question-text".to_string(),
        }
    }
}

/// Page lifecycle extras
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Service worker script registered on load (empty = never)
    pub service_worker_path: String,
    /// Images preloaded at init
    pub critical_images: Vec<String>,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            service_worker_path: "/sw.js".to_string(),
            critical_images: vec![
                "/assets/hero-product-image.jpg".to_string(),
                "/assets/product-demo-thumbnail.jpg".to_string(),
            ],
        }
    }
}

/// Complete storefront configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorefrontConfig {
    /// Analytics sinks
    pub analytics: AnalyticsConfig,
    /// Scroll reveals
    pub reveal: RevealConfig,
    /// Sticky CTA
    pub sticky_cta: StickyCtaConfig,
    /// Video autoplay
    pub video: VideoConfig,
    /// Lazy images
    pub lazy_images: LazyImageConfig,
    /// Scroll handling
    pub scroll: ScrollConfig,
    /// Cart
    pub cart: CartConfig,
    /// Click tracking
    pub tracking: TrackingConfig,
    /// Lifecycle extras
    pub lifecycle: LifecycleConfig,
}

impl StorefrontConfig {
    /// Create default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate YAML configuration
    pub fn from_yaml(source: &str) -> StorefrontResult<Self> {
        let config: Self = serde_yaml_ng::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate JSON configuration
    pub fn from_json(source: &str) -> StorefrontResult<Self> {
        let config: Self = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> StorefrontResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Set analytics sinks
    #[must_use]
    pub fn with_analytics(mut self, analytics: AnalyticsConfig) -> Self {
        self.analytics = analytics;
        self
    }

    /// Set cart behavior
    #[must_use]
    pub fn with_cart(mut self, cart: CartConfig) -> Self {
        self.cart = cart;
        self
    }

    /// Set scroll handling
    #[must_use]
    pub fn with_scroll(mut self, scroll: ScrollConfig) -> Self {
        self.scroll = scroll;
        self
    }

    /// Set lifecycle extras
    #[must_use]
    pub fn with_lifecycle(mut self, lifecycle: LifecycleConfig) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    /// Check value ranges
    pub fn validate(&self) -> StorefrontResult<()> {
        let thresholds = [
            ("reveal.threshold", self.reveal.threshold),
            ("sticky_cta.threshold", self.sticky_cta.threshold),
            ("video.threshold", self.video.threshold),
        ];
        for (name, value) in thresholds {
            if !(0.0..=1.0).contains(&value) {
                return Err(StorefrontError::config(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }

        if let Some(bad) = self.scroll.milestones.iter().find(|m| **m > 100) {
            return Err(StorefrontError::config(format!(
                "scroll milestone {bad}% exceeds 100%"
            )));
        }

        crate::dom::RootMargin::parse(&self.reveal.root_margin)?;
        Ok(())
    }
}
