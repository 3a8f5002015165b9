//! In-memory page model.
//!
//! The behaviors in this crate never talk to a browser directly. A host (the
//! wasm glue, a test, a headless driver) mirrors the page into a [`Document`]
//! and feeds events into [`crate::Storefront`]; behaviors mutate the model and
//! the host applies the mutations back.
//!
//! Lookups of missing elements are silent: getters return `None` or defaults
//! and setters are no-ops, so a page without some piece of markup simply
//! loses the feature that needed it.

pub mod geometry;
pub mod selector;

pub use geometry::{Intersection, Rect, RootMargin, Viewport};
pub use selector::Selector;

use crate::result::{StorefrontError, StorefrontResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Handle to an element in a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(usize);

impl ElementId {
    /// Arena index of this element
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Document loading state (`document.readyState`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReadyState {
    /// Still parsing; DOM-ready work must wait for `DOMContentLoaded`
    Loading,
    /// Parsed, subresources pending
    Interactive,
    /// Fully loaded
    #[default]
    Complete,
}

/// Playback state of a media element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MediaState {
    /// Not a media element, or never started
    #[default]
    Paused,
    /// Currently playing
    Playing,
}

/// A single element node
#[derive(Debug, Clone, Default)]
pub struct Element {
    tag: String,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    styles: BTreeMap<String, String>,
    text: String,
    value: String,
    disabled: bool,
    media: MediaState,
    rect: Rect,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
}

impl Element {
    /// Create a detached element
    #[must_use]
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Self::default()
        }
    }

    /// Add a class
    #[must_use]
    pub fn with_class(mut self, class: &str) -> Self {
        self.add_class(class);
        self
    }

    /// Set an attribute
    ///
    /// `class` is split into the class list and `disabled`/`value` seed the
    /// corresponding properties, the way the HTML parser does.
    #[must_use]
    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Set own text
    #[must_use]
    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    /// Set form value
    #[must_use]
    pub fn with_value(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self
    }

    /// Set layout rect
    #[must_use]
    pub const fn with_rect(mut self, rect: Rect) -> Self {
        self.rect = rect;
        self
    }

    /// Lowercase tag name
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Class list
    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Whether the class list contains `class`
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Attribute value
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        if name == "class" {
            return None;
        }
        self.attributes.get(name).map(String::as_str)
    }

    /// Inline style value
    #[must_use]
    pub fn style(&self, property: &str) -> Option<&str> {
        self.styles.get(property).map(String::as_str)
    }

    /// Current form value
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Whether the control is disabled
    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Layout rect
    #[must_use]
    pub const fn rect(&self) -> Rect {
        self.rect
    }

    /// Media playback state
    #[must_use]
    pub const fn media_state(&self) -> MediaState {
        self.media
    }

    /// Child elements in order
    #[must_use]
    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    fn add_class(&mut self, class: &str) {
        if !class.is_empty() && !self.has_class(class) {
            self.classes.push(class.to_string());
        }
    }

    fn set_attribute(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match name.as_str() {
            "class" => {
                self.classes.clear();
                for class in value.split_whitespace() {
                    self.add_class(class);
                }
            }
            "disabled" => self.disabled = true,
            "value" => self.value = value.to_string(),
            _ => {}
        }
        self.attributes.insert(name, value.to_string());
    }
}

/// Arena-backed document tree plus window state
#[derive(Debug, Clone)]
pub struct Document {
    elements: Vec<Element>,
    root: ElementId,
    head: ElementId,
    body: ElementId,
    ready_state: ReadyState,
    viewport: Viewport,
    location_path: String,
    autoplay_allowed: bool,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a parsed document with empty `head` and `body`
    #[must_use]
    pub fn new() -> Self {
        let mut doc = Self {
            elements: vec![Element::new("html")],
            root: ElementId(0),
            head: ElementId(0),
            body: ElementId(0),
            ready_state: ReadyState::Complete,
            viewport: Viewport::default(),
            location_path: "/".to_string(),
            autoplay_allowed: true,
        };
        doc.head = doc.append(doc.root, Element::new("head"));
        doc.body = doc.append(doc.root, Element::new("body"));
        doc
    }

    /// Create a document that is still loading
    #[must_use]
    pub fn loading() -> Self {
        let mut doc = Self::new();
        doc.ready_state = ReadyState::Loading;
        doc
    }

    /// Set the location path
    #[must_use]
    pub fn with_location(mut self, path: &str) -> Self {
        self.location_path = path.to_string();
        self
    }

    /// Root `html` element
    #[must_use]
    pub const fn root(&self) -> ElementId {
        self.root
    }

    /// `head` element
    #[must_use]
    pub const fn head(&self) -> ElementId {
        self.head
    }

    /// `body` element
    #[must_use]
    pub const fn body(&self) -> ElementId {
        self.body
    }

    /// Loading state
    #[must_use]
    pub const fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    /// Update the loading state
    pub fn set_ready_state(&mut self, state: ReadyState) {
        self.ready_state = state;
    }

    /// Current location path
    #[must_use]
    pub fn location_path(&self) -> &str {
        &self.location_path
    }

    // ----- tree -----

    /// Create a detached element and return its handle
    pub fn create(&mut self, element: Element) -> ElementId {
        let id = ElementId(self.elements.len());
        let mut element = element;
        element.parent = None;
        element.children.clear();
        self.elements.push(element);
        id
    }

    /// Create `element` and append it under `parent`
    pub fn append(&mut self, parent: ElementId, element: Element) -> ElementId {
        let id = self.create(element);
        self.append_child(parent, id);
        id
    }

    /// Move `child` to the end of `parent`'s children
    ///
    /// Refuses to create cycles; unknown handles are ignored.
    pub fn append_child(&mut self, parent: ElementId, child: ElementId) {
        if self.element(parent).is_none() || self.element(child).is_none() {
            return;
        }
        if parent == child || self.ancestors(parent).any(|a| a == child) {
            return;
        }
        self.detach(child);
        self.elements[child.0].parent = Some(parent);
        self.elements[parent.0].children.push(child);
    }

    /// Detach an element (and its subtree) from the tree
    pub fn remove(&mut self, id: ElementId) {
        self.detach(id);
    }

    fn detach(&mut self, id: ElementId) {
        let Some(parent) = self.element(id).and_then(|e| e.parent) else {
            return;
        };
        self.elements[parent.0].children.retain(|c| *c != id);
        self.elements[id.0].parent = None;
    }

    /// Element by handle
    #[must_use]
    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id.0)
    }

    fn element_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(id.0)
    }

    /// Parent element
    #[must_use]
    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.element(id).and_then(|e| e.parent)
    }

    /// Ancestors from the parent up to the root
    pub fn ancestors(&self, id: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        std::iter::successors(self.parent(id), move |current| self.parent(*current))
    }

    /// Whether the element is attached under the root
    #[must_use]
    pub fn is_connected(&self, id: ElementId) -> bool {
        id == self.root || self.ancestors(id).any(|a| a == self.root)
    }

    /// Connected descendants of `scope` in document order (excluding `scope`)
    #[must_use]
    pub fn descendants(&self, scope: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack: Vec<ElementId> = self
            .element(scope)
            .map(|e| e.children.iter().rev().copied().collect())
            .unwrap_or_default();
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(element) = self.element(id) {
                stack.extend(element.children.iter().rev().copied());
            }
        }
        out
    }

    // ----- selectors -----

    /// All matches under the root, in document order
    #[must_use]
    pub fn query_all(&self, selector: &Selector) -> Vec<ElementId> {
        self.query_all_within(self.root, selector)
    }

    /// All matches under `scope`
    #[must_use]
    pub fn query_all_within(&self, scope: ElementId, selector: &Selector) -> Vec<ElementId> {
        self.descendants(scope)
            .into_iter()
            .filter(|id| selector.matches(self, *id))
            .collect()
    }

    /// First match under the root
    #[must_use]
    pub fn query(&self, selector: &Selector) -> Option<ElementId> {
        self.query_within(self.root, selector)
    }

    /// First match under `scope`
    #[must_use]
    pub fn query_within(&self, scope: ElementId, selector: &Selector) -> Option<ElementId> {
        self.descendants(scope)
            .into_iter()
            .find(|id| selector.matches(self, *id))
    }

    /// Parse `selector` and return all matches under the root
    pub fn select_all(&self, selector: &str) -> StorefrontResult<Vec<ElementId>> {
        Ok(self.query_all(&Selector::parse(selector)?))
    }

    /// Parse `selector` and return the first match under the root
    pub fn select(&self, selector: &str) -> StorefrontResult<Option<ElementId>> {
        Ok(self.query(&Selector::parse(selector)?))
    }

    /// Nearest inclusive ancestor matching `selector`
    #[must_use]
    pub fn closest(&self, id: ElementId, selector: &Selector) -> Option<ElementId> {
        if self.element(id).is_none() {
            return None;
        }
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|candidate| selector.matches(self, *candidate))
    }

    /// Whether `id` matches `selector`
    #[must_use]
    pub fn matches(&self, id: ElementId, selector: &Selector) -> bool {
        selector.matches(self, id)
    }

    // ----- attributes, classes, styles -----

    /// Attribute value
    #[must_use]
    pub fn attribute(&self, id: ElementId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.attribute(name))
    }

    /// Whether the attribute is present
    #[must_use]
    pub fn has_attribute(&self, id: ElementId, name: &str) -> bool {
        if name == "class" {
            return self.element(id).is_some_and(|e| !e.classes.is_empty());
        }
        self.attribute(id, name).is_some()
    }

    /// Set an attribute
    pub fn set_attribute(&mut self, id: ElementId, name: &str, value: &str) {
        if let Some(element) = self.element_mut(id) {
            element.set_attribute(name, value);
        }
    }

    /// Add a class
    pub fn add_class(&mut self, id: ElementId, class: &str) {
        if let Some(element) = self.element_mut(id) {
            element.add_class(class);
        }
    }

    /// Remove a class
    pub fn remove_class(&mut self, id: ElementId, class: &str) {
        if let Some(element) = self.element_mut(id) {
            element.classes.retain(|c| c != class);
        }
    }

    /// Whether the element has `class`
    #[must_use]
    pub fn has_class(&self, id: ElementId, class: &str) -> bool {
        self.element(id).is_some_and(|e| e.has_class(class))
    }

    /// Inline style value
    #[must_use]
    pub fn style(&self, id: ElementId, property: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.style(property))
    }

    /// Set an inline style; an empty value removes the property
    pub fn set_style(&mut self, id: ElementId, property: &str, value: &str) {
        if let Some(element) = self.element_mut(id) {
            if value.is_empty() {
                element.styles.remove(property);
            } else {
                element.styles.insert(property.to_string(), value.to_string());
            }
        }
    }

    // ----- text and form state -----

    /// Concatenated text of the element and its descendants (`textContent`)
    #[must_use]
    pub fn text_content(&self, id: ElementId) -> String {
        let Some(element) = self.element(id) else {
            return String::new();
        };
        let mut text = element.text.clone();
        for child in self.descendants(id) {
            if let Some(child) = self.element(child) {
                text.push_str(&child.text);
            }
        }
        text
    }

    /// Replace the element's content with `text`
    pub fn set_text_content(&mut self, id: ElementId, text: &str) {
        let children = match self.element(id) {
            Some(element) => element.children.clone(),
            None => return,
        };
        for child in children {
            self.detach(child);
        }
        if let Some(element) = self.element_mut(id) {
            element.text = text.to_string();
        }
    }

    /// Form value
    #[must_use]
    pub fn value(&self, id: ElementId) -> &str {
        self.element(id).map_or("", Element::value)
    }

    /// Set form value (user input)
    pub fn set_value(&mut self, id: ElementId, value: &str) {
        if let Some(element) = self.element_mut(id) {
            element.value = value.to_string();
        }
    }

    /// Whether the control is disabled
    #[must_use]
    pub fn is_disabled(&self, id: ElementId) -> bool {
        self.element(id).is_some_and(Element::is_disabled)
    }

    /// Enable or disable a control
    pub fn set_disabled(&mut self, id: ElementId, disabled: bool) {
        if let Some(element) = self.element_mut(id) {
            element.disabled = disabled;
            if disabled {
                element.attributes.insert("disabled".to_string(), String::new());
            } else {
                element.attributes.remove("disabled");
            }
        }
    }

    // ----- layout and window -----

    /// Layout rect
    #[must_use]
    pub fn rect(&self, id: ElementId) -> Option<Rect> {
        self.element(id).map(Element::rect)
    }

    /// Update layout rect
    pub fn set_rect(&mut self, id: ElementId, rect: Rect) {
        if let Some(element) = self.element_mut(id) {
            element.rect = rect;
        }
    }

    /// Current viewport
    #[must_use]
    pub const fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Resize the viewport (scroll offset is re-clamped)
    pub fn set_viewport_size(&mut self, width: f64, height: f64) {
        self.viewport.width = width;
        self.viewport.height = height;
        self.scroll_to(self.viewport.scroll_y);
    }

    /// Full scrollable height (`document.body.scrollHeight`)
    #[must_use]
    pub fn document_height(&self) -> f64 {
        let mut height = self.rect(self.body).map_or(0.0, |r| r.bottom());
        for id in self.descendants(self.root) {
            if let Some(rect) = self.rect(id) {
                height = height.max(rect.bottom());
            }
        }
        height.max(self.viewport.height)
    }

    /// Largest reachable scroll offset
    #[must_use]
    pub fn max_scroll(&self) -> f64 {
        (self.document_height() - self.viewport.height).max(0.0)
    }

    /// Scroll to `y`, clamped to the scrollable range (`window.scrollTo`)
    pub fn scroll_to(&mut self, y: f64) {
        self.viewport.scroll_y = y.clamp(0.0, self.max_scroll());
    }

    /// Record a scroll offset reported by the host without clamping
    ///
    /// Hosts report what the platform reports, which includes overscroll.
    pub fn set_scroll_y(&mut self, y: f64) {
        self.viewport.scroll_y = y;
    }

    // ----- media -----

    /// Allow or refuse media autoplay
    pub fn set_autoplay_allowed(&mut self, allowed: bool) {
        self.autoplay_allowed = allowed;
    }

    /// Start playback (`HTMLMediaElement.play`)
    pub fn play(&mut self, id: ElementId) -> StorefrontResult<()> {
        if !self.autoplay_allowed {
            return Err(StorefrontError::PlaybackPrevented {
                message: format!("autoplay is not allowed for {id}"),
            });
        }
        if let Some(element) = self.element_mut(id) {
            element.media = MediaState::Playing;
        }
        Ok(())
    }

    /// Pause playback
    pub fn pause(&mut self, id: ElementId) {
        if let Some(element) = self.element_mut(id) {
            element.media = MediaState::Paused;
        }
    }

    /// Whether the media element is playing
    #[must_use]
    pub fn is_playing(&self, id: ElementId) -> bool {
        self.element(id)
            .is_some_and(|e| e.media == MediaState::Playing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document_structure() {
        let doc = Document::new();
        assert_eq!(doc.element(doc.root()).unwrap().tag(), "html");
        assert_eq!(doc.parent(doc.body()), Some(doc.root()));
        assert_eq!(doc.parent(doc.head()), Some(doc.root()));
        assert_eq!(doc.ready_state(), ReadyState::Complete);
        assert_eq!(Document::loading().ready_state(), ReadyState::Loading);
    }

    #[test]
    fn test_class_attribute_parsing() {
        let mut doc = Document::new();
        let body = doc.body();
        let el = doc.append(
            body,
            Element::new("BUTTON").with_attribute("class", "button button--primary"),
        );

        assert_eq!(doc.element(el).unwrap().tag(), "button");
        assert!(doc.has_class(el, "button--primary"));
        doc.remove_class(el, "button");
        assert!(!doc.has_class(el, "button"));
        assert!(doc.has_attribute(el, "class"));
    }

    #[test]
    fn test_text_content_and_replace() {
        let mut doc = Document::new();
        let body = doc.body();
        let button = doc.append(body, Element::new("button").with_text("Buy "));
        doc.append(button, Element::new("span").with_text("Now"));

        assert_eq!(doc.text_content(button), "Buy Now");

        doc.set_text_content(button, "Adding...");
        assert_eq!(doc.text_content(button), "Adding...");
        assert!(doc.element(button).unwrap().children().is_empty());
    }

    #[test]
    fn test_remove_and_connectivity() {
        let mut doc = Document::new();
        let body = doc.body();
        let outer = doc.append(body, Element::new("div"));
        let inner = doc.append(outer, Element::new("div"));

        assert!(doc.is_connected(inner));
        doc.remove(outer);
        assert!(!doc.is_connected(inner));
        assert!(doc.select_all("div").unwrap().is_empty());
    }

    #[test]
    fn test_append_child_rejects_cycles() {
        let mut doc = Document::new();
        let body = doc.body();
        let outer = doc.append(body, Element::new("div"));
        let inner = doc.append(outer, Element::new("div"));

        doc.append_child(inner, outer);
        assert_eq!(doc.parent(outer), Some(body));
    }

    #[test]
    fn test_closest_is_inclusive() {
        let mut doc = Document::new();
        let body = doc.body();
        let card = doc.append(body, Element::new("div").with_class("bundle-card"));
        let button = doc.append(card, Element::new("button"));
        let sel = Selector::parse(".bundle-card").unwrap();

        assert_eq!(doc.closest(button, &sel), Some(card));
        assert_eq!(doc.closest(card, &sel), Some(card));
        assert_eq!(doc.closest(body, &sel), None);
    }

    #[test]
    fn test_scroll_clamped_to_document() {
        let mut doc = Document::new();
        let body = doc.body();
        doc.set_viewport_size(400.0, 800.0);
        doc.append(
            body,
            Element::new("section").with_rect(Rect::new(0.0, 0.0, 400.0, 2000.0)),
        );

        assert_eq!(doc.document_height(), 2000.0);
        doc.scroll_to(5000.0);
        assert_eq!(doc.viewport().scroll_y, 1200.0);
        doc.scroll_to(-10.0);
        assert_eq!(doc.viewport().scroll_y, 0.0);
    }

    #[test]
    fn test_disabled_tracks_attribute() {
        let mut doc = Document::new();
        let body = doc.body();
        let button = doc.append(body, Element::new("button"));

        doc.set_disabled(button, true);
        assert!(doc.is_disabled(button));
        assert!(doc.has_attribute(button, "disabled"));
        doc.set_disabled(button, false);
        assert!(!doc.has_attribute(button, "disabled"));
    }

    #[test]
    fn test_blocked_autoplay() {
        let mut doc = Document::new();
        let body = doc.body();
        let video = doc.append(body, Element::new("video"));

        doc.set_autoplay_allowed(false);
        assert!(doc.play(video).is_err());
        assert!(!doc.is_playing(video));

        doc.set_autoplay_allowed(true);
        doc.play(video).unwrap();
        assert!(doc.is_playing(video));
        doc.pause(video);
        assert!(!doc.is_playing(video));
    }

    #[test]
    fn test_missing_elements_are_silent() {
        let mut doc = Document::new();
        let ghost = ElementId(999);
        doc.set_text_content(ghost, "x");
        doc.add_class(ghost, "x");
        assert_eq!(doc.text_content(ghost), "");
        assert_eq!(doc.value(ghost), "");
        assert!(doc.rect(ghost).is_none());
    }
}
