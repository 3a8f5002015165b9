//! Form validation with inline field annotations.

use crate::analytics::EventTracker;
use crate::dom::{Document, Element, ElementId, Selector};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Message for an empty required field
pub const REQUIRED_MESSAGE: &str = "This field is required";
/// Message for a malformed email address
pub const EMAIL_MESSAGE: &str = "Please enter a valid email address";

const ERROR_CLASS: &str = "field-error";
const ERROR_FOR_ATTRIBUTE: &str = "data-error-for";
const ERROR_COLOR: &str = "var(--color-error)";

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
    })
}

/// `local@domain.tld` check used for `type="email"` fields
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email)
}

/// Why a field failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldIssue {
    /// Empty after trimming
    Required,
    /// Not an email address
    InvalidEmail,
}

impl FieldIssue {
    /// Message shown next to the field
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Required => REQUIRED_MESSAGE,
            Self::InvalidEmail => EMAIL_MESSAGE,
        }
    }
}

/// Outcome of validating one required field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldReport {
    /// The field
    pub field: ElementId,
    /// Problem found, if any
    pub issue: Option<FieldIssue>,
}

/// Outcome of validating a form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Per-field results in document order
    pub fields: Vec<FieldReport>,
}

impl ValidationReport {
    /// Whether every required field passed
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.fields.iter().all(|f| f.issue.is_none())
    }

    /// Fields that failed
    pub fn invalid(&self) -> impl Iterator<Item = &FieldReport> {
        self.fields.iter().filter(|f| f.issue.is_some())
    }
}

/// Whether a submission may proceed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Valid; let the browser submit
    Proceed,
    /// Invalid; default action prevented
    Prevented,
}

/// Validates `[required]` fields and renders inline errors
#[derive(Debug, Clone)]
pub struct FormValidator {
    required: Selector,
    annotation: Selector,
}

impl Default for FormValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl FormValidator {
    /// Create a validator
    #[must_use]
    pub fn new() -> Self {
        Self {
            required: Selector::parse("[required]").expect("static selector"),
            annotation: Selector::parse(".field-error").expect("static selector"),
        }
    }

    /// Check one field without touching the page
    #[must_use]
    pub fn check_field(&self, doc: &Document, field: ElementId) -> Option<FieldIssue> {
        let value = doc.value(field);
        if value.trim().is_empty() {
            return Some(FieldIssue::Required);
        }
        let is_email = doc
            .attribute(field, "type")
            .is_some_and(|t| t.eq_ignore_ascii_case("email"));
        if is_email && !is_valid_email(value) {
            return Some(FieldIssue::InvalidEmail);
        }
        None
    }

    /// Validate every required field of `form`, updating annotations
    pub fn validate_detailed(&self, doc: &mut Document, form: ElementId) -> ValidationReport {
        let mut report = ValidationReport::default();
        for field in doc.query_all_within(form, &self.required) {
            let issue = self.check_field(doc, field);
            match issue {
                Some(issue) => self.show_field_error(doc, field, issue.message()),
                None => self.clear_field_error(doc, field),
            }
            report.fields.push(FieldReport { field, issue });
        }
        report
    }

    /// Validate `form`; true iff every required field passes
    pub fn validate(&self, doc: &mut Document, form: ElementId) -> bool {
        self.validate_detailed(doc, form).is_valid()
    }

    /// Submit handler: validate, then either block or track the submission
    pub fn handle_submit(
        &self,
        doc: &mut Document,
        form: ElementId,
        tracker: &mut EventTracker,
    ) -> SubmitOutcome {
        let report = self.validate_detailed(doc, form);
        if !report.is_valid() {
            tracing::debug!(
                form = %form,
                invalid = report.invalid().count(),
                "form submission blocked"
            );
            return SubmitOutcome::Prevented;
        }

        let action = doc.attribute(form, "action").unwrap_or("Unknown").to_string();
        tracker.track("Form", "Submit", &action, None);
        SubmitOutcome::Proceed
    }

    /// Replace any annotation on `field` with `message`
    pub fn show_field_error(&self, doc: &mut Document, field: ElementId, message: &str) {
        self.clear_field_error(doc, field);

        if let Some(parent) = doc.parent(field) {
            let annotation = Element::new("div")
                .with_class(ERROR_CLASS)
                .with_attribute(ERROR_FOR_ATTRIBUTE, &field.index().to_string())
                .with_text(message);
            let annotation = doc.append(parent, annotation);
            doc.set_style(annotation, "color", ERROR_COLOR);
            doc.set_style(annotation, "font-size", "0.875rem");
            doc.set_style(annotation, "margin-top", "0.25rem");
        }
        doc.set_style(field, "border-color", ERROR_COLOR);
    }

    /// Remove the annotation and error border from `field`
    pub fn clear_field_error(&self, doc: &mut Document, field: ElementId) {
        if let Some(annotation) = self.annotation_for(doc, field) {
            doc.remove(annotation);
        }
        doc.set_style(field, "border-color", "");
    }

    /// Annotation currently rendered for `field`
    #[must_use]
    pub fn annotation_for(&self, doc: &Document, field: ElementId) -> Option<ElementId> {
        let parent = doc.parent(field)?;
        let key = field.index().to_string();
        doc.element(parent)?
            .children()
            .iter()
            .copied()
            .find(|child| {
                self.annotation.matches(doc, *child)
                    && doc.attribute(*child, ERROR_FOR_ATTRIBUTE) == Some(key.as_str())
            })
    }
}
