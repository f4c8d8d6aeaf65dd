//! DOM query capability used by probing and refreshing.
//!
//! A [`DomProvider`] opens a document for a URL; the document and its
//! elements are borrowed views that release their backing session when
//! dropped. Every query can fail, and callers treat a failure as "no match".

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod chrome;
pub mod document;

pub use chrome::ChromeDomProvider;
pub use document::{HtmlDocument, HtmlElement, StaticPages};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DomErrorKind {
    /// The page could not be loaded at all.
    Navigation,
    /// The selector string does not parse.
    InvalidSelector,
    /// The query ran but the backend reported a failure.
    Query,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomError {
    pub kind: DomErrorKind,
    pub message: String,
}

impl DomError {
    pub fn new(kind: DomErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn navigation(message: impl Into<String>) -> Self {
        Self::new(DomErrorKind::Navigation, message)
    }

    pub fn invalid_selector(selector: &str) -> Self {
        Self::new(
            DomErrorKind::InvalidSelector,
            format!("Invalid CSS selector '{}'", selector),
        )
    }
}

impl fmt::Display for DomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for DomError {}

pub type DomResult<T> = std::result::Result<T, DomError>;

/// A single element handle inside an open document.
pub trait DomElement {
    fn text(&self) -> DomResult<String>;
    fn attribute(&self, name: &str) -> DomResult<Option<String>>;
    fn outer_html(&self) -> DomResult<String>;
    /// Descendants of this element matching `selector`, in document order.
    fn find(&self, selector: &str) -> DomResult<Vec<Box<dyn DomElement + '_>>>;
}

/// An open document. Dropping it closes the underlying session.
pub trait DomDocument {
    fn find(&self, selector: &str) -> DomResult<Vec<Box<dyn DomElement + '_>>>;
}

pub trait DomProvider: Send + Sync {
    fn open(&self, url: &str) -> DomResult<Box<dyn DomDocument>>;
}

/// First descendant of `element` matching `selector`; query failures read as absent.
pub fn first_match<'a>(element: &'a dyn DomElement, selector: &str) -> Option<Box<dyn DomElement + 'a>> {
    element.find(selector).ok()?.into_iter().next()
}

/// Trimmed, non-empty text of an element.
pub fn non_empty_text(element: &dyn DomElement) -> Option<String> {
    let text = element.text().ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Trimmed, non-empty attribute value of an element.
pub fn non_empty_attribute(element: &dyn DomElement, name: &str) -> Option<String> {
    let value = element.attribute(name).ok()??;
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
