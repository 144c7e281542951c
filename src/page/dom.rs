//! Host page access.
//!
//! The host DOM is an external collaborator; everything the core needs from it goes
//! through [`Document`].

use crate::error::DomError;

/// Identity of an element created by the core
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    pub id: String,
    pub node: u64,
}

pub trait Document: Send + Sync {
    /// Current location (`window.location.href`).
    fn href(&self) -> String;

    /// Trimmed text content of the first element matching `selector`.
    fn query_text(&self, selector: &str) -> Option<String>;

    fn exists(&self, selector: &str) -> bool;

    fn element_by_id(&self, id: &str) -> Option<ElementHandle>;

    /// Create an element with `id` and inline `style` and append it to the body.
    fn append_panel(&self, id: &str, style: &str) -> Result<ElementHandle, DomError>;

    /// Remove the element with `id`; `Ok(false)` when there was none.
    fn remove_element(&self, id: &str) -> Result<bool, DomError>;

    /// Set one style property on the first element matching `selector`.
    /// Returns false when nothing matched.
    fn set_style(&self, selector: &str, property: &str, value: &str) -> bool;
}

/// Text of the first selector in `selectors` whose text satisfies `accept`.
pub fn first_text_matching<F>(doc: &dyn Document, selectors: &[String], accept: F) -> Option<String>
where
    F: Fn(&str) -> bool,
{
    selectors
        .iter()
        .filter_map(|selector| doc.query_text(selector))
        .find(|text| accept(text))
}
