//! Headless document model.
//!
//! Selectors are matched literally: text and markers are registered per selector string,
//! which is all the detector and injector need from a page.

use super::dom::{Document, ElementHandle};
use crate::error::DomError;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct PageState {
    href: String,
    texts: HashMap<String, String>,
    elements: HashMap<String, ElementHandle>,
    styles: HashMap<(String, String), String>,
    next_node: u64,
}

#[derive(Debug, Default)]
pub struct MemoryDocument {
    state: RwLock<PageState>,
}

impl MemoryDocument {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            state: RwLock::new(PageState {
                href: href.into(),
                ..PageState::default()
            }),
        }
    }

    /// Simulate an SPA navigation. Page content is left untouched.
    pub fn navigate(&self, href: impl Into<String>) {
        self.state.write().href = href.into();
    }

    /// Make `selector` match an element with the given text.
    pub fn set_text(&self, selector: impl Into<String>, text: impl Into<String>) {
        self.state.write().texts.insert(selector.into(), text.into());
    }

    /// Make `selector` match an element with no text.
    pub fn add_marker(&self, selector: impl Into<String>) {
        self.set_text(selector, "");
    }

    pub fn remove_selector(&self, selector: &str) {
        self.state.write().texts.remove(selector);
    }

    pub fn style(&self, selector: &str, property: &str) -> Option<String> {
        self.state
            .read()
            .styles
            .get(&(selector.to_string(), property.to_string()))
            .cloned()
    }

    pub fn element_count(&self) -> usize {
        self.state.read().elements.len()
    }
}

impl Document for MemoryDocument {
    fn href(&self) -> String {
        self.state.read().href.clone()
    }

    fn query_text(&self, selector: &str) -> Option<String> {
        self.state
            .read()
            .texts
            .get(selector)
            .map(|text| text.trim().to_string())
    }

    fn exists(&self, selector: &str) -> bool {
        self.state.read().texts.contains_key(selector)
    }

    fn element_by_id(&self, id: &str) -> Option<ElementHandle> {
        self.state.read().elements.get(id).cloned()
    }

    fn append_panel(&self, id: &str, _style: &str) -> Result<ElementHandle, DomError> {
        let mut state = self.state.write();
        if state.elements.contains_key(id) {
            return Err(DomError::CreateFailed(id.to_string()));
        }
        state.next_node += 1;
        let handle = ElementHandle {
            id: id.to_string(),
            node: state.next_node,
        };
        state.elements.insert(id.to_string(), handle.clone());
        Ok(handle)
    }

    fn remove_element(&self, id: &str) -> Result<bool, DomError> {
        Ok(self.state.write().elements.remove(id).is_some())
    }

    fn set_style(&self, selector: &str, property: &str, value: &str) -> bool {
        let mut state = self.state.write();
        if !state.texts.contains_key(selector) {
            return false;
        }
        state
            .styles
            .insert((selector.to_string(), property.to_string()), value.to_string());
        true
    }
}
