//! Right-docked panel container.

use super::dom::{Document, ElementHandle};
use crate::config::{split_selectors, PageConfig};
use crate::error::DomError;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct PanelInjector {
    document: Arc<dyn Document>,
    panel_id: String,
    width: String,
    main_selectors: Vec<String>,
}

impl PanelInjector {
    pub fn new(document: Arc<dyn Document>, config: &PageConfig) -> Self {
        Self {
            document,
            panel_id: config.sidebar_id.clone(),
            width: config.sidebar_width.clone(),
            main_selectors: split_selectors(&config.selectors.main_content),
        }
    }

    pub fn panel_id(&self) -> &str {
        &self.panel_id
    }

    pub fn is_injected(&self) -> bool {
        self.document.element_by_id(&self.panel_id).is_some()
    }

    fn panel_style(&self) -> String {
        format!(
            "position: fixed; top: 0; right: 0; width: {}; height: 100vh; z-index: 10000; \
             background: white; box-shadow: -2px 0 8px rgba(0, 0, 0, 0.1); overflow-y: auto;",
            self.width
        )
    }

    /// Create the container, or return the existing one.
    pub fn inject(&self) -> Result<ElementHandle, DomError> {
        if let Some(existing) = self.document.element_by_id(&self.panel_id) {
            debug!(id = %self.panel_id, "Panel already injected");
            return Ok(existing);
        }

        let handle = self.document.append_panel(&self.panel_id, &self.panel_style())?;
        if !self.set_main_margin(&self.width) {
            warn!("Main content not found, page layout left unchanged");
        }

        info!(id = %self.panel_id, "Panel injected");
        Ok(handle)
    }

    /// Remove the container and restore the layout; `false` when there was nothing to remove.
    pub fn remove(&self) -> Result<bool, DomError> {
        if !self.document.remove_element(&self.panel_id)? {
            return Ok(false);
        }
        self.set_main_margin("0");
        info!(id = %self.panel_id, "Panel removed");
        Ok(true)
    }

    fn set_main_margin(&self, value: &str) -> bool {
        self.main_selectors
            .iter()
            .any(|selector| self.document.set_style(selector, "margin-right", value))
    }
}
