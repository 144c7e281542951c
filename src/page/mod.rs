//! Page context: detection, panel injection and content extraction over a [`Document`].

pub mod detector;
pub mod dom;
pub mod extract;
pub mod injector;
pub mod memory;

pub use detector::{HostUiState, PageDetector};
pub use dom::{Document, ElementHandle};
pub use extract::{first_non_empty, BodySource, Resolved};
pub use injector::PanelInjector;
pub use memory::MemoryDocument;
