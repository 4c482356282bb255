//! Document viewport subsystem of the pdfview widget.
//!
//! The crate owns page geometry, layout, scroll and zoom state, visibility
//! culled rendering and incremental text search. Concrete PDF decoding,
//! pixel surfaces and print jobs are reached through the collaborator traits
//! declared here and in [`render`], [`layout`] and [`print`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub mod config;
pub mod document;
pub mod error;
pub mod events;
pub mod geometry;
pub mod layout;
pub mod outline;
pub mod pages;
pub mod print;
pub mod properties;
pub mod render;
pub mod scroll;
pub mod search;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::ViewerConfig;
pub use document::{Command, Document, ViewerContext};
pub use error::{LayoutError, LoadError, PrintError, SearchError, ViewerError};
pub use events::{EventQueue, ViewerEvent};
pub use geometry::{PageSize, PdfRect, Point, Rect, Rgba, Transform};
pub use layout::{DocumentLayout, LayoutPolicy, VerticalStack};
pub use outline::{Destination, OutlineEntry, OutlineNode, OutlineTarget};
pub use pages::{Page, PageInfo, PageStore};
pub use print::{PrintBackend, PrintSettings, PrintSource};
pub use properties::{PropertyValue, ScrollSnapshot, Widget};
pub use render::{Canvas, FrameStats, RenderStyle, Renderer};
pub use scroll::{ScrollRange, Viewport};
pub use search::{Direction, MatchRef, SearchSession};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Vec<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DocumentInfo {
    pub path: PathBuf,
    pub page_count: usize,
    /// Intrinsic page sizes in PDF units, in page order.
    pub page_sizes: Vec<PageSize>,
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRequest {
    pub page_index: usize,
    pub scale: f64,
}

impl Default for RenderRequest {
    fn default() -> Self {
        Self {
            page_index: 0,
            scale: 1.0,
        }
    }
}

/// RGBA8 pixel buffer, row-major without padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RenderImage {
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }
}

/// Decoded document handle provided by the PDF library.
pub trait DocumentBackend: Send + Sync {
    fn info(&self) -> &DocumentInfo;

    /// Rasterises one page at `request.scale` pixels per PDF unit.
    fn render_page(&self, request: RenderRequest) -> Result<RenderImage>;

    /// Returns one PDF-space rectangle per match, in the library's natural order.
    fn find_text(&self, page_index: usize, query: &str, case_sensitive: bool)
        -> Result<Vec<PdfRect>>;

    fn page_text(&self, page_index: usize) -> Result<String>;

    fn outline(&self) -> Result<Vec<OutlineNode>>;
}

#[async_trait::async_trait]
pub trait DocumentProvider: Send + Sync {
    async fn open(
        &self,
        path: &Path,
        password: Option<&str>,
    ) -> std::result::Result<Arc<dyn DocumentBackend>, LoadError>;
}
