//! Printing: the document exposes itself as a [`PrintSource`] and a
//! [`PrintBackend`] drives it page by page.

use std::ops::Range;

use anyhow::{Context, Result};

use crate::error::PrintError;
use crate::geometry::PageSize;
use crate::pages::PageStore;
use crate::render::{Canvas, Renderer};
use crate::{DocumentBackend, RenderRequest};

#[derive(Debug, Clone, PartialEq)]
pub struct PrintSettings {
    pub job_name: String,
    /// Zero-based pages to print.
    pub page_range: Range<usize>,
    /// Pixels per PDF unit.
    pub scale: f64,
}

impl PrintSettings {
    /// Settings for a single page when `page` is given, otherwise the whole
    /// document.
    pub fn for_selection(
        job_name: impl Into<String>,
        page: Option<usize>,
        page_count: usize,
        scale: f64,
    ) -> Result<Self, PrintError> {
        let page_range = match page {
            Some(index) if index >= page_count => {
                return Err(PrintError::PageOutOfRange {
                    index,
                    count: page_count,
                })
            }
            Some(index) => index..index + 1,
            None => 0..page_count,
        };
        Ok(Self {
            job_name: job_name.into(),
            page_range,
            scale,
        })
    }

    pub fn page_count(&self) -> usize {
        self.page_range.len()
    }
}

pub trait PrintSource {
    fn page_count(&self) -> usize;

    fn page_size(&self, index: usize) -> Option<PageSize>;

    /// Paints page `index` at the origin of `canvas`, `scale` device pixels
    /// per PDF unit.
    fn draw_page(&self, index: usize, canvas: &mut dyn Canvas, scale: f64) -> Result<()>;
}

pub trait PrintBackend {
    fn run(&mut self, settings: &PrintSettings, source: &dyn PrintSource) -> Result<(), PrintError>;
}

/// Prints pages of a loaded document using the viewer's own page painter.
pub struct DocumentPrintSource<'a> {
    backend: &'a dyn DocumentBackend,
    pages: &'a PageStore,
    renderer: &'a Renderer,
}

impl<'a> DocumentPrintSource<'a> {
    pub fn new(backend: &'a dyn DocumentBackend, pages: &'a PageStore, renderer: &'a Renderer) -> Self {
        Self {
            backend,
            pages,
            renderer,
        }
    }
}

impl PrintSource for DocumentPrintSource<'_> {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_size(&self, index: usize) -> Option<PageSize> {
        self.pages.get(index).map(|page| page.size())
    }

    fn draw_page(&self, index: usize, canvas: &mut dyn Canvas, scale: f64) -> Result<()> {
        let page = self
            .pages
            .get(index)
            .with_context(|| format!("page {} out of range", index))?;
        let image = self
            .backend
            .render_page(RenderRequest {
                page_index: index,
                scale,
            })
            .with_context(|| format!("failed to rasterise page {} for printing", index))?;

        canvas.identity();
        canvas.scale(scale, scale);
        self.renderer.paint_page(canvas, page.size(), Some(&image));
        canvas.identity();
        Ok(())
    }
}
