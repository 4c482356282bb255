//! In-memory collaborators shared by the unit tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use parking_lot::Mutex;

use crate::error::{LoadError, PrintError};
use crate::geometry::{PageSize, PdfRect, Point, Rect, Rgba, Transform};
use crate::outline::OutlineNode;
use crate::print::{PrintBackend, PrintSettings, PrintSource};
use crate::render::Canvas;
use crate::{
    DocumentBackend, DocumentInfo, DocumentMetadata, DocumentProvider, RenderImage, RenderRequest,
};

pub(crate) struct FakeBackend {
    pub info: DocumentInfo,
    pub texts: Vec<String>,
    pub outline: Vec<OutlineNode>,
    pub fail_render: bool,
    /// `(page, query)` for which `find_text` fails.
    pub fail_search: Option<(usize, String)>,
    renders: Mutex<Vec<usize>>,
    searches: Mutex<usize>,
}

impl FakeBackend {
    pub fn with_pages(sizes: &[(f64, f64)]) -> Self {
        let texts = vec![String::new(); sizes.len()];
        Self::with_text(sizes, &texts.iter().map(String::as_str).collect::<Vec<_>>())
    }

    pub fn with_text(sizes: &[(f64, f64)], texts: &[&str]) -> Self {
        let page_sizes: Vec<PageSize> = sizes.iter().map(|&(w, h)| PageSize::new(w, h)).collect();
        Self {
            info: DocumentInfo {
                path: PathBuf::from("/tmp/fake.pdf"),
                page_count: page_sizes.len(),
                page_sizes,
                metadata: DocumentMetadata {
                    title: Some("Fake document".to_owned()),
                    author: Some("Tester".to_owned()),
                    keywords: vec!["alpha".to_owned(), "beta".to_owned()],
                    ..DocumentMetadata::default()
                },
            },
            texts: texts.iter().map(|text| (*text).to_owned()).collect(),
            outline: Vec::new(),
            fail_render: false,
            fail_search: None,
            renders: Mutex::new(Vec::new()),
            searches: Mutex::new(0),
        }
    }

    /// Page indices passed to `render_page`, in call order.
    pub fn rendered_pages(&self) -> Vec<usize> {
        self.renders.lock().clone()
    }

    /// Number of `find_text` calls.
    pub fn search_calls(&self) -> usize {
        *self.searches.lock()
    }
}

impl DocumentBackend for FakeBackend {
    fn info(&self) -> &DocumentInfo {
        &self.info
    }

    fn render_page(&self, request: RenderRequest) -> Result<RenderImage> {
        self.renders.lock().push(request.page_index);
        if self.fail_render {
            return Err(anyhow!("render failure on page {}", request.page_index));
        }
        let size = self
            .info
            .page_sizes
            .get(request.page_index)
            .ok_or_else(|| anyhow!("page {} out of range", request.page_index))?;
        Ok(RenderImage::blank(
            (size.width * request.scale).round() as u32,
            (size.height * request.scale).round() as u32,
        ))
    }

    /// One 10-unit tall rectangle per occurrence, placed by byte offset.
    fn find_text(&self, page_index: usize, query: &str, case_sensitive: bool) -> Result<Vec<PdfRect>> {
        *self.searches.lock() += 1;
        if let Some((page, failing)) = &self.fail_search {
            if *page == page_index && failing == query {
                return Err(anyhow!("text layer of page {} is unreadable", page_index));
            }
        }
        let text = self
            .texts
            .get(page_index)
            .ok_or_else(|| anyhow!("page {} out of range", page_index))?;
        let (haystack, needle) = if case_sensitive {
            (text.clone(), query.to_owned())
        } else {
            (text.to_lowercase(), query.to_lowercase())
        };
        Ok(haystack
            .match_indices(needle.as_str())
            .map(|(offset, found)| {
                let x = offset as f64;
                PdfRect::new(x, 20.0, x + found.len() as f64, 30.0)
            })
            .collect())
    }

    fn page_text(&self, page_index: usize) -> Result<String> {
        self.texts
            .get(page_index)
            .cloned()
            .ok_or_else(|| anyhow!("page {} out of range", page_index))
    }

    fn outline(&self) -> Result<Vec<OutlineNode>> {
        Ok(self.outline.clone())
    }
}

/// Hands out the same backend for every path except `missing.pdf` and
/// `broken.pdf`, optionally demanding a password.
pub(crate) struct FakeProvider {
    pub backend: Arc<FakeBackend>,
    pub password: Option<String>,
}

impl FakeProvider {
    pub fn new(backend: FakeBackend) -> Self {
        Self {
            backend: Arc::new(backend),
            password: None,
        }
    }
}

#[async_trait::async_trait]
impl DocumentProvider for FakeProvider {
    async fn open(
        &self,
        path: &Path,
        password: Option<&str>,
    ) -> std::result::Result<Arc<dyn DocumentBackend>, LoadError> {
        match path.file_name().and_then(|name| name.to_str()) {
            Some("missing.pdf") => return Err(LoadError::NotFound(path.to_path_buf())),
            Some("broken.pdf") => {
                return Err(LoadError::Malformed {
                    path: path.to_path_buf(),
                    reason: "no xref table".to_owned(),
                })
            }
            _ => {}
        }
        if let Some(expected) = &self.password {
            if password != Some(expected.as_str()) {
                return Err(LoadError::PasswordRequired(path.to_path_buf()));
            }
        }
        let backend: Arc<dyn DocumentBackend> = self.backend.clone();
        Ok(backend)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CanvasOp {
    Clear(Rgba),
    /// Fill in device coordinates.
    Fill { device: Rect, color: Rgba },
    Surface { origin: Point, width: u32, height: u32 },
}

/// Canvas spy recording every draw call in device coordinates.
#[derive(Debug, Default)]
pub(crate) struct RecordingCanvas {
    pub ops: Vec<CanvasOp>,
    transform: Transform,
}

impl RecordingCanvas {
    pub fn fills(&self) -> Vec<(Rect, Rgba)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                CanvasOp::Fill { device, color } => Some((*device, *color)),
                _ => None,
            })
            .collect()
    }

    pub fn surfaces(&self) -> Vec<Point> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                CanvasOp::Surface { origin, .. } => Some(*origin),
                _ => None,
            })
            .collect()
    }
}

impl Canvas for RecordingCanvas {
    fn transform(&self) -> Transform {
        self.transform
    }

    fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    fn clear(&mut self, color: Rgba) {
        self.ops.push(CanvasOp::Clear(color));
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgba) {
        let device = self.transform.apply_rect(rect);
        self.ops.push(CanvasOp::Fill { device, color });
    }

    fn draw_surface(&mut self, surface: &RenderImage) {
        let origin = self.transform.apply(Point::default());
        self.ops.push(CanvasOp::Surface {
            origin,
            width: surface.width,
            height: surface.height,
        });
    }
}

/// Print backend that paints every page into a [`RecordingCanvas`].
#[derive(Debug, Default)]
pub(crate) struct RecordingPrintBackend {
    pub printed: Vec<usize>,
    pub canvas: RecordingCanvas,
    pub cancel: bool,
}

impl PrintBackend for RecordingPrintBackend {
    fn run(&mut self, settings: &PrintSettings, source: &dyn PrintSource) -> Result<(), PrintError> {
        if self.cancel {
            return Err(PrintError::Cancelled);
        }
        for index in settings.page_range.clone() {
            source
                .draw_page(index, &mut self.canvas, settings.scale)
                .map_err(PrintError::Backend)?;
            self.printed.push(index);
        }
        Ok(())
    }
}
