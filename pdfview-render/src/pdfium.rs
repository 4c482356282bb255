use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use pdfium_render::prelude::*;
use pdfview_core::{
    DocumentBackend, DocumentInfo, DocumentMetadata, DocumentProvider, LoadError, OutlineNode,
    OutlineTarget, PageSize, PdfRect, RenderImage, RenderRequest,
};
use tracing::{debug, instrument, warn};

/// Environment variable naming an explicit Pdfium shared library.
pub const PDFIUM_LIBRARY_ENV: &str = "PDFVIEW_PDFIUM_LIBRARY_PATH";

pub struct PdfiumProvider {
    pdfium: Arc<Pdfium>,
}

impl PdfiumProvider {
    pub fn new() -> Result<Self> {
        let pdfium = match bind_pdfium_from_env() {
            Some(pdfium) => pdfium,
            None => bind_pdfium_default()?,
        };
        Ok(Self {
            pdfium: Arc::new(pdfium),
        })
    }
}

#[async_trait]
impl DocumentProvider for PdfiumProvider {
    async fn open(
        &self,
        path: &Path,
        password: Option<&str>,
    ) -> std::result::Result<Arc<dyn DocumentBackend>, LoadError> {
        let absolute = path
            .canonicalize()
            .map_err(|_| LoadError::NotFound(path.to_path_buf()))?;
        let document = PdfiumDocument::open(Arc::clone(&self.pdfium), absolute, password)?;
        Ok(Arc::new(document))
    }
}

struct PdfiumDocument {
    // Declared before `pdfium` so it is dropped first.
    document: Mutex<PdfDocument<'static>>,
    info: DocumentInfo,
    #[allow(dead_code)]
    pdfium: Arc<Pdfium>,
}

impl PdfiumDocument {
    fn open(pdfium: Arc<Pdfium>, path: PathBuf, password: Option<&str>) -> Result<Self, LoadError> {
        let document = pdfium
            .load_pdf_from_file(&path, password)
            .map_err(|err| load_error(&path, err))?;
        // SAFETY: the document borrows the bindings inside `pdfium`. Both live
        // in this struct and `document` is declared first, so it is dropped
        // while the bindings are still alive.
        let document =
            unsafe { mem::transmute::<PdfDocument<'_>, PdfDocument<'static>>(document) };
        let info = build_document_info(&document, &path);
        debug!(path = ?info.path, pages = info.page_count, "pdfium document opened");
        Ok(Self {
            document: Mutex::new(document),
            info,
            pdfium,
        })
    }

    fn with_page<R, F>(&self, page_index: usize, f: F) -> Result<R>
    where
        F: FnOnce(&PdfPage<'_>) -> Result<R>,
    {
        let document = self.document.lock();
        let index: PdfPageIndex = page_index
            .try_into()
            .map_err(|_| anyhow!("page {} is out of supported range", page_index))?;
        let page = document
            .pages()
            .get(index)
            .with_context(|| format!("page {} out of range", page_index))?;
        f(&page)
    }
}

impl DocumentBackend for PdfiumDocument {
    fn info(&self) -> &DocumentInfo {
        &self.info
    }

    #[instrument(skip(self))]
    fn render_page(&self, request: RenderRequest) -> Result<RenderImage> {
        self.with_page(request.page_index, |page| {
            let config = PdfRenderConfig::new().scale_page_by_factor(request.scale.max(0.01) as f32);
            let bitmap = page
                .render_with_config(&config)
                .with_context(|| format!("failed to render page {}", request.page_index))?;
            let image = bitmap.as_image().to_rgba8();
            Ok(RenderImage {
                width: image.width(),
                height: image.height(),
                pixels: image.into_raw(),
            })
        })
    }

    fn find_text(&self, page_index: usize, query: &str, case_sensitive: bool) -> Result<Vec<PdfRect>> {
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.with_page(page_index, |page| {
            let text = page
                .text()
                .with_context(|| format!("failed to extract text for page {}", page_index))?;
            let options = PdfSearchOptions::new().match_case(case_sensitive);
            let search = text
                .search(query, &options)
                .with_context(|| format!("failed to perform search on page {}", page_index))?;

            let mut matches = Vec::new();
            while let Some(segments) = search.find_next() {
                let rect = segments
                    .iter()
                    .map(|segment| {
                        let bounds = segment.bounds();
                        PdfRect::new(
                            bounds.left().value as f64,
                            bounds.bottom().value as f64,
                            bounds.right().value as f64,
                            bounds.top().value as f64,
                        )
                    })
                    .reduce(|acc, rect| acc.union(&rect));
                if let Some(rect) = rect {
                    matches.push(rect);
                }
            }
            Ok(matches)
        })
    }

    fn page_text(&self, page_index: usize) -> Result<String> {
        self.with_page(page_index, |page| {
            let text = page
                .text()
                .with_context(|| format!("failed to extract text for page {}", page_index))?;
            Ok(text.all())
        })
    }

    fn outline(&self) -> Result<Vec<OutlineNode>> {
        let document = self.document.lock();
        let mut outline = Vec::new();
        if let Some(root) = document.bookmarks().root() {
            collect_outline(root, &mut outline);
        }
        Ok(outline)
    }
}

fn collect_outline(mut bookmark: PdfBookmark<'_>, out: &mut Vec<OutlineNode>) {
    loop {
        let target = bookmark
            .destination()
            .and_then(|destination| destination.page_index().ok())
            .map(|page_index| OutlineTarget {
                page_index: page_index as usize,
                point: None,
            });
        let mut node = OutlineNode {
            title: bookmark.title().unwrap_or_default(),
            target,
            children: Vec::new(),
        };
        if let Some(child) = bookmark.first_child() {
            collect_outline(child, &mut node.children);
        }
        out.push(node);

        match bookmark.next_sibling() {
            Some(next) => bookmark = next,
            None => break,
        }
    }
}

fn build_document_info(document: &PdfDocument<'_>, path: &Path) -> DocumentInfo {
    let page_sizes: Vec<PageSize> = document
        .pages()
        .iter()
        .map(|page| PageSize::new(page.width().value as f64, page.height().value as f64))
        .collect();
    let metadata = document.metadata();
    let tag = |kind: PdfDocumentMetadataTagType| metadata.get(kind).map(|t| t.value().to_owned());

    let keywords: Vec<String> = tag(PdfDocumentMetadataTagType::Keywords)
        .map(|k| {
            k.split(',')
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    DocumentInfo {
        path: path.to_path_buf(),
        page_count: page_sizes.len(),
        metadata: DocumentMetadata {
            title: tag(PdfDocumentMetadataTagType::Title),
            author: tag(PdfDocumentMetadataTagType::Author),
            subject: tag(PdfDocumentMetadataTagType::Subject),
            keywords,
            creator: tag(PdfDocumentMetadataTagType::Creator),
            producer: tag(PdfDocumentMetadataTagType::Producer),
        },
        page_sizes,
    }
}

fn load_error(path: &Path, err: PdfiumError) -> LoadError {
    match err {
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
            LoadError::PasswordRequired(path.to_path_buf())
        }
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::FileError) => {
            LoadError::NotFound(path.to_path_buf())
        }
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::FormatError) => {
            LoadError::Malformed {
                path: path.to_path_buf(),
                reason: err.to_string(),
            }
        }
        other => LoadError::Backend(anyhow!(other).context(format!("failed to open {:?}", path))),
    }
}

fn bind_pdfium_from_env() -> Option<Pdfium> {
    let path = std::env::var(PDFIUM_LIBRARY_ENV).ok()?;
    if path.is_empty() {
        return None;
    }
    match Pdfium::bind_to_library(&path) {
        Ok(bindings) => Some(Pdfium::new(bindings)),
        Err(err) => {
            warn!("failed to load Pdfium from {}={}: {}", PDFIUM_LIBRARY_ENV, path, err);
            None
        }
    }
}

fn bind_pdfium_default() -> Result<Pdfium> {
    let mut errors = Vec::new();

    let cwd_path = Pdfium::pdfium_platform_library_name_at_path("./");
    match Pdfium::bind_to_library(&cwd_path) {
        Ok(bindings) => return Ok(Pdfium::new(bindings)),
        Err(err) => errors.push(format!("{}: {}", cwd_path.display(), err)),
    }

    match Pdfium::bind_to_system_library() {
        Ok(bindings) => Ok(Pdfium::new(bindings)),
        Err(err) => {
            errors.push(format!("system: {err}"));
            Err(anyhow!(
                "failed to bind to a pdfium library; set {} or install it ({})",
                PDFIUM_LIBRARY_ENV,
                errors.join(", ")
            ))
        }
    }
}
