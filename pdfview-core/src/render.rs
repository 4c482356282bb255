//! Visibility-culled painting of the document into a [`Canvas`].

use tracing::{debug, warn};

use crate::geometry::{pdf_to_page, PageSize, PdfRect, Rect, Rgba, Transform};
use crate::pages::{Page, PageStore};
use crate::scroll::Viewport;
use crate::search::SearchSession;
use crate::{DocumentBackend, RenderImage, RenderRequest};

/// 2D drawing target. Shapes go through the current transform; surfaces are
/// already rasterised at the right resolution and are blitted unscaled with
/// their top-left corner at the device position of the user-space origin.
pub trait Canvas {
    fn transform(&self) -> Transform;

    fn set_transform(&mut self, transform: Transform);

    fn scale(&mut self, sx: f64, sy: f64) {
        let mut transform = self.transform();
        transform.scale(sx, sy);
        self.set_transform(transform);
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        let mut transform = self.transform();
        transform.translate(dx, dy);
        self.set_transform(transform);
    }

    fn identity(&mut self) {
        self.set_transform(Transform::IDENTITY);
    }

    /// Fills the whole target, ignoring the transform.
    fn clear(&mut self, color: Rgba);

    fn fill_rect(&mut self, rect: Rect, color: Rgba);

    fn draw_surface(&mut self, surface: &RenderImage);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderStyle {
    pub background: Rgba,
    pub page_background: Rgba,
    pub match_highlight: Rgba,
    pub current_match_highlight: Rgba,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            background: Rgba::rgb(220.0 / 256.0, 218.0 / 256.0, 213.0 / 256.0),
            page_background: Rgba::WHITE,
            match_highlight: Rgba::new(1.0, 1.0, 0.0, 0.5),
            current_match_highlight: Rgba::new(0.5, 1.0, 0.0, 0.5),
        }
    }
}

/// What one frame did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub painted: Vec<usize>,
    pub culled: usize,
    pub highlights: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Renderer {
    style: RenderStyle,
}

impl Renderer {
    pub fn new(style: RenderStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &RenderStyle {
        &self.style
    }

    /// Paints every page intersecting the visible rectangle, then its search
    /// highlights. Page surfaces are rasterised lazily and cached per zoom.
    pub fn render_frame(
        &self,
        canvas: &mut dyn Canvas,
        pages: &mut PageStore,
        viewport: &Viewport,
        backend: &dyn DocumentBackend,
        search: Option<&SearchSession>,
    ) -> FrameStats {
        let zoom = viewport.zoom();
        let scroll = viewport.scroll_offset();
        let visible = viewport.visible_rect();
        let mut stats = FrameStats::default();

        canvas.identity();
        canvas.clear(self.style.background);

        for page in pages.iter_mut() {
            if !page.frame().scaled(zoom).intersects(&visible) {
                stats.culled += 1;
                continue;
            }

            let index = page.index();
            let size = page.size();
            canvas.scale(zoom, zoom);
            canvas.translate(page.x() - scroll.x, page.y() - scroll.y);

            let surface = ensure_surface(page, zoom, backend);
            self.paint_page(canvas, size, surface);

            if let Some(session) = search {
                let matches = session.matches_on(index);
                if !matches.is_empty() {
                    self.paint_highlights(canvas, size, matches, session.current_on(index));
                    stats.highlights += matches.len();
                }
            }

            canvas.identity();
            stats.painted.push(index);
        }

        debug!(
            painted = stats.painted.len(),
            culled = stats.culled,
            highlights = stats.highlights,
            zoom,
            "frame rendered"
        );
        stats
    }

    /// White page background followed by the page content, in page space.
    pub fn paint_page(&self, canvas: &mut dyn Canvas, size: PageSize, surface: Option<&RenderImage>) {
        canvas.fill_rect(
            Rect::new(0.0, 0.0, size.width, size.height),
            self.style.page_background,
        );
        if let Some(surface) = surface {
            canvas.draw_surface(surface);
        }
    }

    fn paint_highlights(
        &self,
        canvas: &mut dyn Canvas,
        size: PageSize,
        matches: &[PdfRect],
        current: Option<usize>,
    ) {
        for (index, rect) in matches.iter().enumerate() {
            let color = if current == Some(index) {
                self.style.current_match_highlight
            } else {
                self.style.match_highlight
            };
            canvas.fill_rect(pdf_to_page(rect, size.height), color);
        }
    }
}

fn ensure_surface<'a>(
    page: &'a mut Page,
    zoom: f64,
    backend: &dyn DocumentBackend,
) -> Option<&'a RenderImage> {
    if page.surface(zoom).is_none() {
        let request = RenderRequest {
            page_index: page.index(),
            scale: zoom,
        };
        match backend.render_page(request) {
            Ok(image) => {
                page.store_surface(zoom, image);
            }
            Err(err) => {
                warn!(?err, page = page.index(), zoom, "failed to rasterise page");
                return None;
            }
        }
    }
    page.surface(zoom)
}
