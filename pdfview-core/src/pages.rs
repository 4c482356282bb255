use serde::Serialize;

use crate::geometry::{PageSize, Point, Rect};
use crate::layout::DocumentLayout;
use crate::RenderImage;

/// Snapshot of a page's geometry, handed out to external code instead of the
/// page itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageInfo {
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone)]
struct CachedSurface {
    zoom: f64,
    image: RenderImage,
}

/// One page of the loaded document. Position is meaningful only after layout
/// has run.
#[derive(Debug, Clone)]
pub struct Page {
    index: usize,
    size: PageSize,
    position: Point,
    surface: Option<CachedSurface>,
}

impl Page {
    fn new(index: usize, size: PageSize) -> Self {
        Self {
            index,
            size,
            position: Point::default(),
            surface: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn size(&self) -> PageSize {
        self.size
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn x(&self) -> f64 {
        self.position.x
    }

    pub fn y(&self) -> f64 {
        self.position.y
    }

    pub fn width(&self) -> f64 {
        self.size.width
    }

    pub fn height(&self) -> f64 {
        self.size.height
    }

    /// Page rectangle in document space.
    pub fn frame(&self) -> Rect {
        Rect::new(
            self.position.x,
            self.position.y,
            self.size.width,
            self.size.height,
        )
    }

    pub fn info(&self) -> PageInfo {
        PageInfo {
            index: self.index,
            x: self.position.x,
            y: self.position.y,
            width: self.size.width,
            height: self.size.height,
        }
    }

    /// Cached raster of the page, if one exists for `zoom`.
    pub fn surface(&self, zoom: f64) -> Option<&RenderImage> {
        self.surface
            .as_ref()
            .filter(|cached| (cached.zoom - zoom).abs() < f64::EPSILON)
            .map(|cached| &cached.image)
    }

    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    pub fn store_surface(&mut self, zoom: f64, image: RenderImage) -> &RenderImage {
        &self.surface.insert(CachedSurface { zoom, image }).image
    }

    pub fn invalidate_surface(&mut self) {
        self.surface = None;
    }
}

/// Ordered pages of a document together with the laid-out extent.
#[derive(Debug, Clone, Default)]
pub struct PageStore {
    pages: Vec<Page>,
    extent: PageSize,
}

impl PageStore {
    pub fn from_sizes(sizes: &[PageSize]) -> Self {
        Self {
            pages: sizes
                .iter()
                .enumerate()
                .map(|(index, size)| Page::new(index, *size))
                .collect(),
            extent: PageSize::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Page> {
        self.pages.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Page> {
        self.pages.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Page> {
        self.pages.iter_mut()
    }

    pub fn sizes(&self) -> Vec<PageSize> {
        self.pages.iter().map(Page::size).collect()
    }

    pub fn infos(&self) -> Vec<PageInfo> {
        self.pages.iter().map(Page::info).collect()
    }

    /// Total document size in document units.
    pub fn extent(&self) -> PageSize {
        self.extent
    }

    /// The caller guarantees `layout` places exactly `self.len()` pages.
    pub fn apply_layout(&mut self, layout: &DocumentLayout) {
        for (page, position) in self.pages.iter_mut().zip(&layout.positions) {
            page.position = *position;
        }
        self.extent = PageSize::new(layout.width, layout.height);
    }

    pub fn invalidate_surfaces(&mut self) {
        for page in &mut self.pages {
            page.invalidate_surface();
        }
    }

    /// Index of the first page whose rectangle contains `point`.
    pub fn page_at(&self, point: Point) -> Option<usize> {
        self.pages
            .iter()
            .position(|page| page.frame().contains(point))
    }

    pub fn clear(&mut self) {
        self.pages.clear();
        self.extent = PageSize::default();
    }
}

impl<'a> IntoIterator for &'a PageStore {
    type Item = &'a Page;
    type IntoIter = std::slice::Iter<'a, Page>;

    fn into_iter(self) -> Self::IntoIter {
        self.pages.iter()
    }
}
