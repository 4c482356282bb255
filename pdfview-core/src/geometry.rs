//! Coordinate spaces and the pure conversions between them.
//!
//! * PDF space: native page coordinates, origin bottom-left.
//! * Page space: relative to a page's top-left corner, unscaled.
//! * Document space: the whole laid-out document, origin top-left, unscaled.
//! * Viewport space: device pixels, document space shifted by the scroll
//!   offset and scaled by zoom.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// True when the two rectangles share a region of non-zero area.
    /// Rectangles that only touch along an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Half-open containment: the left and top edges are inside, the right
    /// and bottom edges are not.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    pub fn scaled(&self, factor: f64) -> Rect {
        Rect::new(
            self.x * factor,
            self.y * factor,
            self.width * factor,
            self.height * factor,
        )
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    pub fn approx_eq(&self, other: &Rect, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance
            && (self.y - other.y).abs() <= tolerance
            && (self.width - other.width).abs() <= tolerance
            && (self.height - other.height).abs() <= tolerance
    }
}

/// Rectangle in PDF space given by two corners, as PDF libraries report
/// text matches. `y1` is normally the bottom edge and `y2` the top edge.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PdfRect {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl PdfRect {
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn union(&self, other: &PdfRect) -> PdfRect {
        PdfRect {
            x1: self.x1.min(self.x2).min(other.x1.min(other.x2)),
            y1: self.y1.min(self.y2).min(other.y1.min(other.y2)),
            x2: self.x1.max(self.x2).max(other.x1.max(other.x2)),
            y2: self.y1.max(self.y2).max(other.y1.max(other.y2)),
        }
    }
}

/// Colour with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    #[serde(default = "opaque")]
    pub a: f64,
}

fn opaque() -> f64 {
    1.0
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::new(1.0, 1.0, 1.0, 1.0);

    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self::new(r, g, b, 1.0)
    }
}

/// Scale-and-translate affine matrix. Operations compose in user space the
/// way a 2D drawing context does: after `scale(z)` then `translate(d)`, a
/// user-space point `p` lands on the device at `z * (p + d)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub sx: f64,
    pub sy: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        sx: 1.0,
        sy: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    pub fn scale(&mut self, sx: f64, sy: f64) {
        self.sx *= sx;
        self.sy *= sy;
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.tx += self.sx * dx;
        self.ty += self.sy * dy;
    }

    pub fn apply(&self, point: Point) -> Point {
        Point::new(self.sx * point.x + self.tx, self.sy * point.y + self.ty)
    }

    pub fn apply_rect(&self, rect: Rect) -> Rect {
        let origin = self.apply(Point::new(rect.x, rect.y));
        Rect::new(
            origin.x,
            origin.y,
            rect.width * self.sx,
            rect.height * self.sy,
        )
    }
}

pub fn pdf_to_page(rect: &PdfRect, page_height: f64) -> Rect {
    let top = page_height - rect.y1.max(rect.y2);
    Rect::new(
        rect.x1.min(rect.x2),
        top,
        (rect.x2 - rect.x1).abs(),
        (rect.y1 - rect.y2).abs(),
    )
}

pub fn page_to_pdf(rect: &Rect, page_height: f64) -> PdfRect {
    PdfRect::new(
        rect.x,
        page_height - rect.bottom(),
        rect.right(),
        page_height - rect.y,
    )
}

pub fn pdf_point_to_page(point: Point, page_height: f64) -> Point {
    Point::new(point.x, page_height - point.y)
}

/// `page_frame` is the page's rectangle in document space.
pub fn page_to_document(rect: &Rect, page_frame: &Rect) -> Rect {
    rect.translated(page_frame.x, page_frame.y)
}

pub fn document_to_viewport(rect: &Rect, zoom: f64, scroll: Point) -> Rect {
    rect.translated(-scroll.x, -scroll.y).scaled(zoom)
}

pub fn viewport_to_document(rect: &Rect, zoom: f64, scroll: Point) -> Rect {
    rect.scaled(1.0 / zoom).translated(scroll.x, scroll.y)
}

/// Widget pixel position to document space.
pub fn viewport_point_to_document(point: Point, zoom: f64, scroll: Point) -> Point {
    Point::new(point.x / zoom + scroll.x, point.y / zoom + scroll.y)
}

pub fn pdf_to_viewport(rect: &PdfRect, page_frame: &Rect, zoom: f64, scroll: Point) -> Rect {
    let page = pdf_to_page(rect, page_frame.height);
    document_to_viewport(&page_to_document(&page, page_frame), zoom, scroll)
}
