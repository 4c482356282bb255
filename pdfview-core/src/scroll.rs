//! Scroll and zoom state of the viewport.

use crate::error::ViewerError;
use crate::geometry::{Point, Rect};

const PAGE_INCREMENT_RATIO: f64 = 0.9;

/// One scroll axis. All values are in document units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollRange {
    value: f64,
    upper: f64,
    page_size: f64,
    step_increment: f64,
    page_increment: f64,
}

impl ScrollRange {
    pub fn new(step_increment: f64) -> Self {
        Self {
            value: 0.0,
            upper: 0.0,
            page_size: 0.0,
            step_increment,
            page_increment: 0.0,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    pub fn page_size(&self) -> f64 {
        self.page_size
    }

    pub fn step_increment(&self) -> f64 {
        self.step_increment
    }

    pub fn page_increment(&self) -> f64 {
        self.page_increment
    }

    /// Largest offset the range accepts.
    pub fn max_value(&self) -> f64 {
        (self.upper - self.page_size).max(0.0)
    }

    /// Clamps `value` into `[0, max_value]`. Returns whether the offset moved.
    pub fn set_value(&mut self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        let clamped = value.clamp(0.0, self.max_value());
        let changed = clamped != self.value;
        self.value = clamped;
        changed
    }

    pub fn set_upper(&mut self, upper: f64) -> bool {
        self.upper = upper.max(0.0);
        self.reclamp()
    }

    pub fn set_page_size(&mut self, page_size: f64) -> bool {
        self.page_size = page_size.max(0.0);
        self.page_increment = self.page_size * PAGE_INCREMENT_RATIO;
        self.reclamp()
    }

    /// Scrolls the minimum distance needed to bring `[lower, upper]` into
    /// view. When the span is larger than the page, `lower` wins.
    pub fn clamp_page(&mut self, lower: f64, upper: f64) -> bool {
        let lower = lower.clamp(0.0, self.upper);
        let upper = upper.clamp(0.0, self.upper);
        let mut value = self.value;
        if value + self.page_size < upper {
            value = upper - self.page_size;
        }
        if value > lower {
            value = lower;
        }
        self.set_value(value)
    }

    pub fn step(&mut self, steps: f64) -> bool {
        self.set_value(self.value + steps * self.step_increment)
    }

    pub fn page(&mut self, pages: f64) -> bool {
        self.set_value(self.value + pages * self.page_increment)
    }

    fn reclamp(&mut self) -> bool {
        let value = self.value;
        self.set_value(value)
    }
}

/// Both scroll axes, the zoom factor and the widget allocation in pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub horizontal: ScrollRange,
    pub vertical: ScrollRange,
    zoom: f64,
    width: f64,
    height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64, zoom: f64, step_increment: f64) -> Result<Self, ViewerError> {
        validate_zoom(zoom)?;
        let mut viewport = Self {
            horizontal: ScrollRange::new(step_increment),
            vertical: ScrollRange::new(step_increment),
            zoom,
            width: width.max(0.0),
            height: height.max(0.0),
        };
        viewport.update_page_sizes();
        Ok(viewport)
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Widget allocation in pixels.
    pub fn allocation(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    /// Returns whether the zoom factor changed.
    pub fn set_zoom(&mut self, zoom: f64) -> Result<bool, ViewerError> {
        validate_zoom(zoom)?;
        if zoom == self.zoom {
            return Ok(false);
        }
        self.zoom = zoom;
        self.update_page_sizes();
        Ok(true)
    }

    pub fn resize(&mut self, width: f64, height: f64) -> bool {
        let width = width.max(0.0);
        let height = height.max(0.0);
        if width == self.width && height == self.height {
            return false;
        }
        self.width = width;
        self.height = height;
        self.update_page_sizes();
        true
    }

    /// Sets the scrollable extent (the laid-out document size).
    pub fn set_extent(&mut self, width: f64, height: f64) {
        self.horizontal.set_upper(width);
        self.vertical.set_upper(height);
    }

    pub fn scroll_offset(&self) -> Point {
        Point::new(self.horizontal.value(), self.vertical.value())
    }

    pub fn scroll_to(&mut self, x: f64, y: f64) -> bool {
        let moved_x = self.horizontal.set_value(x);
        let moved_y = self.vertical.set_value(y);
        moved_x || moved_y
    }

    /// Visible rectangle used for culling, in zoomed document pixels.
    pub fn visible_rect(&self) -> Rect {
        Rect::new(
            self.horizontal.value() * self.zoom,
            self.vertical.value() * self.zoom,
            self.width,
            self.height,
        )
    }

    /// Visible rectangle in document units.
    pub fn document_rect(&self) -> Rect {
        Rect::new(
            self.horizontal.value(),
            self.vertical.value(),
            self.horizontal.page_size(),
            self.vertical.page_size(),
        )
    }

    /// Centre of the visible area in document space.
    pub fn midpoint(&self) -> Point {
        Point::new(
            self.horizontal.value() + self.width / self.zoom / 2.0,
            self.vertical.value() + self.height / self.zoom / 2.0,
        )
    }

    /// Scrolls both axes so `rect` (document space) plus `margin` is visible.
    pub fn reveal(&mut self, rect: Rect, margin: f64) -> bool {
        let moved_x = self
            .horizontal
            .clamp_page(rect.x - margin, rect.right() + margin);
        let moved_y = self
            .vertical
            .clamp_page(rect.y - margin, rect.bottom() + margin);
        moved_x || moved_y
    }

    fn update_page_sizes(&mut self) {
        self.horizontal.set_page_size(self.width / self.zoom);
        self.vertical.set_page_size(self.height / self.zoom);
    }
}

fn validate_zoom(zoom: f64) -> Result<(), ViewerError> {
    if zoom.is_finite() && zoom > 0.0 {
        Ok(())
    } else {
        Err(ViewerError::InvalidZoom(zoom))
    }
}
