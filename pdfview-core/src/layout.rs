//! Page placement. The controller hands the intrinsic page sizes to a chain
//! of [`LayoutPolicy`] implementations and takes the first answer.

use tracing::debug;

use crate::error::LayoutError;
use crate::geometry::{PageSize, Point};

pub const DEFAULT_SPACING: f64 = 10.0;

/// Positions of every page in document space plus the total extent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentLayout {
    pub positions: Vec<Point>,
    pub width: f64,
    pub height: f64,
}

pub trait LayoutPolicy: Send + Sync {
    /// `None` means the policy declines and the next one is asked.
    fn layout(&self, sizes: &[PageSize]) -> Option<DocumentLayout>;
}

impl<F> LayoutPolicy for F
where
    F: Fn(&[PageSize]) -> Option<DocumentLayout> + Send + Sync,
{
    fn layout(&self, sizes: &[PageSize]) -> Option<DocumentLayout> {
        self(sizes)
    }
}

/// Pages stacked top to bottom with `spacing` between them, each centred
/// against the widest page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalStack {
    pub spacing: f64,
}

impl Default for VerticalStack {
    fn default() -> Self {
        Self {
            spacing: DEFAULT_SPACING,
        }
    }
}

impl LayoutPolicy for VerticalStack {
    fn layout(&self, sizes: &[PageSize]) -> Option<DocumentLayout> {
        let width = sizes.iter().map(|s| s.width).fold(0.0, f64::max);
        let mut height = 0.0;
        let mut positions = Vec::with_capacity(sizes.len());
        for size in sizes {
            positions.push(Point::new((width - size.width) / 2.0, height));
            height += size.height + self.spacing;
        }
        if !sizes.is_empty() {
            height -= self.spacing;
        }
        Some(DocumentLayout {
            positions,
            width,
            height,
        })
    }
}

pub fn run_policies(
    policies: &[Box<dyn LayoutPolicy>],
    sizes: &[PageSize],
) -> Result<DocumentLayout, LayoutError> {
    for (index, policy) in policies.iter().enumerate() {
        if let Some(layout) = policy.layout(sizes) {
            if layout.positions.len() != sizes.len() {
                return Err(LayoutError::PageCountMismatch {
                    expected: sizes.len(),
                    got: layout.positions.len(),
                });
            }
            debug!(
                policy = index,
                width = layout.width,
                height = layout.height,
                "layout computed"
            );
            return Ok(layout);
        }
    }
    Err(LayoutError::NoPolicy)
}
