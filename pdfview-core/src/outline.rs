//! Document outline (bookmarks) resolved into document space.

use serde::Serialize;

use crate::geometry::{pdf_point_to_page, Point};
use crate::pages::PageStore;

/// Where an outline node points, as reported by the PDF library. `point` is
/// in PDF space of the target page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlineTarget {
    pub page_index: usize,
    pub point: Option<Point>,
}

/// Raw outline node as read from the document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OutlineNode {
    pub title: String,
    pub target: Option<OutlineTarget>,
    pub children: Vec<OutlineNode>,
}

/// Resolved destination: page index and a point in document space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Destination {
    pub page: usize,
    pub point: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlineEntry {
    pub title: String,
    pub destination: Option<Destination>,
    pub children: Vec<OutlineEntry>,
}

impl OutlineEntry {
    /// Depth-first listing of `entries` with their nesting depth.
    pub fn flatten(entries: &[OutlineEntry]) -> Vec<(usize, &OutlineEntry)> {
        fn walk<'a>(entries: &'a [OutlineEntry], depth: usize, out: &mut Vec<(usize, &'a OutlineEntry)>) {
            for entry in entries {
                out.push((depth, entry));
                walk(&entry.children, depth + 1, out);
            }
        }

        let mut out = Vec::new();
        walk(entries, 0, &mut out);
        out
    }
}

pub fn resolve_outline(nodes: &[OutlineNode], pages: &PageStore) -> Vec<OutlineEntry> {
    nodes
        .iter()
        .map(|node| OutlineEntry {
            title: node.title.clone(),
            destination: node.target.and_then(|target| resolve_target(target, pages)),
            children: resolve_outline(&node.children, pages),
        })
        .collect()
}

fn resolve_target(target: OutlineTarget, pages: &PageStore) -> Option<Destination> {
    let page = pages.get(target.page_index)?;
    let local = target
        .point
        .map(|point| pdf_point_to_page(point, page.height()))
        .unwrap_or_default();
    Some(Destination {
        page: target.page_index,
        point: Point::new(page.x() + local.x, page.y() + local.y),
    })
}
