//! Text search across all pages with a single navigable cursor.
//!
//! A [`SearchSession`] is computed once per distinct query and keeps one
//! match list per page. Matches are ordered by page, then by the order the
//! PDF library reported them; they are never re-sorted.

use serde::Serialize;
use tracing::debug;

use crate::error::SearchError;
use crate::geometry::PdfRect;
use crate::DocumentBackend;

/// Address of one match: page index and position in that page's list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MatchRef {
    pub page: usize,
    pub index: usize,
}

impl MatchRef {
    pub const fn new(page: usize, index: usize) -> Self {
        Self { page, index }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn from_forward(forward: bool) -> Self {
        if forward {
            Direction::Forward
        } else {
            Direction::Backward
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchSession {
    query: String,
    case_sensitive: bool,
    direction: Direction,
    wrap: bool,
    origin_page: usize,
    matches: Vec<Vec<PdfRect>>,
    cursor: Option<MatchRef>,
}

impl SearchSession {
    /// Runs the text search on every page of `backend`. `origin_page` is the
    /// page that was current when the search began.
    pub fn start(
        backend: &dyn DocumentBackend,
        query: &str,
        case_sensitive: bool,
        origin_page: usize,
    ) -> Result<Self, SearchError> {
        let page_count = backend.info().page_count;
        let mut matches = Vec::with_capacity(page_count);
        for page in 0..page_count {
            let rects = backend
                .find_text(page, query, case_sensitive)
                .map_err(|source| SearchError::Backend { page, source })?;
            matches.push(rects);
        }
        let session = Self::from_matches(query, case_sensitive, origin_page, matches);
        debug!(query, total = session.total(), "search session started");
        Ok(session)
    }

    pub fn from_matches(
        query: &str,
        case_sensitive: bool,
        origin_page: usize,
        matches: Vec<Vec<PdfRect>>,
    ) -> Self {
        Self {
            query: query.to_owned(),
            case_sensitive,
            direction: Direction::Forward,
            wrap: false,
            origin_page,
            matches,
            cursor: None,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Whether this session already answers `query`.
    pub fn answers(&self, query: &str, case_sensitive: bool) -> bool {
        self.query == query && self.case_sensitive == case_sensitive
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn wrap(&self) -> bool {
        self.wrap
    }

    pub fn origin_page(&self) -> usize {
        self.origin_page
    }

    pub fn total(&self) -> usize {
        self.matches.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn matches_on(&self, page: usize) -> &[PdfRect] {
        self.matches.get(page).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get(&self, at: MatchRef) -> Option<&PdfRect> {
        self.matches.get(at.page).and_then(|page| page.get(at.index))
    }

    pub fn contains(&self, at: MatchRef) -> bool {
        self.get(at).is_some()
    }

    pub fn current(&self) -> Option<MatchRef> {
        self.cursor
    }

    /// Index of the current match within `page`'s list, if it lives there.
    pub fn current_on(&self, page: usize) -> Option<usize> {
        self.cursor.filter(|c| c.page == page).map(|c| c.index)
    }

    /// All matches in page order.
    pub fn iter(&self) -> impl Iterator<Item = (MatchRef, &PdfRect)> + '_ {
        self.matches.iter().enumerate().flat_map(|(page, rects)| {
            rects
                .iter()
                .enumerate()
                .map(move |(index, rect)| (MatchRef::new(page, index), rect))
        })
    }

    /// Zero-based position of `at` in the global match order.
    pub fn ordinal(&self, at: MatchRef) -> Option<usize> {
        if !self.contains(at) {
            return None;
        }
        let before: usize = self.matches[..at.page].iter().map(Vec::len).sum();
        Some(before + at.index)
    }

    /// Moves the cursor one match in `direction`. Returns `false` and leaves
    /// the cursor untouched when there is nothing further and `wrap` is off.
    pub fn advance(&mut self, direction: Direction, wrap: bool) -> bool {
        self.direction = direction;
        self.wrap = wrap;

        let order: Vec<MatchRef> = self.iter().map(|(at, _)| at).collect();
        if order.is_empty() {
            return false;
        }

        let next = match self.cursor.and_then(|c| self.ordinal(c)) {
            Some(position) => match direction {
                Direction::Forward => order.get(position + 1).copied(),
                Direction::Backward => position.checked_sub(1).map(|p| order[p]),
            },
            None => match direction {
                Direction::Forward => order
                    .iter()
                    .find(|at| at.page >= self.origin_page)
                    .copied(),
                Direction::Backward => order
                    .iter()
                    .rev()
                    .find(|at| at.page < self.origin_page)
                    .copied(),
            },
        };

        let next = match (next, wrap) {
            (Some(at), _) => at,
            (None, true) => match direction {
                Direction::Forward => order[0],
                Direction::Backward => order[order.len() - 1],
            },
            (None, false) => return false,
        };

        self.cursor = Some(next);
        true
    }

    pub fn set_current(&mut self, at: MatchRef) -> Result<(), SearchError> {
        if !self.contains(at) {
            return Err(SearchError::UnknownMatch {
                page: at.page,
                index: at.index,
            });
        }
        self.cursor = Some(at);
        Ok(())
    }
}
