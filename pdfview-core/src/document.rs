//! The document controller: owns the decoded document, its pages, the
//! viewport and the active search, and keeps them consistent.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::config::ViewerConfig;
use crate::error::{LoadError, PrintError, SearchError, ViewerError};
use crate::events::{EventQueue, ViewerEvent};
use crate::geometry::{page_to_document, pdf_to_page, Point};
use crate::layout::{run_policies, LayoutPolicy};
use crate::outline::{resolve_outline, OutlineEntry};
use crate::pages::{PageInfo, PageStore};
use crate::print::{DocumentPrintSource, PrintBackend, PrintSettings};
use crate::properties::ScrollSnapshot;
use crate::render::{Canvas, FrameStats, Renderer};
use crate::scroll::Viewport;
use crate::search::{Direction, MatchRef, SearchSession};
use crate::{DocumentBackend, DocumentMetadata, DocumentProvider};

/// Application-wide collaborators shared by every document.
pub struct ViewerContext {
    pub config: ViewerConfig,
    pub provider: Arc<dyn DocumentProvider>,
}

impl ViewerContext {
    pub fn new(config: ViewerConfig, provider: Arc<dyn DocumentProvider>) -> Self {
        Self { config, provider }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ScrollTo { x: f64, y: f64 },
    ScrollBy { dx: f64, dy: f64 },
    /// Scroll by multiples of the step increment.
    StepScroll { dx: f64, dy: f64 },
    /// Scroll by multiples of the page increment.
    PageScroll { dx: f64, dy: f64 },
    SetZoom { zoom: f64 },
    ZoomBy { factor: f64 },
    Resize { width: f64, height: f64 },
    GotoPage { page: usize },
    ClearSearch,
}

enum LoadState {
    Empty,
    Loaded(Arc<dyn DocumentBackend>),
    Destroyed,
}

pub struct Document {
    context: Arc<ViewerContext>,
    path: Option<PathBuf>,
    password: Option<String>,
    state: LoadState,
    pages: PageStore,
    viewport: Viewport,
    policies: Vec<Box<dyn LayoutPolicy>>,
    renderer: Renderer,
    search: Option<SearchSession>,
    events: EventQueue,
}

impl Document {
    pub fn new(context: Arc<ViewerContext>) -> Result<Self, ViewerError> {
        let config = &context.config;
        let viewport = Viewport::new(
            config.viewport_width,
            config.viewport_height,
            config.zoom,
            config.scroll_step,
        )?;
        let policies: Vec<Box<dyn LayoutPolicy>> = vec![Box::new(config.layout_policy())];
        let renderer = Renderer::new(config.render_style());
        Ok(Self {
            path: None,
            password: None,
            state: LoadState::Empty,
            pages: PageStore::default(),
            viewport,
            policies,
            renderer,
            search: None,
            events: EventQueue::new(),
            context,
        })
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.context.config
    }

    /// Handle onto the event queue; clones share the same queue.
    pub fn events(&self) -> EventQueue {
        self.events.clone()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Takes effect on the next [`Document::load`].
    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = Some(path.into());
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn set_password(&mut self, password: Option<String>) {
        self.password = password.filter(|p| !p.is_empty());
    }

    /// Registers a policy that is asked before every existing one.
    pub fn push_layout_policy(&mut self, policy: Box<dyn LayoutPolicy>) {
        self.policies.insert(0, policy);
    }

    pub fn clear_layout_policies(&mut self) {
        self.policies.clear();
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, LoadState::Loaded(_))
    }

    fn backend(&self) -> Option<Arc<dyn DocumentBackend>> {
        match &self.state {
            LoadState::Loaded(backend) => Some(Arc::clone(backend)),
            _ => None,
        }
    }

    /// Opens the document at the configured path and lays out its pages.
    /// On error nothing is committed.
    #[instrument(skip(self), fields(path = ?self.path))]
    pub async fn load(&mut self) -> Result<(), ViewerError> {
        match self.state {
            LoadState::Loaded(_) => return Err(LoadError::AlreadyLoaded.into()),
            LoadState::Destroyed => return Err(LoadError::Destroyed.into()),
            LoadState::Empty => {}
        }
        let path = self.path.clone().ok_or(LoadError::NoPath)?;
        let backend = self
            .context
            .provider
            .open(&path, self.password.as_deref())
            .await?;

        let sizes = backend.info().page_sizes.clone();
        let layout = run_policies(&self.policies, &sizes)?;
        let mut pages = PageStore::from_sizes(&sizes);
        pages.apply_layout(&layout);

        self.pages = pages;
        self.viewport.set_extent(layout.width, layout.height);
        self.viewport.scroll_to(0.0, 0.0);
        self.search = None;
        self.state = LoadState::Loaded(backend);

        info!(pages = sizes.len(), width = layout.width, height = layout.height, "document loaded");
        self.events.push(ViewerEvent::Loaded { pages: sizes.len() });
        self.events.push(ViewerEvent::LayoutChanged {
            width: layout.width,
            height: layout.height,
        });
        self.events.push(ViewerEvent::RedrawNeeded);
        Ok(())
    }

    /// Runs the layout policies again, e.g. after one was added.
    pub fn relayout(&mut self) -> Result<(), ViewerError> {
        if !self.is_loaded() {
            return Err(ViewerError::NotLoaded);
        }
        let layout = run_policies(&self.policies, &self.pages.sizes())?;
        self.pages.apply_layout(&layout);
        let before = self.viewport.scroll_offset();
        self.viewport.set_extent(layout.width, layout.height);
        self.events.push(ViewerEvent::LayoutChanged {
            width: layout.width,
            height: layout.height,
        });
        self.notify_scroll(before);
        self.events.push(ViewerEvent::RedrawNeeded);
        Ok(())
    }

    pub fn pages(&self) -> Vec<PageInfo> {
        self.pages.infos()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page_text(&self, index: usize) -> Result<String, ViewerError> {
        let backend = self.backend().ok_or(ViewerError::NotLoaded)?;
        self.check_page(index)?;
        Ok(backend.page_text(index)?)
    }

    pub fn metadata(&self) -> Option<DocumentMetadata> {
        self.backend().map(|backend| backend.info().metadata.clone())
    }

    pub fn outline(&self) -> Result<Vec<OutlineEntry>, ViewerError> {
        let backend = self.backend().ok_or(ViewerError::NotLoaded)?;
        let nodes = backend.outline()?;
        Ok(resolve_outline(&nodes, &self.pages))
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn zoom(&self) -> f64 {
        self.viewport.zoom()
    }

    /// Changing the zoom drops every cached page surface.
    pub fn set_zoom(&mut self, zoom: f64) -> Result<(), ViewerError> {
        let before = self.viewport.scroll_offset();
        if self.viewport.set_zoom(zoom)? {
            self.pages.invalidate_surfaces();
            debug!(zoom, "zoom changed, page surfaces invalidated");
            self.events.push(ViewerEvent::ZoomChanged { zoom });
            self.notify_scroll(before);
            self.events.push(ViewerEvent::RedrawNeeded);
        }
        Ok(())
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        let before = self.viewport.scroll_offset();
        if self.viewport.resize(width, height) {
            self.notify_scroll(before);
            self.events.push(ViewerEvent::RedrawNeeded);
        }
    }

    pub fn scroll(&self) -> ScrollSnapshot {
        ScrollSnapshot::from(&self.viewport)
    }

    pub fn scroll_to(&mut self, x: f64, y: f64) {
        let before = self.viewport.scroll_offset();
        self.viewport.scroll_to(x, y);
        self.notify_scroll(before);
    }

    pub fn set_scroll_x(&mut self, x: f64) {
        let y = self.viewport.vertical.value();
        self.scroll_to(x, y);
    }

    pub fn set_scroll_y(&mut self, y: f64) {
        let x = self.viewport.horizontal.value();
        self.scroll_to(x, y);
    }

    pub fn scroll_by(&mut self, dx: f64, dy: f64) {
        let offset = self.viewport.scroll_offset();
        self.scroll_to(offset.x + dx, offset.y + dy);
    }

    /// Zero-based page under the centre of the viewport, 0 if the centre
    /// falls between pages.
    pub fn current_page(&self) -> usize {
        self.pages.page_at(self.viewport.midpoint()).unwrap_or(0)
    }

    pub fn current_page_number(&self) -> usize {
        self.current_page() + 1
    }

    /// Aligns the top of page `index` with the top of the viewport.
    pub fn goto_page(&mut self, index: usize) -> Result<(), ViewerError> {
        self.check_page(index)?;
        let y = self.pages.get(index).map(|page| page.y()).unwrap_or_default();
        self.set_scroll_y(y);
        Ok(())
    }

    pub fn apply(&mut self, command: Command) -> Result<(), ViewerError> {
        match command {
            Command::ScrollTo { x, y } => self.scroll_to(x, y),
            Command::ScrollBy { dx, dy } => self.scroll_by(dx, dy),
            Command::StepScroll { dx, dy } => {
                let before = self.viewport.scroll_offset();
                self.viewport.horizontal.step(dx);
                self.viewport.vertical.step(dy);
                self.notify_scroll(before);
            }
            Command::PageScroll { dx, dy } => {
                let before = self.viewport.scroll_offset();
                self.viewport.horizontal.page(dx);
                self.viewport.vertical.page(dy);
                self.notify_scroll(before);
            }
            Command::SetZoom { zoom } => self.set_zoom(zoom)?,
            Command::ZoomBy { factor } => self.set_zoom(self.zoom() * factor)?,
            Command::Resize { width, height } => self.resize(width, height),
            Command::GotoPage { page } => self.goto_page(page)?,
            Command::ClearSearch => self.clear_search(),
        }
        Ok(())
    }

    /// Moves to the next match of `text`. A new query (or case flag) discards
    /// the active session and searches every page again. Empty text clears
    /// the search. Returns whether a match was found.
    #[instrument(skip(self))]
    pub fn search(
        &mut self,
        text: &str,
        case_sensitive: bool,
        forward: bool,
        wrap: bool,
    ) -> Result<bool, ViewerError> {
        let backend = self.backend().ok_or(SearchError::NotLoaded)?;
        if text.is_empty() {
            self.clear_search();
            return Ok(false);
        }

        let reuse = self
            .search
            .as_ref()
            .map_or(false, |session| session.answers(text, case_sensitive));
        if !reuse {
            let origin = self.current_page();
            self.search = None;
            let session = SearchSession::start(backend.as_ref(), text, case_sensitive, origin)?;
            self.search = Some(session);
        }

        let Some(session) = self.search.as_mut() else {
            return Ok(false);
        };
        let found = session.advance(Direction::from_forward(forward), wrap);
        let total = session.total();
        let current = session.current();
        debug!(found, total, ?current, "search advanced");

        if found {
            if let Some(at) = current {
                self.reveal_match(at);
            }
        }
        self.events.push(ViewerEvent::SearchChanged { total, current });
        self.events.push(ViewerEvent::RedrawNeeded);
        Ok(found)
    }

    pub fn search_session(&self) -> Option<&SearchSession> {
        self.search.as_ref()
    }

    pub fn clear_search(&mut self) {
        if self.search.take().is_none() {
            return;
        }
        debug!("search cleared");
        self.events.push(ViewerEvent::SearchChanged {
            total: 0,
            current: None,
        });
        self.events.push(ViewerEvent::RedrawNeeded);
    }

    /// Makes `at` the current match and scrolls it into view.
    pub fn highlight_match(&mut self, at: MatchRef) -> Result<(), ViewerError> {
        let session = self.search.as_mut().ok_or(SearchError::UnknownMatch {
            page: at.page,
            index: at.index,
        })?;
        session.set_current(at)?;
        let total = session.total();
        self.reveal_match(at);
        self.events.push(ViewerEvent::SearchChanged {
            total,
            current: Some(at),
        });
        self.events.push(ViewerEvent::RedrawNeeded);
        Ok(())
    }

    fn reveal_match(&mut self, at: MatchRef) {
        let Some(rect) = self.search.as_ref().and_then(|session| session.get(at)).copied() else {
            return;
        };
        let Some(page) = self.pages.get(at.page) else {
            return;
        };
        let target = page_to_document(&pdf_to_page(&rect, page.height()), &page.frame());
        let before = self.viewport.scroll_offset();
        self.viewport.reveal(target, self.context.config.clamp_margin);
        self.notify_scroll(before);
    }

    /// Prints page `page`, or every page when `None`.
    #[instrument(skip(self, printer))]
    pub fn print(&self, printer: &mut dyn PrintBackend, page: Option<usize>) -> Result<(), ViewerError> {
        let backend = self.backend().ok_or(PrintError::NotLoaded)?;
        let job_name = self
            .path
            .as_deref()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "pdfview".to_owned());
        let settings = PrintSettings::for_selection(
            job_name,
            page,
            self.pages.len(),
            self.context.config.print_scale,
        )?;
        let source = DocumentPrintSource::new(backend.as_ref(), &self.pages, &self.renderer);
        printer.run(&settings, &source)?;
        info!(pages = settings.page_count(), "print job finished");
        Ok(())
    }

    /// Paints the visible part of the document.
    pub fn render(&mut self, canvas: &mut dyn Canvas) -> FrameStats {
        match self.backend() {
            Some(backend) => self.renderer.render_frame(
                canvas,
                &mut self.pages,
                &self.viewport,
                backend.as_ref(),
                self.search.as_ref(),
            ),
            None => {
                canvas.identity();
                canvas.clear(self.renderer.style().background);
                FrameStats::default()
            }
        }
    }

    /// Releases the backend, pages, surfaces and search state. The document
    /// cannot be loaded again afterwards.
    pub fn destroy(&mut self) {
        if matches!(self.state, LoadState::Destroyed) {
            return;
        }
        self.state = LoadState::Destroyed;
        self.search = None;
        self.pages.clear();
        self.viewport.set_extent(0.0, 0.0);
        info!(path = ?self.path, "document destroyed");
        self.events.push(ViewerEvent::Destroyed);
    }

    fn check_page(&self, index: usize) -> Result<(), ViewerError> {
        if index < self.pages.len() {
            Ok(())
        } else {
            Err(ViewerError::PageOutOfRange {
                index,
                count: self.pages.len(),
            })
        }
    }

    fn notify_scroll(&self, before: Point) {
        let after = self.viewport.scroll_offset();
        if after != before {
            self.events.push(ViewerEvent::ScrollChanged {
                x: after.x,
                y: after.y,
            });
            self.events.push(ViewerEvent::RedrawNeeded);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PageSize;
    use crate::layout::DocumentLayout;
    use crate::outline::{Destination, OutlineNode, OutlineTarget};
    use crate::test_support::{FakeBackend, FakeProvider, RecordingCanvas, RecordingPrintBackend};

    fn document_with(provider: FakeProvider, width: f64, height: f64) -> Document {
        let config = ViewerConfig {
            viewport_width: width,
            viewport_height: height,
            ..ViewerConfig::default()
        };
        let context = Arc::new(ViewerContext::new(config, Arc::new(provider)));
        let mut document = Document::new(context).unwrap();
        document.set_path("/docs/sample.pdf");
        document
    }

    async fn loaded(backend: FakeBackend, width: f64, height: f64) -> (Document, Arc<FakeBackend>) {
        let provider = FakeProvider::new(backend);
        let handle = Arc::clone(&provider.backend);
        let mut document = document_with(provider, width, height);
        document.load().await.unwrap();
        (document, handle)
    }

    #[tokio::test]
    async fn load_lays_out_three_pages() {
        let backend = FakeBackend::with_pages(&[(100.0, 100.0), (100.0, 200.0), (100.0, 150.0)]);
        let (document, _) = loaded(backend, 300.0, 300.0).await;

        let pages = document.pages();
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[1].y, 110.0);
        assert_eq!(pages[2].y, 320.0);
        assert_eq!(document.viewport().vertical.upper(), 470.0);

        let events = document.events().drain();
        assert_eq!(events[0], ViewerEvent::Loaded { pages: 3 });
        assert!(events.contains(&ViewerEvent::LayoutChanged {
            width: 100.0,
            height: 470.0
        }));
    }

    #[tokio::test]
    async fn zoom_updates_page_size_and_drops_surfaces() {
        let backend = FakeBackend::with_pages(&[(300.0, 400.0)]);
        let (mut document, backend) = loaded(backend, 300.0, 300.0).await;
        let mut canvas = RecordingCanvas::default();

        document.render(&mut canvas);
        document.set_zoom(2.0).unwrap();
        assert_eq!(document.viewport().horizontal.page_size(), 150.0);
        assert_eq!(document.viewport().vertical.page_size(), 150.0);

        document.render(&mut canvas);
        assert_eq!(backend.rendered_pages(), vec![0, 0]);
        assert!(document
            .events()
            .drain()
            .contains(&ViewerEvent::ZoomChanged { zoom: 2.0 }));

        assert!(matches!(
            document.set_zoom(-1.0),
            Err(ViewerError::InvalidZoom(_))
        ));
        assert_eq!(document.zoom(), 2.0);
    }

    #[tokio::test]
    async fn search_walks_matches_on_pages_zero_and_two() {
        let backend = FakeBackend::with_text(
            &[(100.0, 100.0); 3],
            &["a needle here", "nothing to see", "one more needle"],
        );
        let (mut document, _) = loaded(backend, 100.0, 100.0).await;

        assert!(document.search("needle", false, true, false).unwrap());
        assert_eq!(
            document.search_session().unwrap().current(),
            Some(MatchRef::new(0, 0))
        );

        assert!(document.search("needle", false, true, false).unwrap());
        assert_eq!(
            document.search_session().unwrap().current(),
            Some(MatchRef::new(2, 0))
        );

        assert!(!document.search("needle", false, true, false).unwrap());
        assert_eq!(
            document.search_session().unwrap().current(),
            Some(MatchRef::new(2, 0))
        );

        assert!(document.search("needle", false, true, true).unwrap());
        assert_eq!(
            document.search_session().unwrap().current(),
            Some(MatchRef::new(0, 0))
        );
    }

    #[tokio::test]
    async fn repeated_query_reuses_matches_and_new_query_recomputes() {
        let backend = FakeBackend::with_text(
            &[(100.0, 100.0); 3],
            &["needle needle", "", "needle"],
        );
        let (mut document, backend) = loaded(backend, 100.0, 100.0).await;

        document.search("needle", false, true, false).unwrap();
        let first: Vec<_> = document
            .search_session()
            .unwrap()
            .iter()
            .map(|(at, rect)| (at, *rect))
            .collect();
        document.search("needle", false, true, false).unwrap();
        assert_eq!(backend.search_calls(), 3);

        document.clear_search();
        document.search("needle", false, true, false).unwrap();
        let second: Vec<_> = document
            .search_session()
            .unwrap()
            .iter()
            .map(|(at, rect)| (at, *rect))
            .collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
        assert!(first.windows(2).all(|pair| pair[0].0 < pair[1].0));

        document.search("NEEDLE", true, true, false).unwrap();
        assert_eq!(backend.search_calls(), 9);
        assert_eq!(document.search_session().unwrap().total(), 0);
    }

    #[tokio::test]
    async fn empty_query_clears_the_session() {
        let backend = FakeBackend::with_text(&[(100.0, 100.0)], &["needle"]);
        let (mut document, _) = loaded(backend, 100.0, 100.0).await;

        document.search("needle", false, true, false).unwrap();
        assert!(!document.search("", false, true, false).unwrap());
        assert!(document.search_session().is_none());
    }

    #[tokio::test]
    async fn failed_requery_drops_the_previous_session() {
        let mut backend = FakeBackend::with_text(&[(100.0, 100.0); 2], &["good bad", "good bad"]);
        backend.fail_search = Some((1, "bad".to_owned()));
        let (mut document, backend) = loaded(backend, 100.0, 100.0).await;

        assert!(document.search("good", false, true, false).unwrap());
        assert_eq!(document.search_session().unwrap().total(), 2);

        assert!(matches!(
            document.search("bad", false, true, false),
            Err(ViewerError::Search(SearchError::Backend { page: 1, .. }))
        ));
        assert!(document.search_session().is_none());

        let mut canvas = RecordingCanvas::default();
        assert_eq!(document.render(&mut canvas).highlights, 0);

        // the old query is searched again rather than reused
        assert!(document.search("good", false, true, false).unwrap());
        assert_eq!(backend.search_calls(), 6);
    }

    #[tokio::test]
    async fn clearing_without_a_session_is_silent() {
        let backend = FakeBackend::with_text(&[(100.0, 100.0)], &["needle"]);
        let (mut document, _) = loaded(backend, 100.0, 100.0).await;
        document.events().drain();

        document.apply(Command::ClearSearch).unwrap();
        assert!(document.events().is_empty());

        document.search("needle", false, true, false).unwrap();
        document.events().drain();
        document.clear_search();
        assert_eq!(
            document.events().drain(),
            vec![
                ViewerEvent::SearchChanged {
                    total: 0,
                    current: None
                },
                ViewerEvent::RedrawNeeded,
            ]
        );
    }

    #[tokio::test]
    async fn search_scrolls_match_into_view_with_margin() {
        let backend = FakeBackend::with_text(&[(100.0, 1000.0); 3], &["", "", "xxxxx needle"]);
        let (mut document, _) = loaded(backend, 100.0, 100.0).await;

        assert!(document.search("needle", false, true, false).unwrap());
        // page 2 sits at y 2020 and the match spans page y 970..980, so the
        // bottom edge plus margin (3010) lands at the bottom of the view
        assert_eq!(document.scroll().y, 2910.0);

        document.scroll_to(0.0, 0.0);
        document.highlight_match(MatchRef::new(2, 0)).unwrap();
        assert_eq!(document.scroll().y, 2910.0);

        assert!(matches!(
            document.highlight_match(MatchRef::new(1, 0)),
            Err(ViewerError::Search(SearchError::UnknownMatch { page: 1, index: 0 }))
        ));
    }

    #[tokio::test]
    async fn failed_loads_keep_the_empty_state() {
        let mut provider = FakeProvider::new(FakeBackend::with_pages(&[(100.0, 100.0)]));
        provider.password = Some("secret".to_owned());
        let mut document = document_with(provider, 100.0, 100.0);

        document.set_path("/docs/missing.pdf");
        assert!(matches!(
            document.load().await,
            Err(ViewerError::Load(LoadError::NotFound(_)))
        ));
        document.set_path("/docs/broken.pdf");
        assert!(matches!(
            document.load().await,
            Err(ViewerError::Load(LoadError::Malformed { .. }))
        ));
        document.set_path("/docs/locked.pdf");
        assert!(matches!(
            document.load().await,
            Err(ViewerError::Load(LoadError::PasswordRequired(_)))
        ));
        assert!(!document.is_loaded());
        assert_eq!(document.page_count(), 0);
        assert!(document.events().is_empty());

        document.set_password(Some("secret".to_owned()));
        document.load().await.unwrap();
        assert_eq!(document.page_count(), 1);

        assert!(matches!(
            document.load().await,
            Err(ViewerError::Load(LoadError::AlreadyLoaded))
        ));
    }

    #[tokio::test]
    async fn load_without_path_fails() {
        let provider = FakeProvider::new(FakeBackend::with_pages(&[(100.0, 100.0)]));
        let config = ViewerConfig::default();
        let context = Arc::new(ViewerContext::new(config, Arc::new(provider)));
        let mut document = Document::new(context).unwrap();
        assert!(matches!(
            document.load().await,
            Err(ViewerError::Load(LoadError::NoPath))
        ));
    }

    #[tokio::test]
    async fn load_requires_a_responding_layout_policy() {
        let provider = FakeProvider::new(FakeBackend::with_pages(&[(100.0, 100.0)]));
        let mut document = document_with(provider, 100.0, 100.0);
        document.clear_layout_policies();
        document.push_layout_policy(Box::new(|_: &[PageSize]| -> Option<DocumentLayout> { None }));

        assert!(matches!(
            document.load().await,
            Err(ViewerError::Layout(crate::error::LayoutError::NoPolicy))
        ));
        assert!(!document.is_loaded());
    }

    #[tokio::test]
    async fn pushed_policy_takes_precedence() {
        let provider = FakeProvider::new(FakeBackend::with_pages(&[(100.0, 100.0), (100.0, 100.0)]));
        let mut document = document_with(provider, 100.0, 100.0);
        document.push_layout_policy(Box::new(|sizes: &[PageSize]| {
            Some(DocumentLayout {
                positions: sizes
                    .iter()
                    .enumerate()
                    .map(|(i, _)| Point::new(i as f64 * 100.0, 0.0))
                    .collect(),
                width: sizes.len() as f64 * 100.0,
                height: 100.0,
            })
        }));
        document.load().await.unwrap();

        assert_eq!(document.pages()[1].x, 100.0);
        assert_eq!(document.viewport().horizontal.upper(), 200.0);
    }

    #[tokio::test]
    async fn goto_page_and_current_page_follow_the_midpoint() {
        let backend = FakeBackend::with_pages(&[(100.0, 100.0); 3]);
        let (mut document, _) = loaded(backend, 100.0, 100.0).await;

        assert_eq!(document.current_page_number(), 1);
        document.apply(Command::GotoPage { page: 2 }).unwrap();
        assert_eq!(document.scroll().y, 220.0);
        assert_eq!(document.current_page(), 2);

        // midpoint in the gap between pages 0 and 1
        document.scroll_to(0.0, 55.0);
        assert_eq!(document.current_page(), 0);

        assert!(matches!(
            document.goto_page(3),
            Err(ViewerError::PageOutOfRange { index: 3, count: 3 })
        ));
    }

    #[tokio::test]
    async fn commands_drive_scroll_and_zoom() {
        let backend = FakeBackend::with_pages(&[(100.0, 1000.0)]);
        let (mut document, _) = loaded(backend, 100.0, 100.0).await;
        document.events().drain();

        document.apply(Command::StepScroll { dx: 0.0, dy: 2.0 }).unwrap();
        assert_eq!(document.scroll().y, 40.0);
        document.apply(Command::PageScroll { dx: 0.0, dy: 1.0 }).unwrap();
        assert_eq!(document.scroll().y, 130.0);
        document.apply(Command::ScrollBy { dx: 0.0, dy: -30.0 }).unwrap();
        assert_eq!(document.scroll().y, 100.0);
        document.apply(Command::ZoomBy { factor: 2.0 }).unwrap();
        assert_eq!(document.zoom(), 2.0);

        let events = document.events().drain();
        assert!(events.contains(&ViewerEvent::ScrollChanged { x: 0.0, y: 40.0 }));
        assert!(events.contains(&ViewerEvent::ZoomChanged { zoom: 2.0 }));
    }

    #[tokio::test]
    async fn resize_recomputes_page_size_and_reclamps() {
        let backend = FakeBackend::with_pages(&[(400.0, 1000.0)]);
        let (mut document, _) = loaded(backend, 300.0, 300.0).await;
        document.set_zoom(2.0).unwrap();
        document.scroll_to(250.0, 850.0);
        assert_eq!(document.scroll().x, 250.0);
        document.events().drain();

        document.apply(Command::Resize { width: 600.0, height: 300.0 }).unwrap();

        let scroll = document.scroll();
        assert_eq!(scroll.xpage_size, 300.0);
        assert_eq!(scroll.ypage_size, 150.0);
        assert_eq!(scroll.x, 100.0);
        assert_eq!(scroll.y, 850.0);
        assert!(document
            .events()
            .drain()
            .contains(&ViewerEvent::ScrollChanged { x: 100.0, y: 850.0 }));
    }

    #[tokio::test]
    async fn relayout_applies_a_policy_pushed_after_load() {
        let backend = FakeBackend::with_pages(&[(100.0, 100.0); 2]);
        let (mut document, _) = loaded(backend, 100.0, 100.0).await;
        document.scroll_to(0.0, 110.0);
        assert_eq!(document.scroll().y, 110.0);
        document.events().drain();

        document.push_layout_policy(Box::new(|sizes: &[PageSize]| {
            Some(DocumentLayout {
                positions: (0..sizes.len())
                    .map(|i| Point::new(i as f64 * 100.0, 0.0))
                    .collect(),
                width: sizes.len() as f64 * 100.0,
                height: 100.0,
            })
        }));
        document.relayout().unwrap();

        let pages = document.pages();
        assert_eq!((pages[1].x, pages[1].y), (100.0, 0.0));
        assert_eq!(document.viewport().horizontal.upper(), 200.0);
        assert_eq!(document.viewport().vertical.upper(), 100.0);
        assert_eq!(document.scroll().y, 0.0);

        let events = document.events().drain();
        assert!(events.contains(&ViewerEvent::LayoutChanged {
            width: 200.0,
            height: 100.0
        }));
        assert!(events.contains(&ViewerEvent::ScrollChanged { x: 0.0, y: 0.0 }));
    }

    #[tokio::test]
    async fn render_paints_only_visible_pages() {
        let backend = FakeBackend::with_pages(&[(100.0, 100.0); 3]);
        let (mut document, backend) = loaded(backend, 100.0, 100.0).await;
        let mut canvas = RecordingCanvas::default();

        let stats = document.render(&mut canvas);
        assert_eq!(stats.painted, vec![0]);
        assert_eq!(stats.culled, 2);
        assert_eq!(backend.rendered_pages(), vec![0]);
    }

    #[tokio::test]
    async fn print_selects_pages_and_surfaces_errors() {
        let backend = FakeBackend::with_pages(&[(100.0, 100.0); 3]);
        let (document, _) = loaded(backend, 100.0, 100.0).await;

        let mut printer = RecordingPrintBackend::default();
        document.print(&mut printer, None).unwrap();
        assert_eq!(printer.printed, vec![0, 1, 2]);

        let mut printer = RecordingPrintBackend::default();
        document.print(&mut printer, Some(1)).unwrap();
        assert_eq!(printer.printed, vec![1]);

        assert!(matches!(
            document.print(&mut printer, Some(9)),
            Err(ViewerError::Print(PrintError::PageOutOfRange { index: 9, count: 3 }))
        ));

        let mut cancelled = RecordingPrintBackend {
            cancel: true,
            ..RecordingPrintBackend::default()
        };
        assert!(matches!(
            document.print(&mut cancelled, None),
            Err(ViewerError::Print(PrintError::Cancelled))
        ));
    }

    #[tokio::test]
    async fn operations_before_load_report_not_loaded() {
        let provider = FakeProvider::new(FakeBackend::with_pages(&[(100.0, 100.0)]));
        let mut document = document_with(provider, 100.0, 100.0);
        let mut printer = RecordingPrintBackend::default();

        assert!(matches!(
            document.print(&mut printer, None),
            Err(ViewerError::Print(PrintError::NotLoaded))
        ));
        assert!(matches!(
            document.search("x", false, true, false),
            Err(ViewerError::Search(SearchError::NotLoaded))
        ));
        assert!(matches!(document.outline(), Err(ViewerError::NotLoaded)));
        assert_eq!(document.render(&mut RecordingCanvas::default()), FrameStats::default());
    }

    #[tokio::test]
    async fn outline_resolves_against_layout() {
        let mut backend = FakeBackend::with_pages(&[(100.0, 100.0), (100.0, 100.0)]);
        backend.outline = vec![OutlineNode {
            title: "Second".to_owned(),
            target: Some(OutlineTarget {
                page_index: 1,
                point: Some(Point::new(0.0, 100.0)),
            }),
            children: vec![],
        }];
        let (document, _) = loaded(backend, 100.0, 100.0).await;

        let outline = document.outline().unwrap();
        assert_eq!(
            outline[0].destination,
            Some(Destination {
                page: 1,
                point: Point::new(0.0, 110.0)
            })
        );
    }

    #[tokio::test]
    async fn destroy_releases_everything() {
        let backend = FakeBackend::with_text(&[(100.0, 100.0)], &["needle"]);
        let (mut document, _) = loaded(backend, 100.0, 100.0).await;
        document.search("needle", false, true, false).unwrap();

        document.destroy();

        assert!(!document.is_loaded());
        assert_eq!(document.page_count(), 0);
        assert!(document.search_session().is_none());
        assert!(matches!(
            document.load().await,
            Err(ViewerError::Load(LoadError::Destroyed))
        ));
    }
}
