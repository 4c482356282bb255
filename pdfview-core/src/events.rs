use std::sync::Arc;

use parking_lot::Mutex;

use crate::search::MatchRef;

/// Notifications pushed by [`crate::Document`] whenever its visible state
/// changes. The host drains them on the UI thread and repaints.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    Loaded { pages: usize },
    LayoutChanged { width: f64, height: f64 },
    ScrollChanged { x: f64, y: f64 },
    ZoomChanged { zoom: f64 },
    SearchChanged { total: usize, current: Option<MatchRef> },
    RedrawNeeded,
    Destroyed,
}

#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    inner: Arc<Mutex<Vec<ViewerEvent>>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: ViewerEvent) {
        self.inner.lock().push(event);
    }

    pub fn drain(&self) -> Vec<ViewerEvent> {
        std::mem::take(&mut *self.inner.lock())
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
