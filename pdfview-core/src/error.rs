use std::path::PathBuf;

use thiserror::Error;

/// Failures of [`crate::Document::load`]. The document keeps its pre-load
/// state whenever one of these is returned.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no path given to document")]
    NoPath,
    #[error("document {0:?} does not exist or cannot be read")]
    NotFound(PathBuf),
    #[error("document {0:?} is encrypted and the password is missing or wrong")]
    PasswordRequired(PathBuf),
    #[error("document {path:?} is malformed: {reason}")]
    Malformed { path: PathBuf, reason: String },
    #[error("document is already loaded; reloading is not supported")]
    AlreadyLoaded,
    #[error("document has been destroyed")]
    Destroyed,
    #[error("failed to open document: {0:#}")]
    Backend(#[source] anyhow::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("no layout policy responded")]
    NoPolicy,
    #[error("layout policy positioned {got} pages, document has {expected}")]
    PageCountMismatch { expected: usize, got: usize },
}

#[derive(Debug, Error)]
pub enum PrintError {
    #[error("no document loaded")]
    NotLoaded,
    #[error("page {index} out of range (document has {count} pages)")]
    PageOutOfRange { index: usize, count: usize },
    #[error("print job cancelled")]
    Cancelled,
    #[error("print backend failed: {0:#}")]
    Backend(#[source] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("no document loaded")]
    NotLoaded,
    #[error("match {page}:{index} is not part of the active search")]
    UnknownMatch { page: usize, index: usize },
    #[error("text search failed on page {page}: {source:#}")]
    Backend {
        page: usize,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Print(#[from] PrintError),
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error("zoom must be a finite number greater than zero, got {0}")]
    InvalidZoom(f64),
    #[error("no document loaded")]
    NotLoaded,
    #[error("page {index} out of range (document has {count} pages)")]
    PageOutOfRange { index: usize, count: usize },
    #[error("property `{name}` expects {expected}")]
    PropertyType {
        name: String,
        expected: &'static str,
    },
    #[error("property `{0}` is read-only")]
    ReadOnlyProperty(String),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}
