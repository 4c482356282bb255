//! Concrete collaborators for `pdfview-core`: a Pdfium document provider, a
//! software raster canvas and a PNG print backend.

mod canvas;
#[cfg(feature = "pdf")]
mod pdfium;
mod print;

pub use canvas::{to_rgba_image, RasterCanvas};
#[cfg(feature = "pdf")]
pub use pdfium::{PdfiumProvider, PDFIUM_LIBRARY_ENV};
pub use print::PngPrintBackend;

#[cfg(feature = "pdf")]
pub type PdfRenderFactory = PdfiumProvider;
