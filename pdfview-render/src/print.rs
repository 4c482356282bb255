use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use pdfview_core::{Canvas, PrintBackend, PrintError, PrintSettings, PrintSource, Rgba};
use tracing::{info, instrument};

use crate::canvas::RasterCanvas;

/// Print backend that writes every printed page to `<dir>/<job>-NNNN.png`.
pub struct PngPrintBackend {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl PngPrintBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Files produced so far, in print order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl PrintBackend for PngPrintBackend {
    #[instrument(skip(self, source), fields(dir = ?self.dir))]
    fn run(&mut self, settings: &PrintSettings, source: &dyn PrintSource) -> Result<(), PrintError> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create print directory {:?}", self.dir))
            .map_err(PrintError::Backend)?;
        let stem = file_stem(&settings.job_name);

        for index in settings.page_range.clone() {
            let size = source.page_size(index).ok_or(PrintError::PageOutOfRange {
                index,
                count: source.page_count(),
            })?;
            let width = (size.width * settings.scale).ceil().max(1.0) as u32;
            let height = (size.height * settings.scale).ceil().max(1.0) as u32;

            let mut canvas = RasterCanvas::new(width, height);
            canvas.clear(Rgba::WHITE);
            source
                .draw_page(index, &mut canvas, settings.scale)
                .map_err(PrintError::Backend)?;

            let path = self.dir.join(format!("{}-{:04}.png", stem, index + 1));
            canvas.save_png(&path).map_err(PrintError::Backend)?;
            info!(page = index, ?path, "page printed");
            self.written.push(path);
        }
        Ok(())
    }
}

fn file_stem(job_name: &str) -> String {
    let stem = job_name
        .trim_end_matches(".pdf")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect::<String>();
    if stem.is_empty() {
        "page".to_owned()
    } else {
        stem
    }
}
