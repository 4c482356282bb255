use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use directories::ProjectDirs;
use pdfview_core::{
    Command, Document, DocumentMetadata, OutlineEntry, PageInfo, ScrollSnapshot, ViewerConfig,
    ViewerContext,
};
use pdfview_render::{PdfRenderFactory, PngPrintBackend, RasterCanvas};
use serde::Serialize;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(
    name = "pdfview",
    version,
    about = "Headless host for the pdfview document viewport"
)]
struct Args {
    /// PDF file to open
    file: PathBuf,

    /// Password for encrypted documents
    #[arg(long)]
    password: Option<String>,

    /// Configuration file (defaults to the platform config dir)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    #[arg(short = 'z', long)]
    zoom: Option<f64>,

    /// Viewport width in pixels
    #[arg(long)]
    width: Option<f64>,

    /// Viewport height in pixels
    #[arg(long)]
    height: Option<f64>,

    #[arg(long = "scroll-x")]
    scroll_x: Option<f64>,

    #[arg(long = "scroll-y")]
    scroll_y: Option<f64>,

    /// Page to scroll to (0-based)
    #[arg(short = 'p', long)]
    page: Option<usize>,

    /// Text to search for
    #[arg(short = 's', long)]
    search: Option<String>,

    #[arg(long)]
    backward: bool,

    #[arg(long = "no-wrap")]
    no_wrap: bool,

    #[arg(long = "case-sensitive")]
    case_sensitive: bool,

    /// Extra matches to step through after the first one
    #[arg(long, default_value_t = 0)]
    next: usize,

    /// Write the visible frame to this PNG file
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Print the document outline
    #[arg(long)]
    outline: bool,

    /// Print document and viewport state as JSON
    #[arg(long)]
    info: bool,

    /// Rasterise pages into this directory as PNG files
    #[arg(long = "print-dir")]
    print_dir: Option<PathBuf>,

    /// Only print this page (0-based)
    #[arg(long = "print-page", requires = "print_dir")]
    print_page: Option<usize>,
}

#[derive(Serialize)]
struct Report<'a> {
    path: &'a PathBuf,
    page_count: usize,
    current_page: usize,
    zoom: f64,
    metadata: Option<DocumentMetadata>,
    scroll: ScrollSnapshot,
    pages: Vec<PageInfo>,
    search: Option<SearchReport>,
}

#[derive(Serialize)]
struct SearchReport {
    query: String,
    total: usize,
    current: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let project_dirs = ProjectDirs::from("net", "pdfview", "pdfview")
        .ok_or_else(|| anyhow!("unable to resolve platform data directories"))?;
    let _log_guard = init_logging(&project_dirs)?;

    let config = ViewerConfig::load_or_default(args.config.as_deref())?;
    let provider = PdfRenderFactory::new()?;
    let context = Arc::new(ViewerContext::new(config, Arc::new(provider)));

    let mut document = Document::new(context)?;
    let events = document.events();
    document.set_path(args.file.clone());
    document.set_password(args.password.clone());
    document
        .load()
        .await
        .with_context(|| format!("failed to open {:?}", args.file))?;

    apply_viewport_args(&args, &mut document)?;

    if let Some(query) = &args.search {
        run_search(&mut document, query, &args)?;
    }

    if args.outline {
        print_outline(&document.outline()?);
    }

    if args.info {
        let report = Report {
            path: &args.file,
            page_count: document.page_count(),
            current_page: document.current_page_number(),
            zoom: document.zoom(),
            metadata: document.metadata(),
            scroll: document.scroll(),
            pages: document.pages(),
            search: document.search_session().map(|session| SearchReport {
                query: session.query().to_owned(),
                total: session.total(),
                current: session.current().and_then(|at| session.ordinal(at)),
            }),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if let Some(output) = &args.output {
        let (width, height) = document.viewport().allocation();
        let mut canvas =
            RasterCanvas::new(width.ceil().max(1.0) as u32, height.ceil().max(1.0) as u32);
        let stats = document.render(&mut canvas);
        info!(painted = ?stats.painted, culled = stats.culled, "frame rendered");
        canvas.save_png(output)?;
    }

    if let Some(dir) = &args.print_dir {
        let mut printer = PngPrintBackend::new(dir.clone());
        document.print(&mut printer, args.print_page)?;
        for path in printer.written() {
            println!("{}", path.display());
        }
    }

    for event in events.drain() {
        debug!(?event, "viewer event");
    }
    document.destroy();
    Ok(())
}

/// Applies size, zoom, page and scroll options in that order. Scroll offsets
/// given for one axis keep the other axis where the earlier steps left it.
fn apply_viewport_args(args: &Args, document: &mut Document) -> Result<()> {
    if args.width.is_some() || args.height.is_some() {
        let (width, height) = document.viewport().allocation();
        document.apply(Command::Resize {
            width: args.width.unwrap_or(width),
            height: args.height.unwrap_or(height),
        })?;
    }
    if let Some(zoom) = args.zoom {
        document.apply(Command::SetZoom { zoom })?;
    }
    if let Some(page) = args.page {
        document.apply(Command::GotoPage { page })?;
    }
    if args.scroll_x.is_some() || args.scroll_y.is_some() {
        let scroll = document.scroll();
        document.apply(Command::ScrollTo {
            x: args.scroll_x.unwrap_or(scroll.x),
            y: args.scroll_y.unwrap_or(scroll.y),
        })?;
    }
    Ok(())
}

fn run_search(document: &mut Document, query: &str, args: &Args) -> Result<()> {
    let forward = !args.backward;
    let wrap = !args.no_wrap;
    for _ in 0..=args.next {
        if !document.search(query, args.case_sensitive, forward, wrap)? {
            warn!(query, "no further matches");
            break;
        }
    }

    let Some(session) = document.search_session() else {
        return Ok(());
    };
    match session.current() {
        Some(at) => println!(
            "match {}/{} on page {}",
            session.ordinal(at).map_or(0, |n| n + 1),
            session.total(),
            at.page + 1
        ),
        None => println!("no matches for {:?}", query),
    }
    Ok(())
}

fn print_outline(entries: &[OutlineEntry]) {
    for (depth, entry) in OutlineEntry::flatten(entries) {
        let indent = "  ".repeat(depth);
        match entry.destination {
            Some(destination) => println!(
                "{}{} (page {}, y {:.0})",
                indent,
                entry.title,
                destination.page + 1,
                destination.point.y
            ),
            None => println!("{}{}", indent, entry.title),
        }
    }
}

fn init_logging(project_dirs: &ProjectDirs) -> Result<WorkerGuard> {
    let log_dir = project_dirs.data_local_dir().join("logs");
    fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(log_dir, "pdfview.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer);
    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|err| anyhow!(err))?;

    Ok(guard)
}
