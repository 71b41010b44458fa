//! PDF rasterisation backed by pdfium.
//!
//! pdfium keeps process-global state: creating a `Pdfium` initialises the
//! library and dropping it tears the library down for every thread. A single
//! instance is therefore created lazily on a dedicated render thread and kept
//! until the process exits. Every `PdfiumRasterizer` sends its work to that
//! thread, so renders are serialised no matter how many blocking tasks call in.

use image::{DynamicImage, RgbaImage};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, OnceLock};
use std::thread;

use super::normalizer::{PageRasterizer, RasterizeError};

/// Points per inch in PDF user space.
const POINTS_PER_INCH: f32 = 72.0;

const RENDER_THREAD_NAME: &str = "pdfium-render";

static RENDER_THREAD: OnceLock<Result<RenderThread, RasterizeError>> = OnceLock::new();

/// Renders PDF pages with the pdfium library.
///
/// The library is bound once per process, on first use. The library
/// directory of the rasterizer that triggers the bind is the one used for
/// the rest of the process; a failed bind is reported to every later call.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    /// Directory containing the pdfium shared library; system lookup if unset
    library_dir: Option<PathBuf>,
}

impl PdfiumRasterizer {
    /// Bind to the system pdfium library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind to the pdfium library in a specific directory.
    pub fn with_library_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            library_dir: Some(dir.into()),
        }
    }

    fn render_thread(&self) -> Result<&'static RenderThread, RasterizeError> {
        let library_dir = self.library_dir.clone();
        RENDER_THREAD
            .get_or_init(|| RenderThread::spawn(move || bind(library_dir.as_deref())))
            .as_ref()
            .map_err(|e| RasterizeError(e.0.clone()))
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn rasterize(&self, pdf: &[u8], dpi: u16) -> Result<Vec<DynamicImage>, RasterizeError> {
        self.render_thread()?.render(pdf, dpi)
    }
}

fn bind(library_dir: Option<&Path>) -> Result<Pdfium, RasterizeError> {
    let bindings = match library_dir {
        Some(dir) => {
            let dir = dir.to_string_lossy().to_string();
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&dir))
        }
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| RasterizeError(format!("pdfium library unavailable: {}", e)))?;

    tracing::debug!("pdfium bound on render thread");
    Ok(Pdfium::new(bindings))
}

/// Whatever actually turns PDF bytes into page images on the render thread.
trait RenderBackend {
    fn render(&self, pdf: &[u8], dpi: u16) -> Result<Vec<DynamicImage>, RasterizeError>;
}

impl RenderBackend for Pdfium {
    fn render(&self, pdf: &[u8], dpi: u16) -> Result<Vec<DynamicImage>, RasterizeError> {
        let document = self
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(|e| RasterizeError(e.to_string()))?;

        let config =
            PdfRenderConfig::new().scale_page_by_factor(f32::from(dpi) / POINTS_PER_INCH);

        let mut pages = Vec::new();
        for (index, page) in document.pages().iter().enumerate() {
            let bitmap = page
                .render_with_config(&config)
                .map_err(|e| RasterizeError(format!("page {}: {}", index + 1, e)))?;

            let width = bitmap.width() as u32;
            let height = bitmap.height() as u32;
            let rgba = RgbaImage::from_raw(width, height, bitmap.as_rgba_bytes()).ok_or_else(
                || RasterizeError(format!("page {}: bitmap size mismatch", index + 1)),
            )?;

            pages.push(DynamicImage::ImageRgba8(rgba));
        }

        Ok(pages)
    }
}

type RenderResult = Result<Vec<DynamicImage>, RasterizeError>;

struct RenderJob {
    pdf: Vec<u8>,
    dpi: u16,
    reply: mpsc::Sender<RenderResult>,
}

/// Handle to the thread that owns the render backend.
///
/// The thread runs until the process exits; the backend is never dropped.
struct RenderThread {
    jobs: mpsc::Sender<RenderJob>,
}

impl RenderThread {
    /// Start the thread and build the backend on it.
    ///
    /// Returns once `init` has finished, with its error if it failed.
    fn spawn<B, F>(init: F) -> Result<Self, RasterizeError>
    where
        B: RenderBackend + 'static,
        F: FnOnce() -> Result<B, RasterizeError> + Send + 'static,
    {
        let (jobs, queue) = mpsc::channel::<RenderJob>();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);

        thread::Builder::new()
            .name(RENDER_THREAD_NAME.to_string())
            .spawn(move || {
                let backend = match init() {
                    Ok(backend) => {
                        let _ = ready_tx.send(Ok(()));
                        backend
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                for job in queue {
                    let _ = job.reply.send(backend.render(&job.pdf, job.dpi));
                }
            })
            .map_err(|e| RasterizeError(format!("failed to start render thread: {}", e)))?;

        ready_rx
            .recv()
            .map_err(|_| RasterizeError("render thread exited during startup".to_string()))??;

        Ok(Self { jobs })
    }

    fn render(&self, pdf: &[u8], dpi: u16) -> RenderResult {
        let (reply, response) = mpsc::channel();
        self.jobs
            .send(RenderJob {
                pdf: pdf.to_vec(),
                dpi,
                reply,
            })
            .map_err(|_| RasterizeError("render thread has stopped".to_string()))?;

        response
            .recv()
            .map_err(|_| RasterizeError("render thread dropped the job".to_string()))?
    }
}
