//! Document normalization.
//!
//! Every resume is reduced to a single raster image before it is sent to
//! the model. Images pass through untouched; PDFs are rasterised page by
//! page and stacked vertically into one tall image.
//!
//! Normalized documents are held in memory and owned by the task that
//! produced them. Nothing is written to a shared scratch path.

mod normalizer;
mod stack;

#[cfg(feature = "pdfium")]
mod pdfium;

pub use normalizer::{
    mime_for_path, DocumentKind, NormalizeError, NormalizedDocument, Normalizer, PageRasterizer,
    RasterizeError, DEFAULT_PAGE_GAP, DEFAULT_RENDER_DPI,
};
pub use stack::stack_pages;

#[cfg(feature = "pdfium")]
pub use pdfium::PdfiumRasterizer;
