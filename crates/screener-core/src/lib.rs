//! # screener-core
//!
//! Deterministic building blocks for resume screening.
//!
//! This crate answers two questions without touching the network:
//! - What single image should the model see for this resume?
//! - What structured evaluation did the model actually return?
//!
//! ## Key Guarantees
//!
//! 1. **No LLM calls**: normalization and decoding are pure functions of their input
//! 2. **No partial records**: a reply decodes to a complete record or an error
//! 3. **No shared scratch files**: normalized images are owned by their caller
//!
//! ## Example
//!
//! ```rust,ignore
//! use screener_core::{decode_response, Normalizer, ResumeFile};
//!
//! let file = ResumeFile::new("jane.pdf", "application/pdf", std::fs::read("jane.pdf")?);
//! let image = Normalizer::with_pdfium().normalize(&file)?;
//!
//! // ... send `image` to the model ...
//!
//! let record = decode_response(&reply)?;
//! println!("{}: {:?}%", record.candidate_name, record.overall_fit_percentage);
//! ```

pub mod decoder;
pub mod document;
pub mod types;

// Re-export main types at crate root
pub use decoder::{
    decode_response, decode_response_with, DecodeError, DecodeOptions, DecodeStrategy,
    StrategyFailure,
};
pub use document::{
    mime_for_path, stack_pages, DocumentKind, NormalizeError, NormalizedDocument, Normalizer,
    PageRasterizer, RasterizeError,
};
pub use types::{
    Criterion, CriterionRating, EvaluationRecord, RangeViolation, ResumeFile,
    DEFAULT_CANDIDATE_NAME,
};

#[cfg(feature = "pdfium")]
pub use document::PdfiumRasterizer;
