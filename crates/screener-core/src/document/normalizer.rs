//! Resume normalization to a single raster image.

use image::{DynamicImage, ImageFormat, ImageReader};
use std::fmt;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use super::stack::stack_pages;
use crate::types::ResumeFile;

/// Resolution PDF pages are rendered at.
pub const DEFAULT_RENDER_DPI: u16 = 250;

/// Vertical gap between stacked PDF pages, in pixels.
pub const DEFAULT_PAGE_GAP: u32 = 2;

/// Errors that can occur while normalizing a resume.
#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("Unsupported format '{mime}' for file '{file_name}'")]
    UnsupportedFormat { file_name: String, mime: String },

    #[error("Failed to decode image '{file_name}': {message}")]
    ImageDecode { file_name: String, message: String },

    #[error("Failed to render PDF '{file_name}': {source}")]
    PdfRender {
        file_name: String,
        #[source]
        source: RasterizeError,
    },

    #[error("PDF '{0}' has no pages")]
    EmptyDocument(String),

    #[error("PDF '{file_name}' is too large to stack ({pages} pages, {gap}px gap)")]
    TooLarge {
        file_name: String,
        pages: usize,
        gap: u32,
    },

    #[error("Failed to encode normalized image: {0}")]
    Encode(String),

    #[error("Failed to write normalized image: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure reported by a [`PageRasterizer`].
#[derive(Error, Debug)]
#[error("{0}")]
pub struct RasterizeError(pub String);

/// Renders every page of a PDF to an image.
///
/// Implementations must return pages in document order.
pub trait PageRasterizer: Send + Sync {
    fn rasterize(&self, pdf: &[u8], dpi: u16) -> Result<Vec<DynamicImage>, RasterizeError>;
}

/// How a declared MIME type is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Raster image; bytes and MIME type are forwarded unchanged.
    Passthrough(ImageFormat),
    /// Paginated document; rendered and stacked.
    Pdf,
}

impl DocumentKind {
    /// Classify a declared MIME type. Parameters such as `; charset=` are ignored.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "image/png" => Some(DocumentKind::Passthrough(ImageFormat::Png)),
            "image/jpeg" | "image/jpg" | "image/pjpeg" => {
                Some(DocumentKind::Passthrough(ImageFormat::Jpeg))
            }
            "image/gif" => Some(DocumentKind::Passthrough(ImageFormat::Gif)),
            "image/bmp" | "image/x-ms-bmp" => Some(DocumentKind::Passthrough(ImageFormat::Bmp)),
            "image/webp" => Some(DocumentKind::Passthrough(ImageFormat::WebP)),
            "image/tiff" => Some(DocumentKind::Passthrough(ImageFormat::Tiff)),
            "application/pdf" => Some(DocumentKind::Pdf),
            _ => None,
        }
    }
}

/// Infer a MIME type from a file extension.
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "webp" => Some("image/webp"),
        "tif" | "tiff" => Some("image/tiff"),
        "pdf" => Some("application/pdf"),
        _ => None,
    }
}

/// A resume flattened to one raster image.
#[derive(Clone, PartialEq)]
pub struct NormalizedDocument {
    /// Encoded image bytes
    pub bytes: Vec<u8>,

    /// MIME type of `bytes`
    pub mime: String,

    pub width: u32,
    pub height: u32,

    /// Number of source pages (1 for images)
    pub page_count: usize,
}

impl NormalizedDocument {
    /// File extension matching the encoded format.
    pub fn extension(&self) -> &'static str {
        match self.mime.as_str() {
            "image/jpeg" => "jpg",
            "image/gif" => "gif",
            "image/bmp" => "bmp",
            "image/webp" => "webp",
            "image/tiff" => "tif",
            _ => "png",
        }
    }

    /// Write a copy to `dir` under a unique name derived from `stem`.
    ///
    /// Concurrent callers never collide: each file gets a random suffix.
    pub fn save_to(&self, dir: &Path, stem: &str) -> Result<PathBuf, NormalizeError> {
        fs::create_dir_all(dir)?;
        let safe_stem: String = stem
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        let path = dir.join(format!(
            "{}-{}.{}",
            safe_stem,
            uuid::Uuid::new_v4(),
            self.extension()
        ));
        fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

impl fmt::Debug for NormalizedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NormalizedDocument")
            .field("mime", &self.mime)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("page_count", &self.page_count)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Converts uploaded resumes into [`NormalizedDocument`]s.
#[derive(Clone)]
pub struct Normalizer {
    rasterizer: Arc<dyn PageRasterizer>,
    dpi: u16,
    page_gap: u32,
}

impl Normalizer {
    /// Create a normalizer backed by the given PDF rasterizer.
    pub fn new(rasterizer: Arc<dyn PageRasterizer>) -> Self {
        Self {
            rasterizer,
            dpi: DEFAULT_RENDER_DPI,
            page_gap: DEFAULT_PAGE_GAP,
        }
    }

    /// Create a normalizer that renders PDFs with the system pdfium library.
    #[cfg(feature = "pdfium")]
    pub fn with_pdfium() -> Self {
        Self::new(Arc::new(super::PdfiumRasterizer::new()))
    }

    /// Set the PDF render resolution.
    pub fn with_dpi(mut self, dpi: u16) -> Self {
        self.dpi = dpi;
        self
    }

    /// Set the gap between stacked pages.
    pub fn with_page_gap(mut self, gap: u32) -> Self {
        self.page_gap = gap;
        self
    }

    /// Normalize one resume.
    ///
    /// This is CPU bound (and, for PDFs, calls into a native library);
    /// async callers should run it on a blocking thread.
    pub fn normalize(&self, file: &ResumeFile) -> Result<NormalizedDocument, NormalizeError> {
        let kind =
            DocumentKind::from_mime(&file.mime).ok_or_else(|| NormalizeError::UnsupportedFormat {
                file_name: file.name.clone(),
                mime: file.mime.clone(),
            })?;

        match kind {
            DocumentKind::Passthrough(format) => {
                let (width, height) = ImageReader::with_format(Cursor::new(&file.bytes[..]), format)
                    .into_dimensions()
                    .map_err(|e| NormalizeError::ImageDecode {
                        file_name: file.name.clone(),
                        message: e.to_string(),
                    })?;

                Ok(NormalizedDocument {
                    bytes: file.bytes.clone(),
                    mime: format.to_mime_type().to_string(),
                    width,
                    height,
                    page_count: 1,
                })
            }
            DocumentKind::Pdf => self.normalize_pdf(file),
        }
    }

    fn normalize_pdf(&self, file: &ResumeFile) -> Result<NormalizedDocument, NormalizeError> {
        let mut pages = self
            .rasterizer
            .rasterize(&file.bytes, self.dpi)
            .map_err(|source| NormalizeError::PdfRender {
                file_name: file.name.clone(),
                source,
            })?;

        let page_count = pages.len();
        tracing::debug!(file = %file.name, pages = page_count, dpi = self.dpi, "Rendered PDF");

        let image = match page_count {
            0 => return Err(NormalizeError::EmptyDocument(file.name.clone())),
            1 => pages.remove(0),
            _ => stack_pages(&pages, self.page_gap).ok_or_else(|| NormalizeError::TooLarge {
                file_name: file.name.clone(),
                pages: page_count,
                gap: self.page_gap,
            })?,
        };

        encode_png(&image, page_count)
    }
}

impl fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Normalizer")
            .field("dpi", &self.dpi)
            .field("page_gap", &self.page_gap)
            .finish()
    }
}

fn encode_png(image: &DynamicImage, page_count: usize) -> Result<NormalizedDocument, NormalizeError> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| NormalizeError::Encode(e.to_string()))?;

    Ok(NormalizedDocument {
        bytes,
        mime: "image/png".to_string(),
        width: image.width(),
        height: image.height(),
        page_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    /// Rasterizer that ignores its input and returns canned pages.
    struct FakeRasterizer {
        shades: Vec<u8>,
    }

    impl PageRasterizer for FakeRasterizer {
        fn rasterize(&self, _pdf: &[u8], _dpi: u16) -> Result<Vec<DynamicImage>, RasterizeError> {
            Ok(self
                .shades
                .iter()
                .map(|s| DynamicImage::ImageRgba8(RgbaImage::from_pixel(6, 4, Rgba([*s, 0, 0, 255]))))
                .collect())
        }
    }

    struct FailingRasterizer;

    impl PageRasterizer for FailingRasterizer {
        fn rasterize(&self, _pdf: &[u8], _dpi: u16) -> Result<Vec<DynamicImage>, RasterizeError> {
            Err(RasterizeError("not a PDF".to_string()))
        }
    }

    fn normalizer(shades: Vec<u8>) -> Normalizer {
        Normalizer::new(Arc::new(FakeRasterizer { shades }))
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba([1, 2, 3, 255]),
        ));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn decode(doc: &NormalizedDocument) -> RgbaImage {
        image::load_from_memory(&doc.bytes).unwrap().to_rgba8()
    }

    #[test]
    fn test_image_passthrough_is_identity() {
        let bytes = png_bytes(5, 7);
        let file = ResumeFile::new("cv.png", "image/png", bytes.clone());

        let doc = normalizer(vec![]).normalize(&file).unwrap();
        assert_eq!(doc.bytes, bytes);
        assert_eq!(doc.mime, "image/png");
        assert_eq!((doc.width, doc.height), (5, 7));
        assert_eq!(doc.page_count, 1);
    }

    #[test]
    fn test_corrupt_image_fails() {
        let file = ResumeFile::new("cv.png", "image/png", b"not an image".to_vec());
        let result = normalizer(vec![]).normalize(&file);
        assert!(matches!(result, Err(NormalizeError::ImageDecode { .. })));
    }

    #[test]
    fn test_unsupported_format_names_file_and_type() {
        let file = ResumeFile::new("cv.docx", "application/msword", vec![0; 4]);
        let err = normalizer(vec![]).normalize(&file).unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("cv.docx"));
        assert!(msg.contains("application/msword"));
    }

    #[test]
    fn test_multi_page_pdf_stacks_in_order() {
        let file = ResumeFile::new("cv.pdf", "application/pdf", b"%PDF".to_vec());
        let doc = normalizer(vec![10, 20, 30])
            .with_page_gap(2)
            .normalize(&file)
            .unwrap();

        assert_eq!(doc.mime, "image/png");
        assert_eq!(doc.page_count, 3);
        assert_eq!((doc.width, doc.height), (6, 4 * 3 + 2 * 2));

        let image = decode(&doc);
        assert_eq!(image.get_pixel(0, 0)[0], 10);
        assert_eq!(image.get_pixel(0, 6)[0], 20);
        assert_eq!(image.get_pixel(0, 12)[0], 30);
    }

    #[test]
    fn test_single_page_pdf_is_not_stacked() {
        let file = ResumeFile::new("cv.pdf", "application/pdf", b"%PDF".to_vec());
        let doc = normalizer(vec![42]).normalize(&file).unwrap();

        assert_eq!(doc.page_count, 1);
        assert_eq!((doc.width, doc.height), (6, 4));
        assert_eq!(decode(&doc).get_pixel(5, 3)[0], 42);
    }

    #[test]
    fn test_empty_pdf_fails() {
        let file = ResumeFile::new("empty.pdf", "application/pdf", b"%PDF".to_vec());
        let result = normalizer(vec![]).normalize(&file);
        assert!(matches!(result, Err(NormalizeError::EmptyDocument(name)) if name == "empty.pdf"));
    }

    #[test]
    fn test_rasterizer_failure_is_reported() {
        let file = ResumeFile::new("broken.pdf", "application/pdf", vec![]);
        let result = Normalizer::new(Arc::new(FailingRasterizer)).normalize(&file);

        let err = result.unwrap_err();
        assert!(err.to_string().contains("broken.pdf"));
        assert!(err.to_string().contains("not a PDF"));
    }

    #[test]
    fn test_document_kind_from_mime() {
        assert_eq!(
            DocumentKind::from_mime("image/PNG"),
            Some(DocumentKind::Passthrough(ImageFormat::Png))
        );
        assert_eq!(
            DocumentKind::from_mime("image/jpg"),
            Some(DocumentKind::Passthrough(ImageFormat::Jpeg))
        );
        assert_eq!(
            DocumentKind::from_mime("application/pdf; qs=0.001"),
            Some(DocumentKind::Pdf)
        );
        assert_eq!(
            DocumentKind::from_mime("image/x-ms-bmp"),
            Some(DocumentKind::Passthrough(ImageFormat::Bmp))
        );
        assert_eq!(DocumentKind::from_mime("text/plain"), None);
    }

    #[test]
    fn test_mime_for_path() {
        assert_eq!(mime_for_path(Path::new("a/b/Resume.PDF")), Some("application/pdf"));
        assert_eq!(mime_for_path(Path::new("cv.jpeg")), Some("image/jpeg"));
        assert_eq!(mime_for_path(Path::new("cv.docx")), None);
        assert_eq!(mime_for_path(Path::new("README")), None);
    }

    #[test]
    fn test_every_image_format_passes_through_unchanged() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 2, Rgba([9, 9, 9, 255])));
        let cases = [
            (ImageFormat::Gif, "image/gif", "gif"),
            (ImageFormat::Bmp, "image/bmp", "bmp"),
            (ImageFormat::WebP, "image/webp", "webp"),
            (ImageFormat::Tiff, "image/tiff", "tif"),
        ];

        for (format, mime, ext) in cases {
            let mut bytes = Vec::new();
            image
                .write_to(&mut Cursor::new(&mut bytes), format)
                .unwrap();

            let file = ResumeFile::new(format!("cv.{}", ext), mime, bytes.clone());
            let doc = normalizer(vec![]).normalize(&file).unwrap();
            assert_eq!(doc.bytes, bytes, "{} bytes changed", mime);
            assert_eq!(doc.mime, mime);
            assert_eq!((doc.width, doc.height), (3, 2));
            assert_eq!(doc.extension(), ext);
        }
    }

    #[test]
    fn test_oversized_stack_is_rejected() {
        let file = ResumeFile::new("huge.pdf", "application/pdf", b"%PDF".to_vec());
        let err = normalizer(vec![1, 2])
            .with_page_gap(u32::MAX)
            .normalize(&file)
            .unwrap_err();

        assert!(matches!(err, NormalizeError::TooLarge { pages: 2, .. }));
        assert!(err.to_string().contains("huge.pdf"));
    }

    #[test]
    fn test_save_to_uses_unique_names() {
        let dir = std::env::temp_dir().join(format!("screener-test-{}", uuid::Uuid::new_v4()));
        let file = ResumeFile::new("cv.png", "image/png", png_bytes(2, 2));
        let doc = normalizer(vec![]).normalize(&file).unwrap();

        let first = doc.save_to(&dir, "jane doe").unwrap();
        let second = doc.save_to(&dir, "jane doe").unwrap();
        assert_ne!(first, second);
        assert_eq!(fs::read(&first).unwrap(), doc.bytes);
        assert!(first
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("jane_doe-"));

        fs::remove_dir_all(&dir).unwrap();
    }
}
