//! Error types for the edgequake-pdf2img library.
//!
//! Every failure surfaces as a [`Pdf2ImgError`]. Variants are specific enough
//! to print an actionable message (which file, which page, what to try next),
//! and [`Pdf2ImgError::kind`] folds them into the coarse [`ErrorKind`]
//! categories callers usually branch on.
//!
//! A conversion never reports success after a partial failure: rendering,
//! encoding and persistence errors abort the run, staged artifacts are
//! removed, and the original error is returned. Cleanup failures are the only
//! exception: they are logged and attached to the report instead of masking
//! the real outcome.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`Pdf2ImgError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Bad source document, bad target size, empty page set, bad config.
    InvalidInput,
    /// A page could not be rasterised, or pdfium is unavailable.
    RenderFailure,
    /// No size-constrained encoder exists for the requested format.
    UnsupportedFormat,
    /// The image encoder itself failed.
    EncodeFailure,
    /// Staging or persisting artifacts failed.
    IoFailure,
    /// A worker thread panicked.
    Internal,
}

/// All errors returned by the edgequake-pdf2img library.
#[derive(Debug, Error)]
pub enum Pdf2ImgError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// Target size was negative, NaN or infinite.
    #[error("Invalid target size '{value}': expected a non-negative number of kilobytes")]
    InvalidTargetSize { value: String },

    /// The document (or the page selection) yields no pages to stitch.
    #[error("'{path}' has no pages to convert")]
    EmptyDocument { path: PathBuf },

    /// Selected page numbers exceed the actual page count.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// The compositor was handed an empty image sequence.
    #[error("Cannot composite an empty image sequence")]
    NoImages,

    /// Summed page extents do not fit in a single canvas.
    #[error("Combined canvas of {width}×{height} px is too large\nSelect fewer pages or lower the DPI.")]
    CanvasTooLarge { width: u64, height: u64 },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDFium is loaded at runtime. You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (file or directory).\n\
  • Place libpdfium next to the pdf2img executable.\n\
  • Install pdfium system-wide so the dynamic loader can find it.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Encoding errors ───────────────────────────────────────────────────
    /// No quality-driven encoder is available for this output format.
    #[error("No size-constrained encoder available for {format} output")]
    UnsupportedFormat { format: String },

    /// The image encoder failed at the given quality.
    #[error("Image encoding failed at quality {quality}: {source}")]
    EncodeFailed {
        quality: u8,
        #[source]
        source: image::ImageError,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not write or reload an intermediate artifact.
    #[error("Failed to stage intermediate artifact '{path}': {detail}")]
    StagingFailed { path: PathBuf, detail: String },

    /// Could not create or write the output image file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Pdf2ImgError {
    /// Classify this error into one of the coarse [`ErrorKind`]s.
    pub fn kind(&self) -> ErrorKind {
        use Pdf2ImgError::*;
        match self {
            FileNotFound { .. }
            | PermissionDenied { .. }
            | NotAPdf { .. }
            | InvalidTargetSize { .. }
            | EmptyDocument { .. }
            | PageOutOfRange { .. }
            | NoImages
            | CanvasTooLarge { .. }
            | CorruptPdf { .. }
            | PasswordRequired { .. }
            | WrongPassword { .. }
            | InvalidConfig(_) => ErrorKind::InvalidInput,
            RasterisationFailed { .. } | PdfiumBindingFailed(_) => ErrorKind::RenderFailure,
            UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            EncodeFailed { .. } => ErrorKind::EncodeFailure,
            StagingFailed { .. } | OutputWriteFailed { .. } => ErrorKind::IoFailure,
            Internal(_) => ErrorKind::Internal,
        }
    }
}
