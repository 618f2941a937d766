//! # edgequake-pdf2img
//!
//! Stitch every page of a PDF into one JPEG that fits a target file size.
//!
//! ## Why this crate?
//!
//! Upload forms, ticketing systems and e-mail gateways often accept exactly
//! one image under a fixed size limit. This crate renders each page with
//! pdfium, stacks the pages into a single canvas and then searches for the
//! JPEG quality whose output lands just under the limit, so the image keeps
//! as much detail as the budget allows.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      validate the local file (exists, readable, %PDF)
//!  ├─ 2. Render     rasterise pages via pdfium at the configured DPI
//!  ├─ 3. Stage      hold pages in memory or as PNGs in a per-run temp dir
//!  ├─ 4. Composite  stack pages vertically (or horizontally) on one canvas
//!  ├─ 5. Encode     binary-search JPEG quality into [target − 10 KiB, target]
//!  └─ 6. Output     atomic write + ConversionReport; staging always cleaned
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2img::{convert_to_file, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder().target_size_kb(500.0).build()?;
//!     let report = convert_to_file("document.pdf", "document.jpg", &config).await?;
//!     eprintln!(
//!         "{} pages → {} bytes at q={}",
//!         report.stitched_pages, report.output_size_bytes, report.quality
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2img` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdf2img = { version = "0.1", default-features = false }
//! ```
//!
//! ## Locating pdfium
//!
//! The pdfium shared library is loaded at runtime. Set `PDFIUM_LIB_PATH` to
//! the library file or its directory, place it next to the executable, or
//! install it on the system library path.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod raster;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, MergeOrientation, PageSelection, StagingMode};
pub use convert::{convert_sync, convert_to_file, convert_with_backend, inspect};
pub use error::{ErrorKind, Pdf2ImgError};
pub use output::{ConversionReport, DocumentMetadata};
pub use pipeline::composite::{canvas_dimensions, composite, APP_WORKSPACE_GREY};
pub use pipeline::encode::{
    EncodeFormat, EncodingResult, JpegCodec, QualityCodec, SearchOutcome, SizeConstrainedEncoder, SizeTarget,
    DEFAULT_QUALITY, DEFAULT_TOLERANCE_BYTES,
};
pub use pipeline::render::{PageSource, PdfiumBackend, RenderBackend};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use raster::RasterImage;
