//! Conversion entry points: PDF in, one size-constrained JPEG out.
//!
//! [`convert_with_backend`] is the blocking core. It either writes the
//! destination file completely or leaves it untouched, and in both cases
//! removes every intermediate artifact before returning. The other entry
//! points bind pdfium ([`convert_sync`]) or move the work off the async
//! runtime ([`convert_to_file`], [`inspect`]).

use crate::config::{ConversionConfig, PageSelection};
use crate::error::Pdf2ImgError;
use crate::output::{ConversionReport, DocumentMetadata};
use crate::pipeline::composite::composite;
use crate::pipeline::encode::{EncodeFormat, SizeConstrainedEncoder, SizeTarget};
use crate::pipeline::input;
use crate::pipeline::render::{self, PageSource, PdfiumBackend, RenderBackend};
use crate::pipeline::staging::{StagedPage, StagingArea};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert `input` into a single JPEG at `output` using `backend` to render.
///
/// # Errors
/// Any failure aborts the conversion. Staged artifacts are removed first; a
/// failure to remove them is logged but never replaces the original error.
/// The destination is written through a temporary file in the same
/// directory and renamed into place, so it is never left half-written.
pub fn convert_with_backend(
    backend: &dyn RenderBackend,
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionReport, Pdf2ImgError> {
    let total_start = Instant::now();
    let input = input.as_ref();
    let output = output.as_ref();
    info!("Starting conversion: {} → {}", input.display(), output.display());

    // ── Step 1: Validate ─────────────────────────────────────────────────
    let target = validate(config)?;
    let pdf_path = input::resolve_local(input)?;

    // ── Step 2: Open document and select pages ───────────────────────────
    let document = backend.open(&pdf_path, config.password.as_deref())?;
    let total_pages = document.page_count();
    if total_pages == 0 {
        return Err(Pdf2ImgError::EmptyDocument { path: pdf_path });
    }

    let page_indices = config.pages.to_indices(total_pages);
    if page_indices.is_empty() {
        return Err(Pdf2ImgError::PageOutOfRange {
            page: first_requested_page(&config.pages),
            total: total_pages,
        });
    }
    debug!("Selected {} of {} pages", page_indices.len(), total_pages);

    // ── Step 3: Run stages; cleanup happens whatever they return ─────────
    let mut staging = StagingArea::new(config.staging, config.staging_dir.as_deref())?;
    let job = Job {
        document: &*document,
        pdf_path: &pdf_path,
        output,
        config,
        target,
        page_indices: &page_indices,
    };
    let result = job.run(&mut staging);
    let cleanup_warnings = staging.cleanup();

    match result {
        Ok(mut report) => {
            report.total_pages = total_pages;
            report.total_duration_ms = total_start.elapsed().as_millis() as u64;
            report.cleanup_warnings = cleanup_warnings;

            info!(
                "Conversion complete: {} pages → {} bytes at q={} ({:?}), {}ms total",
                report.stitched_pages,
                report.output_size_bytes,
                report.quality,
                report.outcome,
                report.total_duration_ms
            );

            if let Some(ref cb) = config.progress_callback {
                cb.on_conversion_complete(report.output_size_bytes, report.quality);
            }
            Ok(report)
        }
        Err(e) => {
            for w in &cleanup_warnings {
                warn!("Left behind after failed conversion: {}", w);
            }
            Err(e)
        }
    }
}

/// Bind pdfium and run [`convert_with_backend`] on the calling thread.
///
/// The input is checked before pdfium is loaded, so a bad path is reported
/// as such even on machines without the library.
pub fn convert_sync(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionReport, Pdf2ImgError> {
    let input = input::resolve_local(input.as_ref())?;
    let backend = PdfiumBackend::bind()?;
    convert_with_backend(&backend, input, output, config)
}

/// Convert a PDF and write the JPEG to `output`.
///
/// pdfium rendering and JPEG encoding are CPU-bound, so the whole
/// conversion runs inside `spawn_blocking`.
pub async fn convert_to_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionReport, Pdf2ImgError> {
    let input = input.as_ref().to_path_buf();
    let output = output.as_ref().to_path_buf();
    let config = config.clone();

    tokio::task::spawn_blocking(move || convert_sync(&input, &output, &config))
        .await
        .map_err(|e| Pdf2ImgError::Internal(format!("Conversion task panicked: {}", e)))?
}

/// Extract PDF metadata without rendering anything.
pub async fn inspect(
    input: impl AsRef<Path>,
    password: Option<&str>,
) -> Result<DocumentMetadata, Pdf2ImgError> {
    let pdf_path = input::resolve_local(input.as_ref())?;
    let password = password.map(str::to_owned);

    tokio::task::spawn_blocking(move || {
        let backend = PdfiumBackend::bind()?;
        render::extract_metadata(&backend, &pdf_path, password.as_deref())
    })
    .await
    .map_err(|e| Pdf2ImgError::Internal(format!("Metadata task panicked: {}", e)))?
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Everything one run of the stages needs, borrowed from the caller.
struct Job<'a> {
    document: &'a dyn PageSource,
    pdf_path: &'a Path,
    output: &'a Path,
    config: &'a ConversionConfig,
    target: SizeTarget,
    page_indices: &'a [usize],
}

impl Job<'_> {
    /// Render, stage, composite, encode and write. Every artifact is
    /// registered with `staging`; the caller cleans it up.
    fn run(&self, staging: &mut StagingArea) -> Result<ConversionReport, Pdf2ImgError> {
        let config = self.config;
        let selected = self.page_indices.len();

        if let Some(ref cb) = config.progress_callback {
            cb.on_conversion_start(selected);
        }

        // ── Render ───────────────────────────────────────────────────────
        let render_start = Instant::now();
        let stem = self
            .pdf_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "page".to_string());

        let mut staged = Vec::with_capacity(selected);
        for &idx in self.page_indices {
            let page = self.document.render_page(idx, config.dpi)?;
            let (width, height) = page.dimensions();
            debug!("Page {}: {}x{} px", idx + 1, width, height);
            if let Some(ref cb) = config.progress_callback {
                cb.on_page_rendered(idx + 1, selected, width, height);
            }
            staged.push(staging.stage(&format!("{}_{}", stem, idx), page)?);
        }
        let render_duration_ms = render_start.elapsed().as_millis() as u64;
        info!("Rendered {} pages in {}ms", selected, render_duration_ms);

        // ── Composite ────────────────────────────────────────────────────
        let pages = staged
            .into_iter()
            .map(StagedPage::load)
            .collect::<Result<Vec<_>, _>>()?;
        let canvas = composite(pages, config.orientation, config.background)?;
        let (canvas_width, canvas_height) = canvas.dimensions();
        info!(
            "Canvas {}x{} ({:?}, {} pages)",
            canvas_width, canvas_height, config.orientation, selected
        );
        if let Some(ref cb) = config.progress_callback {
            cb.on_canvas_ready(canvas_width, canvas_height);
        }

        // On disk the staged canvas size seeds the search; in memory the
        // encoder measures it.
        let known_source_size = staging.stage_canvas(&canvas)?.unwrap_or(0);

        // ── Encode ───────────────────────────────────────────────────────
        let encode_start = Instant::now();
        let encoder = SizeConstrainedEncoder::for_format(EncodeFormat::Jpeg)?
            .with_progress(config.progress_callback.clone());
        let encoded = encoder.encode(&canvas, self.target, known_source_size)?;
        drop(canvas);
        let encode_duration_ms = encode_start.elapsed().as_millis() as u64;

        // ── Write ────────────────────────────────────────────────────────
        write_atomic(self.output, &encoded.bytes)?;
        debug!("Wrote {} bytes to {}", encoded.len(), self.output.display());

        Ok(ConversionReport {
            output_path: self.output.to_path_buf(),
            total_pages: 0,
            stitched_pages: selected,
            dpi: config.dpi,
            orientation: config.orientation,
            staging: config.staging,
            canvas_width,
            canvas_height,
            source_size_bytes: encoded.source_size_bytes,
            target_size_bytes: self.target.target_bytes,
            tolerance_bytes: self.target.tolerance_bytes,
            output_size_bytes: encoded.len(),
            quality: encoded.quality,
            encode_attempts: encoded.attempts,
            outcome: encoded.outcome,
            render_duration_ms,
            encode_duration_ms,
            total_duration_ms: 0,
            cleanup_warnings: Vec::new(),
        })
    }
}

/// Re-check the config; its fields are public, so `build()` may have been skipped.
fn validate(config: &ConversionConfig) -> Result<SizeTarget, Pdf2ImgError> {
    if !(72..=600).contains(&config.dpi) {
        return Err(Pdf2ImgError::InvalidConfig(format!(
            "DPI must be 72–600, got {}",
            config.dpi
        )));
    }
    config.size_target()
}

/// The page number to blame when a selection matches nothing.
fn first_requested_page(selection: &PageSelection) -> usize {
    match selection {
        PageSelection::All => 1,
        PageSelection::Single(p) => *p,
        PageSelection::Range(start, _) => *start,
        PageSelection::Set(pages) => pages.first().copied().unwrap_or(0),
    }
}

/// Write `bytes` to `path` through a sibling temp file and an atomic rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Pdf2ImgError> {
    let write_err = |source: std::io::Error| Pdf2ImgError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}
