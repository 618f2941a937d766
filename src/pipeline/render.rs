//! PDF rasterisation: open a document and render pages to bitmaps.
//!
//! The pipeline only sees the [`RenderBackend`] / [`PageSource`] pair, so the
//! orchestration logic can be driven by a synthetic backend in tests while
//! production uses [`PdfiumBackend`].
//!
//! pdfium keeps thread-local state and blocks for the whole render; callers
//! in async code run everything here inside `spawn_blocking`.

use crate::error::Pdf2ImgError;
use crate::output::DocumentMetadata;
use crate::raster::RasterImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Points per inch in PDF user space.
const PDF_POINTS_PER_INCH: f32 = 72.0;

/// Something that can open a document for rendering.
pub trait RenderBackend {
    fn open<'a>(
        &'a self,
        path: &Path,
        password: Option<&'a str>,
    ) -> Result<Box<dyn PageSource + 'a>, Pdf2ImgError>;
}

/// An opened document.
pub trait PageSource {
    fn page_count(&self) -> usize;

    /// Render the 0-indexed page `index` at `dpi`.
    fn render_page(&self, index: usize, dpi: u32) -> Result<RasterImage, Pdf2ImgError>;
}

/// [`RenderBackend`] backed by a dynamically loaded pdfium library.
pub struct PdfiumBackend {
    pdfium: Pdfium,
}

impl PdfiumBackend {
    /// Load pdfium.
    ///
    /// Discovery order:
    /// 1. `PDFIUM_LIB_PATH` — a library file, or a directory containing one
    /// 2. the directory of the running executable
    /// 3. the system library search path
    pub fn bind() -> Result<Self, Pdf2ImgError> {
        if let Ok(path) = std::env::var("PDFIUM_LIB_PATH") {
            let candidate = PathBuf::from(&path);
            let lib = if candidate.is_dir() {
                PathBuf::from(Pdfium::pdfium_platform_library_name_at_path(
                    candidate.to_string_lossy().as_ref(),
                ))
            } else {
                candidate
            };
            debug!("Loading pdfium from PDFIUM_LIB_PATH: {}", lib.display());
            let bindings = Pdfium::bind_to_library(&lib).map_err(|e| {
                Pdf2ImgError::PdfiumBindingFailed(format!("{}: {:?}", lib.display(), e))
            })?;
            return Ok(Self {
                pdfium: Pdfium::new(bindings),
            });
        }

        if let Some(exe_dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            let lib = Pdfium::pdfium_platform_library_name_at_path(exe_dir.to_string_lossy().as_ref());
            if let Ok(bindings) = Pdfium::bind_to_library(&lib) {
                debug!("Loaded pdfium next to executable: {}", exe_dir.display());
                return Ok(Self {
                    pdfium: Pdfium::new(bindings),
                });
            }
        }

        let bindings = Pdfium::bind_to_system_library()
            .map_err(|e| Pdf2ImgError::PdfiumBindingFailed(format!("{:?}", e)))?;
        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }

    fn load<'a>(
        &'a self,
        path: &Path,
        password: Option<&'a str>,
    ) -> Result<PdfDocument<'a>, Pdf2ImgError> {
        self.pdfium
            .load_pdf_from_file(path, password)
            .map_err(|e| map_load_error(path, password, e))
    }
}

impl RenderBackend for PdfiumBackend {
    fn open<'a>(
        &'a self,
        path: &Path,
        password: Option<&'a str>,
    ) -> Result<Box<dyn PageSource + 'a>, Pdf2ImgError> {
        let document = self.load(path, password)?;
        info!("PDF loaded: {} pages", document.pages().len());
        Ok(Box::new(PdfiumDocument { document }))
    }
}

struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl PageSource for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn render_page(&self, index: usize, dpi: u32) -> Result<RasterImage, Pdf2ImgError> {
        let total = self.page_count();
        if index >= total {
            return Err(Pdf2ImgError::PageOutOfRange {
                page: index + 1,
                total,
            });
        }

        let page = self
            .document
            .pages()
            .get(index as u16)
            .map_err(|e| Pdf2ImgError::RasterisationFailed {
                page: index + 1,
                detail: format!("{:?}", e),
            })?;

        let render_config =
            PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / PDF_POINTS_PER_INCH);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| Pdf2ImgError::RasterisationFailed {
                page: index + 1,
                detail: format!("{:?}", e),
            })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} at {} DPI → {}x{} px",
            index + 1,
            dpi,
            image.width(),
            image.height()
        );

        Ok(RasterImage::from_dynamic(image))
    }
}

/// Classify a pdfium load failure.
fn map_load_error(path: &Path, password: Option<&str>, e: PdfiumError) -> Pdf2ImgError {
    let err_str = format!("{:?}", e);
    if err_str.to_lowercase().contains("password") {
        if password.is_some() {
            Pdf2ImgError::WrongPassword {
                path: path.to_path_buf(),
            }
        } else {
            Pdf2ImgError::PasswordRequired {
                path: path.to_path_buf(),
            }
        }
    } else {
        Pdf2ImgError::CorruptPdf {
            path: path.to_path_buf(),
            detail: err_str,
        }
    }
}

/// Read document metadata and page geometry without rendering.
pub fn extract_metadata<'a>(
    backend: &'a PdfiumBackend,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<DocumentMetadata, Pdf2ImgError> {
    let document = backend.load(pdf_path, password)?;
    let metadata = document.metadata();
    let pages = document.pages();

    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    let page_sizes_pt = pages
        .iter()
        .map(|page| (page.width().value, page.height().value))
        .collect();

    Ok(DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
        modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
        page_count: pages.len() as usize,
        pdf_version: format!("{:?}", document.version()),
        page_sizes_pt,
    })
}

/// Pixel size of a page of `size_pt` points rendered at `dpi`.
pub fn pixels_at_dpi(size_pt: (f32, f32), dpi: u32) -> (u32, u32) {
    let scale = dpi as f32 / PDF_POINTS_PER_INCH;
    (
        (size_pt.0 * scale).round() as u32,
        (size_pt.1 * scale).round() as u32,
    )
}
