//! Configuration types for PDF-to-image conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Every knob lives in one struct so a
//! run can be logged, serialised into a report, or replayed exactly.

use crate::error::Pdf2ImgError;
use crate::pipeline::composite::APP_WORKSPACE_GREY;
use crate::pipeline::encode::{SizeTarget, DEFAULT_TOLERANCE_BYTES};
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Configuration for a PDF-to-image conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdf2img::{ConversionConfig, MergeOrientation};
///
/// let config = ConversionConfig::builder()
///     .target_size_kb(800.0)
///     .orientation(MergeOrientation::Vertical)
///     .build()
///     .unwrap();
/// assert_eq!(config.size_target().unwrap().target_bytes, 800 * 1024);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Rendering DPI used when rasterising each PDF page. Range: 72–600. Default: 300.
    ///
    /// At 300 DPI an A4 page is roughly 2480 × 3508 px, so a ten-page
    /// document stitches into a canvas of ~87 megapixels. Lower the DPI
    /// when the target size is small; the encoder can only trade quality,
    /// not resolution.
    pub dpi: u32,

    /// Target output size in kilobytes (1 KB = 1024 bytes). Default: 500.
    pub target_size_kb: f64,

    /// Width of the acceptance band below the target, in bytes. Default: 10 KiB.
    pub tolerance_bytes: u64,

    /// Axis along which pages are stacked. Default: [`MergeOrientation::Vertical`].
    pub orientation: MergeOrientation,

    /// RGB fill for canvas areas not covered by a page. Default: `#ABABAB`.
    pub background: [u8; 3],

    /// Page selection. Default: All pages.
    pub pages: PageSelection,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Where intermediate page bitmaps live between stages. Default: memory.
    pub staging: StagingMode,

    /// Parent directory for the per-run staging directory in
    /// [`StagingMode::Disk`]. Default: the system temp directory.
    pub staging_dir: Option<PathBuf>,

    /// Optional progress callback for render / encode events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            target_size_kb: 500.0,
            tolerance_bytes: DEFAULT_TOLERANCE_BYTES,
            orientation: MergeOrientation::default(),
            background: APP_WORKSPACE_GREY,
            pages: PageSelection::default(),
            password: None,
            staging: StagingMode::default(),
            staging_dir: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("dpi", &self.dpi)
            .field("target_size_kb", &self.target_size_kb)
            .field("tolerance_bytes", &self.tolerance_bytes)
            .field("orientation", &self.orientation)
            .field("background", &self.background)
            .field("pages", &self.pages)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("staging", &self.staging)
            .field("staging_dir", &self.staging_dir)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Acceptance window derived from `target_size_kb` and `tolerance_bytes`.
    ///
    /// # Errors
    /// [`Pdf2ImgError::InvalidTargetSize`] when `target_size_kb` is negative,
    /// NaN or infinite.
    pub fn size_target(&self) -> Result<SizeTarget, Pdf2ImgError> {
        Ok(SizeTarget::from_kb(self.target_size_kb)?.with_tolerance(self.tolerance_bytes))
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn target_size_kb(mut self, kb: f64) -> Self {
        self.config.target_size_kb = kb;
        self
    }

    pub fn tolerance_bytes(mut self, bytes: u64) -> Self {
        self.config.tolerance_bytes = bytes;
        self
    }

    pub fn orientation(mut self, orientation: MergeOrientation) -> Self {
        self.config.orientation = orientation;
        self
    }

    pub fn background(mut self, rgb: [u8; 3]) -> Self {
        self.config.background = rgb;
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn staging(mut self, mode: StagingMode) -> Self {
        self.config.staging = mode;
        self
    }

    pub fn staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.staging_dir = Some(dir.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Pdf2ImgError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(Pdf2ImgError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        c.size_target()?;
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Axis along which page bitmaps are concatenated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MergeOrientation {
    /// Pages side by side, left to right.
    Horizontal,
    /// Pages stacked top to bottom. (default)
    #[default]
    Vertical,
}

/// Where per-page bitmaps are held between rendering and compositing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StagingMode {
    /// Hand bitmaps straight from the renderer to the compositor. (default)
    #[default]
    Memory,
    /// Write each page and the combined canvas as PNG files in a per-run
    /// temporary directory. The combined file's size seeds the encoder's
    /// quality search instead of a measuring encode.
    Disk,
}

/// Specifies which pages of the PDF to stitch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum PageSelection {
    /// All pages (default).
    #[default]
    All,
    /// A single page (1-indexed).
    Single(usize),
    /// A contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_conversion_contract() {
        let c = ConversionConfig::default();
        assert_eq!(c.dpi, 300);
        assert_eq!(c.orientation, MergeOrientation::Vertical);
        assert_eq!(c.staging, StagingMode::Memory);
        assert_eq!(c.tolerance_bytes, 10 * 1024);
    }

    #[test]
    fn builder_rejects_negative_target() {
        let err = ConversionConfig::builder()
            .target_size_kb(-1.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, Pdf2ImgError::InvalidTargetSize { .. }));
    }

    #[test]
    fn builder_rejects_nan_target() {
        assert!(ConversionConfig::builder()
            .target_size_kb(f64::NAN)
            .build()
            .is_err());
    }

    #[test]
    fn builder_clamps_dpi() {
        let c = ConversionConfig::builder().dpi(5000).build().unwrap();
        assert_eq!(c.dpi, 600);
        let c = ConversionConfig::builder().dpi(10).build().unwrap();
        assert_eq!(c.dpi, 72);
    }

    #[test]
    fn size_target_uses_tolerance() {
        let c = ConversionConfig::builder()
            .target_size_kb(500.0)
            .tolerance_bytes(2048)
            .build()
            .unwrap();
        let t = c.size_target().unwrap();
        assert_eq!(t.exit_high(), 500 * 1024);
        assert_eq!(t.exit_low(), 500 * 1024 - 2048);
    }

    #[test]
    fn size_target_reports_invalid_size() {
        let mut c = ConversionConfig {
            target_size_kb: -3.0,
            ..ConversionConfig::default()
        };
        assert!(matches!(
            c.size_target(),
            Err(Pdf2ImgError::InvalidTargetSize { .. })
        ));
        c.target_size_kb = f64::NAN;
        assert!(c.size_target().is_err());
    }

    #[test]
    fn page_selection_to_indices() {
        assert_eq!(PageSelection::All.to_indices(3), vec![0, 1, 2]);
        assert_eq!(PageSelection::Single(4).to_indices(3), Vec::<usize>::new());
        assert_eq!(PageSelection::Range(2, 10).to_indices(4), vec![1, 2, 3]);
        assert_eq!(
            PageSelection::Set(vec![3, 1, 3]).to_indices(5),
            vec![0, 2]
        );
    }

    #[test]
    fn debug_redacts_password() {
        let c = ConversionConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }
}
