//! Result types returned by the conversion entry points.

use crate::config::{MergeOrientation, StagingMode};
use crate::pipeline::encode::SearchOutcome;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Summary of a finished conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionReport {
    /// Where the JPEG was written.
    pub output_path: PathBuf,
    /// Pages in the source document.
    pub total_pages: usize,
    /// Pages stitched into the canvas.
    pub stitched_pages: usize,
    pub dpi: u32,
    pub orientation: MergeOrientation,
    pub staging: StagingMode,
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Size the quality search was seeded with (measured or staged file).
    pub source_size_bytes: u64,
    pub target_size_bytes: u64,
    pub tolerance_bytes: u64,
    pub output_size_bytes: u64,
    /// JPEG quality of the written file.
    pub quality: u8,
    /// Encodes performed by the quality search.
    pub encode_attempts: u32,
    pub outcome: SearchOutcome,
    pub render_duration_ms: u64,
    pub encode_duration_ms: u64,
    pub total_duration_ms: u64,
    /// Temporary artifacts that could not be removed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cleanup_warnings: Vec<String>,
}

impl ConversionReport {
    /// Whether the written file lies in the acceptance window.
    pub fn within_target(&self) -> bool {
        self.output_size_bytes <= self.target_size_bytes
            && self.output_size_bytes >= self.target_size_bytes.saturating_sub(self.tolerance_bytes)
    }
}

/// Document-level metadata, available without rendering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
    /// `(width, height)` of each page in PDF points.
    pub page_sizes_pt: Vec<(f32, f32)>,
}
