//! In-memory raster bitmaps passed between pipeline stages.

use crate::error::Pdf2ImgError;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::path::Path;

/// A decoded bitmap plus the format it was read from, if any.
///
/// Rendered pages and composited canvases carry no source format; images
/// reloaded from a staged file remember the format the decoder detected.
/// A `RasterImage` is moved between stages and dropped once consumed.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pixels: DynamicImage,
    source_format: Option<ImageFormat>,
}

impl RasterImage {
    /// Wrap a freshly produced bitmap.
    pub fn from_dynamic(pixels: DynamicImage) -> Self {
        Self {
            pixels,
            source_format: None,
        }
    }

    /// Decode an image from storage, tagging it with the detected format.
    pub fn load(path: &Path) -> Result<Self, Pdf2ImgError> {
        let staging_err = |detail: String| Pdf2ImgError::StagingFailed {
            path: path.to_path_buf(),
            detail,
        };

        let reader = ImageReader::open(path)
            .map_err(|e| staging_err(e.to_string()))?
            .with_guessed_format()
            .map_err(|e| staging_err(e.to_string()))?;
        let source_format = reader.format();
        let pixels = reader.decode().map_err(|e| staging_err(e.to_string()))?;

        Ok(Self {
            pixels,
            source_format,
        })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.pixels.width(), self.pixels.height())
    }

    /// Format the pixels were decoded from, `None` for in-memory bitmaps.
    pub fn source_format(&self) -> Option<ImageFormat> {
        self.source_format
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.pixels
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.pixels
    }
}

impl From<DynamicImage> for RasterImage {
    fn from(pixels: DynamicImage) -> Self {
        Self::from_dynamic(pixels)
    }
}
