//! Page stitching: an ordered run of page bitmaps → one canvas.
//!
//! The canvas is as long as all pages together along the merge axis and as
//! wide as the widest page across it. Pages are pinned to the top (or left)
//! edge; anything a narrower page leaves uncovered keeps the background fill,
//! so gaps read as solid grey rather than transparent black once the canvas
//! is flattened for JPEG.

use crate::config::MergeOrientation;
use crate::error::Pdf2ImgError;
use crate::raster::RasterImage;
use image::{imageops, DynamicImage, Rgba, RgbaImage};
use tracing::debug;

/// Windows "AppWorkspace" system colour, the historical fill for gaps.
pub const APP_WORKSPACE_GREY: [u8; 3] = [0xAB, 0xAB, 0xAB];

/// Largest canvas, in pixels, the compositor will allocate.
pub const MAX_CANVAS_PIXELS: u64 = u32::MAX as u64;

/// Canvas size for pages of the given `(width, height)`.
///
/// Returns `None` when an extent overflows `u32`.
pub fn canvas_dimensions(sizes: &[(u32, u32)], orientation: MergeOrientation) -> Option<(u32, u32)> {
    let sum = |extent: fn(&(u32, u32)) -> u32| {
        sizes
            .iter()
            .map(extent)
            .try_fold(0u32, |acc, v| acc.checked_add(v))
    };
    let max = |extent: fn(&(u32, u32)) -> u32| sizes.iter().map(extent).max().unwrap_or(0);

    match orientation {
        MergeOrientation::Horizontal => Some((sum(|s| s.0)?, max(|s| s.1))),
        MergeOrientation::Vertical => Some((max(|s| s.0), sum(|s| s.1)?)),
    }
}

/// Stitch `images` into a single opaque RGB canvas.
///
/// Each page is drawn at the running cursor on the merge axis and at 0 on the
/// cross axis, then dropped. The cursor starts at the origin and is advanced
/// by each page's own extent, so the first page leaves it at its own width
/// (horizontal) or height (vertical).
///
/// # Errors
/// * [`Pdf2ImgError::NoImages`] for an empty sequence
/// * [`Pdf2ImgError::CanvasTooLarge`] when the result cannot be allocated
pub fn composite(
    images: Vec<RasterImage>,
    orientation: MergeOrientation,
    background: [u8; 3],
) -> Result<RasterImage, Pdf2ImgError> {
    if images.is_empty() {
        return Err(Pdf2ImgError::NoImages);
    }

    let sizes: Vec<(u32, u32)> = images.iter().map(RasterImage::dimensions).collect();
    let (width, height) = canvas_dimensions(&sizes, orientation).ok_or_else(|| {
        let along: u64 = sizes
            .iter()
            .map(|&(w, h)| match orientation {
                MergeOrientation::Horizontal => u64::from(w),
                MergeOrientation::Vertical => u64::from(h),
            })
            .sum();
        match orientation {
            MergeOrientation::Horizontal => Pdf2ImgError::CanvasTooLarge {
                width: along,
                height: sizes.iter().map(|s| u64::from(s.1)).max().unwrap_or(0),
            },
            MergeOrientation::Vertical => Pdf2ImgError::CanvasTooLarge {
                width: sizes.iter().map(|s| u64::from(s.0)).max().unwrap_or(0),
                height: along,
            },
        }
    })?;

    if u64::from(width) * u64::from(height) > MAX_CANVAS_PIXELS {
        return Err(Pdf2ImgError::CanvasTooLarge {
            width: width.into(),
            height: height.into(),
        });
    }

    let [r, g, b] = background;
    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([r, g, b, 255]));

    let mut cursor = 0u32;
    for (i, image) in images.into_iter().enumerate() {
        let (w, h) = image.dimensions();
        let (x, y) = match orientation {
            MergeOrientation::Horizontal => (cursor, 0),
            MergeOrientation::Vertical => (0, cursor),
        };

        let page = image.into_dynamic().into_rgba8();
        imageops::overlay(&mut canvas, &page, i64::from(x), i64::from(y));
        debug!("Placed image {} ({}x{}) at ({}, {})", i, w, h, x, y);

        cursor += match orientation {
            MergeOrientation::Horizontal => w,
            MergeOrientation::Vertical => h,
        };
    }

    let flattened = DynamicImage::ImageRgba8(canvas).into_rgb8();
    Ok(RasterImage::from_dynamic(DynamicImage::ImageRgb8(flattened)))
}
