//! Size-constrained encoding: canvas → JPEG bytes close to a byte budget.
//!
//! The search assumes encoded size never shrinks as quality rises. JPEG
//! encoders make no such promise, and nothing here verifies it; when it does
//! not hold the search still terminates, it just may settle on a quality
//! whose size lies outside the acceptance window.
//!
//! ## The search
//!
//! Given a measured source size `S` and target `T` (`T ≤ S`):
//!
//! ```text
//! lo = max(1, ⌊100·T/S⌋), hi = 100
//! loop:
//!   q = (lo + hi) / 2, encode at q → size s
//!   s ∈ [T − tolerance, T]  → done (WithinWindow)
//!   lo == hi                → done (Exhausted)
//!   s < T − tolerance       → lo = q
//!   s > T                   → hi = q
//!   (lo + hi) / 2 == q      → done (Exhausted)
//!   (lo + hi) / 2 == lo     → done, reuse the encode made at lo (Exhausted)
//! ```
//!
//! Every iteration costs exactly one full encode, no quality is encoded
//! twice, and the interval halves each time, so the loop runs at most
//! ⌈log₂ 100⌉ = 7 times.

use crate::error::Pdf2ImgError;
use crate::progress::ProgressCallback;
use crate::raster::RasterImage;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Width of the acceptance band below the target: 10 KiB.
pub const DEFAULT_TOLERANCE_BYTES: u64 = 10 * 1024;

/// Quality used for the measuring encode and the fast path.
pub const DEFAULT_QUALITY: u8 = 75;

/// Upper bound on search-loop encodes (⌈log₂ 100⌉).
pub const MAX_SEARCH_ATTEMPTS: u32 = 7;

/// Byte budget for an encoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeTarget {
    /// Upper edge of the acceptance window.
    pub target_bytes: u64,
    /// Width of the window below `target_bytes`.
    pub tolerance_bytes: u64,
}

impl SizeTarget {
    /// Target expressed in kilobytes (1 KB = 1024 bytes).
    ///
    /// # Errors
    /// [`Pdf2ImgError::InvalidTargetSize`] for negative, NaN or infinite input.
    pub fn from_kb(kb: f64) -> Result<Self, Pdf2ImgError> {
        if !kb.is_finite() || kb < 0.0 {
            return Err(Pdf2ImgError::InvalidTargetSize {
                value: kb.to_string(),
            });
        }
        Ok(Self::from_bytes((kb * 1024.0).round() as u64))
    }

    pub fn from_bytes(target_bytes: u64) -> Self {
        Self {
            target_bytes,
            tolerance_bytes: DEFAULT_TOLERANCE_BYTES,
        }
    }

    pub fn with_tolerance(mut self, tolerance_bytes: u64) -> Self {
        self.tolerance_bytes = tolerance_bytes;
        self
    }

    /// Smallest acceptable size.
    pub fn exit_low(&self) -> u64 {
        self.target_bytes.saturating_sub(self.tolerance_bytes)
    }

    /// Largest acceptable size.
    pub fn exit_high(&self) -> u64 {
        self.target_bytes
    }

    pub fn contains(&self, size: u64) -> bool {
        (self.exit_low()..=self.exit_high()).contains(&size)
    }
}

/// Raster formats a caller may ask the encoder for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncodeFormat {
    Jpeg,
    Png,
    Gif,
    Bmp,
}

impl fmt::Display for EncodeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EncodeFormat::Jpeg => "JPEG",
            EncodeFormat::Png => "PNG",
            EncodeFormat::Gif => "GIF",
            EncodeFormat::Bmp => "BMP",
        };
        f.write_str(name)
    }
}

/// An encoder whose output size is driven by a 1–100 quality parameter.
pub trait QualityCodec {
    /// Encode `image` at `quality`. Must be deterministic.
    fn encode(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>, image::ImageError>;
}

/// Baseline JPEG via the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegCodec;

impl QualityCodec for JpegCodec {
    fn encode(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
        let mut buf = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
        match image {
            DynamicImage::ImageRgb8(rgb) => {
                encoder.write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)?
            }
            // JPEG has no alpha channel
            other => {
                let rgb = other.to_rgb8();
                encoder.write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)?
            }
        }
        Ok(buf)
    }
}

/// How the search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchOutcome {
    /// The default-quality encode already fits the target; no search ran.
    FastPath,
    /// The last encode landed inside the acceptance window.
    WithinWindow,
    /// The quality interval collapsed before reaching the window.
    Exhausted,
}

/// Encoded bytes plus the quality that produced them.
#[derive(Debug, Clone)]
pub struct EncodingResult {
    pub bytes: Vec<u8>,
    pub quality: u8,
    /// Encodes performed by the search loop (0 on the fast path).
    pub attempts: u32,
    pub outcome: SearchOutcome,
    /// Source size the search was seeded with.
    pub source_size_bytes: u64,
}

impl EncodingResult {
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Binary-searches the quality parameter until the output fits a [`SizeTarget`].
pub struct SizeConstrainedEncoder<C = JpegCodec> {
    codec: C,
    progress: Option<ProgressCallback>,
}

impl SizeConstrainedEncoder<JpegCodec> {
    /// Encoder for `format`.
    ///
    /// # Errors
    /// [`Pdf2ImgError::UnsupportedFormat`] for anything without a quality knob.
    pub fn for_format(format: EncodeFormat) -> Result<Self, Pdf2ImgError> {
        match format {
            EncodeFormat::Jpeg => Ok(Self::with_codec(JpegCodec)),
            other => Err(Pdf2ImgError::UnsupportedFormat {
                format: other.to_string(),
            }),
        }
    }
}

impl<C: QualityCodec> SizeConstrainedEncoder<C> {
    pub fn with_codec(codec: C) -> Self {
        Self {
            codec,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: Option<ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Encode `image` as close to `target` as the quality search allows.
    ///
    /// `known_source_size` seeds the initial lower bound; pass 0 to have the
    /// image measured by one encode at [`DEFAULT_QUALITY`]. If the measured
    /// encode is no larger than the target it is returned unchanged.
    pub fn encode(
        &self,
        image: &RasterImage,
        target: SizeTarget,
        known_source_size: u64,
    ) -> Result<EncodingResult, Pdf2ImgError> {
        let pixels = image.as_dynamic();

        let mut measured = None;
        let source_size = if known_source_size == 0 {
            let bytes = self.encode_at(pixels, DEFAULT_QUALITY)?;
            let size = bytes.len() as u64;
            debug!("Measured source size: {} bytes at q={}", size, DEFAULT_QUALITY);
            measured = Some(bytes);
            size
        } else {
            known_source_size
        };

        // A measured encode that fits is kept as is; a caller-supplied size
        // only says how big the source is, so the target must exceed it.
        let fits = if measured.is_some() {
            target.target_bytes >= source_size
        } else {
            target.target_bytes > source_size
        };
        if fits {
            let bytes = match measured {
                Some(bytes) => bytes,
                None => self.encode_at(pixels, DEFAULT_QUALITY)?,
            };
            info!(
                "Target {} bytes covers source {} bytes; no compression needed",
                target.target_bytes, source_size
            );
            return Ok(EncodingResult {
                bytes,
                quality: DEFAULT_QUALITY,
                attempts: 0,
                outcome: SearchOutcome::FastPath,
                source_size_bytes: source_size,
            });
        }

        let (quality, bytes, attempts, outcome) = search_quality(&target, source_size, |q| {
            let bytes = self.encode_at(pixels, q)?;
            if let Some(ref cb) = self.progress {
                cb.on_encode_attempt(q, bytes.len() as u64);
            }
            Ok(bytes)
        })?;

        info!(
            "Encoded at q={} → {} bytes after {} attempts ({:?}, window {}–{})",
            quality,
            bytes.len(),
            attempts,
            outcome,
            target.exit_low(),
            target.exit_high()
        );

        Ok(EncodingResult {
            bytes,
            quality,
            attempts,
            outcome,
            source_size_bytes: source_size,
        })
    }

    fn encode_at(&self, pixels: &DynamicImage, quality: u8) -> Result<Vec<u8>, Pdf2ImgError> {
        self.codec
            .encode(pixels, quality)
            .map_err(|source| Pdf2ImgError::EncodeFailed { quality, source })
    }
}

/// The quality search itself, over any encode function.
///
/// Returns `(quality, bytes, attempts, outcome)`. Normally that is the last
/// encode made; when the interval narrows onto a lower bound that was
/// already encoded (and found too small), that cached encode is returned
/// instead of producing it a second time.
fn search_quality<F>(
    target: &SizeTarget,
    source_size: u64,
    mut encode_at: F,
) -> Result<(u8, Vec<u8>, u32, SearchOutcome), Pdf2ImgError>
where
    F: FnMut(u8) -> Result<Vec<u8>, Pdf2ImgError>,
{
    let ratio = if source_size == 0 {
        100
    } else {
        (100u128 * u128::from(target.target_bytes) / u128::from(source_size)).min(100) as u32
    };
    let mut lo = ratio.max(1);
    let mut hi = 100u32;
    let mut quality = (lo + hi) / 2;
    let mut attempts = 0u32;
    let mut floor_probe: Option<(u32, Vec<u8>)> = None;

    loop {
        let bytes = encode_at(quality as u8)?;
        attempts += 1;
        let size = bytes.len() as u64;
        debug!("q={} [{}, {}] → {} bytes", quality, lo, hi, size);

        if target.contains(size) {
            return Ok((quality as u8, bytes, attempts, SearchOutcome::WithinWindow));
        }
        if lo >= hi {
            return Ok((quality as u8, bytes, attempts, SearchOutcome::Exhausted));
        }

        if size < target.exit_low() {
            lo = quality;
            if (lo + hi) / 2 == quality {
                return Ok((quality as u8, bytes, attempts, SearchOutcome::Exhausted));
            }
            floor_probe = Some((quality, bytes));
        } else {
            hi = quality;
            let next = (lo + hi) / 2;
            if next == quality {
                return Ok((quality as u8, bytes, attempts, SearchOutcome::Exhausted));
            }
            match floor_probe.take() {
                Some((q, kept)) if q == next => {
                    return Ok((q as u8, kept, attempts, SearchOutcome::Exhausted));
                }
                kept => floor_probe = kept,
            }
        }

        quality = (lo + hi) / 2;
    }
}
