//! Progress-callback trait for conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the pipeline renders each page and searches for a quality that
//! fits the size target.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2img::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct AttemptCounter {
//!     attempts: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for AttemptCounter {
//!     fn on_encode_attempt(&self, quality: u8, size_bytes: u64) {
//!         self.attempts.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("q={quality} → {size_bytes} bytes");
//!     }
//! }
//!
//! let counter = Arc::new(AttemptCounter { attempts: AtomicUsize::new(0) });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the conversion pipeline as it works through a document.
///
/// The pipeline itself is sequential, but a conversion may run on a
/// `spawn_blocking` thread, so implementations must be `Send + Sync`.
/// All methods have default no-op implementations.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once, before the first page is rendered.
    ///
    /// # Arguments
    /// * `total_pages` — number of pages that will be stitched
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called after each page has been rasterised.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number in the document
    /// * `total_pages` — number of pages being stitched
    /// * `width`, `height` — rendered size in pixels
    fn on_page_rendered(&self, page_num: usize, total_pages: usize, width: u32, height: u32) {
        let _ = (page_num, total_pages, width, height);
    }

    /// Called once the combined canvas exists.
    fn on_canvas_ready(&self, width: u32, height: u32) {
        let _ = (width, height);
    }

    /// Called after every encode performed while searching for a quality.
    fn on_encode_attempt(&self, quality: u8, size_bytes: u64) {
        let _ = (quality, size_bytes);
    }

    /// Called once the output file has been written.
    ///
    /// # Arguments
    /// * `output_bytes` — size of the written file
    /// * `quality`      — JPEG quality that produced it
    fn on_conversion_complete(&self, output_bytes: u64, quality: u8) {
        let _ = (output_bytes, quality);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
