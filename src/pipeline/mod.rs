//! Pipeline stages for PDF-to-image conversion.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and the rendering backend can be swapped without
//! touching the other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ staging ──▶ composite ──▶ encode
//! (path)    (pdfium)   (mem/disk)  (canvas)      (JPEG, sized)
//! ```
//!
//! 1. [`input`]     — check the path exists and starts with `%PDF`
//! 2. [`render`]    — rasterise selected pages through a [`render::RenderBackend`]
//! 3. [`staging`]   — hold page bitmaps in memory or as PNGs in a per-run
//!    temp directory; owns every intermediate artifact until cleanup
//! 4. [`composite`] — stitch pages into one canvas along the merge axis
//! 5. [`encode`]    — binary-search JPEG quality until the output lands in
//!    the target size window

pub mod composite;
pub mod encode;
pub mod input;
pub mod render;
pub mod staging;
