//! Per-run storage for intermediate page bitmaps and the combined canvas.
//!
//! In [`StagingMode::Memory`] pages go straight from renderer to compositor.
//! In [`StagingMode::Disk`] every page is written as a PNG into a private
//! [`TempDir`], read back for compositing, and the canvas is written once more
//! so its file size can seed the quality search. Each run gets its own
//! directory, so concurrent conversions never collide.
//!
//! [`StagingArea::cleanup`] must run on every exit path. Removal failures are
//! logged and returned as warnings rather than errors. If a panic skips
//! `cleanup`, dropping the `TempDir` still removes the directory.

use crate::config::StagingMode;
use crate::error::Pdf2ImgError;
use crate::raster::RasterImage;
use image::ImageFormat;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

/// A staged page: held in memory or written to the staging directory.
#[derive(Debug)]
pub enum StagedPage {
    Memory(RasterImage),
    Disk(PathBuf),
}

/// Owner of every intermediate artifact produced by one conversion.
#[derive(Debug)]
pub struct StagingArea {
    dir: Option<TempDir>,
    artifacts: Vec<PathBuf>,
}

impl StagingArea {
    /// Create the staging area. `Disk` mode creates a fresh temporary
    /// directory, inside `parent` when given.
    pub fn new(mode: StagingMode, parent: Option<&Path>) -> Result<Self, Pdf2ImgError> {
        let dir = match mode {
            StagingMode::Memory => None,
            StagingMode::Disk => {
                let mut builder = tempfile::Builder::new();
                builder.prefix("pdf2img-");
                let created = match parent {
                    Some(p) => builder.tempdir_in(p),
                    None => builder.tempdir(),
                };
                Some(created.map_err(|e| Pdf2ImgError::StagingFailed {
                    path: parent.map(Path::to_path_buf).unwrap_or_else(std::env::temp_dir),
                    detail: e.to_string(),
                })?)
            }
        };
        Ok(Self {
            dir,
            artifacts: Vec::new(),
        })
    }

    /// Directory holding staged files, if staging on disk.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_ref().map(TempDir::path)
    }

    /// Paths of artifacts written so far.
    pub fn artifacts(&self) -> &[PathBuf] {
        &self.artifacts
    }

    /// Stage a rendered page. `name` is the file stem used on disk.
    pub fn stage(&mut self, name: &str, image: RasterImage) -> Result<StagedPage, Pdf2ImgError> {
        match self.dir() {
            None => Ok(StagedPage::Memory(image)),
            Some(dir) => {
                let path = dir.join(format!("{name}.png"));
                self.write_png(&path, &image)?;
                Ok(StagedPage::Disk(path))
            }
        }
    }

    /// Write the combined canvas and return its size in bytes, or `None`
    /// when staging in memory.
    pub fn stage_canvas(&mut self, canvas: &RasterImage) -> Result<Option<u64>, Pdf2ImgError> {
        let Some(dir) = self.dir() else {
            return Ok(None);
        };
        let path = dir.join("combined.png");
        self.write_png(&path, canvas)?;
        let len = std::fs::metadata(&path)
            .map_err(|e| Pdf2ImgError::StagingFailed {
                path: path.clone(),
                detail: e.to_string(),
            })?
            .len();
        debug!("Staged canvas: {} ({} bytes)", path.display(), len);
        Ok(Some(len))
    }

    fn write_png(&mut self, path: &Path, image: &RasterImage) -> Result<(), Pdf2ImgError> {
        // record first so a half-written file is still cleaned up
        self.artifacts.push(path.to_path_buf());
        image
            .as_dynamic()
            .save_with_format(path, ImageFormat::Png)
            .map_err(|e| Pdf2ImgError::StagingFailed {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })
    }

    /// Remove every staged artifact and the staging directory.
    ///
    /// Returns one message per artifact that could not be removed.
    pub fn cleanup(mut self) -> Vec<String> {
        let mut warnings = Vec::new();

        for path in self.artifacts.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!("Removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!("Failed to remove {}: {}", path.display(), e);
                    warnings.push(format!("{}: {}", path.display(), e));
                }
            }
        }

        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                warn!("Failed to remove staging directory {}: {}", path.display(), e);
                warnings.push(format!("{}: {}", path.display(), e));
            }
        }

        warnings
    }
}

impl StagedPage {
    /// Turn the staged page back into pixels, reading it from disk if needed.
    pub fn load(self) -> Result<RasterImage, Pdf2ImgError> {
        match self {
            StagedPage::Memory(image) => Ok(image),
            StagedPage::Disk(path) => RasterImage::load(&path),
        }
    }
}
