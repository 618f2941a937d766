//! Input validation: make sure the source path is a readable PDF.
//!
//! pdfium reports a missing or non-PDF file as a generic load failure.
//! Checking existence, permissions and the `%PDF` magic bytes up front gives
//! callers a specific [`Pdf2ImgError`] before any rendering work starts.

use crate::error::Pdf2ImgError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate a local file path, returning it unchanged on success.
pub fn resolve_local(path: &Path) -> Result<PathBuf, Pdf2ImgError> {
    let path = path.to_path_buf();

    if !path.exists() {
        return Err(Pdf2ImgError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(Pdf2ImgError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Pdf2ImgError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(Pdf2ImgError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}
