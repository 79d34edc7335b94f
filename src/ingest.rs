//! Image source adapter: persists an upload into a slot and decodes it.

use std::fs;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};
use tracing::debug;

use crate::error::{AnalyzerError, Result};

/// File extensions accepted from the upload form.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

pub const DEFAULT_SLOT_NAME: &str = "uploaded_image";

pub fn is_supported_extension(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

/// Storage location for one upload. Every ingest into the same slot
/// replaces the previous contents; separate slots never share a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSlot {
    path: PathBuf,
}

impl UploadSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(dir: impl AsRef<Path>, name: &str) -> Self {
        Self::new(dir.as_ref().join(name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// An upload after it has been stored and decoded.
#[derive(Debug, Clone)]
pub struct IngestedImage {
    pub path: PathBuf,
    pub image: DynamicImage,
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
}

/// Store `bytes` verbatim in `slot`, then decode them.
///
/// The slot is overwritten even when decoding fails afterwards, so a bad
/// upload never leaves an older image behind to be analyzed by mistake.
pub fn ingest(slot: &UploadSlot, bytes: Vec<u8>) -> Result<IngestedImage> {
    if let Some(parent) = slot.path().parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(slot.path(), &bytes)?;
    debug!("Stored {} bytes at {}", bytes.len(), slot.path().display());

    let (image, format) = decode(&bytes)?;

    Ok(IngestedImage {
        path: slot.path().to_path_buf(),
        image,
        bytes,
        format,
    })
}

/// Decode JPEG or PNG bytes. The format is whatever the decoder guesses.
pub fn decode(bytes: &[u8]) -> Result<(DynamicImage, ImageFormat)> {
    if bytes.is_empty() {
        return Err(AnalyzerError::Decode("image data is empty".to_string()));
    }

    let format = image::guess_format(bytes).map_err(|e| AnalyzerError::Decode(e.to_string()))?;
    if !matches!(format, ImageFormat::Jpeg | ImageFormat::Png) {
        return Err(AnalyzerError::UnsupportedFormat(format!("{:?}", format)));
    }

    let image = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| AnalyzerError::Decode(e.to_string()))?;

    Ok((image, format))
}
