use std::path::Path;

use image::RgbaImage;

use crate::error::CompositeError;

/// The fixed overlay composited onto every original.
///
/// Kept as RGBA so its alpha channel can serve as the blend mask.
#[derive(Debug, Clone)]
pub struct Overlay {
    image: RgbaImage,
}

impl Overlay {
    /// Wrap an already decoded RGBA image.
    pub fn from_image(image: RgbaImage) -> Result<Self, CompositeError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(CompositeError::Overlay("overlay has no pixels".into()));
        }
        Ok(Self { image })
    }

    /// Decode an overlay from encoded image bytes (PNG recommended).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CompositeError> {
        let decoded =
            image::load_from_memory(bytes).map_err(|e| CompositeError::Overlay(e.to_string()))?;
        Self::from_image(decoded.to_rgba8())
    }

    /// Read and decode an overlay file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CompositeError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| CompositeError::Overlay(format!("{}: {e}", path.display())))?;
        Self::from_bytes(&bytes)
    }

    /// Overlay size as `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// The overlay pixels.
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}
