use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};
use tracing::debug;

use crate::error::CompositeError;
use crate::overlay::Overlay;
use crate::scale::scale_overlay;

/// JPEG quality of composited output.
pub const JPEG_QUALITY: u8 = 75;

/// `round(v / 255)` in integer arithmetic.
fn div255(v: u32) -> u32 {
    let t = v + 128;
    ((t >> 8) + t) >> 8
}

/// Paste `overlay` onto `base` at (0, 0), using the overlay's alpha as mask.
///
/// Every channel, alpha included, becomes `src * a + dst * (255 - a)`
/// divided by 255 and rounded.
#[allow(clippy::cast_possible_truncation)]
fn paste_with_mask(base: &mut RgbaImage, overlay: &RgbaImage) {
    let width = base.width().min(overlay.width());
    let height = base.height().min(overlay.height());
    for y in 0..height {
        for x in 0..width {
            let src = overlay.get_pixel(x, y);
            let mask = u32::from(src[3]);
            if mask == 0 {
                continue;
            }
            let dst = base.get_pixel_mut(x, y);
            for c in 0..4 {
                let blended = u32::from(src[c]) * mask + u32::from(dst[c]) * (255 - mask);
                // At most 255 * 255 before division, so the result fits in u8.
                dst[c] = div255(blended) as u8;
            }
        }
    }
}

/// Composite `overlay` onto the encoded image `original` and return JPEG
/// bytes of the same dimensions as the original.
pub fn composite(original: &[u8], overlay: &Overlay) -> Result<Vec<u8>, CompositeError> {
    let decoded =
        image::load_from_memory(original).map_err(|e| CompositeError::Decode(e.to_string()))?;
    let target = (decoded.width(), decoded.height());
    if target.0 == 0 || target.1 == 0 {
        return Err(CompositeError::Decode("image has no pixels".into()));
    }

    let scaled = scale_overlay(overlay.image(), target);
    debug!(
        width = target.0,
        height = target.1,
        overlay_width = scaled.width(),
        overlay_height = scaled.height(),
        "compositing overlay"
    );

    let mut base = decoded.to_rgba8();
    paste_with_mask(&mut base, &scaled);

    let rgb = DynamicImage::ImageRgba8(base).to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(|e| CompositeError::Encode(e.to_string()))?;
    Ok(out)
}

/// Owns the overlay and composites originals with it.
///
/// Cheap to clone; the overlay is shared.
#[derive(Debug, Clone)]
pub struct Compositor {
    overlay: Arc<Overlay>,
}

impl Compositor {
    /// Create a compositor for `overlay`.
    pub fn new(overlay: Overlay) -> Self {
        Self {
            overlay: Arc::new(overlay),
        }
    }

    /// The overlay this compositor applies.
    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    /// Composite the overlay onto `original`. See [`composite`].
    pub fn composite(&self, original: &[u8]) -> Result<Vec<u8>, CompositeError> {
        composite(original, &self.overlay)
    }
}
