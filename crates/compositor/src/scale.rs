//! Overlay scaling.
//!
//! Two branches, chosen by comparing the overlay with the original:
//!
//! * [`ScalePolicy::Contain`] when the overlay is wider or taller than the
//!   original. The overlay shrinks to fit inside, keeping its aspect ratio.
//! * [`ScalePolicy::Cover`] otherwise. The overlay is center-cropped to the
//!   original's aspect ratio and resized to fill it exactly.

use image::RgbaImage;
use image::imageops::{self, FilterType};

/// Resampling filter used by both branches (bicubic).
const FILTER: FilterType = FilterType::CatmullRom;

/// How the overlay is fitted onto the original.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalePolicy {
    /// Shrink to fit inside, preserving aspect ratio. Never upscales.
    Contain,
    /// Center-crop to the target aspect ratio, then resize to fill.
    Cover,
}

impl ScalePolicy {
    /// Pick the branch for an overlay of size `overlay` on a target of size
    /// `target`.
    pub fn select(overlay: (u32, u32), target: (u32, u32)) -> Self {
        if overlay.0 > target.0 || overlay.1 > target.1 {
            Self::Contain
        } else {
            Self::Cover
        }
    }
}

/// Size of `src` after shrinking to fit inside `max`, preserving aspect
/// ratio.
///
/// The constrained side takes the bound exactly; the other side is whichever
/// of its floor or ceiling best preserves the aspect ratio (floor on ties)
/// and is never below 1. Sources that already fit are returned unchanged.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn thumbnail_size(src: (u32, u32), max: (u32, u32)) -> (u32, u32) {
    let (w, h) = src;
    let (mut x, mut y) = max;
    if (x >= w && y >= h) || w == 0 || h == 0 || x == 0 || y == 0 {
        return src;
    }

    let round_aspect = |n: f64, key: &dyn Fn(f64) -> f64| -> u32 {
        let (lo, hi) = (n.floor(), n.ceil());
        let best = if key(hi) < key(lo) { hi } else { lo };
        (best as u32).max(1)
    };

    let aspect = f64::from(w) / f64::from(h);
    let (fx, fy) = (f64::from(x), f64::from(y));
    if fx / fy >= aspect {
        x = round_aspect(fy * aspect, &|n| (aspect - n / fy).abs());
    } else {
        y = round_aspect(fx / aspect, &|n| {
            if n == 0.0 { 0.0 } else { (aspect - fx / n).abs() }
        });
    }
    (x, y)
}

/// A fractional crop rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Centered crop of `src` that has the aspect ratio of `target`.
///
/// The crop keeps the full extent of one side of `src` and trims the other
/// symmetrically.
pub fn fit_crop_box(src: (u32, u32), target: (u32, u32)) -> CropBox {
    let (sw, sh) = (f64::from(src.0), f64::from(src.1));
    let live_ratio = sw / sh;
    let output_ratio = f64::from(target.0) / f64::from(target.1);

    let (width, height) = if (live_ratio - output_ratio).abs() < f64::EPSILON {
        (sw, sh)
    } else if live_ratio >= output_ratio {
        (output_ratio * sh, sh)
    } else {
        (sw, sw / output_ratio)
    };

    CropBox {
        left: (sw - width) * 0.5,
        top: (sh - height) * 0.5,
        width,
        height,
    }
}

/// Round a crop box to whole pixels inside a `src`-sized image.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn pixel_crop(crop: CropBox, src: (u32, u32)) -> (u32, u32, u32, u32) {
    let width = (crop.width.round() as u32).clamp(1, src.0);
    let height = (crop.height.round() as u32).clamp(1, src.1);
    let left = (crop.left.round() as u32).min(src.0 - width);
    let top = (crop.top.round() as u32).min(src.1 - height);
    (left, top, width, height)
}

/// Scale `overlay` for a target image of size `target`.
///
/// The result is `target`-sized for [`ScalePolicy::Cover`] and fits inside
/// `target` for [`ScalePolicy::Contain`].
pub fn scale_overlay(overlay: &RgbaImage, target: (u32, u32)) -> RgbaImage {
    let src = overlay.dimensions();
    match ScalePolicy::select(src, target) {
        ScalePolicy::Contain => {
            let (w, h) = thumbnail_size(src, target);
            if (w, h) == src {
                overlay.clone()
            } else {
                imageops::resize(overlay, w, h, FILTER)
            }
        }
        ScalePolicy::Cover => {
            if src == target {
                return overlay.clone();
            }
            let (left, top, width, height) = pixel_crop(fit_crop_box(src, target), src);
            let cropped = imageops::crop_imm(overlay, left, top, width, height).to_image();
            imageops::resize(&cropped, target.0, target.1, FILTER)
        }
    }
}
