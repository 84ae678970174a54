//! Image compositing for the watify stage.
//!
//! An [`Overlay`] is loaded once at startup and shared through a
//! [`Compositor`]. Each call scales the overlay to the original image with
//! one of two [`ScalePolicy`] branches, alpha-composites it at the top-left
//! corner and encodes the result as JPEG. Output is deterministic for a
//! given original and overlay.

pub mod composite;
pub mod error;
pub mod overlay;
pub mod scale;

pub use composite::{Compositor, JPEG_QUALITY, composite};
pub use error::CompositeError;
pub use overlay::Overlay;
pub use scale::{CropBox, ScalePolicy, fit_crop_box, scale_overlay, thumbnail_size};
