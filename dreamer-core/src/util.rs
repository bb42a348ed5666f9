//! Image conversions.
use crate::record::RecordValue;
use ndarray::{Array, Array4, Dimension};

/// Maps `u8` pixels to `[-0.5, 0.5]`.
pub fn normalize_image<D: Dimension>(img: &Array<u8, D>) -> Array<f32, D> {
    img.mapv(|v| v as f32 / 255.0 - 0.5)
}

/// Inverse of [`normalize_image`]; values outside `[-0.5, 0.5]` are clamped.
pub fn denormalize_image<D: Dimension>(img: &Array<f32, D>) -> Array<u8, D> {
    img.mapv(|v| ((v + 0.5) * 255.0).round().max(0.0).min(255.0) as u8)
}

/// Turns normalized frames `[T, C, H, W]` into a [`RecordValue::Video`].
pub fn video_record(frames: &Array4<f32>) -> RecordValue {
    let (t, c, h, w) = frames.dim();
    let pixels = denormalize_image(frames);
    RecordValue::Video(pixels.iter().copied().collect(), [t, c, h, w])
}
