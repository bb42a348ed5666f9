//! Convolutional encoder and decoder of 64x64 images.
mod config;
mod decoder;
mod encoder;
pub use config::{ConvDecoderConfig, ConvEncoderConfig};
pub use decoder::ConvDecoder;
pub use encoder::ConvEncoder;
use candle_core::{Result, Tensor};

/// Merges all leading dimensions of `xs` except the last `keep` ones.
///
/// Returns the merged tensor and the leading dimensions for
/// [`split_leading`].
fn merge_leading(xs: &Tensor, keep: usize) -> Result<(Tensor, Vec<usize>)> {
    let dims = xs.dims();
    let n_lead = dims.len().saturating_sub(keep);
    let lead = dims[..n_lead].to_vec();
    let mut shape = vec![lead.iter().product::<usize>()];
    shape.extend_from_slice(&dims[n_lead..]);
    Ok((xs.reshape(shape)?, lead))
}

/// Inverse of [`merge_leading`].
fn split_leading(xs: &Tensor, lead: &[usize]) -> Result<Tensor> {
    let mut shape = lead.to_vec();
    shape.extend_from_slice(&xs.dims()[1..]);
    xs.reshape(shape)
}
