use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`ConvEncoder`](super::ConvEncoder).
pub struct ConvEncoderConfig {
    /// Number of channels of input images.
    pub in_channels: usize,

    /// Multiplier of the number of feature maps.
    pub depth: usize,
}

impl ConvEncoderConfig {
    /// Creates a configuration.
    pub fn new(in_channels: usize, depth: usize) -> Self {
        Self { in_channels, depth }
    }

    /// Dimension of the embedding of a 64x64 image.
    pub fn out_dim(&self) -> usize {
        32 * self.depth
    }
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`ConvDecoder`](super::ConvDecoder).
pub struct ConvDecoderConfig {
    /// Dimension of input features.
    pub in_dim: usize,

    /// Number of channels of output images.
    pub out_channels: usize,

    /// Multiplier of the number of feature maps.
    pub depth: usize,
}

impl ConvDecoderConfig {
    /// Creates a configuration.
    pub fn new(in_dim: usize, out_channels: usize, depth: usize) -> Self {
        Self {
            in_dim,
            out_channels,
            depth,
        }
    }
}
