use super::{merge_leading, split_leading, ConvEncoderConfig};
use crate::model::SubModel1;
use anyhow::Result;
use candle_core::{Device, Tensor};
use candle_nn::{
    conv::Conv2dConfig,
    conv2d,
    sequential::{seq, Sequential},
    Module, VarBuilder,
};

/// Four stride-2 convolutions mapping a 64x64 image to a flat embedding.
pub struct ConvEncoder {
    config: ConvEncoderConfig,
    device: Device,
    seq: Sequential,
}

impl ConvEncoder {
    fn stride(s: usize) -> Conv2dConfig {
        Conv2dConfig {
            stride: s,
            ..Default::default()
        }
    }

    fn create_net(vb: &VarBuilder, config: &ConvEncoderConfig) -> Result<Sequential> {
        let d = config.depth;
        let seq = seq()
            .add(conv2d(config.in_channels, d, 4, Self::stride(2), vb.pp("c1"))?)
            .add_fn(|xs| xs.relu())
            .add(conv2d(d, 2 * d, 4, Self::stride(2), vb.pp("c2"))?)
            .add_fn(|xs| xs.relu())
            .add(conv2d(2 * d, 4 * d, 4, Self::stride(2), vb.pp("c3"))?)
            .add_fn(|xs| xs.relu())
            .add(conv2d(4 * d, 8 * d, 4, Self::stride(2), vb.pp("c4"))?)
            .add_fn(|xs| xs.relu()?.flatten_from(1));

        Ok(seq)
    }

    /// Dimension of the embedding.
    pub fn out_dim(&self) -> usize {
        self.config.out_dim()
    }
}

impl SubModel1 for ConvEncoder {
    type Config = ConvEncoderConfig;
    /// Images of shape `[.., C, 64, 64]`.
    type Input = Tensor;
    /// Embeddings of shape `[.., 32 * depth]`.
    type Output = Tensor;

    fn forward(&self, xs: &Self::Input) -> Result<Tensor> {
        let (xs, lead) = merge_leading(&xs.to_device(&self.device)?, 3)?;
        let ys = self.seq.forward(&xs)?;
        Ok(split_leading(&ys, &lead)?)
    }

    fn build(vb: VarBuilder, config: Self::Config) -> Result<Self> {
        let device = vb.device().clone();
        let seq = Self::create_net(&vb, &config)?;

        Ok(Self {
            config,
            device,
            seq,
        })
    }
}
