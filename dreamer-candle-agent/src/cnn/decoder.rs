use super::{merge_leading, split_leading, ConvDecoderConfig};
use crate::model::SubModel1;
use anyhow::Result;
use candle_core::{Device, Tensor};
use candle_nn::{
    conv::ConvTranspose2dConfig,
    conv_transpose2d, linear,
    sequential::{seq, Sequential},
    Module, VarBuilder,
};

/// Maps latent features to the mean of a 64x64 image.
pub struct ConvDecoder {
    device: Device,
    seq: Sequential,
}

impl ConvDecoder {
    fn stride(s: usize) -> ConvTranspose2dConfig {
        ConvTranspose2dConfig {
            padding: 0,
            output_padding: 0,
            stride: s,
            dilation: 1,
        }
    }

    fn create_net(vb: &VarBuilder, config: &ConvDecoderConfig) -> Result<Sequential> {
        let d = config.depth;
        let seq = seq()
            .add(linear(config.in_dim, 32 * d, vb.pp("l1"))?)
            .add_fn(move |xs| xs.reshape((xs.dim(0)?, 32 * d, 1, 1)))
            // 1 -> 5 -> 13 -> 30 -> 64
            .add(conv_transpose2d(32 * d, 4 * d, 5, Self::stride(2), vb.pp("d1"))?)
            .add_fn(|xs| xs.relu())
            .add(conv_transpose2d(4 * d, 2 * d, 5, Self::stride(2), vb.pp("d2"))?)
            .add_fn(|xs| xs.relu())
            .add(conv_transpose2d(2 * d, d, 6, Self::stride(2), vb.pp("d3"))?)
            .add_fn(|xs| xs.relu())
            .add(conv_transpose2d(
                d,
                config.out_channels,
                6,
                Self::stride(2),
                vb.pp("d4"),
            )?);

        Ok(seq)
    }
}

impl SubModel1 for ConvDecoder {
    type Config = ConvDecoderConfig;
    /// Features of shape `[.., in_dim]`.
    type Input = Tensor;
    /// Images of shape `[.., C, 64, 64]`.
    type Output = Tensor;

    fn forward(&self, xs: &Self::Input) -> Result<Tensor> {
        let (xs, lead) = merge_leading(&xs.to_device(&self.device)?, 1)?;
        let ys = self.seq.forward(&xs)?;
        Ok(split_leading(&ys, &lead)?)
    }

    fn build(vb: VarBuilder, config: Self::Config) -> Result<Self> {
        let device = vb.device().clone();
        let seq = Self::create_net(&vb, &config)?;
        Ok(Self { device, seq })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cnn::{ConvEncoder, ConvEncoderConfig};
    use candle_core::DType;
    use candle_nn::VarMap;

    #[test]
    fn test_encoder_decoder_shapes() -> Result<()> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let enc_config = ConvEncoderConfig::new(3, 2);
        let embed_dim = enc_config.out_dim();
        let encoder = ConvEncoder::build(vb.pp("encoder"), enc_config)?;
        let decoder = ConvDecoder::build(vb.pp("decoder"), ConvDecoderConfig::new(10, 3, 2))?;

        let obs = Tensor::zeros((2, 3, 3, 64, 64), DType::F32, &Device::Cpu)?;
        let embed = encoder.forward(&obs)?;
        assert_eq!(embed.dims(), &[2, 3, embed_dim]);

        let feat = Tensor::zeros((5, 10), DType::F32, &Device::Cpu)?;
        assert_eq!(decoder.forward(&feat)?.dims(), &[5, 3, 64, 64]);
        Ok(())
    }
}
