use super::{mlp_forward, MlpConfig};
use crate::model::SubModel1;
use anyhow::Result;
use candle_core::{Device, Tensor};
use candle_nn::{linear, Linear, VarBuilder};

/// Returns the linear layers from [`MlpConfig`], named `{prefix}.ln{i}`.
fn create_linear_layers(prefix: &str, vb: VarBuilder, config: &MlpConfig) -> Result<Vec<Linear>> {
    let mut dims = Vec::with_capacity(config.units.len() + 2);
    dims.push(config.in_dim);
    dims.extend(config.units.iter().copied());
    dims.push(config.out_dim);
    let vb = vb.pp(prefix);

    dims.windows(2)
        .enumerate()
        .map(|(i, w)| Ok(linear(w[0], w[1], vb.pp(format!("ln{}", i)))?))
        .collect()
}

/// Multilayer perceptron with ELU activation function.
///
/// Inputs of any rank are accepted as long as the last dimension is
/// `in_dim`.
pub struct Mlp {
    config: MlpConfig,
    device: Device,
    layers: Vec<Linear>,
}

impl SubModel1 for Mlp {
    type Config = MlpConfig;
    type Input = Tensor;
    type Output = Tensor;

    fn forward(&self, xs: &Self::Input) -> Result<Tensor> {
        let xs = xs.to_device(&self.device)?;
        let xs = mlp_forward(&xs, &self.layers)?;

        match self.config.activation_out {
            false => Ok(xs),
            true => Ok(xs.elu(1.0)?),
        }
    }

    fn build(vb: VarBuilder, config: Self::Config) -> Result<Self> {
        let device = vb.device().clone();
        let layers = create_linear_layers("mlp", vb, &config)?;

        Ok(Mlp {
            config,
            device,
            layers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::DType;
    use candle_nn::VarMap;

    #[test]
    fn test_mlp_shapes_and_names() -> Result<()> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let mlp = Mlp::build(vb.pp("reward"), MlpConfig::new(6, vec![8, 8], 1, false))?;

        let xs = Tensor::zeros((4, 3, 6), DType::F32, &Device::Cpu)?;
        assert_eq!(mlp.forward(&xs)?.dims(), &[4, 3, 1]);

        let mut names: Vec<String> = varmap.data().lock().unwrap().keys().cloned().collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "reward.mlp.ln0.bias",
                "reward.mlp.ln0.weight",
                "reward.mlp.ln1.bias",
                "reward.mlp.ln1.weight",
                "reward.mlp.ln2.bias",
                "reward.mlp.ln2.weight",
            ]
        );
        Ok(())
    }
}
