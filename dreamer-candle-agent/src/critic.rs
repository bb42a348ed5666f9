//! Critic of the Dreamer agent.
use crate::{
    mlp::{Mlp, MlpConfig},
    model::SubModel1,
};
use anyhow::Result;
use candle_core::{Tensor, D};
use candle_nn::VarBuilder;

/// State-value function on latent features.
pub struct Critic {
    mlp: Mlp,
}

impl Critic {
    /// Builds the critic with parameters under `vb`.
    pub fn build(vb: VarBuilder, units: &[usize], feature_dim: usize) -> Result<Self> {
        let config = MlpConfig::new(feature_dim, units.to_vec(), 1, false);
        Ok(Self {
            mlp: Mlp::build(vb, config)?,
        })
    }

    /// Values of features `[.., F]`, returned as `[..]`.
    pub fn forward(&self, features: &Tensor) -> Result<Tensor> {
        Ok(self.mlp.forward(features)?.squeeze(D::Minus1)?)
    }
}
