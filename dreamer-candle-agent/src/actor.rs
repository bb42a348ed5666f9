//! Actor of the Dreamer agent.
use crate::{
    mlp::{Mlp, MlpConfig},
    model::SubModel1,
    util::{normal_logp, softplus},
};
use anyhow::Result;
use candle_core::{Tensor, D};
use candle_nn::VarBuilder;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`Actor`].
pub struct ActorConfig {
    /// Hidden units of the MLP.
    pub units: Vec<usize>,

    /// Standard deviation of actions when the raw output is zero.
    pub init_std: f64,

    /// Lower bound of the standard deviation.
    pub min_std: f64,

    /// Bound of the mean before squashing.
    pub mean_scale: f64,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            units: vec![400; 4],
            init_std: 5.0,
            min_std: 1e-4,
            mean_scale: 5.0,
        }
    }
}

impl ActorConfig {
    /// Sets hidden units.
    pub fn units(mut self, v: Vec<usize>) -> Self {
        self.units = v;
        self
    }
}

/// Gaussian squashed by `tanh`.
#[derive(Clone, Debug)]
pub struct ActionDist {
    /// Mean before squashing, `[N, A]`.
    pub mean: Tensor,

    /// Standard deviation before squashing, `[N, A]`.
    pub std: Tensor,
}

impl ActionDist {
    /// Draws actions with the reparameterization trick.
    ///
    /// Returns actions in `(-1, 1)` and their log density, `[N, A]` and `[N]`.
    pub fn sample(&self) -> Result<(Tensor, Tensor)> {
        let u = (&self.mean + (&self.std * self.std.randn_like(0.0, 1.0)?)?)?;
        let act = u.tanh()?;

        // log(1 - tanh(u)^2) = 2 * (log 2 - u - softplus(-2u))
        let log_det = ((2f64.ln() - &u)? - softplus(&(&u * -2.0)?)?)?;
        let log_det = (log_det * 2.0)?;
        let logp = (normal_logp(&u, &self.mean, &self.std)? - log_det)?.sum(D::Minus1)?;

        Ok((act, logp))
    }

    /// Deterministic action, `tanh(mean)`.
    pub fn mode(&self) -> Result<Tensor> {
        Ok(self.mean.tanh()?)
    }
}

/// Maps latent features to a distribution of actions.
pub struct Actor {
    config: ActorConfig,
    action_dim: usize,
    mlp: Mlp,
}

impl Actor {
    /// Builds the actor with parameters under `vb`.
    pub fn build(
        vb: VarBuilder,
        config: &ActorConfig,
        feature_dim: usize,
        action_dim: usize,
    ) -> Result<Self> {
        let mlp_config = MlpConfig::new(feature_dim, config.units.clone(), 2 * action_dim, false);
        Ok(Self {
            config: config.clone(),
            action_dim,
            mlp: Mlp::build(vb, mlp_config)?,
        })
    }

    /// Dimension of actions.
    pub fn action_dim(&self) -> usize {
        self.action_dim
    }

    /// Distribution of actions given features `[N, F]`.
    pub fn forward(&self, features: &Tensor) -> Result<ActionDist> {
        let raw = self.mlp.forward(features)?;
        let chunks = raw.chunk(2, D::Minus1)?;
        let scale = self.config.mean_scale;
        let mean = ((&chunks[0] / scale)?.tanh()? * scale)?;

        // softplus(raw_init_std) == init_std
        let raw_init_std = (self.config.init_std.exp() - 1.0).ln();
        let std = (softplus(&(&chunks[1] + raw_init_std)?)? + self.config.min_std)?;

        Ok(ActionDist { mean, std })
    }
}
