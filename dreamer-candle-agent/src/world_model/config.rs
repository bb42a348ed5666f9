use crate::{
    cnn::{ConvDecoderConfig, ConvEncoderConfig},
    rssm::RssmConfig,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`WorldModel`](super::WorldModel).
pub struct WorldModelConfig {
    /// Number of channels of observations.
    pub obs_channels: usize,

    /// Dimension of actions.
    pub action_dim: usize,

    /// Multiplier of the number of feature maps of the encoder and decoder.
    pub cnn_depth: usize,

    /// Dimension of the stochastic state.
    pub stoch_dim: usize,

    /// Dimension of the deterministic state.
    pub deter_dim: usize,

    /// Hidden units of the transition model.
    pub hidden_dim: usize,

    /// Lower bound of the standard deviation of the stochastic state.
    pub min_std: f64,

    /// Hidden units of the reward head.
    pub reward_units: Vec<usize>,

    /// The KL term is not penalized below this value.
    pub free_nats: f64,

    /// Weight of the KL term.
    pub kl_scale: f64,
}

impl Default for WorldModelConfig {
    fn default() -> Self {
        Self {
            obs_channels: 3,
            action_dim: 1,
            cnn_depth: 32,
            stoch_dim: 30,
            deter_dim: 200,
            hidden_dim: 200,
            min_std: 0.1,
            reward_units: vec![400, 400],
            free_nats: 3.0,
            kl_scale: 1.0,
        }
    }
}

impl WorldModelConfig {
    /// Sets the number of channels of observations.
    pub fn obs_channels(mut self, v: usize) -> Self {
        self.obs_channels = v;
        self
    }

    /// Sets the dimension of actions.
    pub fn action_dim(mut self, v: usize) -> Self {
        self.action_dim = v;
        self
    }

    /// Sets the depth of the encoder and decoder.
    pub fn cnn_depth(mut self, v: usize) -> Self {
        self.cnn_depth = v;
        self
    }

    /// Sets the dimensions of the latent state and of the transition model.
    pub fn latent_dims(mut self, stoch_dim: usize, deter_dim: usize, hidden_dim: usize) -> Self {
        self.stoch_dim = stoch_dim;
        self.deter_dim = deter_dim;
        self.hidden_dim = hidden_dim;
        self
    }

    /// Sets hidden units of the reward head.
    pub fn reward_units(mut self, v: Vec<usize>) -> Self {
        self.reward_units = v;
        self
    }

    /// Sets free nats.
    pub fn free_nats(mut self, v: f64) -> Self {
        self.free_nats = v;
        self
    }

    /// Dimension of latent features.
    pub fn feature_dim(&self) -> usize {
        self.stoch_dim + self.deter_dim
    }

    pub(super) fn encoder_config(&self) -> ConvEncoderConfig {
        ConvEncoderConfig::new(self.obs_channels, self.cnn_depth)
    }

    pub(super) fn decoder_config(&self) -> ConvDecoderConfig {
        ConvDecoderConfig::new(self.feature_dim(), self.obs_channels, self.cnn_depth)
    }

    pub(super) fn rssm_config(&self) -> RssmConfig {
        RssmConfig {
            stoch_dim: self.stoch_dim,
            deter_dim: self.deter_dim,
            hidden_dim: self.hidden_dim,
            action_dim: self.action_dim,
            embed_dim: self.encoder_config().out_dim(),
            min_std: self.min_std,
        }
    }
}
