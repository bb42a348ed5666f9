use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`Rssm`](super::Rssm).
pub struct RssmConfig {
    /// Dimension of the stochastic state.
    pub stoch_dim: usize,

    /// Dimension of the deterministic state.
    pub deter_dim: usize,

    /// Number of hidden units of the layers around the GRU.
    pub hidden_dim: usize,

    /// Dimension of actions.
    pub action_dim: usize,

    /// Dimension of observation embeddings.
    pub embed_dim: usize,

    /// Lower bound of the standard deviation of the stochastic state.
    pub min_std: f64,
}

impl RssmConfig {
    /// Dimension of the features, `stoch_dim + deter_dim`.
    pub fn feature_dim(&self) -> usize {
        self.stoch_dim + self.deter_dim
    }
}
