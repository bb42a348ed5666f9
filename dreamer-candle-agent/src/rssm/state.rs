use super::RssmConfig;
use anyhow::Result;
use candle_core::{DType, Device, Tensor, D};

/// Latent state of the [`Rssm`](super::Rssm).
///
/// All fields share the leading dimensions, e.g. `[N, _]` for a single step
/// or `[B, L, _]` for a sequence.
#[derive(Clone, Debug)]
pub struct RssmState {
    /// Deterministic state.
    pub deter: Tensor,

    /// Stochastic state.
    pub stoch: Tensor,

    /// Mean of the distribution of `stoch`.
    pub mean: Tensor,

    /// Standard deviation of the distribution of `stoch`.
    pub std: Tensor,
}

impl RssmState {
    /// All-zero state of batch size `n`. The standard deviation is one.
    pub fn zeros(n: usize, config: &RssmConfig, device: &Device) -> Result<Self> {
        let stoch = Tensor::zeros((n, config.stoch_dim), DType::F32, device)?;
        Ok(Self {
            deter: Tensor::zeros((n, config.deter_dim), DType::F32, device)?,
            mean: stoch.clone(),
            std: stoch.ones_like()?,
            stoch,
        })
    }

    /// Concatenation of the stochastic and deterministic states.
    pub fn features(&self) -> Result<Tensor> {
        Ok(Tensor::cat(&[&self.stoch, &self.deter], D::Minus1)?)
    }

    /// Same values without dependency on the computation graph.
    pub fn detach(&self) -> Self {
        Self {
            deter: self.deter.detach(),
            stoch: self.stoch.detach(),
            mean: self.mean.detach(),
            std: self.std.detach(),
        }
    }

    /// Stacks states along a new dimension.
    pub fn stack(states: &[Self], dim: usize) -> Result<Self> {
        let field = |f: fn(&Self) -> &Tensor| -> Result<Tensor> {
            let ts: Vec<&Tensor> = states.iter().map(f).collect();
            Ok(Tensor::stack(&ts, dim)?)
        };
        Ok(Self {
            deter: field(|s| &s.deter)?,
            stoch: field(|s| &s.stoch)?,
            mean: field(|s| &s.mean)?,
            std: field(|s| &s.std)?,
        })
    }

    /// Merges the first two dimensions, `[B, L, _]` to `[B * L, _]`.
    pub fn flatten(&self) -> Result<Self> {
        Ok(Self {
            deter: self.deter.flatten(0, 1)?,
            stoch: self.stoch.flatten(0, 1)?,
            mean: self.mean.flatten(0, 1)?,
            std: self.std.flatten(0, 1)?,
        })
    }

    /// Moves the state to `device`.
    pub fn to_device(&self, device: &Device) -> Result<Self> {
        Ok(Self {
            deter: self.deter.to_device(device)?,
            stoch: self.stoch.to_device(device)?,
            mean: self.mean.to_device(device)?,
            std: self.std.to_device(device)?,
        })
    }

    /// Size of the first dimension.
    pub fn batch_size(&self) -> usize {
        self.deter.dims()[0]
    }
}
