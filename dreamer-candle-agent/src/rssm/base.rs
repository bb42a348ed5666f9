use super::{RssmConfig, RssmState};
use crate::util::softplus;
use anyhow::Result;
use candle_core::{Device, Tensor, D};
use candle_nn::{
    linear,
    rnn::{gru, GRUConfig, GRUState, GRU, RNN},
    Linear, Module, VarBuilder,
};
use log::trace;

/// Recurrent state-space model.
pub struct Rssm {
    config: RssmConfig,
    device: Device,
    fc_input: Linear,
    gru: GRU,
    fc_prior_h: Linear,
    fc_prior: Linear,
    fc_post_h: Linear,
    fc_post: Linear,
}

impl Rssm {
    /// Builds the model with parameters under `vb`.
    pub fn build(vb: VarBuilder, config: RssmConfig) -> Result<Self> {
        let RssmConfig {
            stoch_dim,
            deter_dim,
            hidden_dim,
            action_dim,
            embed_dim,
            ..
        } = config;
        let device = vb.device().clone();
        trace!("Build Rssm on {:?}", device);

        Ok(Self {
            fc_input: linear(stoch_dim + action_dim, hidden_dim, vb.pp("fc_input"))?,
            gru: gru(hidden_dim, deter_dim, GRUConfig::default(), vb.pp("gru"))?,
            fc_prior_h: linear(deter_dim, hidden_dim, vb.pp("fc_prior_h"))?,
            fc_prior: linear(hidden_dim, 2 * stoch_dim, vb.pp("fc_prior"))?,
            fc_post_h: linear(deter_dim + embed_dim, hidden_dim, vb.pp("fc_post_h"))?,
            fc_post: linear(hidden_dim, 2 * stoch_dim, vb.pp("fc_post"))?,
            config,
            device,
        })
    }

    /// Configuration of the model.
    pub fn config(&self) -> &RssmConfig {
        &self.config
    }

    /// Zero state of batch size `n` on the device of the model.
    pub fn initial_state(&self, n: usize) -> Result<RssmState> {
        RssmState::zeros(n, &self.config, &self.device)
    }

    /// Gaussian over the stochastic state from the raw output of a head.
    fn stoch_dist(&self, raw: &Tensor, sample: bool) -> Result<(Tensor, Tensor, Tensor)> {
        let chunks = raw.chunk(2, D::Minus1)?;
        let mean = chunks[0].clone();
        let std = (softplus(&chunks[1])? + self.config.min_std)?;
        let stoch = match sample {
            true => (&mean + (&std * std.randn_like(0.0, 1.0)?)?)?,
            false => mean.clone(),
        };
        Ok((stoch, mean, std))
    }

    /// One step of the prior transition, `[N, _]` to `[N, _]`.
    ///
    /// The stochastic state is sampled with the reparameterization trick if
    /// `sample` is `true`, otherwise it is the mean.
    pub fn imagine(&self, prev: &RssmState, action: &Tensor, sample: bool) -> Result<RssmState> {
        let xs = Tensor::cat(&[&prev.stoch, &action.to_device(&self.device)?], D::Minus1)?;
        let xs = self.fc_input.forward(&xs)?.elu(1.0)?;
        let h = GRUState {
            h: prev.deter.clone(),
        };
        let deter = self.gru.step(&xs, &h)?.h;

        let ys = self.fc_prior_h.forward(&deter)?.elu(1.0)?;
        let (stoch, mean, std) = self.stoch_dist(&self.fc_prior.forward(&ys)?, sample)?;

        Ok(RssmState {
            deter,
            stoch,
            mean,
            std,
        })
    }

    /// One step of the transition followed by the correction with the
    /// observation embedding. Returns `(posterior, prior)`.
    pub fn observe(
        &self,
        prev: &RssmState,
        action: &Tensor,
        embed: &Tensor,
        sample: bool,
    ) -> Result<(RssmState, RssmState)> {
        let prior = self.imagine(prev, action, sample)?;
        let xs = Tensor::cat(&[&prior.deter, &embed.to_device(&self.device)?], D::Minus1)?;
        let ys = self.fc_post_h.forward(&xs)?.elu(1.0)?;
        let (stoch, mean, std) = self.stoch_dist(&self.fc_post.forward(&ys)?, sample)?;

        let post = RssmState {
            deter: prior.deter.clone(),
            stoch,
            mean,
            std,
        };
        Ok((post, prior))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::DType;
    use candle_nn::VarMap;

    fn rssm() -> Result<Rssm> {
        let config = RssmConfig {
            stoch_dim: 3,
            deter_dim: 5,
            hidden_dim: 7,
            action_dim: 2,
            embed_dim: 4,
            min_std: 0.1,
        };
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        Rssm::build(vb, config)
    }

    #[test]
    fn test_observe_shapes() -> Result<()> {
        let rssm = rssm()?;
        let state = rssm.initial_state(6)?;
        assert_eq!(state.features()?.dims(), &[6, 8]);

        let action = Tensor::zeros((6, 2), DType::F32, &Device::Cpu)?;
        let embed = Tensor::ones((6, 4), DType::F32, &Device::Cpu)?;
        let (post, prior) = rssm.observe(&state, &action, &embed, true)?;
        assert_eq!(post.stoch.dims(), &[6, 3]);
        assert_eq!(prior.deter.dims(), &[6, 5]);
        assert_eq!(post.deter.to_vec2::<f32>()?, prior.deter.to_vec2::<f32>()?);

        // Standard deviations respect the lower bound
        let min = post.std.flatten_all()?.min(0)?.to_scalar::<f32>()?;
        assert!(min >= 0.1);

        let states = RssmState::stack(&[post.clone(), prior], 1)?;
        assert_eq!(states.mean.dims(), &[6, 2, 3]);
        assert_eq!(states.flatten()?.deter.dims(), &[12, 5]);
        Ok(())
    }

    #[test]
    fn test_imagine_without_sampling_is_deterministic() -> Result<()> {
        let rssm = rssm()?;
        let state = rssm.initial_state(2)?;
        let action = Tensor::ones((2, 2), DType::F32, &Device::Cpu)?;
        let s1 = rssm.imagine(&state, &action, false)?;
        let s2 = rssm.imagine(&state, &action, false)?;
        assert_eq!(s1.stoch.to_vec2::<f32>()?, s2.stoch.to_vec2::<f32>()?);
        assert_eq!(s1.stoch.to_vec2::<f32>()?, s1.mean.to_vec2::<f32>()?);
        Ok(())
    }
}
