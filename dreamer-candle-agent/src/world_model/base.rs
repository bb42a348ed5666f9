use super::WorldModelConfig;
use crate::{
    cnn::{ConvDecoder, ConvEncoder},
    mlp::{Mlp, MlpConfig},
    model::SubModel1,
    rssm::{Rssm, RssmState},
    util::gaussian_kl,
    SequenceTensors,
};
use anyhow::Result;
use candle_core::{Tensor, D};
use candle_nn::VarBuilder;

/// Losses of the world model on a batch of sequences.
pub struct WorldModelLoss {
    /// Weighted sum of the terms below, with the KL term floored.
    pub total: Tensor,

    /// Sum of squared errors over pixels, averaged over batch and time.
    pub recon: Tensor,

    /// Squared error of predicted rewards.
    pub reward: Tensor,

    /// KL divergence of the posterior from the prior before flooring.
    pub kl: Tensor,

    /// Posterior states `[B, L, _]`.
    pub posts: RssmState,
}

/// Encoder, recurrent state-space model, decoder and reward head.
pub struct WorldModel {
    config: WorldModelConfig,
    encoder: ConvEncoder,
    rssm: Rssm,
    decoder: ConvDecoder,
    reward: Mlp,
}

impl WorldModel {
    /// Builds the model with parameters under `vb`.
    pub fn build(vb: VarBuilder, config: WorldModelConfig) -> Result<Self> {
        let reward_config = MlpConfig::new(
            config.feature_dim(),
            config.reward_units.clone(),
            1,
            false,
        );

        Ok(Self {
            encoder: ConvEncoder::build(vb.pp("encoder"), config.encoder_config())?,
            rssm: Rssm::build(vb.pp("rssm"), config.rssm_config())?,
            decoder: ConvDecoder::build(vb.pp("decoder"), config.decoder_config())?,
            reward: Mlp::build(vb.pp("reward"), reward_config)?,
            config,
        })
    }

    /// Configuration of the model.
    pub fn config(&self) -> &WorldModelConfig {
        &self.config
    }

    /// Dimension of latent features.
    pub fn feature_dim(&self) -> usize {
        self.config.feature_dim()
    }

    /// Zero latent state of batch size `n`.
    pub fn initial_state(&self, n: usize) -> Result<RssmState> {
        self.rssm.initial_state(n)
    }

    /// Embeds observations `[.., C, 64, 64]` into `[.., E]`.
    pub fn encode(&self, obs: &Tensor) -> Result<Tensor> {
        self.encoder.forward(obs)
    }

    /// See [`Rssm::observe`].
    pub fn observe(
        &self,
        prev: &RssmState,
        action: &Tensor,
        embed: &Tensor,
        sample: bool,
    ) -> Result<(RssmState, RssmState)> {
        self.rssm.observe(prev, action, embed, sample)
    }

    /// See [`Rssm::imagine`].
    pub fn imagine(&self, prev: &RssmState, action: &Tensor) -> Result<RssmState> {
        self.rssm.imagine(prev, action, true)
    }

    /// Mean of observations reconstructed from features.
    pub fn decode(&self, features: &Tensor) -> Result<Tensor> {
        self.decoder.forward(features)
    }

    /// Rewards predicted from features `[.., F]`, returned as `[..]`.
    pub fn predict_reward(&self, features: &Tensor) -> Result<Tensor> {
        Ok(self.reward.forward(features)?.squeeze(D::Minus1)?)
    }

    /// Filters a batch of sequences from the zero state.
    ///
    /// `act[:, t]` is the action that produced `obs[:, t]`. Returns posterior
    /// and prior states of shape `[B, L, _]`.
    pub fn observe_sequence(&self, obs: &Tensor, act: &Tensor) -> Result<(RssmState, RssmState)> {
        let (batch_size, batch_length) = (act.dim(0)?, act.dim(1)?);
        let embed = self.encode(obs)?;
        let mut state = self.initial_state(batch_size)?;
        let mut posts = Vec::with_capacity(batch_length);
        let mut priors = Vec::with_capacity(batch_length);

        for t in 0..batch_length {
            let a = act.narrow(1, t, 1)?.squeeze(1)?;
            let e = embed.narrow(1, t, 1)?.squeeze(1)?;
            let (post, prior) = self.observe(&state, &a, &e, true)?;
            state = post.clone();
            posts.push(post);
            priors.push(prior);
        }

        Ok((RssmState::stack(&posts, 1)?, RssmState::stack(&priors, 1)?))
    }

    /// Losses on a batch of sequences.
    pub fn loss(&self, batch: &SequenceTensors) -> Result<WorldModelLoss> {
        let (posts, priors) = self.observe_sequence(&batch.obs, &batch.act)?;
        let features = posts.features()?;

        // [B, L, C, H, W] -> [B, L]
        let recon = self.decode(&features)?;
        let recon = (recon - &batch.obs)?.sqr()?.flatten_from(2)?.sum(D::Minus1)?.mean_all()?;

        let reward = (self.predict_reward(&features)? - &batch.reward)?
            .sqr()?
            .mean_all()?;

        let kl = gaussian_kl(&posts.mean, &posts.std, &priors.mean, &priors.std)?.mean_all()?;
        let kl_loss = kl.maximum(self.config.free_nats)?;
        let total = ((&recon + &reward)? + (kl_loss * self.config.kl_scale)?)?;

        Ok(WorldModelLoss {
            total,
            recon,
            reward,
            kl,
            posts,
        })
    }
}
