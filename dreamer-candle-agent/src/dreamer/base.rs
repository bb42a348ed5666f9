use super::{
    imagine_rollout,
    policy::{act_with, DreamerState},
    DreamerConfig, DreamerPolicy,
};
use crate::{
    actor::Actor,
    critic::Critic,
    opt::Optimizer,
    rssm::RssmState,
    util::{lambda_return, track_with_replace_substring, NamedTensors},
    world_model::WorldModel,
    SequenceTensors,
};
use anyhow::{bail, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use dreamer_core::{
    record::{Record, RecordValue},
    Action, Agent, Observation, Policy, SequenceBatch,
};
use log::{info, trace};
use std::path::Path;

/// Dreamer agent.
///
/// The world model, the actor, the critic and the target critic have their
/// own [`VarMap`]s, so that each optimizer steps only its own parameters.
pub struct Dreamer {
    config: DreamerConfig,
    device: Device,
    wm_varmap: VarMap,
    actor_varmap: VarMap,
    critic_varmap: VarMap,
    critic_tgt_varmap: VarMap,
    world_model: WorldModel,
    actor: Actor,
    critic: Critic,
    critic_tgt: Critic,
    model_opt: Optimizer,
    actor_opt: Optimizer,
    critic_opt: Optimizer,
    n_updates: usize,
    train: bool,
}

impl Dreamer {
    /// Constructs the agent with freshly initialized parameters.
    pub fn build(config: DreamerConfig) -> Result<Self> {
        if config.horizon == 0 {
            bail!("horizon must be positive");
        }
        if config.target_update_interval == 0 {
            bail!("target_update_interval must be positive");
        }
        let device = config.device.build()?;
        let feature_dim = config.world_model.feature_dim();
        let action_dim = config.world_model.action_dim;

        let wm_varmap = VarMap::new();
        let world_model = {
            let vb = VarBuilder::from_varmap(&wm_varmap, DType::F32, &device);
            WorldModel::build(vb.pp("world_model"), config.world_model.clone())?
        };
        let actor_varmap = VarMap::new();
        let actor = {
            let vb = VarBuilder::from_varmap(&actor_varmap, DType::F32, &device);
            Actor::build(vb.pp("actor"), &config.actor, feature_dim, action_dim)?
        };
        let critic_varmap = VarMap::new();
        let critic = {
            let vb = VarBuilder::from_varmap(&critic_varmap, DType::F32, &device);
            Critic::build(vb.pp("critic"), &config.critic_units, feature_dim)?
        };
        let critic_tgt_varmap = VarMap::new();
        let critic_tgt = {
            let vb = VarBuilder::from_varmap(&critic_tgt_varmap, DType::F32, &device);
            Critic::build(vb.pp("critic_tgt"), &config.critic_units, feature_dim)?
        };
        track_with_replace_substring(
            &critic_tgt_varmap,
            &critic_varmap,
            1.0,
            ("critic", "critic_tgt"),
        )?;

        let model_opt = config.model_opt.build(wm_varmap.all_vars())?;
        let actor_opt = config.actor_opt.build(actor_varmap.all_vars())?;
        let critic_opt = config.critic_opt.build(critic_varmap.all_vars())?;
        info!(
            "Build Dreamer agent with feature_dim={}, action_dim={} on {:?}",
            feature_dim, action_dim, device
        );

        Ok(Self {
            config,
            device,
            wm_varmap,
            actor_varmap,
            critic_varmap,
            critic_tgt_varmap,
            world_model,
            actor,
            critic,
            critic_tgt,
            model_opt,
            actor_opt,
            critic_opt,
            n_updates: 0,
            train: false,
        })
    }

    /// Configuration of the agent.
    pub fn config(&self) -> &DreamerConfig {
        &self.config
    }

    /// The world model.
    pub fn world_model(&self) -> &WorldModel {
        &self.world_model
    }

    /// Number of optimization steps so far.
    pub fn n_updates(&self) -> usize {
        self.n_updates
    }

    /// Copies all parameters, including those of the target critic.
    pub fn state_dict(&self) -> Result<NamedTensors> {
        NamedTensors::copy_from(&[
            &self.wm_varmap,
            &self.actor_varmap,
            &self.critic_varmap,
            &self.critic_tgt_varmap,
        ])
    }

    /// Overwrites all parameters with those of the same names.
    pub fn load_state_dict(&mut self, named_tensors: &NamedTensors) -> Result<()> {
        named_tensors.copy_to(&self.wm_varmap)?;
        named_tensors.copy_to(&self.actor_varmap)?;
        named_tensors.copy_to(&self.critic_varmap)?;
        named_tensors.copy_to(&self.critic_tgt_varmap)?;
        Ok(())
    }

    /// Snapshot of the world model and the actor on `device`.
    pub fn policy(&self, device: crate::Device) -> Result<DreamerPolicy> {
        let named_tensors = NamedTensors::copy_from(&[&self.wm_varmap, &self.actor_varmap])?;
        let policy = DreamerPolicy::build(&self.config, device)?;
        policy.load(&named_tensors)?;
        Ok(policy)
    }

    fn update_world_model(&mut self, batch: &SequenceTensors) -> Result<(Record, RssmState)> {
        let loss = self.world_model.loss(batch)?;
        let grad_norm = self
            .model_opt
            .backward_step_clip(&loss.total, self.config.grad_clip)?;

        let record = Record::from_slice(&[
            ("loss_model", RecordValue::Scalar(loss.total.to_scalar()?)),
            ("loss_recon", RecordValue::Scalar(loss.recon.to_scalar()?)),
            ("loss_reward", RecordValue::Scalar(loss.reward.to_scalar()?)),
            ("kl", RecordValue::Scalar(loss.kl.to_scalar()?)),
            ("grad_norm_model", RecordValue::Scalar(grad_norm)),
        ]);

        // [B, L, _] -> [B * L, _], cut from the graph of the model loss
        let start = loss.posts.flatten()?.detach();
        Ok((record, start))
    }

    fn update_actor_critic(&mut self, start: &RssmState) -> Result<Record> {
        let horizon = self.config.horizon;
        let traj = imagine_rollout(&self.world_model, &self.actor, start, horizon)?;

        // [H, N]
        let next_features = traj.features.narrow(0, 1, horizon)?;
        let rewards = self.world_model.predict_reward(&next_features)?;
        let next_values = self.critic_tgt.forward(&next_features)?;
        let returns = lambda_return(
            &rewards,
            &next_values,
            self.config.gamma,
            self.config.lambda,
        )?;

        let entropy = traj.log_probs.neg()?.mean_all()?;
        let loss_actor =
            (returns.mean_all()?.neg()? - (&entropy * self.config.entropy_scale)?)?;
        let grad_norm_actor = self
            .actor_opt
            .backward_step_clip(&loss_actor, self.config.grad_clip)?;

        let features = traj.features.narrow(0, 0, horizon)?.detach();
        let values = self.critic.forward(&features)?;
        let loss_critic = ((values - returns.detach())?.sqr()?.mean_all()? * 0.5)?;
        let grad_norm_critic = self
            .critic_opt
            .backward_step_clip(&loss_critic, self.config.grad_clip)?;

        Ok(Record::from_slice(&[
            ("loss_actor", RecordValue::Scalar(loss_actor.to_scalar()?)),
            ("loss_critic", RecordValue::Scalar(loss_critic.to_scalar()?)),
            ("entropy", RecordValue::Scalar(entropy.to_scalar()?)),
            (
                "imagined_return",
                RecordValue::Scalar(returns.mean_all()?.to_scalar()?),
            ),
            ("grad_norm_actor", RecordValue::Scalar(grad_norm_actor)),
            ("grad_norm_critic", RecordValue::Scalar(grad_norm_critic)),
        ]))
    }
}

impl Policy for Dreamer {
    type State = DreamerState;

    /// Samples actions only if `explore` is set and the agent is in training
    /// mode. In evaluation mode the mode of the action distribution is taken.
    fn act(
        &self,
        obs: &Observation,
        state: Option<DreamerState>,
        explore: bool,
    ) -> Result<(Action, DreamerState)> {
        act_with(
            &self.world_model,
            &self.actor,
            &self.device,
            obs,
            state,
            explore && self.train,
        )
    }
}

impl Agent for Dreamer {
    type Snapshot = DreamerPolicy;

    fn train(&mut self) {
        self.train = true;
    }

    fn eval(&mut self) {
        self.train = false;
    }

    fn is_train(&self) -> bool {
        self.train
    }

    fn update(&mut self, batch: &SequenceBatch) -> Result<Record> {
        trace!("Dreamer::update()");
        let batch = SequenceTensors::from_batch(batch, &self.device)?;
        let (record, start) = self.update_world_model(&batch)?;
        let record = record.merge(self.update_actor_critic(&start)?);

        self.n_updates += 1;
        if self.n_updates % self.config.target_update_interval == 0 {
            trace!("Update target critic");
            track_with_replace_substring(
                &self.critic_tgt_varmap,
                &self.critic_varmap,
                self.config.tau,
                ("critic", "critic_tgt"),
            )?;
        }

        Ok(record)
    }

    fn snapshot(&self) -> Result<DreamerPolicy> {
        self.policy(self.config.collector_device)
    }

    fn save_params(&self, path: &Path) -> Result<()> {
        self.state_dict()?.save(path)?;
        info!("Save parameters of Dreamer agent into {:?}", path);
        Ok(())
    }

    fn load_params(&mut self, path: &Path) -> Result<()> {
        let named_tensors = NamedTensors::load(path, &self.device)?;
        self.load_state_dict(&named_tensors)?;
        info!("Load parameters of Dreamer agent from {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{actor::ActorConfig, opt::OptimizerConfig, world_model::WorldModelConfig};
    use dreamer_core::{
        dummy::{ConstantPolicy, SyntheticEnv, SyntheticEnvConfig},
        Collector, Env,
    };
    use ndarray::{arr1, s, stack, Axis};

    fn config() -> DreamerConfig {
        let world_model = WorldModelConfig::default()
            .action_dim(2)
            .cnn_depth(4)
            .latent_dims(4, 8, 8)
            .reward_units(vec![16]);
        let opt = OptimizerConfig::Adam { lr: 1e-3 };

        DreamerConfig::default()
            .world_model(world_model)
            .actor(ActorConfig::default().units(vec![16]))
            .critic_units(vec![16])
            .optimizers(opt.clone(), opt.clone(), opt)
            .horizon(3)
            .target_update(1.0, 2)
    }

    fn env() -> Result<SyntheticEnv> {
        SyntheticEnv::build(&SyntheticEnvConfig::default().episode_length(6), 0)
    }

    fn batch() -> Result<SequenceBatch> {
        let policy = ConstantPolicy::new(arr1(&[0.0, 0.0]));
        let mut collector = Collector::new(env()?, policy, true).seed(0);
        let episodes = collector.collect(2, true)?.episodes;

        let obs: Vec<_> = episodes.iter().map(|e| e.obs().slice(s![1..5, .., .., ..])).collect();
        let act: Vec<_> = episodes.iter().map(|e| e.act().slice(s![1..5, ..])).collect();
        let reward: Vec<_> = episodes.iter().map(|e| e.reward().slice(s![1..5])).collect();

        Ok(SequenceBatch {
            obs: stack(Axis(0), &obs)?,
            act: stack(Axis(0), &act)?,
            reward: stack(Axis(0), &reward)?,
        })
    }

    /// Largest absolute difference between tensors of the same names, where
    /// names of `b` are those of `a` with `from` replaced by `to`.
    fn max_diff(a: &NamedTensors, b: &NamedTensors, from: &str, to: &str) -> Result<f32> {
        let mut diff = 0f32;
        for (name, t) in a.named_tensors.iter() {
            let u = &b.named_tensors[&name.replacen(from, to, 1)];
            let d = (t - u)?.abs()?.flatten_all()?.max(0)?.to_scalar::<f32>()?;
            diff = diff.max(d);
        }
        Ok(diff)
    }

    #[test]
    fn test_actor_critic_step_keeps_world_model() -> Result<()> {
        let mut agent = Dreamer::build(config())?;
        let batch = SequenceTensors::from_batch(&batch()?, &agent.device)?;
        let (_, start) = agent.update_world_model(&batch)?;

        let wm = NamedTensors::copy_from(&[&agent.wm_varmap])?;
        let actor = NamedTensors::copy_from(&[&agent.actor_varmap])?;
        let critic = NamedTensors::copy_from(&[&agent.critic_varmap])?;
        agent.update_actor_critic(&start)?;

        let wm_ = NamedTensors::copy_from(&[&agent.wm_varmap])?;
        assert_eq!(max_diff(&wm, &wm_, "", "")?, 0.0);
        let actor_ = NamedTensors::copy_from(&[&agent.actor_varmap])?;
        assert!(max_diff(&actor, &actor_, "", "")? > 0.0);
        let critic_ = NamedTensors::copy_from(&[&agent.critic_varmap])?;
        assert!(max_diff(&critic, &critic_, "", "")? > 0.0);
        Ok(())
    }

    #[test]
    fn test_target_critic_follows_interval() -> Result<()> {
        let mut agent = Dreamer::build(config())?;
        let batch = batch()?;
        let diff = |agent: &Dreamer| -> Result<f32> {
            let critic = NamedTensors::copy_from(&[&agent.critic_varmap])?;
            let critic_tgt = NamedTensors::copy_from(&[&agent.critic_tgt_varmap])?;
            max_diff(&critic, &critic_tgt, "critic", "critic_tgt")
        };
        assert_eq!(diff(&agent)?, 0.0);

        agent.update(&batch)?;
        assert!(diff(&agent)? > 0.0);

        agent.update(&batch)?;
        assert_eq!(diff(&agent)?, 0.0);

        agent.update(&batch)?;
        assert!(diff(&agent)? > 0.0);
        Ok(())
    }

    #[test]
    fn test_eval_mode_acts_deterministically() -> Result<()> {
        let mut agent = Dreamer::build(config())?;
        let obs = env()?.reset()?;

        agent.eval();
        let (act1, _) = agent.act(&obs, None, true)?;
        let (act2, _) = agent.act(&obs, None, true)?;
        assert_eq!(act1, act2);
        assert_eq!(act1, agent.act(&obs, None, false)?.0);

        agent.train();
        let (act3, _) = agent.act(&obs, None, true)?;
        let (act4, _) = agent.act(&obs, None, true)?;
        assert_ne!(act3, act4);
        Ok(())
    }
}
