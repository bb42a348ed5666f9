//! Configuration of Dreamer agent.
use crate::{actor::ActorConfig, opt::OptimizerConfig, world_model::WorldModelConfig, Device};
use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`Dreamer`](super::Dreamer).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct DreamerConfig {
    /// Configuration of the world model.
    pub world_model: WorldModelConfig,

    /// Configuration of the actor.
    pub actor: ActorConfig,

    /// Hidden units of the critic.
    pub critic_units: Vec<usize>,

    /// Optimizer of the world model.
    pub model_opt: OptimizerConfig,

    /// Optimizer of the actor.
    pub actor_opt: OptimizerConfig,

    /// Optimizer of the critic.
    pub critic_opt: OptimizerConfig,

    /// Maximum global norm of gradients.
    pub grad_clip: f64,

    /// Length of imagined trajectories.
    pub horizon: usize,

    /// Discount factor.
    pub gamma: f64,

    /// Mixing coefficient of λ-returns.
    pub lambda: f64,

    /// Weight of the entropy bonus of the actor.
    pub entropy_scale: f64,

    /// Soft update coefficient of the target critic.
    pub tau: f64,

    /// Interval of target critic updates in optimization steps.
    pub target_update_interval: usize,

    /// Device on which the agent is trained.
    pub device: Device,

    /// Device of the policy snapshots used for collecting episodes.
    pub collector_device: Device,
}

impl Default for DreamerConfig {
    fn default() -> Self {
        Self {
            world_model: WorldModelConfig::default(),
            actor: ActorConfig::default(),
            critic_units: vec![400; 3],
            model_opt: OptimizerConfig::Adam { lr: 6e-4 },
            actor_opt: OptimizerConfig::Adam { lr: 8e-5 },
            critic_opt: OptimizerConfig::Adam { lr: 8e-5 },
            grad_clip: 100.0,
            horizon: 15,
            gamma: 0.99,
            lambda: 0.95,
            entropy_scale: 1e-4,
            tau: 1.0,
            target_update_interval: 100,
            device: Device::Cpu,
            collector_device: Device::Cpu,
        }
    }
}

impl DreamerConfig {
    /// Sets the configuration of the world model.
    pub fn world_model(mut self, v: WorldModelConfig) -> Self {
        self.world_model = v;
        self
    }

    /// Sets the dimension of actions.
    pub fn action_dim(mut self, v: usize) -> Self {
        self.world_model.action_dim = v;
        self
    }

    /// Sets the configuration of the actor.
    pub fn actor(mut self, v: ActorConfig) -> Self {
        self.actor = v;
        self
    }

    /// Sets hidden units of the critic.
    pub fn critic_units(mut self, v: Vec<usize>) -> Self {
        self.critic_units = v;
        self
    }

    /// Sets the optimizers of the world model, the actor and the critic.
    pub fn optimizers(
        mut self,
        model: OptimizerConfig,
        actor: OptimizerConfig,
        critic: OptimizerConfig,
    ) -> Self {
        self.model_opt = model;
        self.actor_opt = actor;
        self.critic_opt = critic;
        self
    }

    /// Sets the imagination horizon.
    pub fn horizon(mut self, v: usize) -> Self {
        self.horizon = v;
        self
    }

    /// Discount factor.
    pub fn discount_factor(mut self, v: f64) -> Self {
        self.gamma = v;
        self
    }

    /// Sets the soft update coefficient and interval of the target critic.
    pub fn target_update(mut self, tau: f64, interval: usize) -> Self {
        self.tau = tau;
        self.target_update_interval = interval;
        self
    }

    /// Sets the training and collection devices.
    pub fn devices(mut self, device: Device, collector_device: Device) -> Self {
        self.device = device;
        self.collector_device = collector_device;
        self
    }

    /// Constructs [`DreamerConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        info!("Load config of Dreamer agent from {:?}", path.as_ref());
        Ok(b)
    }

    /// Saves [`DreamerConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path.as_ref())?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save config of Dreamer agent into {:?}", path.as_ref());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_serde_dreamer_config() -> Result<()> {
        let config = DreamerConfig::default()
            .action_dim(6)
            .horizon(5)
            .devices(Device::Cpu, Device::Cuda(0));

        let dir = TempDir::new("dreamer_config")?;
        let path = dir.path().join("dreamer.yaml");
        config.save(&path)?;
        let config_ = DreamerConfig::load(&path)?;
        assert_eq!(config, config_);
        assert_eq!(config_.world_model.action_dim, 6);
        Ok(())
    }
}
