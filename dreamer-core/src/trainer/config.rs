//! Configuration of [`Trainer`](super::Trainer).
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

/// Configuration of [`Trainer`](super::Trainer).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct TrainerConfig {
    /// Name of the domain of the environment.
    pub domain_name: String,

    /// Name of the task in the domain.
    pub task_name: String,

    /// Height and width of observations.
    pub obs_image_size: [usize; 2],

    /// Number of times each action is repeated in the environment.
    pub action_repeat: usize,

    /// Directory of the episode archives.
    pub data_dir: String,

    /// Directory of the checkpoints.
    pub model_dir: String,

    /// Number of random episodes collected before training.
    pub prefill_episodes: usize,

    /// Number of sequences in a batch.
    pub batch_size: usize,

    /// Length of the sequences in a batch.
    pub batch_length: usize,

    /// Number of optimization steps per epoch.
    pub training_steps: usize,

    /// Number of epochs.
    pub epochs: usize,

    /// Interval of evaluation and checkpointing in epochs.
    pub test_every: usize,

    /// Number of threads assembling batches. `0` assembles them on the
    /// training thread.
    pub num_workers: usize,

    /// Random seed.
    pub seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            domain_name: "cartpole".to_string(),
            task_name: "swingup".to_string(),
            obs_image_size: [64, 64],
            action_repeat: 2,
            data_dir: "./dreamer/cartpole_swingup/episodes".to_string(),
            model_dir: "./dreamer/cartpole_swingup/models".to_string(),
            prefill_episodes: 5,
            batch_size: 50,
            batch_length: 50,
            training_steps: 100,
            epochs: 1000,
            test_every: 25,
            num_workers: 2,
            seed: 42,
        }
    }
}

impl TrainerConfig {
    /// Sets the domain and task names.
    pub fn env_name(mut self, domain_name: impl Into<String>, task_name: impl Into<String>) -> Self {
        self.domain_name = domain_name.into();
        self.task_name = task_name.into();
        self
    }

    /// Sets the size of observations.
    pub fn obs_image_size(mut self, height: usize, width: usize) -> Self {
        self.obs_image_size = [height, width];
        self
    }

    /// Sets the action repeat.
    pub fn action_repeat(mut self, v: usize) -> Self {
        self.action_repeat = v;
        self
    }

    /// Sets the directory of the episode archives.
    pub fn data_dir(mut self, v: impl Into<String>) -> Self {
        self.data_dir = v.into();
        self
    }

    /// Sets the directory of the checkpoints.
    pub fn model_dir(mut self, v: impl Into<String>) -> Self {
        self.model_dir = v.into();
        self
    }

    /// Sets the number of prefill episodes.
    pub fn prefill_episodes(mut self, v: usize) -> Self {
        self.prefill_episodes = v;
        self
    }

    /// Sets the batch size.
    pub fn batch_size(mut self, v: usize) -> Self {
        self.batch_size = v;
        self
    }

    /// Sets the length of the sequences.
    pub fn batch_length(mut self, v: usize) -> Self {
        self.batch_length = v;
        self
    }

    /// Sets the number of optimization steps per epoch.
    pub fn training_steps(mut self, v: usize) -> Self {
        self.training_steps = v;
        self
    }

    /// Sets the number of epochs.
    pub fn epochs(mut self, v: usize) -> Self {
        self.epochs = v;
        self
    }

    /// Sets the interval of evaluation in epochs.
    pub fn test_every(mut self, v: usize) -> Self {
        self.test_every = v;
        self
    }

    /// Sets the number of prefetch workers.
    pub fn num_workers(mut self, v: usize) -> Self {
        self.num_workers = v;
        self
    }

    /// Sets the random seed.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Path of the checkpoint written after `total_env_steps` steps.
    pub fn checkpoint_path(&self, total_env_steps: usize) -> PathBuf {
        Path::new(&self.model_dir).join(format!("{}.safetensors", total_env_steps))
    }

    /// Constructs [`TrainerConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`TrainerConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_serde_trainer_config() -> Result<()> {
        let config = TrainerConfig::default()
            .env_name("walker", "walk")
            .batch_length(20)
            .num_workers(0);

        let dir = TempDir::new("trainer_config")?;
        let path = dir.path().join("trainer_config.yaml");
        config.save(&path)?;
        let config_ = TrainerConfig::load(&path)?;
        assert_eq!(config, config_);
        assert_eq!(
            config.checkpoint_path(1500),
            Path::new("./dreamer/cartpole_swingup/models/1500.safetensors")
        );
        Ok(())
    }
}
