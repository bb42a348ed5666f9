//! Train [`Agent`].
mod config;
use crate::{
    episode::EpisodeKind,
    record::{AggregateRecorder, Record, RecordValue::Scalar},
    sampler::{SequenceLoader, SequenceSampler},
    store::TrajectoryStore,
    util::video_record,
    Agent, Collector, Env,
};
use anyhow::{bail, Context, Result};
pub use config::TrainerConfig;
use log::{info, warn};
use std::{fs, time::SystemTime};

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Manages the training loop.
///
/// # Training loop
///
/// 0. Given an agent implementing [`Agent`], two [`Collector`]s sharing the
///    agent's snapshot type (one exploring, one deterministic) and a recorder
///    implementing [`AggregateRecorder`].
/// 1. If `prefill_episodes > 0`, collect that many episodes with uniformly
///    random actions, store them as prefill episodes and set
///    `total_env_steps` to their number of steps.
/// 2. For each epoch `i` in `0..epochs`:
///     1. Scan the episode directory into a fresh [`SequenceSampler`] and
///        perform `training_steps` optimization steps on batches from a
///        [`SequenceLoader`], reshuffling whenever an epoch of the loader is
///        exhausted. Losses are stored in the recorder under `train/*` and
///        flushed against `training_steps`.
///     2. Hand a snapshot of the agent to the exploring collector, collect
///        one episode, store it and write `agent/training_return` against
///        `env_steps = total_env_steps * action_repeat`.
///     3. If `i % test_every == 0`, save the agent to
///        `(model_dir)/(total_env_steps).safetensors`, run one deterministic
///        episode and write `agent/test_return` and `agent/test_video`.
///
/// # Interaction of objects
///
/// ```mermaid
/// graph LR
///     A[Agent]-->|snapshot|B[Collector]
///     B -->|Episode|C[TrajectoryStore]
///     C -->|files|D[SequenceSampler]
///     D -->|SequenceBatch|A
/// ```
///
/// Epochs are the only points where the loop can be stopped without losing
/// collected data. Parameters are persisted only at checkpoints.
pub struct Trainer {
    config: TrainerConfig,
    store: TrajectoryStore,
    total_env_steps: usize,
    opt_steps: usize,
    epoch: usize,
}

impl Trainer {
    /// Creates the episode and model directories and the trainer.
    pub fn build(config: TrainerConfig) -> Result<Self> {
        if config.batch_size == 0 || config.batch_length == 0 || config.test_every == 0 {
            bail!("batch_size, batch_length and test_every must be positive");
        }
        let store = TrajectoryStore::new(&config.data_dir)?;
        fs::create_dir_all(&config.model_dir)
            .with_context(|| format!("Failed to create model directory {}", config.model_dir))?;

        Ok(Self {
            config,
            store,
            total_env_steps: 0,
            opt_steps: 0,
            epoch: 0,
        })
    }

    /// The configuration.
    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Environment steps collected so far, without action repeat.
    pub fn total_env_steps(&self) -> usize {
        self.total_env_steps
    }

    /// Optimization steps performed so far.
    pub fn opt_steps(&self) -> usize {
        self.opt_steps
    }

    /// Runs the training loop.
    ///
    /// Fails before collecting anything if the action repeat of either
    /// environment differs from that of the config.
    pub fn train<E, A>(
        &mut self,
        agent: &mut A,
        train_collector: &mut Collector<E, A::Snapshot>,
        test_collector: &mut Collector<E, A::Snapshot>,
        recorder: &mut dyn AggregateRecorder,
    ) -> Result<()>
    where
        E: Env,
        A: Agent,
    {
        let repeats = [
            train_collector.env().action_repeat(),
            test_collector.env().action_repeat(),
        ];
        if repeats.iter().any(|&r| r != self.config.action_repeat) {
            bail!(
                "action_repeat of the environments {:?} differs from that of the config {}",
                repeats,
                self.config.action_repeat
            );
        }

        if self.config.prefill_episodes > 0 {
            info!(
                "Prefill with {} random episodes",
                self.config.prefill_episodes
            );
            let out = train_collector.collect(self.config.prefill_episodes, true)?;
            for episode in out.episodes.iter() {
                self.store.save(episode, EpisodeKind::Prefill)?;
            }
            self.total_env_steps = out.env_steps;
        }

        for _ in 0..self.config.epochs {
            self.train_epoch(agent, recorder)?;

            // Collect with the updated parameters
            train_collector.reset_agent(agent.snapshot()?);
            let out = train_collector.collect(1, false)?;
            self.total_env_steps += out.env_steps;
            for episode in out.episodes.iter() {
                self.store.save(episode, EpisodeKind::Regular)?;
            }
            let mut record = self.env_steps_record();
            record.insert("agent/training_return", Scalar(out.mean_return()));
            recorder.write(record);
            info!(
                "Epoch {}: env_steps = {}, training_return = {}",
                self.epoch,
                self.total_env_steps * self.config.action_repeat,
                out.mean_return()
            );

            if self.epoch % self.config.test_every == 0 {
                self.test(agent, test_collector, recorder)?;
            }
            self.epoch += 1;
        }

        Ok(())
    }

    fn env_steps_record(&self) -> Record {
        Record::from_scalar(
            "env_steps",
            (self.total_env_steps * self.config.action_repeat) as f32,
        )
    }

    fn train_epoch<A: Agent>(
        &mut self,
        agent: &mut A,
        recorder: &mut dyn AggregateRecorder,
    ) -> Result<()> {
        let seed = self.config.seed.wrapping_add(self.epoch as u64);
        let sampler = SequenceSampler::scan(&self.config.data_dir, self.config.batch_length, seed)?;
        if sampler.is_empty() {
            warn!(
                "No episode with at least {} steps yet, skip optimization in epoch {}",
                self.config.batch_length, self.epoch
            );
            return Ok(());
        }
        let mut loader = SequenceLoader::new(
            sampler,
            self.config.batch_size,
            self.config.num_workers,
            seed,
        )?;

        agent.train();
        let timer = SystemTime::now();
        for _ in 0..self.config.training_steps {
            let batch = loader.next_or_restart()?;
            let record = agent.update(&batch)?;
            recorder.store(record.with_prefix("train/"));
            self.opt_steps += 1;
        }
        let secs = timer.elapsed()?.as_secs_f32();
        if secs > 0.0 {
            recorder.store(Record::from_scalar(
                "train/updates_per_sec",
                self.config.training_steps as f32 / secs,
            ));
        }
        recorder.flush(self.opt_steps as i64);

        Ok(())
    }

    fn test<E, A>(
        &mut self,
        agent: &mut A,
        test_collector: &mut Collector<E, A::Snapshot>,
        recorder: &mut dyn AggregateRecorder,
    ) -> Result<()>
    where
        E: Env,
        A: Agent,
    {
        let path = self.config.checkpoint_path(self.total_env_steps);
        agent.save_params(&path)?;
        info!("Saved the model in {:?}", path);

        test_collector.reset_agent(agent.snapshot()?);
        let out = test_collector.collect(1, false)?;
        let mut record = self.env_steps_record();
        record.insert("agent/test_return", Scalar(out.mean_return()));
        if let Some(episode) = out.episodes.first() {
            record.insert("agent/test_video", video_record(episode.obs()));
        }
        recorder.write(record);
        info!("Test return = {}", out.mean_return());

        Ok(())
    }
}
