//! Runs a policy in an environment for complete episodes.
use crate::{
    episode::{Episode, EpisodeBuilder},
    record::{Record, RecordValue},
    Env, Policy,
};
use anyhow::Result;
use log::debug;
use rand::{rngs::StdRng, SeedableRng};
use std::mem;

/// Episodes gathered by [`Collector::collect`].
pub struct CollectOutput {
    /// The episodes in the order they were collected.
    pub episodes: Vec<Episode>,

    /// Per-episode statistics: `episode_return` and `episode_length`.
    pub stats: Vec<Record>,

    /// Number of collected episodes.
    pub n_episodes: usize,

    /// Total number of environment steps, without action repeat.
    pub env_steps: usize,
}

impl CollectOutput {
    /// Mean undiscounted return of the collected episodes.
    pub fn mean_return(&self) -> f32 {
        if self.episodes.is_empty() {
            return 0.0;
        }
        self.episodes.iter().map(|e| e.total_reward()).sum::<f32>() / self.episodes.len() as f32
    }
}

/// Drives an environment with a behavior policy.
///
/// The collector owns the environment and a policy. A collector for
/// exploration is created with `explore = true`, one for evaluation with
/// `explore = false`. The policy is swapped with
/// [`Collector::reset_agent`] whenever the agent's parameters changed.
pub struct Collector<E: Env, P: Policy> {
    env: E,
    policy: P,
    explore: bool,
    rng: StdRng,
}

impl<E: Env, P: Policy> Collector<E, P> {
    /// Creates a collector.
    pub fn new(env: E, policy: P, explore: bool) -> Self {
        Self {
            env,
            policy,
            explore,
            rng: StdRng::seed_from_u64(0),
        }
    }

    /// Sets the seed of the generator of random actions.
    pub fn seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Replaces the behavior policy and returns the previous one.
    ///
    /// Episodes collected before the call are not affected.
    pub fn reset_agent(&mut self, policy: P) -> P {
        mem::replace(&mut self.policy, policy)
    }

    /// The behavior policy.
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// The environment.
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Collects exactly `n_episodes` complete episodes.
    ///
    /// With `random_action`, actions are drawn uniformly from the action
    /// space and the policy is not queried. Errors of the environment or the
    /// policy abort the collection.
    pub fn collect(&mut self, n_episodes: usize, random_action: bool) -> Result<CollectOutput> {
        let mut episodes = Vec::with_capacity(n_episodes);
        let mut stats = Vec::with_capacity(n_episodes);
        let mut env_steps = 0;

        for _ in 0..n_episodes {
            let episode = self.run_episode(random_action)?;
            env_steps += episode.len();
            debug!(
                "Collected an episode: {} steps, return {}",
                episode.len(),
                episode.total_reward()
            );
            stats.push(Record::from_slice(&[
                ("episode_return", RecordValue::Scalar(episode.total_reward())),
                ("episode_length", RecordValue::Scalar(episode.len() as f32)),
            ]));
            episodes.push(episode);
        }

        Ok(CollectOutput {
            episodes,
            stats,
            n_episodes,
            env_steps,
        })
    }

    fn run_episode(&mut self, random_action: bool) -> Result<Episode> {
        let mut obs = self.env.reset()?;
        let mut state = None;
        let mut builder = EpisodeBuilder::new();

        loop {
            let act = if random_action {
                self.env.action_space().sample(&mut self.rng)
            } else {
                let (act, next_state) = self.policy.act(&obs, state.take(), self.explore)?;
                state = Some(next_state);
                act
            };
            let step = self.env.step(&act)?;
            let is_done = step.is_done();
            builder.push(step.obs.clone(), act, step.reward);
            obs = step.obs;

            if is_done {
                break;
            }
        }

        builder.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dummy::{ConstantPolicy, SyntheticEnv, SyntheticEnvConfig};
    use ndarray::arr1;

    fn env(episode_length: usize) -> SyntheticEnv {
        let config = SyntheticEnvConfig::default()
            .episode_length(episode_length)
            .image_size(8, 8);
        SyntheticEnv::build(&config, 42).unwrap()
    }

    #[test]
    fn test_collect_random_episodes() -> Result<()> {
        let policy = ConstantPolicy::new(arr1(&[0.0, 0.0]));
        let mut collector = Collector::new(env(10), policy, true).seed(1);
        let out = collector.collect(3, true)?;

        assert_eq!(out.n_episodes, 3);
        assert_eq!(out.episodes.len(), 3);
        assert_eq!(out.env_steps, 30);
        for episode in out.episodes.iter() {
            assert_eq!(episode.len(), 10);
            assert_eq!(episode.obs().shape(), &[10, 3, 8, 8]);
            assert_eq!(episode.act().shape(), &[10, 2]);
            assert!(episode.act().iter().all(|a| (-1.0..=1.0).contains(a)));
        }
        let total: f32 = out.episodes.iter().map(|e| e.total_reward()).sum();
        assert_eq!(total, 3.0);
        assert_eq!(out.stats[2].get_scalar("episode_length")?, 10.0);
        assert_eq!(out.mean_return(), 1.0);
        Ok(())
    }

    #[test]
    fn test_reset_agent_affects_later_collections_only() -> Result<()> {
        let first = ConstantPolicy::new(arr1(&[0.5, 0.5]));
        let mut collector = Collector::new(env(4), first, false);
        let before = collector.collect(1, false)?;
        let snapshot = before.episodes[0].clone();

        let old = collector.reset_agent(ConstantPolicy::new(arr1(&[-0.5, 0.25])));
        let (old_act, _) = old.act(&ndarray::Array3::zeros((3, 8, 8)), None, false)?;
        assert_eq!(old_act.to_vec(), vec![0.5, 0.5]);

        let after = collector.collect(1, false)?;
        assert_eq!(before.episodes[0], snapshot);
        assert!(before.episodes[0].act().iter().all(|&a| a == 0.5));
        assert_eq!(after.episodes[0].act().row(3).to_vec(), vec![-0.5, 0.25]);
        Ok(())
    }

    #[test]
    fn test_env_error_is_propagated() {
        let config = SyntheticEnvConfig::default()
            .episode_length(10)
            .image_size(8, 8)
            .fail_after(15);
        let env = SyntheticEnv::build(&config, 0).unwrap();
        let mut collector = Collector::new(env, ConstantPolicy::new(arr1(&[0.0, 0.0])), true);
        assert!(collector.collect(2, false).is_err());

        let mut collector = Collector::new(
            self::env(5),
            ConstantPolicy::new(arr1(&[0.0, 0.0, 0.0])),
            true,
        );
        assert!(collector.collect(1, false).is_err());
    }
}
