//! A synthetic environment and a fixed policy, used for tests and demos.
use crate::{
    record::{Record, RecordValue},
    util::normalize_image,
    Action, ActionSpace, Env, Observation, Policy, Step,
};
use anyhow::{bail, Result};
use ndarray::Array3;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Configuration of [`SyntheticEnv`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct SyntheticEnvConfig {
    /// Number of steps in an episode.
    pub episode_length: usize,

    /// Height and width of the images.
    pub image_size: [usize; 2],

    /// Number of image channels.
    pub channels: usize,

    /// Dimension of actions.
    pub action_dim: usize,

    /// Number of times an action is applied per step.
    pub action_repeat: usize,

    /// Side length of the square in pixels.
    pub square_size: usize,

    /// If set, [`Env::step`] fails once this many steps have been taken.
    pub fail_after: Option<usize>,
}

impl Default for SyntheticEnvConfig {
    fn default() -> Self {
        Self {
            episode_length: 100,
            image_size: [64, 64],
            channels: 3,
            action_dim: 2,
            action_repeat: 1,
            square_size: 8,
            fail_after: None,
        }
    }
}

impl SyntheticEnvConfig {
    /// Sets the number of steps in an episode.
    pub fn episode_length(mut self, v: usize) -> Self {
        self.episode_length = v;
        self
    }

    /// Sets the image size.
    pub fn image_size(mut self, height: usize, width: usize) -> Self {
        self.image_size = [height, width];
        self
    }

    /// Sets the number of channels.
    pub fn channels(mut self, v: usize) -> Self {
        self.channels = v;
        self
    }

    /// Sets the dimension of actions.
    pub fn action_dim(mut self, v: usize) -> Self {
        self.action_dim = v;
        self
    }

    /// Sets the action repeat.
    pub fn action_repeat(mut self, v: usize) -> Self {
        self.action_repeat = v;
        self
    }

    /// Makes [`Env::step`] fail after `v` steps.
    pub fn fail_after(mut self, v: usize) -> Self {
        self.fail_after = Some(v);
        self
    }
}

/// A square moving on a black canvas.
///
/// The first two action components move the square. Every episode lasts
/// `episode_length` steps and the reward is 1 on the last step, 0 otherwise.
pub struct SyntheticEnv {
    config: SyntheticEnvConfig,
    action_space: ActionSpace,
    rng: StdRng,
    pos: [f32; 2],
    t: usize,
    total_steps: usize,
}

impl SyntheticEnv {
    fn render(&self) -> Observation {
        let [height, width] = self.config.image_size;
        let size = self.config.square_size.min(height).min(width);
        let top = (self.pos[0] * (height - size) as f32).round() as usize;
        let left = (self.pos[1] * (width - size) as f32).round() as usize;
        let img = Array3::from_shape_fn((self.config.channels, height, width), |(c, h, w)| {
            if (top..top + size).contains(&h) && (left..left + size).contains(&w) {
                255u8.saturating_sub(60 * c.min(4) as u8)
            } else {
                0
            }
        });
        normalize_image(&img)
    }
}

impl Env for SyntheticEnv {
    type Config = SyntheticEnvConfig;

    fn build(config: &Self::Config, seed: i64) -> Result<Self> {
        if config.episode_length == 0 || config.action_repeat == 0 {
            bail!("episode_length and action_repeat must be positive");
        }
        let action_space = ActionSpace::symmetric(config.action_dim)?;
        Ok(Self {
            config: config.clone(),
            action_space,
            rng: StdRng::seed_from_u64(seed as u64),
            pos: [0.5, 0.5],
            t: 0,
            total_steps: 0,
        })
    }

    fn reset(&mut self) -> Result<Observation> {
        self.t = 0;
        self.pos = [self.rng.gen(), self.rng.gen()];
        Ok(self.render())
    }

    fn step(&mut self, act: &Action) -> Result<Step> {
        self.action_space.check(act)?;
        if let Some(n) = self.config.fail_after {
            if self.total_steps >= n {
                bail!("Synthetic failure after {} steps", n);
            }
        }

        let act = self.action_space.clip(act);
        for _ in 0..self.config.action_repeat {
            for (p, a) in self.pos.iter_mut().zip(act.iter()) {
                *p = (*p + 0.05 * a).max(0.0).min(1.0);
            }
        }
        self.t += 1;
        self.total_steps += 1;

        let is_terminated = self.t >= self.config.episode_length;
        let reward = if is_terminated { 1.0 } else { 0.0 };
        let info = Record::from_slice(&[
            ("x", RecordValue::Scalar(self.pos[1])),
            ("y", RecordValue::Scalar(self.pos[0])),
        ]);

        Ok(Step::new(self.render(), reward, is_terminated, false, info))
    }

    fn action_space(&self) -> &ActionSpace {
        &self.action_space
    }

    fn action_repeat(&self) -> usize {
        self.config.action_repeat
    }
}

/// Always takes the same action. Its state counts the steps of the episode.
#[derive(Clone, Debug)]
pub struct ConstantPolicy {
    action: Action,
}

impl ConstantPolicy {
    /// Creates the policy.
    pub fn new(action: Action) -> Self {
        Self { action }
    }
}

impl Policy for ConstantPolicy {
    type State = usize;

    fn act(
        &self,
        _obs: &Observation,
        state: Option<usize>,
        _explore: bool,
    ) -> Result<(Action, usize)> {
        Ok((self.action.clone(), state.map_or(1, |n| n + 1)))
    }
}
