//! Episodes of interaction.
use crate::{error::DreamerError, Action, Observation};
use anyhow::Result;
use ndarray::{s, stack, Array1, Array2, Array4, ArrayView1, ArrayView3, Axis};
use serde::{Deserialize, Serialize};

/// A complete episode.
///
/// Step `t` holds the observation produced by action `t` and the reward of
/// that transition. The observation returned at reset is not part of the
/// episode.
#[derive(Debug, Clone, PartialEq)]
pub struct Episode {
    obs: Array4<f32>,
    act: Array2<f32>,
    reward: Array1<f32>,
}

impl Episode {
    /// Constructs an episode from arrays of shape `[T, C, H, W]`, `[T, A]`
    /// and `[T]`.
    pub fn new(
        obs: Array4<f32>,
        act: Array2<f32>,
        reward: Array1<f32>,
    ) -> Result<Self, DreamerError> {
        let (n_obs, n_act, n_reward) = (obs.len_of(Axis(0)), act.len_of(Axis(0)), reward.len());
        if n_obs != n_act || n_obs != n_reward {
            return Err(DreamerError::EpisodeLengthMismatch {
                obs: n_obs,
                act: n_act,
                reward: n_reward,
            });
        }
        Ok(Self { obs, act, reward })
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.reward.len()
    }

    /// Returns `true` if the episode has no step.
    pub fn is_empty(&self) -> bool {
        self.reward.is_empty()
    }

    /// Observations `[T, C, H, W]`.
    pub fn obs(&self) -> &Array4<f32> {
        &self.obs
    }

    /// Actions `[T, A]`.
    pub fn act(&self) -> &Array2<f32> {
        &self.act
    }

    /// Rewards `[T]`.
    pub fn reward(&self) -> &Array1<f32> {
        &self.reward
    }

    /// Undiscounted return.
    pub fn total_reward(&self) -> f32 {
        self.reward.sum()
    }

    /// Copies the steps `start..start + len`.
    ///
    /// Panics if the range exceeds the episode.
    pub fn slice(&self, start: usize, len: usize) -> Self {
        let end = start + len;
        Self {
            obs: self.obs.slice(s![start..end, .., .., ..]).to_owned(),
            act: self.act.slice(s![start..end, ..]).to_owned(),
            reward: self.reward.slice(s![start..end]).to_owned(),
        }
    }

    /// Decomposes the episode into its arrays.
    pub fn into_arrays(self) -> (Array4<f32>, Array2<f32>, Array1<f32>) {
        (self.obs, self.act, self.reward)
    }
}

/// Accumulates the steps of a running episode.
#[derive(Default)]
pub struct EpisodeBuilder {
    obs: Vec<Observation>,
    act: Vec<Action>,
    reward: Vec<f32>,
}

impl EpisodeBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step.
    pub fn push(&mut self, obs: Observation, act: Action, reward: f32) {
        self.obs.push(obs);
        self.act.push(act);
        self.reward.push(reward);
    }

    /// Number of steps so far.
    pub fn len(&self) -> usize {
        self.reward.len()
    }

    /// Returns `true` if no step was pushed.
    pub fn is_empty(&self) -> bool {
        self.reward.is_empty()
    }

    /// Stacks the steps into an [`Episode`].
    pub fn finish(self) -> Result<Episode> {
        if self.is_empty() {
            return Err(DreamerError::EmptyEpisode.into());
        }
        let obs: Vec<ArrayView3<f32>> = self.obs.iter().map(|o| o.view()).collect();
        let act: Vec<ArrayView1<f32>> = self.act.iter().map(|a| a.view()).collect();
        let obs = stack(Axis(0), &obs)?;
        let act = stack(Axis(0), &act)?;
        Ok(Episode::new(obs, act, Array1::from(self.reward))?)
    }
}

/// Origin of a stored episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum EpisodeKind {
    /// Collected with uniformly random actions before training.
    Prefill,

    /// Collected with the agent's policy.
    Regular,
}

/// Metadata stored along with an episode.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EpisodeMeta {
    /// Index of the episode in its store.
    pub index: u64,

    /// Origin of the episode.
    pub kind: EpisodeKind,

    /// Number of steps.
    pub length: usize,

    /// Undiscounted return.
    pub total_reward: f32,

    /// Creation time in RFC 3339.
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, Array3};

    fn step(v: f32) -> (Array3<f32>, Array1<f32>, f32) {
        (Array3::from_elem((1, 2, 2), v), Array1::from(vec![v, -v]), v)
    }

    #[test]
    fn test_length_mismatch() {
        let obs = Array::zeros((3, 1, 2, 2));
        let act = Array::zeros((2, 2));
        let reward = Array::zeros(3);
        assert_eq!(
            Episode::new(obs, act, reward),
            Err(DreamerError::EpisodeLengthMismatch {
                obs: 3,
                act: 2,
                reward: 3
            })
        );
    }

    #[test]
    fn test_builder_and_slice() {
        let mut builder = EpisodeBuilder::new();
        for i in 0..5 {
            let (o, a, r) = step(i as f32);
            builder.push(o, a, r);
        }
        let episode = builder.finish().unwrap();
        assert_eq!(episode.len(), 5);
        assert_eq!(episode.obs().shape(), &[5, 1, 2, 2]);
        assert_eq!(episode.act().shape(), &[5, 2]);
        assert_eq!(episode.total_reward(), 10.0);

        let sub = episode.slice(2, 3);
        assert_eq!(sub.len(), 3);
        assert_eq!(sub.reward().to_vec(), vec![2.0, 3.0, 4.0]);
        assert_eq!(sub.act()[[0, 1]], -2.0);
        assert_eq!(sub.obs()[[2, 0, 1, 1]], 4.0);
    }

    #[test]
    fn test_empty_builder() {
        assert!(EpisodeBuilder::new().finish().is_err());
    }
}
