//! Environment.
use super::{Action, ActionSpace, Observation, Step};
use anyhow::Result;

/// Represents an episodic environment with image observations and
/// continuous actions.
pub trait Env {
    /// Configurations.
    type Config: Clone;

    /// Builds an environment with a given random seed.
    fn build(config: &Self::Config, seed: i64) -> Result<Self>
    where
        Self: Sized;

    /// Starts a new episode and returns its first observation.
    fn reset(&mut self) -> Result<Observation>;

    /// Applies an action.
    ///
    /// With an action repeat larger than one, the action is applied that many
    /// times and the returned reward is the sum over the repeats.
    fn step(&mut self, act: &Action) -> Result<Step>;

    /// The action space.
    fn action_space(&self) -> &ActionSpace;

    /// Number of times each action is repeated by [`Env::step`].
    fn action_repeat(&self) -> usize {
        1
    }
}
