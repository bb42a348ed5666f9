//! Policy.
use super::{Action, Observation};
use anyhow::Result;

/// A recurrent policy on image observations.
///
/// The recurrent state is threaded explicitly by the caller: `None` at the
/// start of an episode, then the state returned by the previous call.
pub trait Policy {
    /// Recurrent state carried between steps of an episode.
    type State: Clone;

    /// Selects an action for `obs`.
    ///
    /// When `explore` is `true` the action is sampled from the policy,
    /// otherwise the most likely action is taken.
    fn act(
        &self,
        obs: &Observation,
        state: Option<Self::State>,
        explore: bool,
    ) -> Result<(Action, Self::State)>;
}
