//! Environment step.
use super::Observation;
use crate::record::Record;

/// Result of an environment step: the observation `o_t+1` and reward `r_t`
/// produced by action `a_t`, with some additional information.
pub struct Step {
    /// Observation.
    pub obs: Observation,

    /// Reward.
    pub reward: f32,

    /// Flag denoting if episode is terminated.
    pub is_terminated: bool,

    /// Flag denoting if episode is truncated.
    pub is_truncated: bool,

    /// Information defined by the environment.
    pub info: Record,
}

impl Step {
    /// Constructs a [`Step`] object.
    pub fn new(
        obs: Observation,
        reward: f32,
        is_terminated: bool,
        is_truncated: bool,
        info: Record,
    ) -> Self {
        Step {
            obs,
            reward,
            is_terminated,
            is_truncated,
            info,
        }
    }

    #[inline]
    /// Terminated or truncated.
    pub fn is_done(&self) -> bool {
        self.is_terminated || self.is_truncated
    }
}
