//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug, PartialEq)]
pub enum DreamerError {
    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),

    /// The arrays of an episode do not share the time dimension.
    #[error("Episode length mismatch: obs={obs}, act={act}, reward={reward}")]
    EpisodeLengthMismatch {
        /// Number of observations.
        obs: usize,
        /// Number of actions.
        act: usize,
        /// Number of rewards.
        reward: usize,
    },

    /// An episode without any step.
    #[error("Episode has no steps")]
    EmptyEpisode,

    /// A file in the episode directory does not follow the naming scheme.
    #[error("Invalid episode file name: {0}")]
    InvalidEpisodeFileName(String),

    /// No stored episode is long enough for sampling.
    #[error("No episode has at least {0} steps")]
    NoEligibleEpisodes(usize),

    /// An action does not match the action space.
    #[error("Invalid action: expected dimension {expected}, got {got}")]
    InvalidAction {
        /// Dimension of the action space.
        expected: usize,
        /// Dimension of the given action.
        got: usize,
    },

    /// Bounds of an action space are inconsistent.
    #[error("Invalid action space: {0}")]
    InvalidActionSpace(String),

    /// Sequences in a batch have different shapes.
    #[error("Inconsistent sequence shapes in batch")]
    InconsistentBatch,
}
