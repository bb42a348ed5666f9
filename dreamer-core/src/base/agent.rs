//! Agent.
use super::Policy;
use crate::{record::Record, SequenceBatch};
use anyhow::Result;
use std::path::Path;

/// Represents a trainable policy.
pub trait Agent: Policy {
    /// Parameter snapshot of the agent acting in the environment.
    type Snapshot: Policy;

    /// Set the policy to training mode.
    ///
    /// Only in training mode does [`Policy::act`] of the agent itself sample
    /// actions when asked to explore. Snapshots explore as their collector
    /// tells them to.
    fn train(&mut self);

    /// Set the policy to evaluation mode, in which the agent acts
    /// deterministically.
    fn eval(&mut self);

    /// Return if it is in training mode.
    fn is_train(&self) -> bool;

    /// Performs an optimization step on a batch of sequences and returns
    /// the losses and other diagnostics.
    fn update(&mut self, batch: &SequenceBatch) -> Result<Record>;

    /// Copies the current parameters into a policy used for collection.
    fn snapshot(&self) -> Result<Self::Snapshot>;

    /// Saves the parameters of the agent to the file `path`.
    fn save_params(&self, path: &Path) -> Result<()>;

    /// Loads the parameters of the agent from the file `path`.
    fn load_params(&mut self, path: &Path) -> Result<()>;
}
