//! Dreamer agent.
//!
//! One optimization step consists of a world model step on a batch of real
//! sequences followed by an actor-critic step on trajectories imagined from
//! the posterior states of that batch.
mod base;
mod config;
mod imagine;
mod policy;
pub use base::Dreamer;
pub use config::DreamerConfig;
pub use imagine::{imagine_rollout, ImaginedTrajectory};
pub use policy::{DreamerPolicy, DreamerState};
