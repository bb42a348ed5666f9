//! World model learned from pixel observations.
mod base;
mod config;
pub use base::{WorldModel, WorldModelLoss};
pub use config::WorldModelConfig;
