//! Dreamer agent implemented with [candle](https://crates.io/crates/candle-core).
//!
//! The agent learns a recurrent latent world model ([`world_model::WorldModel`])
//! from pixel observations and trains an actor and a critic on trajectories
//! imagined inside that model ([`dreamer::Dreamer`]).
pub mod actor;
pub mod cnn;
pub mod critic;
pub mod dreamer;
pub mod mlp;
pub mod model;
pub mod opt;
pub mod rssm;
mod tensor_batch;
pub mod util;
pub mod world_model;
use serde::{Deserialize, Serialize};
pub use dreamer::{Dreamer, DreamerConfig, DreamerPolicy, DreamerState};
pub use tensor_batch::SequenceTensors;

#[derive(Clone, Debug, Copy, Deserialize, Serialize, PartialEq)]
/// Device for using candle.
///
/// This enum is added because [`candle_core::Device`] does not support serialization.
pub enum Device {
    /// The main CPU device.
    Cpu,

    /// The GPU device with the given ordinal.
    Cuda(usize),
}

impl Default for Device {
    fn default() -> Self {
        Self::Cpu
    }
}

impl Device {
    /// Opens the device.
    pub fn build(self) -> candle_core::Result<candle_core::Device> {
        match self {
            Self::Cpu => Ok(candle_core::Device::Cpu),
            Self::Cuda(n) => candle_core::Device::new_cuda(n),
        }
    }
}
