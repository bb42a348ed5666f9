//! Core interfaces.
mod action_space;
mod agent;
mod env;
mod policy;
mod step;
pub use action_space::ActionSpace;
pub use agent::Agent;
pub use env::Env;
pub use policy::Policy;
pub use step::Step;

/// Image observation `[C, H, W]`, normalized to `[-0.5, 0.5]`.
pub type Observation = ndarray::Array3<f32>;

/// Continuous action `[A]`.
pub type Action = ndarray::Array1<f32>;
