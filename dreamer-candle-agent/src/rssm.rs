//! Recurrent state-space model.
//!
//! The latent state consists of a deterministic part updated by a GRU and a
//! stochastic part drawn from a diagonal Gaussian. The prior of the
//! stochastic part depends only on the deterministic part; the posterior
//! additionally sees the embedding of the current observation.
mod base;
mod config;
mod state;
pub use base::Rssm;
pub use config::RssmConfig;
pub use state::RssmState;
