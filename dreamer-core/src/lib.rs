#![warn(missing_docs)]
//! Core components for training Dreamer-style agents.
//!
//! This crate is independent of any tensor backend. It provides
//!
//! * the interfaces [`Env`], [`Policy`] and [`Agent`],
//! * the episode data model [`Episode`] and its file-backed
//!   [`TrajectoryStore`],
//! * [`SequenceSampler`] and [`SequenceLoader`], which cut fixed-length
//!   sub-sequences out of stored episodes and batch them,
//! * [`Collector`], which runs a policy in an environment for a number of
//!   complete episodes,
//! * [`Trainer`], the loop alternating collection and optimization,
//! * the [`record`] module for metrics.
//!
//! Backend crates implement [`Agent`] on top of this crate.
pub mod dummy;
pub mod error;
pub mod record;
pub mod util;

mod base;
pub use base::{Action, ActionSpace, Agent, Env, Observation, Policy, Step};

mod episode;
pub use episode::{Episode, EpisodeBuilder, EpisodeKind, EpisodeMeta};

mod store;
pub use store::TrajectoryStore;

mod sampler;
pub use sampler::{Sequence, SequenceBatch, SequenceLoader, SequenceSampler};

mod collector;
pub use collector::{CollectOutput, Collector};

mod trainer;
pub use trainer::{Trainer, TrainerConfig};
