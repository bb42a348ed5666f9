//! Types and traits for recording training metrics.
//!
//! Metrics produced during collection and optimization are put into a
//! [`Record`], a map from string keys to [`RecordValue`]s, and handed to a
//! [`Recorder`]. Records produced at every optimization step are usually
//! stored into an [`AggregateRecorder`] and flushed once per epoch, where
//! scalar values are reduced to their min/max/mean/median with
//! [`RecordStorage`].
//!
//! Every record written to a recorder is expected to carry a counter,
//! either `"env_steps"` or `"training_steps"`, which sinks use as the
//! horizontal axis.
//!
//! ```rust
//! use dreamer_core::record::{Record, RecordValue};
//!
//! let mut record = Record::from_scalar("env_steps", 2000.0);
//! record.insert("agent/training_return", RecordValue::Scalar(12.5));
//! assert_eq!(record.get_scalar("agent/training_return").unwrap(), 12.5);
//! ```
mod base;
mod buffered_recorder;
mod null_recorder;
mod recorder;
mod storage;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use null_recorder::NullRecorder;
pub use recorder::{AggregateRecorder, Recorder};
pub use storage::RecordStorage;
