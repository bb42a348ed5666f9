//! Records for logging.
use crate::error::DreamerError;
use std::collections::hash_map::{Iter, Keys};
use std::collections::HashMap;

/// Possible values in a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    /// A single value, typically a loss or a return.
    Scalar(f32),

    /// Frames of a video as `u8` pixels with shape `[T, C, H, W]`.
    Video(Vec<u8>, [usize; 4]),

    /// A text value.
    String(String),
}

/// Key-value pairs of metrics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(HashMap<String, RecordValue>);

impl Record {
    /// Creates an empty record.
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Creates a record containing a single scalar value.
    pub fn from_scalar(name: impl Into<String>, value: f32) -> Self {
        Self(HashMap::from([(name.into(), RecordValue::Scalar(value))]))
    }

    /// Creates a record from a slice of key-value pairs.
    pub fn from_slice<K: Into<String> + Clone>(s: &[(K, RecordValue)]) -> Self {
        Self(
            s.iter()
                .map(|(k, v)| (k.clone().into(), v.clone()))
                .collect(),
        )
    }

    /// Returns an iterator over the keys.
    pub fn keys(&self) -> Keys<String, RecordValue> {
        self.0.keys()
    }

    /// Inserts a key-value pair.
    pub fn insert(&mut self, k: impl Into<String>, v: RecordValue) {
        self.0.insert(k.into(), v);
    }

    /// Returns an iterator over the key-value pairs.
    pub fn iter(&self) -> Iter<'_, String, RecordValue> {
        self.0.iter()
    }

    /// Gets the value of the given key.
    pub fn get(&self, k: &str) -> Option<&RecordValue> {
        self.0.get(k)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the record has no entry.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merges two records. Values of `record` win on key collisions.
    pub fn merge(self, record: Record) -> Self {
        Record(self.0.into_iter().chain(record.0).collect())
    }

    /// Returns a record whose keys are prefixed with `prefix`.
    ///
    /// ```rust
    /// # use dreamer_core::record::Record;
    /// let record = Record::from_scalar("loss_model", 1.0).with_prefix("train/");
    /// assert!(record.get("train/loss_model").is_some());
    /// ```
    pub fn with_prefix(self, prefix: &str) -> Self {
        Record(
            self.0
                .into_iter()
                .map(|(k, v)| (format!("{}{}", prefix, k), v))
                .collect(),
        )
    }

    /// Gets a scalar value.
    pub fn get_scalar(&self, k: &str) -> Result<f32, DreamerError> {
        match self.0.get(k) {
            Some(RecordValue::Scalar(v)) => Ok(*v),
            Some(_) => Err(DreamerError::RecordValueTypeError("Scalar".to_string())),
            None => Err(DreamerError::RecordKeyError(k.to_string())),
        }
    }

    /// Gets video frames with their shape `[T, C, H, W]`.
    pub fn get_video(&self, k: &str) -> Result<(&[u8], [usize; 4]), DreamerError> {
        match self.0.get(k) {
            Some(RecordValue::Video(v, s)) => Ok((v.as_slice(), *s)),
            Some(_) => Err(DreamerError::RecordValueTypeError("Video".to_string())),
            None => Err(DreamerError::RecordKeyError(k.to_string())),
        }
    }

    /// Gets a string value.
    pub fn get_string(&self, k: &str) -> Result<String, DreamerError> {
        match self.0.get(k) {
            Some(RecordValue::String(s)) => Ok(s.clone()),
            Some(_) => Err(DreamerError::RecordValueTypeError("String".to_string())),
            None => Err(DreamerError::RecordKeyError(k.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_getters_report_key_and_type_errors() {
        let mut record = Record::from_scalar("loss", 0.5);
        record.insert("name", RecordValue::String("cartpole".into()));

        assert_eq!(record.get_scalar("loss").unwrap(), 0.5);
        assert_eq!(
            record.get_scalar("missing"),
            Err(DreamerError::RecordKeyError("missing".into()))
        );
        assert_eq!(
            record.get_scalar("name"),
            Err(DreamerError::RecordValueTypeError("Scalar".into()))
        );
    }

    #[test]
    fn test_merge_overwrites() {
        let a = Record::from_slice(&[
            ("x", RecordValue::Scalar(1.0)),
            ("y", RecordValue::Scalar(2.0)),
        ]);
        let b = Record::from_scalar("y", 3.0);
        let merged = a.merge(b);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.get_scalar("y").unwrap(), 3.0);
    }
}
