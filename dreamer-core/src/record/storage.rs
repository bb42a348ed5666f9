//! Aggregation of records.
use super::{Record, RecordValue};
use std::collections::HashSet;
use xxhash_rust::xxh3::Xxh3Builder;

/// Stores records and reduces them into a single record.
///
/// Scalars observed more than once are summarized as `{key}_min`,
/// `{key}_max`, `{key}_mean` and `{key}_median`; a scalar observed once keeps
/// its key. For any other value type the most recent value is kept.
#[derive(Default)]
pub struct RecordStorage {
    data: Vec<Record>,
}

fn min(vs: &[f32]) -> f32 {
    vs.iter().copied().fold(f32::INFINITY, f32::min)
}

fn max(vs: &[f32]) -> f32 {
    vs.iter().copied().fold(f32::NEG_INFINITY, f32::max)
}

fn mean(vs: &[f32]) -> f32 {
    vs.iter().sum::<f32>() / vs.len() as f32
}

fn median(mut vs: Vec<f32>) -> f32 {
    vs.sort_by(|x, y| x.total_cmp(y));
    vs[vs.len() / 2]
}

impl RecordStorage {
    /// Creates an empty storage.
    pub fn new() -> Self {
        Self { data: vec![] }
    }

    /// Stores a record.
    pub fn store(&mut self, record: Record) {
        self.data.push(record);
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn keys(&self) -> HashSet<String, Xxh3Builder> {
        let mut keys = HashSet::<String, Xxh3Builder>::default();
        for record in self.data.iter() {
            keys.extend(record.keys().cloned());
        }
        keys
    }

    fn scalars(&self, key: &str) -> Vec<f32> {
        self.data
            .iter()
            .filter_map(|record| match record.get(key) {
                Some(RecordValue::Scalar(v)) => Some(*v),
                _ => None,
            })
            .collect()
    }

    fn latest(&self, key: &str) -> Option<&RecordValue> {
        self.data.iter().rev().find_map(|record| record.get(key))
    }

    /// Aggregates the stored records and clears the storage.
    pub fn aggregate(&mut self) -> Record {
        let mut record = Record::empty();

        for key in self.keys().iter() {
            let vs = self.scalars(key);
            match vs.len() {
                0 => {
                    if let Some(value) = self.latest(key) {
                        record.insert(key.clone(), value.clone());
                    }
                }
                1 => record.insert(key.clone(), RecordValue::Scalar(vs[0])),
                _ => {
                    record.insert(format!("{}_min", key), RecordValue::Scalar(min(&vs)));
                    record.insert(format!("{}_max", key), RecordValue::Scalar(max(&vs)));
                    record.insert(format!("{}_mean", key), RecordValue::Scalar(mean(&vs)));
                    record.insert(format!("{}_median", key), RecordValue::Scalar(median(vs)));
                }
            }
        }

        self.data.clear();
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_scalars() {
        let mut storage = RecordStorage::new();
        for v in [3.0, 1.0, 2.0] {
            let mut record = Record::from_scalar("loss", v);
            record.insert("tag", RecordValue::String(format!("{}", v)));
            storage.store(record);
        }
        storage.store(Record::from_scalar("kl", 0.5));

        let record = storage.aggregate();
        assert_eq!(record.get_scalar("loss_min").unwrap(), 1.0);
        assert_eq!(record.get_scalar("loss_max").unwrap(), 3.0);
        assert_eq!(record.get_scalar("loss_mean").unwrap(), 2.0);
        assert_eq!(record.get_scalar("loss_median").unwrap(), 2.0);
        assert_eq!(record.get_scalar("kl").unwrap(), 0.5);
        assert_eq!(record.get_string("tag").unwrap(), "2");
        assert!(storage.is_empty());
    }
}
