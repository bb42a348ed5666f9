use super::Record;

/// Writes a record to an output destination.
pub trait Recorder {
    /// Writes a record.
    fn write(&mut self, record: Record);
}

/// A [`Recorder`] which also accumulates records and writes their aggregate.
pub trait AggregateRecorder: Recorder {
    /// Stores a record for later aggregation.
    fn store(&mut self, record: Record);

    /// Writes the aggregate of the stored records with the counter
    /// `"training_steps"` set to `step`.
    fn flush(&mut self, step: i64);
}
