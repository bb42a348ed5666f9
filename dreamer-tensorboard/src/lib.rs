//! Writes records of training into TFRecord files for tensorboard.
use dreamer_core::record::{AggregateRecorder, Record, RecordStorage, RecordValue, Recorder};
use log::warn;
use std::path::Path;
use tensorboard_rs::summary_writer::SummaryWriter;

/// Maximum number of frames of a video drawn side by side.
const MAX_VIDEO_FRAMES: usize = 8;

/// Write records to TFRecord.
///
/// The step of a record is taken from `"env_steps"`, or `"training_steps"`
/// if the former is absent. Records without either key are discarded.
pub struct TensorboardRecorder {
    writer: SummaryWriter,
    storage: RecordStorage,
}

impl TensorboardRecorder {
    /// Construct a [`TensorboardRecorder`].
    ///
    /// TFRecord will be stored in `logdir`.
    pub fn new<P: AsRef<Path>>(logdir: P) -> Self {
        Self {
            writer: SummaryWriter::new(logdir),
            storage: RecordStorage::new(),
        }
    }

    fn step_key(record: &Record) -> Option<&'static str> {
        ["env_steps", "training_steps"]
            .iter()
            .copied()
            .find(|k| record.get(k).is_some())
    }
}

/// Draws up to [`MAX_VIDEO_FRAMES`] evenly spaced frames of a video
/// `[T, C, H, W]` side by side as an RGB image `[3, H, k * W]`.
///
/// Single channel videos are drawn in gray scale.
pub fn video_strip(frames: &[u8], shape: &[usize; 4]) -> (Vec<u8>, [usize; 3]) {
    let [t, c, h, w] = *shape;
    let k = t.min(MAX_VIDEO_FRAMES);
    if k == 0 || c == 0 {
        return (vec![], [3, h, 0]);
    }
    let picks: Vec<usize> = match k {
        1 => vec![0],
        _ => (0..k).map(|i| i * (t - 1) / (k - 1)).collect(),
    };

    let mut data = Vec::with_capacity(3 * h * k * w);
    for ch in 0..3 {
        let src_ch = ch.min(c - 1);
        for y in 0..h {
            for &f in picks.iter() {
                let offset = ((f * c + src_ch) * h + y) * w;
                data.extend_from_slice(&frames[offset..offset + w]);
            }
        }
    }

    (data, [3, h, k * w])
}

impl Recorder for TensorboardRecorder {
    /// Write a given [Record] into a TFRecord.
    ///
    /// This method handles [RecordValue::Scalar] and [RecordValue::Video].
    /// [RecordValue::String] is discarded.
    fn write(&mut self, record: Record) {
        let step_key = match Self::step_key(&record) {
            Some(k) => k,
            None => {
                warn!("Record without step is discarded: {:?}", record.keys());
                return;
            }
        };
        let step = match record.get(step_key) {
            Some(RecordValue::Scalar(v)) => *v as usize,
            v => {
                warn!("Invalid step {:?}", v);
                return;
            }
        };

        for (k, v) in record.iter() {
            if k == step_key {
                continue;
            }
            match v {
                RecordValue::Scalar(v) => self.writer.add_scalar(k, *v, step),
                RecordValue::String(_) => {}
                RecordValue::Video(frames, shape) => {
                    let (data, dim) = video_strip(frames, shape);
                    if !data.is_empty() {
                        self.writer.add_image(k, data.as_slice(), &dim, step);
                    }
                }
            };
        }
        self.writer.flush();
    }
}

impl AggregateRecorder for TensorboardRecorder {
    fn store(&mut self, record: Record) {
        self.storage.store(record);
    }

    fn flush(&mut self, step: i64) {
        let mut record = self.storage.aggregate();
        record.insert("training_steps", RecordValue::Scalar(step as f32));
        self.write(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_video_strip() {
        // 10 frames of 1x2x2, frame i filled with i
        let frames: Vec<u8> = (0..10u8).flat_map(|i| vec![i; 4]).collect();
        let (data, dim) = video_strip(&frames, &[10, 1, 2, 2]);
        assert_eq!(dim, [3, 2, 16]);
        assert_eq!(data.len(), 3 * 2 * 16);

        // First row of the red channel, two pixels per frame
        let row: Vec<u8> = data[..16].iter().step_by(2).copied().collect();
        assert_eq!(row, vec![0, 1, 2, 3, 5, 6, 7, 9]);
        // Gray scale
        assert_eq!(data[..32], data[32..64]);

        let (data, dim) = video_strip(&[7; 12], &[1, 3, 2, 2]);
        assert_eq!(dim, [3, 2, 2]);
        assert_eq!(data, vec![7; 12]);
    }

    #[test]
    fn test_write_records() {
        let dir = TempDir::new("tensorboard").unwrap();
        let mut recorder = TensorboardRecorder::new(dir.path());

        let mut record = Record::from_scalar("env_steps", 100.0);
        record.insert("agent/training_return", RecordValue::Scalar(1.0));
        record.insert(
            "agent/test_video",
            RecordValue::Video(vec![0; 2 * 3 * 4 * 4], [2, 3, 4, 4]),
        );
        recorder.write(record);

        recorder.store(Record::from_scalar("train/loss_model", 1.0));
        recorder.store(Record::from_scalar("train/loss_model", 3.0));
        recorder.flush(2);

        // Discarded
        recorder.write(Record::from_scalar("loss", 0.0));

        let n_files = std::fs::read_dir(dir.path()).unwrap().count();
        assert!(n_files > 0);
    }
}
