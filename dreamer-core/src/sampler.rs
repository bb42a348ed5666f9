//! Fixed-length sub-sequences of stored episodes.
//!
//! [`SequenceSampler`] takes a snapshot of the episode directory and cuts a
//! randomly positioned window of `batch_length` steps out of an episode.
//! Episodes shorter than `batch_length` are never sampled. [`SequenceLoader`]
//! shuffles the eligible episodes once per epoch and turns them into full
//! [`SequenceBatch`]es of `batch_size` sub-sequences.
mod batch;
mod loader;
use crate::{episode::Episode, store::TrajectoryStore};
use anyhow::{bail, Result};
pub use batch::SequenceBatch;
use log::debug;
pub use loader::SequenceLoader;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::path::{Path, PathBuf};

/// A window of consecutive steps cut out of a stored episode.
#[derive(Debug, Clone)]
pub struct Sequence {
    /// The steps.
    pub episode: Episode,

    /// Archive the steps were read from.
    pub source: PathBuf,

    /// Offset of the first step in the source episode.
    pub start: usize,
}

#[derive(Debug, Clone)]
struct Entry {
    path: PathBuf,
    length: usize,
}

/// Samples sub-sequences of a snapshot of stored episodes.
#[derive(Clone)]
pub struct SequenceSampler {
    entries: Vec<Entry>,
    batch_length: usize,
    rng: StdRng,
}

impl SequenceSampler {
    /// Lists the episodes in `dir` which have at least `batch_length` steps.
    ///
    /// Only the metadata entry of each archive is read. Episodes written
    /// after the scan are not visible to the sampler.
    pub fn scan(dir: impl AsRef<Path>, batch_length: usize, seed: u64) -> Result<Self> {
        if batch_length == 0 {
            bail!("batch_length must be positive");
        }
        let mut entries = vec![];
        let mut n_short = 0;
        for path in TrajectoryStore::list_paths(dir.as_ref())? {
            let meta = TrajectoryStore::load_meta(&path)?;
            if meta.length >= batch_length {
                entries.push(Entry {
                    path,
                    length: meta.length,
                });
            } else {
                n_short += 1;
            }
        }
        debug!(
            "Scanned {:?}: {} eligible episodes, {} shorter than {}",
            dir.as_ref(),
            entries.len(),
            n_short,
            batch_length
        );

        Ok(Self {
            entries,
            batch_length,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Number of eligible episodes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no episode is long enough.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Length of the sampled sub-sequences.
    pub fn batch_length(&self) -> usize {
        self.batch_length
    }

    /// A copy of the sampler with its own random number generator.
    pub fn fork(&self, seed: u64) -> Self {
        Self {
            entries: self.entries.clone(),
            batch_length: self.batch_length,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Reads eligible episode `k` and returns `batch_length` consecutive steps
    /// starting at an offset drawn uniformly from `[0, len - batch_length]`.
    pub fn get(&mut self, k: usize) -> Result<Sequence> {
        let entry = match self.entries.get(k) {
            Some(entry) => entry,
            None => bail!("Index {} out of range of {} episodes", k, self.entries.len()),
        };
        let episode = TrajectoryStore::load(&entry.path)?;
        if episode.len() != entry.length {
            bail!(
                "Episode {:?} has {} steps, its metadata says {}",
                entry.path,
                episode.len(),
                entry.length
            );
        }
        let start = self.rng.gen_range(0..=entry.length - self.batch_length);

        Ok(Sequence {
            episode: episode.slice(start, self.batch_length),
            source: entry.path.clone(),
            start,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EpisodeKind;
    use ndarray::Array;
    use tempdir::TempDir;

    fn counting_episode(len: usize) -> Episode {
        let obs = Array::from_shape_fn((len, 1, 2, 2), |(t, _, _, _)| t as f32);
        let act = Array::from_shape_fn((len, 1), |(t, _)| t as f32);
        let reward = Array::from_shape_fn(len, |t| t as f32);
        Episode::new(obs, act, reward).unwrap()
    }

    #[test]
    fn test_only_long_episodes_are_sampled() -> Result<()> {
        let dir = TempDir::new("sampler")?;
        let mut store = TrajectoryStore::new(dir.path())?;
        store.save(&counting_episode(4), EpisodeKind::Prefill)?;
        let long = store.save(&counting_episode(8), EpisodeKind::Regular)?;

        let mut sampler = SequenceSampler::scan(dir.path(), 5, 0)?;
        assert_eq!(sampler.len(), 1);

        let mut starts = vec![];
        for _ in 0..200 {
            let seq = sampler.get(0)?;
            assert_eq!(seq.source, long);
            assert_eq!(seq.episode.len(), 5);
            assert!(seq.start <= 3);
            // Steps are contiguous and aligned across arrays
            let expected: Vec<f32> = (seq.start..seq.start + 5).map(|t| t as f32).collect();
            assert_eq!(seq.episode.reward().to_vec(), expected);
            assert_eq!(seq.episode.act().column(0).to_vec(), expected);
            starts.push(seq.start);
        }
        for start in 0..=3 {
            assert!(starts.contains(&start));
        }
        assert!(sampler.get(1).is_err());
        Ok(())
    }

    #[test]
    fn test_scan_is_a_snapshot() -> Result<()> {
        let dir = TempDir::new("sampler")?;
        let mut store = TrajectoryStore::new(dir.path())?;
        store.save(&counting_episode(6), EpisodeKind::Regular)?;
        let sampler = SequenceSampler::scan(dir.path(), 6, 0)?;
        store.save(&counting_episode(6), EpisodeKind::Regular)?;

        assert_eq!(sampler.len(), 1);
        assert_eq!(SequenceSampler::scan(dir.path(), 6, 0)?.len(), 2);
        assert!(SequenceSampler::scan(dir.path(), 0, 0).is_err());
        Ok(())
    }
}
