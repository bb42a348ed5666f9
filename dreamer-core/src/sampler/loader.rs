use super::{SequenceBatch, SequenceSampler};
use crate::error::DreamerError;
use anyhow::{anyhow, bail, Result};
use crossbeam_channel::{bounded, Receiver};
use log::trace;
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use std::{collections::VecDeque, mem, thread::JoinHandle};

enum Epoch {
    Serial(VecDeque<Vec<usize>>),
    Prefetch {
        rx: Receiver<Result<SequenceBatch>>,
        remaining: usize,
        workers: Vec<JoinHandle<()>>,
    },
}

fn make_batch(sampler: &mut SequenceSampler, chunk: &[usize]) -> Result<SequenceBatch> {
    let seqs = chunk
        .iter()
        .map(|&k| sampler.get(k))
        .collect::<Result<Vec<_>>>()?;
    Ok(SequenceBatch::from_sequences(&seqs)?)
}

/// Iterates over batches of `batch_size` sub-sequences.
///
/// At the start of an epoch the eligible episodes are shuffled and split
/// into chunks of `batch_size`. Every episode appears at least once per
/// epoch; the order is padded with episodes drawn uniformly with replacement
/// so that every chunk is full, even with fewer eligible episodes than
/// `batch_size`. When the epoch is exhausted [`SequenceLoader::next_batch`] returns `None` until
/// [`SequenceLoader::restart`] is called.
///
/// With `num_workers > 0`, batches are assembled by worker threads and handed
/// over through a bounded channel. Their order within an epoch is then
/// arbitrary.
pub struct SequenceLoader {
    sampler: SequenceSampler,
    batch_size: usize,
    num_workers: usize,
    rng: StdRng,
    epoch: Epoch,
}

impl SequenceLoader {
    /// Creates a loader and starts its first epoch.
    pub fn new(
        sampler: SequenceSampler,
        batch_size: usize,
        num_workers: usize,
        seed: u64,
    ) -> Result<Self> {
        if batch_size == 0 {
            bail!("batch_size must be positive");
        }
        let mut loader = Self {
            sampler,
            batch_size,
            num_workers,
            rng: StdRng::seed_from_u64(seed),
            epoch: Epoch::Serial(VecDeque::new()),
        };
        loader.start_epoch();
        Ok(loader)
    }

    /// Number of batches in an epoch, each holding exactly `batch_size`
    /// sub-sequences.
    pub fn num_batches(&self) -> usize {
        (self.sampler.len() + self.batch_size - 1) / self.batch_size
    }

    fn start_epoch(&mut self) {
        let n = self.sampler.len();
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut self.rng);
        if n > 0 {
            let padded = self.num_batches() * self.batch_size;
            while order.len() < padded {
                order.push(self.rng.gen_range(0..n));
            }
        }
        let chunks: Vec<Vec<usize>> = order.chunks(self.batch_size).map(|c| c.to_vec()).collect();
        trace!("New epoch with {} batches", chunks.len());

        if self.num_workers == 0 || chunks.is_empty() {
            self.epoch = Epoch::Serial(chunks.into());
            return;
        }

        let remaining = chunks.len();
        let n_workers = self.num_workers.min(remaining);
        let mut assigned = vec![vec![]; n_workers];
        for (i, chunk) in chunks.into_iter().enumerate() {
            assigned[i % n_workers].push(chunk);
        }

        let (tx, rx) = bounded(2 * n_workers);
        let workers = assigned
            .into_iter()
            .map(|chunks| {
                let tx = tx.clone();
                let mut sampler = self.sampler.fork(self.rng.gen());
                std::thread::spawn(move || {
                    for chunk in chunks {
                        if tx.send(make_batch(&mut sampler, &chunk)).is_err() {
                            // The loader moved on to another epoch
                            break;
                        }
                    }
                })
            })
            .collect();

        self.epoch = Epoch::Prefetch {
            rx,
            remaining,
            workers,
        };
    }

    fn stop_workers(&mut self) {
        if let Epoch::Prefetch { rx, workers, .. } =
            mem::replace(&mut self.epoch, Epoch::Serial(VecDeque::new()))
        {
            drop(rx);
            for worker in workers {
                let _ = worker.join();
            }
        }
    }

    /// Returns the next batch of the current epoch, or `None` when the epoch
    /// is exhausted.
    pub fn next_batch(&mut self) -> Option<Result<SequenceBatch>> {
        match &mut self.epoch {
            Epoch::Serial(chunks) => {
                let chunk = chunks.pop_front()?;
                Some(make_batch(&mut self.sampler, &chunk))
            }
            Epoch::Prefetch { rx, remaining, .. } => {
                if *remaining == 0 {
                    return None;
                }
                match rx.recv() {
                    Ok(batch) => {
                        *remaining -= 1;
                        Some(batch)
                    }
                    Err(_) => {
                        *remaining = 0;
                        Some(Err(anyhow!("Prefetch workers stopped unexpectedly")))
                    }
                }
            }
        }
    }

    /// Reshuffles and starts a new epoch.
    pub fn restart(&mut self) {
        self.stop_workers();
        self.start_epoch();
    }

    /// Returns the next batch, starting a new epoch if the current one is
    /// exhausted.
    pub fn next_or_restart(&mut self) -> Result<SequenceBatch> {
        if let Some(batch) = self.next_batch() {
            return batch;
        }
        self.restart();
        match self.next_batch() {
            Some(batch) => batch,
            None => Err(DreamerError::NoEligibleEpisodes(self.sampler.batch_length()).into()),
        }
    }
}

impl Iterator for SequenceLoader {
    type Item = Result<SequenceBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_batch()
    }
}

impl Drop for SequenceLoader {
    fn drop(&mut self) {
        self.stop_workers();
    }
}
