use super::Sequence;
use crate::error::DreamerError;
use ndarray::{stack, Array2, Array3, Array5, ArrayView1, ArrayView2, ArrayView4, Axis};

/// A batch of `B` sequences of length `L`.
#[derive(Debug, Clone)]
pub struct SequenceBatch {
    /// Observations `[B, L, C, H, W]`.
    pub obs: Array5<f32>,

    /// Actions `[B, L, A]`.
    pub act: Array3<f32>,

    /// Rewards `[B, L]`.
    pub reward: Array2<f32>,
}

impl SequenceBatch {
    /// Stacks sequences of identical shape.
    pub fn from_sequences(seqs: &[Sequence]) -> Result<Self, DreamerError> {
        if seqs.is_empty() {
            return Err(DreamerError::InconsistentBatch);
        }
        let obs: Vec<ArrayView4<f32>> = seqs.iter().map(|s| s.episode.obs().view()).collect();
        let act: Vec<ArrayView2<f32>> = seqs.iter().map(|s| s.episode.act().view()).collect();
        let reward: Vec<ArrayView1<f32>> =
            seqs.iter().map(|s| s.episode.reward().view()).collect();

        Ok(Self {
            obs: stack(Axis(0), &obs).map_err(|_| DreamerError::InconsistentBatch)?,
            act: stack(Axis(0), &act).map_err(|_| DreamerError::InconsistentBatch)?,
            reward: stack(Axis(0), &reward).map_err(|_| DreamerError::InconsistentBatch)?,
        })
    }

    /// Number of sequences `B`.
    pub fn batch_size(&self) -> usize {
        self.reward.nrows()
    }

    /// Length of the sequences `L`.
    pub fn batch_length(&self) -> usize {
        self.reward.ncols()
    }
}
