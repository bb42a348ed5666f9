use crate::util::array_to_tensor;
use anyhow::Result;
use candle_core::{Device, Tensor};
use dreamer_core::SequenceBatch;

/// [`SequenceBatch`] moved to a device.
#[derive(Clone, Debug)]
pub struct SequenceTensors {
    /// Observations `[B, L, C, H, W]`.
    pub obs: Tensor,

    /// Actions `[B, L, A]`; `act[:, t]` produced `obs[:, t]`.
    pub act: Tensor,

    /// Rewards `[B, L]`.
    pub reward: Tensor,
}

impl SequenceTensors {
    /// Converts the arrays of a batch into tensors on `device`.
    pub fn from_batch(batch: &SequenceBatch, device: &Device) -> Result<Self> {
        Ok(Self {
            obs: array_to_tensor(&batch.obs, device)?,
            act: array_to_tensor(&batch.act, device)?,
            reward: array_to_tensor(&batch.reward, device)?,
        })
    }

    /// Batch size `B`.
    pub fn batch_size(&self) -> usize {
        self.reward.dims()[0]
    }

    /// Sequence length `L`.
    pub fn batch_length(&self) -> usize {
        self.reward.dims()[1]
    }
}
