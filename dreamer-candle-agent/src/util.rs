//! Utilities.
use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use candle_nn::VarMap;
use log::trace;
mod dist;
mod named_tensors;
pub use dist::{gaussian_kl, lambda_return, normal_logp, softplus};
pub use named_tensors::NamedTensors;
use ndarray::{ArrayBase, Data, Dimension};

/// Apply soft update on variables, where the name of a source variable is
/// that of the destination with `ss_dest` replaced by `ss_src`.
///
/// dest = tau * src + (1.0 - tau) * dest
pub fn track_with_replace_substring(
    dest: &VarMap,
    src: &VarMap,
    tau: f64,
    (ss_src, ss_dest): (&str, &str),
) -> Result<()> {
    trace!("Lock dest");
    let dest = dest
        .data()
        .lock()
        .map_err(|_| anyhow!("Failed to lock the destination VarMap"))?;
    trace!("Lock src");
    let src = src
        .data()
        .lock()
        .map_err(|_| anyhow!("Failed to lock the source VarMap"))?;

    for (k_dest, v_dest) in dest.iter() {
        let k_src = match ss_dest.is_empty() {
            true => k_dest.clone(),
            false => k_dest.replace(ss_dest, ss_src),
        };
        let v_src = src
            .get(&k_src)
            .ok_or_else(|| anyhow!("Variable {} not found in the source", k_src))?;
        let t_src = v_src.as_tensor().to_device(v_dest.device())?;
        let t_dest = v_dest.as_tensor();
        let t_dest = match tau == 1.0 {
            true => t_src,
            false => ((tau * t_src)? + ((1.0 - tau) * t_dest)?)?,
        };
        v_dest.set(&t_dest)?;
    }

    Ok(())
}

/// Converts an `f32` array into a tensor of the same shape on `device`.
pub fn array_to_tensor<S, D>(a: &ArrayBase<S, D>, device: &Device) -> Result<Tensor>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    let shape = a.shape().to_vec();
    let v: Vec<f32> = a.iter().copied().collect();
    Ok(Tensor::from_vec(v, shape, device)?)
}
