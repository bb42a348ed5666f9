//! Multilayer perceptron.
mod base;
mod config;
pub use base::Mlp;
use candle_core::Tensor;
use candle_nn::{Linear, Module};
pub use config::MlpConfig;

/// Applies the layers with ELU between them. The last layer is linear.
fn mlp_forward(xs: &Tensor, layers: &[Linear]) -> candle_core::Result<Tensor> {
    let (last, hidden) = match layers.split_last() {
        Some(v) => v,
        None => return Ok(xs.clone()),
    };
    let mut xs = xs.clone();
    for layer in hidden.iter() {
        xs = layer.forward(&xs)?.elu(1.0)?;
    }
    last.forward(&xs)
}
