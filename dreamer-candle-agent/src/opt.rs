//! Optimizers.
use anyhow::Result;
use candle_core::{backprop::GradStore, Tensor, Var};
use candle_nn::{AdamW, Optimizer as _, ParamsAdamW};
use candle_optimisers::adam::{Adam, ParamsAdam};
use serde::{Deserialize, Serialize};

/// Configuration of optimizer for training neural networks in an RL agent.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum OptimizerConfig {
    /// AdamW optimizer.
    AdamW {
        /// Learning rate.
        lr: f64,
        /// Decay rate of the first moment.
        #[serde(default = "default_beta1")]
        beta1: f64,
        /// Decay rate of the second moment.
        #[serde(default = "default_beta2")]
        beta2: f64,
        /// Term added to the denominator.
        #[serde(default = "default_eps")]
        eps: f64,
        /// Weight decay.
        #[serde(default = "default_weight_decay")]
        weight_decay: f64,
    },

    /// Adam optimizer.
    Adam {
        /// Learning rate.
        lr: f64,
    },
}

fn default_beta1() -> f64 {
    ParamsAdamW::default().beta1
}

fn default_beta2() -> f64 {
    ParamsAdamW::default().beta2
}

fn default_eps() -> f64 {
    ParamsAdamW::default().eps
}

fn default_weight_decay() -> f64 {
    ParamsAdamW::default().weight_decay
}

impl OptimizerConfig {
    /// Constructs an optimizer of the given variables.
    pub fn build(&self, vars: Vec<Var>) -> Result<Optimizer> {
        let kind = match &self {
            OptimizerConfig::AdamW {
                lr,
                beta1,
                beta2,
                eps,
                weight_decay,
            } => {
                let params = ParamsAdamW {
                    lr: *lr,
                    beta1: *beta1,
                    beta2: *beta2,
                    eps: *eps,
                    weight_decay: *weight_decay,
                };
                OptimizerKind::AdamW(AdamW::new(vars.clone(), params)?)
            }
            OptimizerConfig::Adam { lr } => {
                let params = ParamsAdam {
                    lr: *lr,
                    ..ParamsAdam::default()
                };
                OptimizerKind::Adam(Adam::new(vars.clone(), params)?)
            }
        };
        Ok(Optimizer { kind, vars })
    }

    /// Override learning rate.
    pub fn learning_rate(self, lr: f64) -> Self {
        match self {
            Self::AdamW {
                beta1,
                beta2,
                eps,
                weight_decay,
                ..
            } => Self::AdamW {
                lr,
                beta1,
                beta2,
                eps,
                weight_decay,
            },
            Self::Adam { .. } => Self::Adam { lr },
        }
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::Adam { lr: 6e-4 }
    }
}

enum OptimizerKind {
    AdamW(AdamW),
    Adam(Adam),
}

/// Optimizer over a fixed set of variables.
pub struct Optimizer {
    kind: OptimizerKind,
    vars: Vec<Var>,
}

impl Optimizer {
    /// Applies a backward step pass.
    pub fn backward_step(&mut self, loss: &Tensor) -> Result<()> {
        let grads = loss.backward()?;
        self.step(&grads)
    }

    /// Applies a backward step pass with gradients rescaled so that their
    /// global norm does not exceed `max_norm`. Returns the norm before
    /// rescaling.
    pub fn backward_step_clip(&mut self, loss: &Tensor, max_norm: f64) -> Result<f32> {
        let mut grads = loss.backward()?;
        let norm = clip_grad_norm(&self.vars, &mut grads, max_norm)?;
        self.step(&grads)?;
        Ok(norm)
    }

    /// Updates the variables with the given gradients.
    pub fn step(&mut self, grads: &GradStore) -> Result<()> {
        match &mut self.kind {
            OptimizerKind::AdamW(opt) => Ok(opt.step(grads)?),
            OptimizerKind::Adam(opt) => Ok(opt.step(grads)?),
        }
    }
}

/// Rescales the gradients of `vars` in place so that their global L2 norm is
/// at most `max_norm`, and returns the norm before rescaling.
///
/// Variables without a gradient are ignored. Non-finite norms leave the
/// gradients untouched.
pub fn clip_grad_norm(vars: &[Var], grads: &mut GradStore, max_norm: f64) -> Result<f32> {
    let mut sq_sum = 0f64;
    for var in vars.iter() {
        if let Some(grad) = grads.get(var.as_tensor()) {
            sq_sum += grad.sqr()?.sum_all()?.to_scalar::<f32>()? as f64;
        }
    }
    let norm = sq_sum.sqrt();

    if norm.is_finite() && norm > max_norm {
        let scale = max_norm / (norm + 1e-6);
        for var in vars.iter() {
            if let Some(grad) = grads.remove(var.as_tensor()) {
                grads.insert(var.as_tensor(), (grad * scale)?);
            }
        }
    }

    Ok(norm as f32)
}
