use candle_core::{Result, Tensor, D};

/// `log(1 + exp(x))`, computed as `relu(x) + log(1 + exp(-|x|))`.
pub fn softplus(xs: &Tensor) -> Result<Tensor> {
    let tail = (xs.abs()?.neg()?.exp()? + 1.0)?.log()?;
    xs.relu()? + tail
}

/// KL divergence between diagonal Gaussians, summed over the last dimension.
///
/// KL(N(mean1, std1) || N(mean2, std2)).
pub fn gaussian_kl(mean1: &Tensor, std1: &Tensor, mean2: &Tensor, std2: &Tensor) -> Result<Tensor> {
    let var_ratio = (std1 / std2)?.sqr()?;
    let t1 = ((mean1 - mean2)? / std2)?.sqr()?;
    let kl = ((((&var_ratio + t1)? - 1.0)? - var_ratio.log()?)? * 0.5)?;
    kl.sum(D::Minus1)
}

/// Element-wise log density of a diagonal Gaussian.
pub fn normal_logp(xs: &Tensor, mean: &Tensor, std: &Tensor) -> Result<Tensor> {
    let z = ((xs - mean)? / std)?;
    let half_log_2pi = 0.5 * (2.0 * std::f64::consts::PI).ln();
    ((z.sqr()? * -0.5)? - std.log()?)? - half_log_2pi
}

/// λ-returns of an imagined trajectory.
///
/// `rewards[t]` is the reward predicted for the transition into step `t + 1`
/// and `next_values[t]` the value of that state; both have shape `[H, ..]`.
/// The recursion `G_t = r_t + gamma * ((1 - lambda) * v_{t+1} + lambda * G_{t+1})`
/// is bootstrapped with the value of the last state. Returns `[H, ..]`.
pub fn lambda_return(
    rewards: &Tensor,
    next_values: &Tensor,
    gamma: f64,
    lambda: f64,
) -> Result<Tensor> {
    let horizon = rewards.dim(0)?;
    let mut returns = Vec::with_capacity(horizon);
    let mut next = next_values.get(horizon - 1)?;

    for t in (0..horizon).rev() {
        let r = rewards.get(t)?;
        let v = next_values.get(t)?;
        let mix = (((1.0 - lambda) * v)? + (lambda * &next)?)?;
        next = (r + (gamma * mix)?)?;
        returns.push(next.clone());
    }
    returns.reverse();

    Tensor::stack(&returns, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    fn close(a: &[f32], b: &[f32]) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-4)
    }

    #[test]
    fn test_softplus() -> Result<()> {
        let xs = Tensor::from_slice(&[-30f32, 0.0, 2.0, 30.0], (4,), &Device::Cpu)?;
        let ys = softplus(&xs)?.to_vec1::<f32>()?;
        assert!(close(&ys, &[0.0, 2f32.ln(), (1.0 + 2f32.exp()).ln(), 30.0]));
        Ok(())
    }

    #[test]
    fn test_gaussian_kl() -> Result<()> {
        let dev = Device::Cpu;
        let m1 = Tensor::from_slice(&[0f32, 0.0], (1, 2), &dev)?;
        let s1 = Tensor::from_slice(&[1f32, 1.0], (1, 2), &dev)?;
        let m2 = Tensor::from_slice(&[1f32, 0.0], (1, 2), &dev)?;
        let s2 = Tensor::from_slice(&[2f32, 1.0], (1, 2), &dev)?;

        // Second dimension is identical and contributes nothing
        let kl = gaussian_kl(&m1, &s1, &m2, &s2)?.to_vec1::<f32>()?;
        assert!(close(&kl, &[2f32.ln() + 0.25 - 0.5]));

        let kl = gaussian_kl(&m1, &s1, &m1, &s1)?.to_vec1::<f32>()?;
        assert!(close(&kl, &[0.0]));
        Ok(())
    }

    #[test]
    fn test_normal_logp() -> Result<()> {
        let dev = Device::Cpu;
        let xs = Tensor::from_slice(&[0f32, 1.0], (2,), &dev)?;
        let mean = Tensor::zeros((2,), candle_core::DType::F32, &dev)?;
        let std = Tensor::ones((2,), candle_core::DType::F32, &dev)?;
        let lp = normal_logp(&xs, &mean, &std)?.to_vec1::<f32>()?;
        let c = -0.5 * (2.0 * std::f32::consts::PI).ln();
        assert!(close(&lp, &[c, c - 0.5]));
        Ok(())
    }

    #[test]
    fn test_lambda_return() -> Result<()> {
        let dev = Device::Cpu;
        let rewards = Tensor::from_slice(&[1f32, 2.0, 3.0], (3, 1), &dev)?;
        let values = Tensor::from_slice(&[10f32, 20.0, 30.0], (3, 1), &dev)?;
        let gamma = 0.5;

        // One-step targets
        let g = lambda_return(&rewards, &values, gamma, 0.0)?;
        let g = g.flatten_all()?.to_vec1::<f32>()?;
        assert!(close(&g, &[6.0, 12.0, 18.0]));

        // Discounted rewards bootstrapped with the last value
        let g = lambda_return(&rewards, &values, gamma, 1.0)?;
        let g = g.flatten_all()?.to_vec1::<f32>()?;
        assert!(close(&g, &[1.0 + 1.0 + 0.75 + 3.75, 2.0 + 1.5 + 7.5, 3.0 + 15.0]));
        Ok(())
    }
}
