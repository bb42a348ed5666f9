use super::Action;
use crate::error::DreamerError;
use ndarray::Array1;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A box of continuous actions.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ActionSpace {
    low: Vec<f32>,
    high: Vec<f32>,
}

impl ActionSpace {
    /// Creates an action space from elementwise bounds.
    pub fn new(low: Vec<f32>, high: Vec<f32>) -> Result<Self, DreamerError> {
        if low.is_empty() || low.len() != high.len() {
            return Err(DreamerError::InvalidActionSpace(format!(
                "low has {} elements, high has {}",
                low.len(),
                high.len()
            )));
        }
        if low.iter().zip(high.iter()).any(|(l, h)| !(l <= h)) {
            return Err(DreamerError::InvalidActionSpace(
                "low must not exceed high".to_string(),
            ));
        }
        Ok(Self { low, high })
    }

    /// A box `[-1, 1]^dim`.
    pub fn symmetric(dim: usize) -> Result<Self, DreamerError> {
        Self::new(vec![-1.0; dim], vec![1.0; dim])
    }

    /// Shape of an action.
    pub fn shape(&self) -> [usize; 1] {
        [self.low.len()]
    }

    /// Dimension of an action.
    pub fn dim(&self) -> usize {
        self.low.len()
    }

    /// Lower bounds.
    pub fn low(&self) -> &[f32] {
        &self.low
    }

    /// Upper bounds.
    pub fn high(&self) -> &[f32] {
        &self.high
    }

    /// Draws an action uniformly from the box.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Action {
        self.low
            .iter()
            .zip(self.high.iter())
            .map(|(&l, &h)| if l < h { rng.gen_range(l..h) } else { l })
            .collect::<Array1<f32>>()
    }

    /// Checks the dimension of an action.
    pub fn check(&self, act: &Action) -> Result<(), DreamerError> {
        if act.len() != self.dim() {
            return Err(DreamerError::InvalidAction {
                expected: self.dim(),
                got: act.len(),
            });
        }
        Ok(())
    }

    /// Clips an action into the box.
    pub fn clip(&self, act: &Action) -> Action {
        act.iter()
            .zip(self.low.iter().zip(self.high.iter()))
            .map(|(&a, (&l, &h))| a.max(l).min(h))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_sample_within_bounds() {
        let space = ActionSpace::new(vec![-1.0, 0.0], vec![1.0, 2.0]).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let a = space.sample(&mut rng);
            assert_eq!(a.len(), 2);
            assert!((-1.0..1.0).contains(&a[0]));
            assert!((0.0..2.0).contains(&a[1]));
        }
    }

    #[test]
    fn test_invalid_bounds() {
        assert!(ActionSpace::new(vec![1.0], vec![-1.0]).is_err());
        assert!(ActionSpace::new(vec![0.0, 0.0], vec![1.0]).is_err());
        assert!(ActionSpace::new(vec![], vec![]).is_err());
    }
}
