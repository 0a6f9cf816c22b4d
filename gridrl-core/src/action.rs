//! Action representations and action spaces

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Trait for actions in an RL environment
pub trait Action: Clone + Debug + Send + Sync {
    /// Convert action to a vector representation
    fn to_vec(&self) -> Vec<f64>;
}

/// Trait for defining action spaces
pub trait ActionSpace: Send + Sync {
    /// The type of actions in this space
    type Action: Action;

    /// Sample a random action from the space
    fn sample(&self) -> Self::Action;

    /// Check if an action is valid within this space
    fn contains(&self, action: &Self::Action) -> bool;

    /// Get the dimensionality of the action space
    fn dim(&self) -> Option<usize>;
}

/// Discrete action (e.g., for discrete action spaces)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiscreteAction(pub usize);

impl Action for DiscreteAction {
    fn to_vec(&self) -> Vec<f64> {
        vec![self.0 as f64]
    }
}

/// Continuous action (e.g., for continuous control)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuousAction(pub Vec<f64>);

impl Action for ContinuousAction {
    fn to_vec(&self) -> Vec<f64> {
        self.0.clone()
    }
}

/// Discrete action space over the choices `low()..=high()`
#[derive(Debug, Clone)]
pub struct DiscreteSpace {
    /// Number of discrete actions
    pub n: usize,
}

impl DiscreteSpace {
    /// Create a new discrete action space
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self { n }
    }

    /// Declared lower bound of the space
    #[must_use]
    pub fn low(&self) -> usize {
        0
    }

    /// Declared upper bound of the space
    #[must_use]
    pub fn high(&self) -> usize {
        self.n.saturating_sub(1)
    }
}

impl ActionSpace for DiscreteSpace {
    type Action = DiscreteAction;

    fn sample(&self) -> Self::Action {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        DiscreteAction(rng.gen_range(0..self.n))
    }

    fn contains(&self, action: &Self::Action) -> bool {
        action.0 < self.n
    }

    fn dim(&self) -> Option<usize> {
        Some(1)
    }
}

/// Continuous action space (box)
#[derive(Debug, Clone)]
pub struct ContinuousSpace {
    /// Lower bounds for each dimension
    pub low: Vec<f64>,
    /// Upper bounds for each dimension
    pub high: Vec<f64>,
}

impl ContinuousSpace {
    /// Create a new continuous action space
    pub fn new(low: Vec<f64>, high: Vec<f64>) -> crate::Result<Self> {
        if low.len() != high.len() {
            return Err(crate::RLError::DimensionMismatch {
                expected: low.len(),
                actual: high.len(),
            });
        }
        Ok(Self { low, high })
    }

    /// Discretize each dimension into `length` evenly spaced values
    #[must_use]
    pub fn discretize(&self, length: usize) -> Vec<Vec<f64>> {
        self.low
            .iter()
            .zip(&self.high)
            .map(|(&l, &h)| {
                if length <= 1 {
                    return vec![l];
                }
                let step = (h - l) / (length - 1) as f64;
                (0..length).map(|i| l + step * i as f64).collect()
            })
            .collect()
    }
}

impl ActionSpace for ContinuousSpace {
    type Action = ContinuousAction;

    fn sample(&self) -> Self::Action {
        use rand::Rng;
        let mut rng = rand::thread_rng();

        let values: Vec<f64> = self.low.iter()
            .zip(&self.high)
            .map(|(l, h)| rng.gen_range(*l..=*h))
            .collect();

        ContinuousAction(values)
    }

    fn contains(&self, action: &Self::Action) -> bool {
        action.0.len() == self.low.len() &&
        action.0.iter()
            .zip(&self.low)
            .zip(&self.high)
            .all(|((x, l), h)| x >= l && x <= h)
    }

    fn dim(&self) -> Option<usize> {
        Some(self.low.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discrete_bounds() {
        let space = DiscreteSpace::new(3);
        assert_eq!(space.low(), 0);
        assert_eq!(space.high(), 2);
        assert!(space.contains(&DiscreteAction(2)));
        assert!(!space.contains(&DiscreteAction(3)));
    }

    #[test]
    fn continuous_discretize() {
        let space = ContinuousSpace::new(vec![-2.0], vec![2.0]).unwrap();
        let grid = space.discretize(5);
        assert_eq!(grid, vec![vec![-2.0, -1.0, 0.0, 1.0, 2.0]]);
    }

    #[test]
    fn continuous_sample_in_bounds() {
        let space = ContinuousSpace::new(vec![-1.0, 0.0], vec![1.0, 10.0]).unwrap();
        for _ in 0..100 {
            let action = space.sample();
            assert!(space.contains(&action));
        }
    }
}
