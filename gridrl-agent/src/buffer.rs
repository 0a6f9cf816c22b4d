//! Experience replay buffer for RL agents

use rand::seq::SliceRandom;
use std::collections::VecDeque;

use gridrl_core::Transition;

/// Deque-backed replay buffer with uniform sampling
///
/// The oldest transitions fall out once the buffer is at capacity.
#[derive(Debug, Clone)]
pub struct ReplayBuffer<O, A> {
    /// Buffer storage
    buffer: VecDeque<Transition<O, A>>,
    /// Maximum capacity
    capacity: usize,
}

impl<O, A> ReplayBuffer<O, A>
where
    O: Clone,
    A: Clone,
{
    /// Create a new replay buffer
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Add a transition to the buffer
    pub fn push(&mut self, transition: Transition<O, A>) {
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(transition);
    }

    /// Sample a batch of transitions uniformly at random
    ///
    /// Returns `None` until the buffer holds at least `batch_size`
    /// transitions.
    pub fn sample(&self, batch_size: usize) -> Option<Vec<Transition<O, A>>> {
        if self.buffer.len() < batch_size {
            return None;
        }

        let mut rng = rand::thread_rng();
        let indices: Vec<usize> = (0..self.buffer.len()).collect();
        let sample_indices = indices.choose_multiple(&mut rng, batch_size);

        let batch: Vec<_> = sample_indices
            .map(|&i| self.buffer[i].clone())
            .collect();

        Some(batch)
    }

    /// Get the current size of the buffer
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if buffer is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridrl_core::Reward;

    fn transition(id: f64) -> Transition<f64, usize> {
        Transition {
            observation: id,
            action: 0,
            reward: Reward(0.0),
            next_observation: id + 1.0,
            done: false,
        }
    }

    #[test]
    fn capacity_evicts_oldest() {
        let mut buffer = ReplayBuffer::new(3);
        for i in 0..5 {
            buffer.push(transition(f64::from(i)));
        }

        assert_eq!(buffer.len(), 3);
        // oldest two transitions were evicted
        let batch = buffer.sample(3).unwrap();
        assert!(batch.iter().all(|t| t.observation >= 2.0));
    }

    #[test]
    fn sample_requires_enough_transitions() {
        let mut buffer = ReplayBuffer::new(10);
        buffer.push(transition(0.0));

        assert!(buffer.sample(2).is_none());
        buffer.push(transition(1.0));
        assert_eq!(buffer.sample(2).unwrap().len(), 2);
    }

    #[test]
    fn clear_empties_buffer() {
        let mut buffer = ReplayBuffer::new(4);
        buffer.push(transition(0.0));
        buffer.clear();
        assert!(buffer.is_empty());
    }
}
