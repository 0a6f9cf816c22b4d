//! Transitions and episode trajectories

use serde::{Deserialize, Serialize};

use crate::Reward;

/// Single transition in a trajectory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition<O, A> {
    /// Current observation
    pub observation: O,
    /// Action taken
    pub action: A,
    /// Reward received
    pub reward: Reward,
    /// Next observation
    pub next_observation: O,
    /// Whether episode ended
    pub done: bool,
}

/// Complete trajectory of an episode
#[derive(Debug, Clone)]
pub struct Trajectory<O, A> {
    /// Sequence of transitions
    pub transitions: Vec<Transition<O, A>>,
    /// Total reward
    pub total_reward: f64,
    /// Episode ID
    pub episode_id: String,
}

impl<O, A> Trajectory<O, A> {
    /// Create a new empty trajectory
    pub fn new(episode_id: String) -> Self {
        Self {
            transitions: Vec::new(),
            total_reward: 0.0,
            episode_id,
        }
    }

    /// Add a transition to the trajectory
    pub fn push(&mut self, transition: Transition<O, A>) {
        self.total_reward += transition.reward.0;
        self.transitions.push(transition);
    }

    /// Get the length of the trajectory
    #[must_use]
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    /// Check if trajectory is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Compute returns (cumulative discounted rewards)
    #[must_use]
    pub fn returns(&self, discount: f64) -> Vec<f64> {
        let mut returns = vec![0.0; self.len()];
        let mut running_return = 0.0;

        for i in (0..self.len()).rev() {
            if self.transitions[i].done {
                running_return = 0.0;
            }
            running_return = self.transitions[i].reward.0 + discount * running_return;
            returns[i] = running_return;
        }

        returns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transition(reward: f64, done: bool) -> Transition<(), ()> {
        Transition {
            observation: (),
            action: (),
            reward: Reward(reward),
            next_observation: (),
            done,
        }
    }

    #[test]
    fn returns_discount() {
        let mut trajectory = Trajectory::new("test".into());
        trajectory.push(transition(1.0, false));
        trajectory.push(transition(1.0, false));
        trajectory.push(transition(1.0, true));

        let returns = trajectory.returns(0.5);
        assert_eq!(returns, vec![1.75, 1.5, 1.0]);
        assert_eq!(trajectory.total_reward, 3.0);
    }
}
