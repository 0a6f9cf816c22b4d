//! Reinforcement learning agents for the gridrl environments
//!
//! This crate provides the agents used by the experiment programs:
//! - A random baseline agent
//! - A DQN agent with experience replay and a polyak-averaged target network

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod buffer;
pub mod dqn;
pub mod random;
pub mod schedule;

// Re-export agents
pub use dqn::{DQNAgent, DQNConfig, QNetwork};
pub use random::RandomAgent;

// Re-export utilities
pub use buffer::ReplayBuffer;
pub use schedule::{polyak_update, ExponentialSchedule, LinearSchedule, RunningMeanStd, Schedule};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{DQNAgent, DQNConfig, RandomAgent, ReplayBuffer};
    pub use gridrl_core::prelude::*;
}
