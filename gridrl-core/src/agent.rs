//! Agent traits and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Action, Observation, Transition};

/// Configuration for agents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Learning rate
    pub learning_rate: f64,
    /// Discount factor
    pub discount: f64,
    /// Batch size for training
    pub batch_size: usize,
    /// Buffer size for experience replay
    pub buffer_size: usize,
    /// Additional parameters
    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1e-4,
            discount: 0.97,
            batch_size: 32,
            buffer_size: 10000,
            params: serde_json::Map::new(),
        }
    }
}

/// Core agent trait
#[async_trait]
pub trait Agent: Send + Sync {
    /// Observation type
    type Observation: Observation;
    /// Action type
    type Action: Action;

    /// Select an action given an observation
    async fn act(&self, observation: &Self::Observation) -> crate::Result<Self::Action>;

    /// Process a transition from the environment (for learning)
    async fn observe(
        &mut self,
        _transition: &Transition<Self::Observation, Self::Action>,
    ) -> crate::Result<()> {
        Ok(())
    }

    /// Save the agent
    async fn save(&self, path: &std::path::Path) -> crate::Result<()>;

    /// Load the agent
    async fn load(&mut self, path: &std::path::Path) -> crate::Result<()>;

    /// Get agent metrics
    fn metrics(&self) -> AgentMetrics {
        AgentMetrics::default()
    }
}

/// Agent metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentMetrics {
    /// Total steps taken
    pub total_steps: usize,
    /// Total episodes
    pub total_episodes: usize,
    /// Average reward per episode
    pub avg_episode_reward: f64,
    /// Loss value
    pub loss: Option<f64>,
    /// Additional metrics
    #[serde(flatten)]
    pub custom: serde_json::Map<String, serde_json::Value>,
}

/// Trait for agents that can learn
#[async_trait]
pub trait Learning: Agent {
    /// Train the agent for one step, returning the loss
    async fn train_step(&mut self) -> crate::Result<f64>;

    /// Train the agent for multiple steps
    async fn train(&mut self, steps: usize) -> crate::Result<Vec<f64>> {
        let mut losses = Vec::with_capacity(steps);
        for _ in 0..steps {
            losses.push(self.train_step().await?);
        }
        Ok(losses)
    }

    /// Set training mode
    fn set_training(&mut self, training: bool);

    /// Check if in training mode
    fn is_training(&self) -> bool;
}
