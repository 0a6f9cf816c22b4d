//! Random agent for baseline comparisons

use async_trait::async_trait;

use gridrl_core::{
    ActionSpace, Agent, AgentConfig, AgentMetrics, Observation, Policy, RandomPolicy, Result,
};

/// Random agent that selects actions uniformly at random
pub struct RandomAgent<O, A> {
    /// Configuration
    config: AgentConfig,
    /// Random policy
    policy: RandomPolicy<O, A>,
    /// Steps observed
    steps: usize,
}

impl<O, A> RandomAgent<O, A>
where
    O: Observation,
    A: ActionSpace,
{
    /// Create a new random agent over an action space
    pub fn new(action_space: A) -> Self {
        Self {
            config: AgentConfig::default(),
            policy: RandomPolicy::new(action_space),
            steps: 0,
        }
    }
}

#[async_trait]
impl<O, A> Agent for RandomAgent<O, A>
where
    O: Observation,
    A: ActionSpace + Send + Sync + 'static,
    A::Action: Send,
{
    type Observation = O;
    type Action = A::Action;

    async fn act(&self, observation: &Self::Observation) -> Result<Self::Action> {
        self.policy.act(observation).await
    }

    async fn observe(
        &mut self,
        _transition: &gridrl_core::Transition<Self::Observation, Self::Action>,
    ) -> Result<()> {
        // nothing to learn, but keep the step count honest
        self.steps += 1;
        Ok(())
    }

    async fn save(&self, path: &std::path::Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.config)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    async fn load(&mut self, path: &std::path::Path) -> Result<()> {
        let json = tokio::fs::read_to_string(path).await?;
        self.config = serde_json::from_str(&json)?;
        Ok(())
    }

    fn metrics(&self) -> AgentMetrics {
        AgentMetrics {
            total_steps: self.steps,
            ..AgentMetrics::default()
        }
    }
}
