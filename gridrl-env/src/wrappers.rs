//! Environment wrappers for common transformations

use async_trait::async_trait;

use gridrl_core::{
    ActionSpace, Environment, ObservationSpace, Result, Reward, StateSpace, Step, StepInfo,
    VectorObservation,
};

/// Wrapper that modifies rewards
pub struct RewardWrapper<E, F> {
    /// Inner environment
    pub env: E,
    /// Reward transformation function
    pub reward_fn: F,
}

#[async_trait]
impl<E, F> Environment for RewardWrapper<E, F>
where
    E: Environment,
    F: Fn(Reward, &Step<E::Observation, E::State>) -> Reward + Send + Sync,
{
    type Observation = E::Observation;
    type Action = E::Action;
    type State = E::State;

    fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Self::Observation>> {
        self.env.observation_space()
    }

    fn action_space(&self) -> Box<dyn ActionSpace<Action = Self::Action>> {
        self.env.action_space()
    }

    fn state_space(&self) -> Option<Box<dyn StateSpace<State = Self::State>>> {
        self.env.state_space()
    }

    fn state_labels(&self) -> Vec<String> {
        self.env.state_labels()
    }

    fn state_variable(&self, name: &str) -> Result<f64> {
        self.env.state_variable(name)
    }

    async fn reset(&mut self) -> Result<(Self::Observation, StepInfo)> {
        self.env.reset().await
    }

    async fn step(&mut self, action: Self::Action) -> Result<Step<Self::Observation, Self::State>> {
        let mut step = self.env.step(action).await?;
        step.reward = (self.reward_fn)(step.reward, &step);
        Ok(step)
    }

    async fn close(&mut self) -> Result<()> {
        self.env.close().await
    }
}

/// Time limit wrapper
pub struct TimeLimit<E> {
    /// Inner environment
    pub env: E,
    /// Maximum steps
    pub max_steps: usize,
    /// Current step count
    pub steps: usize,
}

impl<E> TimeLimit<E> {
    /// Create a new time limit wrapper
    pub fn new(env: E, max_steps: usize) -> Self {
        Self {
            env,
            max_steps,
            steps: 0,
        }
    }
}

#[async_trait]
impl<E> Environment for TimeLimit<E>
where
    E: Environment,
{
    type Observation = E::Observation;
    type Action = E::Action;
    type State = E::State;

    fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Self::Observation>> {
        self.env.observation_space()
    }

    fn action_space(&self) -> Box<dyn ActionSpace<Action = Self::Action>> {
        self.env.action_space()
    }

    fn state_space(&self) -> Option<Box<dyn StateSpace<State = Self::State>>> {
        self.env.state_space()
    }

    fn state_labels(&self) -> Vec<String> {
        self.env.state_labels()
    }

    fn state_variable(&self, name: &str) -> Result<f64> {
        self.env.state_variable(name)
    }

    async fn reset(&mut self) -> Result<(Self::Observation, StepInfo)> {
        self.steps = 0;
        self.env.reset().await
    }

    async fn step(&mut self, action: Self::Action) -> Result<Step<Self::Observation, Self::State>> {
        self.steps += 1;
        let mut step = self.env.step(action).await?;

        if self.steps >= self.max_steps && !step.done {
            step.truncated = true;
            step.done = true;
        }

        Ok(step)
    }

    async fn close(&mut self) -> Result<()> {
        self.env.close().await
    }
}

/// Observation standardization wrapper
///
/// Keeps a running mean and standard deviation per observation entry and
/// returns standardized, clipped observations.
pub struct Normalize<E> {
    /// Inner environment
    pub env: E,
    /// Running mean
    pub mean: Vec<f64>,
    /// Running std
    pub std: Vec<f64>,
    /// Update statistics
    pub update_stats: bool,
    /// Clip range
    pub clip_range: Option<(f64, f64)>,
}

impl<E> Normalize<E> {
    /// Create a new normalization wrapper
    pub fn new(env: E, obs_dim: usize) -> Self {
        Self {
            env,
            mean: vec![0.0; obs_dim],
            std: vec![1.0; obs_dim],
            update_stats: true,
            clip_range: Some((-5.0, 5.0)),
        }
    }

    /// Update running statistics
    pub fn update(&mut self, obs: &[f64]) {
        if !self.update_stats || obs.len() != self.mean.len() {
            return;
        }

        // exponential running update
        for i in 0..obs.len() {
            let delta = obs[i] - self.mean[i];
            self.mean[i] += delta * 0.01;
            self.std[i] = (self.std[i].powi(2) * 0.99 + delta.powi(2) * 0.01).sqrt();
        }
    }

    /// Standardize an observation
    #[must_use]
    pub fn normalize(&self, obs: &[f64]) -> Vec<f64> {
        let mut normalized = Vec::with_capacity(obs.len());

        for i in 0..obs.len() {
            let z = (obs[i] - self.mean[i]) / (self.std[i] + 1e-8);
            let z = if let Some((min, max)) = self.clip_range {
                z.clamp(min, max)
            } else {
                z
            };
            normalized.push(z);
        }

        normalized
    }
}

#[async_trait]
impl<E> Environment for Normalize<E>
where
    E: Environment<Observation = VectorObservation>,
{
    type Observation = VectorObservation;
    type Action = E::Action;
    type State = E::State;

    fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Self::Observation>> {
        self.env.observation_space()
    }

    fn action_space(&self) -> Box<dyn ActionSpace<Action = Self::Action>> {
        self.env.action_space()
    }

    fn state_space(&self) -> Option<Box<dyn StateSpace<State = Self::State>>> {
        self.env.state_space()
    }

    fn state_labels(&self) -> Vec<String> {
        self.env.state_labels()
    }

    fn state_variable(&self, name: &str) -> Result<f64> {
        self.env.state_variable(name)
    }

    async fn reset(&mut self) -> Result<(Self::Observation, StepInfo)> {
        let (obs, info) = self.env.reset().await?;
        self.update(&obs.data);
        Ok((VectorObservation { data: self.normalize(&obs.data) }, info))
    }

    async fn step(&mut self, action: Self::Action) -> Result<Step<Self::Observation, Self::State>> {
        let mut step = self.env.step(action).await?;
        self.update(&step.observation.data);
        step.observation = VectorObservation {
            data: self.normalize(&step.observation.data),
        };
        Ok(step)
    }

    async fn close(&mut self) -> Result<()> {
        self.env.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flex::{FlexConfig, FlexEnv};
    use gridrl_core::{DiscreteAction, VectorState};

    fn flex_env() -> FlexEnv {
        FlexEnv::with_example_profile(FlexConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn time_limit_truncates() {
        let mut env = TimeLimit::new(flex_env(), 5);
        env.reset().await.unwrap();

        for _ in 0..4 {
            let step = env.step(DiscreteAction(2)).await.unwrap();
            assert!(!step.done);
        }
        let step = env.step(DiscreteAction(2)).await.unwrap();
        assert!(step.done);
        assert!(step.truncated);
    }

    #[tokio::test]
    async fn time_limit_resets_counter() {
        let mut env = TimeLimit::new(flex_env(), 2);
        env.reset().await.unwrap();
        env.step(DiscreteAction(2)).await.unwrap();
        env.reset().await.unwrap();

        let step = env.step(DiscreteAction(2)).await.unwrap();
        assert!(!step.done);
    }

    #[tokio::test]
    async fn reward_wrapper_transforms_reward() {
        let mut env = RewardWrapper {
            env: flex_env(),
            reward_fn: |reward: Reward, _step: &Step<VectorObservation, VectorState>| reward * 2.0,
        };
        env.reset().await.unwrap();

        let step = env.step(DiscreteAction(0)).await.unwrap();
        let raw = env.env.cycle().power() * 28.0 / 12.0;
        assert_eq!(step.reward.0, raw * 2.0);
    }

    #[tokio::test]
    async fn normalize_clips_observations() {
        let mut env = Normalize::new(flex_env(), 6);
        let (obs, _) = env.reset().await.unwrap();
        assert_eq!(obs.data.len(), 6);

        for _ in 0..10 {
            let step = env.step(DiscreteAction(2)).await.unwrap();
            for value in step.observation.data {
                assert!(value.is_finite());
                assert!((-5.0..=5.0).contains(&value));
            }
        }
    }
}
