//! Policy abstractions for action selection

use async_trait::async_trait;
use std::marker::PhantomData;

use crate::{Action, ActionSpace, Observation};

/// Core policy trait for selecting actions
#[async_trait]
pub trait Policy: Send + Sync {
    /// Observation type
    type Observation: Observation;
    /// Action type
    type Action: Action;

    /// Select an action given an observation
    async fn act(&self, observation: &Self::Observation) -> crate::Result<Self::Action>;

    /// Update the policy (for learnable policies)
    async fn update(&mut self) -> crate::Result<()> {
        Ok(())
    }
}

/// Epsilon-greedy policy wrapper
pub struct EpsilonGreedy<P, A> {
    /// Base policy
    pub policy: P,
    /// Exploration rate
    pub epsilon: f64,
    /// Action space for random sampling
    pub action_space: A,
}

impl<P, A> EpsilonGreedy<P, A> {
    /// Create a new epsilon-greedy policy
    pub fn new(policy: P, epsilon: f64, action_space: A) -> Self {
        Self {
            policy,
            epsilon,
            action_space,
        }
    }

    /// Set the exploration rate
    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.epsilon = epsilon.clamp(0.0, 1.0);
    }
}

#[async_trait]
impl<P, A> Policy for EpsilonGreedy<P, A>
where
    P: Policy,
    A: ActionSpace<Action = P::Action> + Send + Sync,
{
    type Observation = P::Observation;
    type Action = P::Action;

    async fn act(&self, observation: &Self::Observation) -> crate::Result<Self::Action> {
        let explore = {
            use rand::Rng;
            rand::thread_rng().gen::<f64>() < self.epsilon
        };

        if explore {
            Ok(self.action_space.sample())
        } else {
            self.policy.act(observation).await
        }
    }

    async fn update(&mut self) -> crate::Result<()> {
        self.policy.update().await
    }
}

/// Random policy that always selects random actions
pub struct RandomPolicy<O, A> {
    /// Action space
    pub action_space: A,
    _obs: PhantomData<fn() -> O>,
}

impl<O, A> RandomPolicy<O, A> {
    /// Create a new random policy
    pub fn new(action_space: A) -> Self {
        Self {
            action_space,
            _obs: PhantomData,
        }
    }
}

#[async_trait]
impl<O, A> Policy for RandomPolicy<O, A>
where
    O: Observation,
    A: ActionSpace + Send + Sync,
{
    type Observation = O;
    type Action = A::Action;

    async fn act(&self, _observation: &Self::Observation) -> crate::Result<Self::Action> {
        Ok(self.action_space.sample())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DiscreteAction, DiscreteSpace, VectorObservation};

    struct Always(usize);

    #[async_trait]
    impl Policy for Always {
        type Observation = VectorObservation;
        type Action = DiscreteAction;

        async fn act(&self, _observation: &Self::Observation) -> crate::Result<Self::Action> {
            Ok(DiscreteAction(self.0))
        }
    }

    #[tokio::test]
    async fn epsilon_zero_is_greedy() {
        let policy = EpsilonGreedy::new(Always(1), 0.0, DiscreteSpace::new(3));
        let obs = VectorObservation { data: vec![0.0] };

        for _ in 0..20 {
            let action = policy.act(&obs).await.unwrap();
            assert_eq!(action, DiscreteAction(1));
        }
    }

    #[tokio::test]
    async fn epsilon_one_stays_in_space() {
        let policy = EpsilonGreedy::new(Always(1), 1.0, DiscreteSpace::new(3));
        let obs = VectorObservation { data: vec![0.0] };

        for _ in 0..20 {
            let action = policy.act(&obs).await.unwrap();
            assert!(action.0 < 3);
        }
    }

    #[tokio::test]
    async fn random_policy_samples_space() {
        let policy: RandomPolicy<VectorObservation, _> = RandomPolicy::new(DiscreteSpace::new(4));
        let obs = VectorObservation { data: vec![0.0] };

        let action = policy.act(&obs).await.unwrap();
        assert!(action.0 < 4);
    }
}
