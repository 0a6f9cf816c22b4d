//! Deep Q-Network (DQN) agent
//!
//! Q-learning over a small multi-layer perceptron: experience replay with
//! uniform sampling, epsilon-greedy exploration decayed over a fraction of
//! the total step budget, a polyak-averaged target network and an optional
//! double-Q target.

use async_trait::async_trait;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use gridrl_core::{
    Agent, AgentConfig, AgentMetrics, DiscreteAction, DiscreteSpace, ActionSpace, Learning,
    Result, Transition, VectorObservation,
};

use crate::buffer::ReplayBuffer;
use crate::schedule::{polyak_update, LinearSchedule, Schedule};

/// DQN-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DQNConfig {
    /// Base agent configuration
    #[serde(flatten)]
    pub base: AgentConfig,
    /// Polyak averaging coefficient for target network updates
    pub tau: f64,
    /// Hidden layer sizes of the Q-network
    pub layers: Vec<usize>,
    /// Initial exploration rate
    pub epsilon_start: f64,
    /// Final exploration rate
    pub epsilon_end: f64,
    /// Fraction of `total_steps` over which epsilon decays
    pub epsilon_decay_fraction: f64,
    /// Total step budget of the experiment
    pub total_steps: usize,
    /// Use the double-Q target
    pub double_q: bool,
}

impl Default for DQNConfig {
    fn default() -> Self {
        Self {
            base: AgentConfig::default(),
            tau: 0.001,
            layers: vec![10, 10, 10],
            epsilon_start: 1.0,
            epsilon_end: 0.05,
            epsilon_decay_fraction: 0.3,
            total_steps: 100_000,
            double_q: true,
        }
    }
}

/// Multi-layer perceptron mapping observations to one Q-value per action
///
/// Hidden layers use tanh, the output layer is linear.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QNetwork {
    weights: Vec<Array2<f64>>,
    biases: Vec<Array1<f64>>,
}

impl QNetwork {
    /// Create a network with Xavier-initialized weights
    #[must_use]
    pub fn new(input_dim: usize, hidden: &[usize], output_dim: usize) -> Self {
        let mut weights = Vec::with_capacity(hidden.len() + 1);
        let mut biases = Vec::with_capacity(hidden.len() + 1);

        let mut prev_dim = input_dim;
        for &dim in hidden.iter().chain(std::iter::once(&output_dim)) {
            weights.push(Self::xavier_init(prev_dim, dim));
            biases.push(Array1::zeros(dim));
            prev_dim = dim;
        }

        Self { weights, biases }
    }

    fn xavier_init(in_dim: usize, out_dim: usize) -> Array2<f64> {
        use rand::Rng;
        let limit = (6.0 / (in_dim + out_dim) as f64).sqrt();
        let mut rng = rand::thread_rng();
        Array2::from_shape_fn((in_dim, out_dim), |_| rng.gen_range(-limit..limit))
    }

    /// Q-values for an observation
    #[must_use]
    pub fn forward(&self, input: &Array1<f64>) -> Array1<f64> {
        self.forward_cached(input).1
    }

    /// Forward pass keeping the input of every layer for backpropagation
    fn forward_cached(&self, input: &Array1<f64>) -> (Vec<Array1<f64>>, Array1<f64>) {
        let n_hidden = self.weights.len() - 1;
        let mut activations = Vec::with_capacity(n_hidden + 1);
        activations.push(input.clone());

        let mut current = input.clone();
        for i in 0..n_hidden {
            current = (current.dot(&self.weights[i]) + &self.biases[i]).mapv(f64::tanh);
            activations.push(current.clone());
        }
        let output = current.dot(&self.weights[n_hidden]) + &self.biases[n_hidden];

        (activations, output)
    }

    /// Gradients of the squared TD error on one action, plus the loss
    fn backward(
        &self,
        input: &Array1<f64>,
        action: usize,
        target: f64,
    ) -> (Vec<Array2<f64>>, Vec<Array1<f64>>, f64) {
        let (activations, output) = self.forward_cached(input);
        let td_error = output[action] - target;
        let loss = td_error * td_error;

        let n_layers = self.weights.len();
        let (mut grad_w, mut grad_b) = self.zeroed_gradients();

        let mut delta = Array1::zeros(output.len());
        delta[action] = 2.0 * td_error;

        for layer in (0..n_layers).rev() {
            let layer_input = &activations[layer];
            grad_w[layer] = layer_input
                .clone()
                .insert_axis(Axis(1))
                .dot(&delta.clone().insert_axis(Axis(0)));
            grad_b[layer] = delta.clone();

            if layer > 0 {
                // propagate through the tanh that produced this layer's input
                let back = self.weights[layer].dot(&delta);
                delta = back * layer_input.mapv(|a| 1.0 - a * a);
            }
        }

        (grad_w, grad_b, loss)
    }

    fn zeroed_gradients(&self) -> (Vec<Array2<f64>>, Vec<Array1<f64>>) {
        (
            self.weights.iter().map(|w| Array2::zeros(w.raw_dim())).collect(),
            self.biases.iter().map(|b| Array1::zeros(b.raw_dim())).collect(),
        )
    }

    fn apply_gradients(&mut self, grad_w: &[Array2<f64>], grad_b: &[Array1<f64>], lr: f64) {
        for (w, gw) in self.weights.iter_mut().zip(grad_w) {
            *w -= &(gw * lr);
        }
        for (b, gb) in self.biases.iter_mut().zip(grad_b) {
            *b -= &(gb * lr);
        }
    }

    fn polyak_from(&mut self, source: &Self, tau: f64) {
        for (t, s) in self.weights.iter_mut().zip(&source.weights) {
            t.zip_mut_with(s, |t_val, &s_val| *t_val = polyak_update(*t_val, s_val, tau));
        }
        for (t, s) in self.biases.iter_mut().zip(&source.biases) {
            t.zip_mut_with(s, |t_val, &s_val| *t_val = polyak_update(*t_val, s_val, tau));
        }
    }
}

fn argmax(values: &Array1<f64>) -> usize {
    let mut best = 0;
    for (i, &value) in values.iter().enumerate() {
        if value > values[best] {
            best = i;
        }
    }
    best
}

#[derive(Serialize, Deserialize)]
struct DQNSnapshot {
    config: DQNConfig,
    online: QNetwork,
    target: QNetwork,
    steps: usize,
}

/// DQN agent over a discrete action space
pub struct DQNAgent {
    config: DQNConfig,
    online: QNetwork,
    target: QNetwork,
    buffer: ReplayBuffer<VectorObservation, DiscreteAction>,
    epsilon: LinearSchedule,
    action_space: DiscreteSpace,
    steps: usize,
    training: bool,
    last_loss: Option<f64>,
}

impl DQNAgent {
    /// Create a new DQN agent for the given observation and action sizes
    #[must_use]
    pub fn new(observation_dim: usize, n_actions: usize, config: DQNConfig) -> Self {
        let online = QNetwork::new(observation_dim, &config.layers, n_actions);
        let target = online.clone();
        let epsilon = LinearSchedule::over_fraction(
            config.epsilon_start,
            config.epsilon_end,
            config.total_steps,
            config.epsilon_decay_fraction,
        );
        let buffer = ReplayBuffer::new(config.base.buffer_size);

        Self {
            config,
            online,
            target,
            buffer,
            epsilon,
            action_space: DiscreteSpace::new(n_actions),
            steps: 0,
            training: true,
            last_loss: None,
        }
    }

    /// Current exploration rate
    #[must_use]
    pub fn epsilon(&self) -> f64 {
        self.epsilon.value(self.steps)
    }

    fn greedy_action(&self, observation: &VectorObservation) -> DiscreteAction {
        let input = Array1::from(observation.data.clone());
        DiscreteAction(argmax(&self.online.forward(&input)))
    }

    /// One gradient step on a sampled batch, if the buffer is deep enough
    fn train_batch(&mut self) -> Option<f64> {
        let batch = self.buffer.sample(self.config.base.batch_size)?;

        let (mut acc_w, mut acc_b) = self.online.zeroed_gradients();
        let mut total_loss = 0.0;

        for transition in &batch {
            let input = Array1::from(transition.observation.data.clone());
            let next_input = Array1::from(transition.next_observation.data.clone());

            let target_value = if transition.done {
                transition.reward.0
            } else {
                let next_q = self.target.forward(&next_input);
                let next_value = if self.config.double_q {
                    next_q[argmax(&self.online.forward(&next_input))]
                } else {
                    next_q.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b))
                };
                transition.reward.0 + self.config.base.discount * next_value
            };

            let (grad_w, grad_b, loss) =
                self.online.backward(&input, transition.action.0, target_value);
            for (acc, grad) in acc_w.iter_mut().zip(&grad_w) {
                *acc += grad;
            }
            for (acc, grad) in acc_b.iter_mut().zip(&grad_b) {
                *acc += grad;
            }
            total_loss += loss;
        }

        let batch_len = batch.len() as f64;
        self.online
            .apply_gradients(&acc_w, &acc_b, self.config.base.learning_rate / batch_len);
        self.target.polyak_from(&self.online, self.config.tau);

        let loss = total_loss / batch_len;
        self.last_loss = Some(loss);
        Some(loss)
    }
}

#[async_trait]
impl Agent for DQNAgent {
    type Observation = VectorObservation;
    type Action = DiscreteAction;

    async fn act(&self, observation: &Self::Observation) -> Result<Self::Action> {
        let explore = {
            use rand::Rng;
            self.training && rand::thread_rng().gen::<f64>() < self.epsilon()
        };

        if explore {
            Ok(self.action_space.sample())
        } else {
            Ok(self.greedy_action(observation))
        }
    }

    async fn observe(
        &mut self,
        transition: &Transition<Self::Observation, Self::Action>,
    ) -> Result<()> {
        self.steps += 1;
        self.buffer.push(transition.clone());

        if self.training {
            if let Some(loss) = self.train_batch() {
                tracing::trace!(loss, steps = self.steps, "dqn gradient step");
            }
        }

        Ok(())
    }

    async fn save(&self, path: &std::path::Path) -> Result<()> {
        let snapshot = DQNSnapshot {
            config: self.config.clone(),
            online: self.online.clone(),
            target: self.target.clone(),
            steps: self.steps,
        };
        let json = serde_json::to_string_pretty(&snapshot)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    async fn load(&mut self, path: &std::path::Path) -> Result<()> {
        let json = tokio::fs::read_to_string(path).await?;
        let snapshot: DQNSnapshot = serde_json::from_str(&json)?;

        self.epsilon = LinearSchedule::over_fraction(
            snapshot.config.epsilon_start,
            snapshot.config.epsilon_end,
            snapshot.config.total_steps,
            snapshot.config.epsilon_decay_fraction,
        );
        self.config = snapshot.config;
        self.online = snapshot.online;
        self.target = snapshot.target;
        self.steps = snapshot.steps;

        Ok(())
    }

    fn metrics(&self) -> AgentMetrics {
        AgentMetrics {
            total_steps: self.steps,
            loss: self.last_loss,
            ..AgentMetrics::default()
        }
    }
}

#[async_trait]
impl Learning for DQNAgent {
    async fn train_step(&mut self) -> Result<f64> {
        Ok(self.train_batch().unwrap_or(0.0))
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    fn is_training(&self) -> bool {
        self.training
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridrl_core::Reward;

    fn small_config() -> DQNConfig {
        DQNConfig {
            base: AgentConfig {
                learning_rate: 1e-2,
                batch_size: 8,
                buffer_size: 128,
                ..AgentConfig::default()
            },
            layers: vec![8],
            total_steps: 100,
            ..DQNConfig::default()
        }
    }

    #[test]
    fn q_network_output_dim() {
        let net = QNetwork::new(4, &[10, 10], 3);
        let q = net.forward(&Array1::from(vec![0.1, -0.2, 0.3, 0.0]));
        assert_eq!(q.len(), 3);
        assert!(q.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn q_network_fits_a_target() {
        let mut net = QNetwork::new(2, &[8], 3);
        let input = Array1::from(vec![0.5, -0.5]);

        let (_, _, initial_loss) = net.backward(&input, 0, 1.0);
        for _ in 0..200 {
            let (grad_w, grad_b, _) = net.backward(&input, 0, 1.0);
            net.apply_gradients(&grad_w, &grad_b, 0.05);
        }
        let (_, _, final_loss) = net.backward(&input, 0, 1.0);

        assert!(final_loss < initial_loss);
        assert!(final_loss < 1e-2);
    }

    #[test]
    fn polyak_leaves_target_close() {
        let online = QNetwork::new(2, &[4], 2);
        let mut target = QNetwork::new(2, &[4], 2);
        let before = target.forward(&Array1::from(vec![0.1, 0.2]));

        target.polyak_from(&online, 0.001);
        let after = target.forward(&Array1::from(vec![0.1, 0.2]));

        for (b, a) in before.iter().zip(after.iter()) {
            assert!((b - a).abs() < 0.1);
        }
    }

    #[tokio::test]
    async fn act_stays_in_action_space() {
        let agent = DQNAgent::new(3, 3, small_config());
        let obs = VectorObservation {
            data: vec![0.0, 1.0, -1.0],
        };

        for _ in 0..50 {
            let action = agent.act(&obs).await.unwrap();
            assert!(action.0 < 3);
        }
    }

    #[tokio::test]
    async fn observe_trains_once_buffer_fills() {
        let mut agent = DQNAgent::new(2, 2, small_config());

        for i in 0..32 {
            let transition = Transition {
                observation: VectorObservation { data: vec![0.0, f64::from(i)] },
                action: DiscreteAction(usize::from(i % 2 == 0)),
                reward: Reward(1.0),
                next_observation: VectorObservation { data: vec![1.0, f64::from(i)] },
                done: i % 8 == 7,
            };
            agent.observe(&transition).await.unwrap();
        }

        let metrics = agent.metrics();
        assert_eq!(metrics.total_steps, 32);
        let loss = metrics.loss.expect("training never ran");
        assert!(loss.is_finite());

        // exploration decayed from its starting value
        assert!(agent.epsilon() < 1.0);
    }

    #[tokio::test]
    async fn save_load_restores_weights() {
        let agent = DQNAgent::new(2, 2, small_config());
        let path = std::env::temp_dir().join(format!("gridrl-dqn-{}.json", std::process::id()));

        agent.save(&path).await.unwrap();
        let mut restored = DQNAgent::new(2, 2, small_config());
        restored.load(&path).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        let obs = Array1::from(vec![0.3, -0.7]);
        assert_eq!(agent.online.forward(&obs), restored.online.forward(&obs));
    }
}
