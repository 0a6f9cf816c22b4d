//! Flexibility asset environment
//!
//! Models an energy-consuming asset that an agent can command into a
//! consumption-reduction cycle. The asset moves through four modes, in
//! order: available, reduction (flex down), penalty (flex up) and
//! relaxation, then becomes available again.
//!
//! A reduction cycle runs until the agent stops it or `max_flex_time` is
//! reached. The penalty cycle that follows lasts exactly as long as the
//! reduction cycle it compensates for, and the relaxation period has the
//! fixed length `relax_time`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use gridrl_core::{
    BoxObservationSpace, DiscreteAction, DiscreteSpace, Environment, Reward, RLError, Result,
    Step, StepInfo, Terminal, VectorObservation, VectorState,
};

use crate::profile::{Profile, ELECTRICITY_PRICE_LABEL};

/// Number of 5-minute steps per hour; converts $/MWh prices into $/step
const STEPS_PER_HOUR: f64 = 12.0;

/// Discrete command driving the flexibility asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlexAction {
    /// Start a reduction cycle if available, continue it if running
    StartOrContinue,
    /// End the running reduction cycle
    Stop,
    /// Do nothing
    NoOp,
}

impl FlexAction {
    /// Decode a discrete action, rejecting values outside the declared bounds
    pub fn from_discrete(action: DiscreteAction) -> Result<Self> {
        match action.0 {
            0 => Ok(Self::StartOrContinue),
            1 => Ok(Self::Stop),
            2 => Ok(Self::NoOp),
            n => Err(RLError::InvalidAction(format!(
                "action {n} outside discrete bounds 0..=2"
            ))),
        }
    }
}

/// Configuration for the flexibility environment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlexConfig {
    /// Size of the consumption change in MW
    pub flex_size: f64,
    /// Hard cap on the reduction cycle, in 5-minute steps
    pub max_flex_time: u32,
    /// Length of the relaxation period, in 5-minute steps
    pub relax_time: u32,
}

impl Default for FlexConfig {
    fn default() -> Self {
        Self {
            flex_size: 2.0,
            max_flex_time: 6,
            relax_time: 6,
        }
    }
}

/// Cycle state of the flexibility asset
///
/// Exactly one of `available`, `flex_down > 0`, `flex_up > 0` and
/// `relax > 0` holds between steps. `flex_time` remembers how long the
/// current or just-finished reduction cycle ran; the penalty cycle uses it
/// as its target length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlexCycle {
    /// Whether the asset is idle and may start a reduction cycle
    pub available: bool,
    /// Steps spent in the current reduction cycle (0 = not reducing)
    pub flex_down: u32,
    /// Steps spent in the current penalty cycle (0 = not in penalty)
    pub flex_up: u32,
    /// Steps spent relaxing (0 = not relaxing)
    pub relax: u32,
    /// Recorded length of the reduction cycle, in steps
    pub flex_time: u32,
    /// Size of the consumption change in MW
    flex_size: f64,
    /// Reduction cycle cap, in steps
    max_flex_time: u32,
    /// Relaxation length, in steps
    relax_time: u32,
}

impl FlexCycle {
    /// Fresh cycle state: available, all counters zero
    #[must_use]
    pub fn new(config: &FlexConfig) -> Self {
        Self {
            available: true,
            flex_down: 0,
            flex_up: 0,
            relax: 0,
            flex_time: 0,
            flex_size: config.flex_size,
            max_flex_time: config.max_flex_time,
            relax_time: config.relax_time,
        }
    }

    /// Consumption change of the asset in its current mode, in MW
    #[must_use]
    pub fn power(&self) -> f64 {
        if self.flex_down > 0 {
            -self.flex_size
        } else if self.flex_up > 0 {
            self.flex_size
        } else {
            0.0
        }
    }

    /// Number of simultaneously running cycle counters
    #[must_use]
    pub fn active_modes(&self) -> usize {
        [self.flex_down, self.flex_up, self.relax]
            .iter()
            .filter(|&&counter| counter > 0)
            .count()
    }

    /// Advance the cycle by one 5-minute step
    ///
    /// Pure transition function: consumes the current record and returns the
    /// successor together with the reward earned over the interval. The
    /// reward is the value of the consumption change at `price`, scaled to
    /// the 5-minute interval: reduction steps pay `-flex_size * price / 12`,
    /// penalty steps earn `+flex_size * price / 12`, all other steps are
    /// worth zero.
    ///
    /// Counters are compared against their targets before they advance:
    /// a reduction cycle at `max_flex_time` behaves as if the agent sent
    /// [`FlexAction::Stop`], a penalty cycle that reached `flex_time` hands
    /// over to relaxation, and a relaxation that reached `relax_time` makes
    /// the asset available again.
    #[must_use]
    pub fn step(mut self, action: FlexAction, price: f64) -> (Self, Reward) {
        // the asset cannot reduce past the cap
        let action = if self.flex_down > 0 && self.flex_down == self.max_flex_time {
            FlexAction::Stop
        } else {
            action
        };

        // relaxation runs to its fixed length
        if self.relax > 0 {
            if self.relax == self.relax_time {
                self.relax = 0;
                self.available = true;
            } else {
                self.relax += 1;
            }
        }

        // the penalty cycle runs as long as the reduction cycle did
        if self.flex_up > 0 {
            if self.flex_up == self.flex_time {
                self.flex_up = 0;
                self.flex_time = 0;
                if self.relax_time == 0 {
                    self.available = true;
                } else {
                    self.relax = 1;
                }
            } else {
                self.flex_up += 1;
            }
        }

        // continue the reduction cycle
        if self.flex_down > 0 && action != FlexAction::Stop {
            self.flex_down += 1;
            self.flex_time += 1;
        }

        // start a reduction cycle
        if self.available && action == FlexAction::StartOrContinue {
            self.available = false;
            self.flex_down = 1;
            self.flex_time = 1;
        }

        // stop the reduction cycle; the penalty cycle begins immediately
        if self.flex_down > 0 && action == FlexAction::Stop {
            self.flex_down = 0;
            self.flex_up = 1;
        }

        debug_assert!(self.active_modes() <= 1);
        debug_assert!(self.flex_down <= self.max_flex_time);

        let reward = Reward(self.power() * price / STEPS_PER_HOUR);
        (self, reward)
    }
}

/// Reinforcement learning environment around [`FlexCycle`]
///
/// Each step reads the electricity price from the current profile row,
/// advances the cycle state machine with the agent's command, and returns
/// the profile row plus the cycle counters as the next observation. The
/// episode ends when the profile runs out of rows.
#[derive(Debug)]
pub struct FlexEnv {
    config: FlexConfig,
    cycle: FlexCycle,
    profile: Profile,
    /// Price column, resolved against the profile at construction
    price_index: usize,
    step_index: usize,
}

/// Labels of the cycle counters appended to the profile columns
const CYCLE_LABELS: [&str; 5] = [
    "Availability [0/1]",
    "Flex down cycle [steps]",
    "Flex up cycle [steps]",
    "Relaxation [steps]",
    "Flex down length [steps]",
];

impl FlexEnv {
    /// Create a flexibility environment over a price profile
    ///
    /// Fails with [`RLError::MissingStateVariable`] if the profile lacks the
    /// electricity price column, so a mislabeled profile is caught here
    /// rather than on the first step.
    pub fn new(config: FlexConfig, profile: Profile) -> Result<Self> {
        if config.flex_size <= 0.0 {
            return Err(RLError::Environment(format!(
                "flex_size must be positive, got {}",
                config.flex_size
            )));
        }
        if config.max_flex_time == 0 {
            return Err(RLError::Environment(
                "max_flex_time must be at least one step".into(),
            ));
        }
        if profile.is_empty() {
            return Err(RLError::Environment("profile has no rows".into()));
        }
        let price_index = profile.index_of(ELECTRICITY_PRICE_LABEL)?;
        let cycle = FlexCycle::new(&config);

        Ok(Self {
            config,
            cycle,
            profile,
            price_index,
            step_index: 0,
        })
    }

    /// Create a flexibility environment over the bundled example prices
    pub fn with_example_profile(config: FlexConfig) -> Result<Self> {
        Self::new(config, Profile::example())
    }

    /// The cycle state after the most recent step
    #[must_use]
    pub fn cycle(&self) -> &FlexCycle {
        &self.cycle
    }

    fn current_row(&self) -> &[f64] {
        let index = self.step_index.min(self.profile.len() - 1);
        self.profile.row(index).unwrap_or(&[])
    }

    fn price(&self) -> f64 {
        self.current_row()[self.price_index]
    }

    fn state_vec(&self) -> Vec<f64> {
        let mut data = self.current_row().to_vec();
        data.extend_from_slice(&[
            f64::from(u8::from(self.cycle.available)),
            f64::from(self.cycle.flex_down),
            f64::from(self.cycle.flex_up),
            f64::from(self.cycle.relax),
            f64::from(self.cycle.flex_time),
        ]);
        data
    }

    fn observation(&self) -> VectorObservation {
        VectorObservation {
            data: self.state_vec(),
        }
    }
}

#[async_trait]
impl Environment for FlexEnv {
    type Observation = VectorObservation;
    type Action = DiscreteAction;
    type State = VectorState;

    fn observation_space(&self) -> Box<dyn gridrl_core::ObservationSpace<Observation = Self::Observation>> {
        let (mut low, mut high) = self.profile.bounds();
        let max_flex = f64::from(self.config.max_flex_time);
        low.extend_from_slice(&[0.0; 5]);
        high.extend_from_slice(&[1.0, max_flex, max_flex, f64::from(self.config.relax_time), max_flex]);
        let shape = vec![low.len()];

        Box::new(BoxObservationSpace { low, high, shape })
    }

    fn action_space(&self) -> Box<dyn gridrl_core::ActionSpace<Action = Self::Action>> {
        // 0: start/continue, 1: stop, 2: no-op
        Box::new(DiscreteSpace::new(3))
    }

    fn state_labels(&self) -> Vec<String> {
        let mut labels = self.profile.labels().to_vec();
        labels.extend(CYCLE_LABELS.iter().map(ToString::to_string));
        labels
    }

    fn state_variable(&self, name: &str) -> Result<f64> {
        let labels = self.state_labels();
        let index = labels
            .iter()
            .position(|label| label == name)
            .ok_or_else(|| RLError::MissingStateVariable { name: name.into() })?;
        Ok(self.state_vec()[index])
    }

    async fn reset(&mut self) -> Result<(Self::Observation, StepInfo)> {
        self.cycle = FlexCycle::new(&self.config);
        self.step_index = 0;
        Ok((self.observation(), StepInfo::default()))
    }

    async fn step(&mut self, action: Self::Action) -> Result<Step<Self::Observation, Self::State>> {
        if self.step_index >= self.profile.len() {
            return Err(RLError::Environment(
                "episode is finished, reset the environment".into(),
            ));
        }
        let command = FlexAction::from_discrete(action)?;
        let price = self.price();

        let (cycle, reward) = self.cycle.step(command, price);
        self.cycle = cycle;
        self.step_index += 1;
        let done = self.step_index >= self.profile.len();

        tracing::debug!(
            ?command,
            price,
            flex_down = self.cycle.flex_down,
            flex_up = self.cycle.flex_up,
            relax = self.cycle.relax,
            reward = reward.0,
            "flex step"
        );

        let mut info = StepInfo::default();
        info.insert("Power [MW]", self.cycle.power());

        Ok(Step {
            observation: self.observation(),
            reward,
            done,
            truncated: false,
            info,
            state: Some(VectorState {
                data: self.state_vec(),
                terminal: if done { Terminal::Yes } else { Terminal::No },
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: FlexAction = FlexAction::StartOrContinue;
    const STOP: FlexAction = FlexAction::Stop;
    const NOOP: FlexAction = FlexAction::NoOp;

    fn config(flex_size: f64, max_flex_time: u32, relax_time: u32) -> FlexConfig {
        FlexConfig {
            flex_size,
            max_flex_time,
            relax_time,
        }
    }

    /// Run a sequence of actions at a fixed price, returning states and rewards
    fn run(cycle: FlexCycle, actions: &[FlexAction], price: f64) -> Vec<(FlexCycle, f64)> {
        let mut state = cycle;
        let mut trace = Vec::with_capacity(actions.len());
        for &action in actions {
            let (next, reward) = state.step(action, price);
            trace.push((next, reward.0));
            state = next;
        }
        trace
    }

    #[test]
    fn start_stop_cycle() {
        // two reduction steps, then stop into the penalty cycle
        let cycle = FlexCycle::new(&config(10.0, 3, 2));
        let trace = run(cycle, &[START, NOOP, STOP], 12.0);

        let (s1, r1) = trace[0];
        assert_eq!(s1.flex_down, 1);
        assert!(!s1.available);
        assert_eq!(r1, -10.0);

        let (s2, r2) = trace[1];
        assert_eq!(s2.flex_down, 2);
        assert_eq!(s2.flex_time, 2);
        assert_eq!(r2, -10.0);

        let (s3, r3) = trace[2];
        assert_eq!(s3.flex_down, 0);
        assert_eq!(s3.flex_up, 1);
        assert_eq!(s3.flex_time, 2);
        assert_eq!(r3, 10.0);
    }

    #[test]
    fn cap_forces_stop() {
        // with the cap at 2 the third step stops the cycle without a STOP action
        let cycle = FlexCycle::new(&config(5.0, 2, 2));
        let trace = run(cycle, &[START, NOOP, NOOP, NOOP], 30.0);

        assert_eq!(trace[1].0.flex_down, 2);
        assert_eq!(trace[2].0.flex_down, 0);
        assert_eq!(trace[2].0.flex_up, 1);

        // penalty then runs for the recorded two steps
        assert_eq!(trace[3].0.flex_up, 2);
    }

    #[test]
    fn flex_down_never_exceeds_cap() {
        let cycle = FlexCycle::new(&config(5.0, 4, 1));
        let mut state = cycle;
        for _ in 0..50 {
            let (next, _) = state.step(START, 20.0);
            assert!(next.flex_down <= 4);
            state = next;
        }
    }

    #[test]
    fn penalty_matches_reduction_duration() {
        for n in 1..=5 {
            let cycle = FlexCycle::new(&config(1.0, 10, 3));
            let mut actions = vec![START];
            actions.extend(std::iter::repeat(NOOP).take(n as usize - 1));
            actions.push(STOP);
            actions.extend(std::iter::repeat(NOOP).take(20));

            let trace = run(cycle, &actions, 60.0);
            let reduction_steps = trace.iter().filter(|(s, _)| s.flex_down > 0).count();
            let penalty_steps = trace.iter().filter(|(s, _)| s.flex_up > 0).count();

            assert_eq!(reduction_steps, n as usize);
            assert_eq!(penalty_steps, n as usize);
        }
    }

    #[test]
    fn relax_duration_is_fixed() {
        for n in 1..=4 {
            let cycle = FlexCycle::new(&config(1.0, 10, 3));
            let mut actions = vec![START];
            actions.extend(std::iter::repeat(NOOP).take(n - 1));
            actions.push(STOP);
            actions.extend(std::iter::repeat(NOOP).take(20));

            let trace = run(cycle, &actions, 60.0);
            let relax_steps = trace.iter().filter(|(s, _)| s.relax > 0).count();
            assert_eq!(relax_steps, 3);
        }
    }

    #[test]
    fn full_cycle_returns_to_available() {
        // availability comes back flex_time + relax_time steps after the stop
        let cycle = FlexCycle::new(&config(2.0, 8, 2));
        let actions = [START, NOOP, NOOP, STOP, NOOP, NOOP, NOOP, NOOP, NOOP, NOOP];
        let trace = run(cycle, &actions, 45.0);

        // stop lands at index 3 with a recorded length of 3
        assert_eq!(trace[3].0.flex_up, 1);
        assert_eq!(trace[3].0.flex_time, 3);

        // 3 penalty steps + 2 relax steps later the asset is available again
        let first_available = trace
            .iter()
            .position(|(s, _)| s.available)
            .expect("asset never became available");
        assert_eq!(first_available, 3 + 3 + 2);

        // and a new cycle can start
        let (restarted, _) = trace[first_available].0.step(START, 45.0);
        assert_eq!(restarted.flex_down, 1);
    }

    #[test]
    fn modes_are_mutually_exclusive() {
        // sweep every action sequence of length 8 over a small config
        let actions = [START, STOP, NOOP];
        for seq in 0..3usize.pow(8) {
            let mut state = FlexCycle::new(&config(1.0, 2, 2));
            let mut code = seq;
            for _ in 0..8 {
                let action = actions[code % 3];
                code /= 3;
                let (next, _) = state.step(action, 10.0);
                assert!(next.active_modes() <= 1, "state {next:?} after {seq}");
                assert!(next.available == (next.active_modes() == 0));
                state = next;
            }
        }
    }

    #[test]
    fn noop_is_idempotent_when_available() {
        let cycle = FlexCycle::new(&config(3.0, 4, 2));
        let (next, reward) = cycle.step(NOOP, 80.0);
        assert_eq!(next, cycle);
        assert_eq!(reward.0, 0.0);
    }

    #[test]
    fn stop_without_cycle_is_noop() {
        let cycle = FlexCycle::new(&config(3.0, 4, 2));
        let (next, reward) = cycle.step(STOP, 80.0);
        assert_eq!(next, cycle);
        assert_eq!(reward.0, 0.0);
    }

    #[test]
    fn reward_scales_with_price() {
        let cycle = FlexCycle::new(&config(6.0, 4, 2));
        let (_, reward) = cycle.step(START, 24.0);
        assert_eq!(reward.0, -6.0 * 24.0 / 12.0);
    }

    #[test]
    fn negative_price_flips_reward_sign() {
        // prices go negative in real markets; the engine passes them through
        let cycle = FlexCycle::new(&config(6.0, 4, 2));
        let (_, reward) = cycle.step(START, -24.0);
        assert_eq!(reward.0, 12.0);
    }

    #[test]
    fn zero_reward_while_relaxing() {
        let cycle = FlexCycle::new(&config(6.0, 4, 2));
        let trace = run(cycle, &[START, STOP, NOOP, NOOP, NOOP], 50.0);

        // reduction 1 step, penalty 1 step, then relaxation
        assert_eq!(trace[2].0.relax, 1);
        assert_eq!(trace[2].1, 0.0);
        assert_eq!(trace[3].1, 0.0);
    }

    #[tokio::test]
    async fn env_rejects_out_of_bounds_action() {
        let mut env = FlexEnv::with_example_profile(FlexConfig::default()).unwrap();
        env.reset().await.unwrap();

        let err = env.step(DiscreteAction(3)).await.unwrap_err();
        assert!(matches!(err, RLError::InvalidAction(_)));

        // the failed step must not have touched the cycle state
        assert_eq!(env.state_variable("Availability [0/1]").unwrap(), 1.0);
        assert_eq!(env.state_variable("Flex down cycle [steps]").unwrap(), 0.0);
    }

    #[tokio::test]
    async fn env_requires_price_column() {
        let profile = Profile::constant("Load [MW]", 1.0, 12);
        let err = FlexEnv::new(FlexConfig::default(), profile).unwrap_err();
        assert!(matches!(
            err,
            RLError::MissingStateVariable { name } if name == ELECTRICITY_PRICE_LABEL
        ));
    }

    #[tokio::test]
    async fn env_observation_carries_price_and_counters() {
        let profile = Profile::constant(ELECTRICITY_PRICE_LABEL, 40.0, 12);
        let mut env = FlexEnv::new(FlexConfig::default(), profile).unwrap();

        let (obs, _) = env.reset().await.unwrap();
        assert_eq!(obs.data.len(), 6);
        assert_eq!(env.state_variable(ELECTRICITY_PRICE_LABEL).unwrap(), 40.0);

        let step = env.step(DiscreteAction(0)).await.unwrap();
        assert_eq!(env.state_variable("Flex down cycle [steps]").unwrap(), 1.0);
        assert_eq!(step.reward.0, -FlexConfig::default().flex_size * 40.0 / 12.0);
        assert_eq!(step.info.get("Power [MW]"), Some(-FlexConfig::default().flex_size));
    }

    #[tokio::test]
    async fn env_finishes_with_profile() {
        let profile = Profile::constant(ELECTRICITY_PRICE_LABEL, 40.0, 3);
        let mut env = FlexEnv::new(FlexConfig::default(), profile).unwrap();
        env.reset().await.unwrap();

        for expected_done in [false, false, true] {
            let step = env.step(DiscreteAction(2)).await.unwrap();
            assert_eq!(step.done, expected_done);
        }

        let err = env.step(DiscreteAction(2)).await.unwrap_err();
        assert!(matches!(err, RLError::Environment(_)));
    }
}
