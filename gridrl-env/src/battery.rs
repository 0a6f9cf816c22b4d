//! Battery storage environment
//!
//! A grid-connected battery charges and discharges against the electricity
//! price. The action is a power setpoint in MW: positive charges, negative
//! discharges. Charge moves by `setpoint / 12` MWh per 5-minute step,
//! clipped by the charge level and the capacity, and a round-trip
//! efficiency is paid on discharge.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use gridrl_core::{
    BoxObservationSpace, ContinuousAction, ContinuousSpace, Environment, Reward, RLError, Result,
    Step, StepInfo, Terminal, VectorObservation, VectorState,
};

use crate::profile::{Profile, ELECTRICITY_PRICE_LABEL};

const STEPS_PER_HOUR: f64 = 12.0;

/// Label of the charge entry in the state vector
pub const CHARGE_LABEL: &str = "Charge [MWh]";

/// Configuration for the battery environment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatteryConfig {
    /// Power rating in MW, bounding charge and discharge setpoints
    pub power: f64,
    /// Storage capacity in MWh
    pub capacity: f64,
    /// Round-trip efficiency, paid on discharge
    pub efficiency: f64,
    /// Initial charge as a fraction of capacity
    pub initial_charge: f64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            power: 2.0,
            capacity: 4.0,
            efficiency: 0.9,
            initial_charge: 0.0,
        }
    }
}

/// Reinforcement learning environment for a price-responsive battery
#[derive(Debug)]
pub struct BatteryEnv {
    config: BatteryConfig,
    profile: Profile,
    price_index: usize,
    step_index: usize,
    charge: f64,
}

impl BatteryEnv {
    /// Create a battery environment over a price profile
    pub fn new(config: BatteryConfig, profile: Profile) -> Result<Self> {
        if config.power <= 0.0 || config.capacity <= 0.0 {
            return Err(RLError::Environment(
                "power and capacity must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&config.efficiency) || config.efficiency == 0.0 {
            return Err(RLError::Environment(format!(
                "efficiency must be in (0, 1], got {}",
                config.efficiency
            )));
        }
        if !(0.0..=1.0).contains(&config.initial_charge) {
            return Err(RLError::Environment(format!(
                "initial_charge must be a fraction of capacity, got {}",
                config.initial_charge
            )));
        }
        if profile.is_empty() {
            return Err(RLError::Environment("profile has no rows".into()));
        }
        let price_index = profile.index_of(ELECTRICITY_PRICE_LABEL)?;
        let charge = config.initial_charge * config.capacity;

        Ok(Self {
            config,
            profile,
            price_index,
            step_index: 0,
            charge,
        })
    }

    /// Create a battery environment over the bundled example prices
    pub fn with_example_profile(config: BatteryConfig) -> Result<Self> {
        Self::new(config, Profile::example())
    }

    /// Current charge level in MWh
    #[must_use]
    pub fn charge(&self) -> f64 {
        self.charge
    }

    /// Power rating in MW
    #[must_use]
    pub fn power_rating(&self) -> f64 {
        self.config.power
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
        data.push(self.charge);
        data
    }

    fn observation(&self) -> VectorObservation {
        VectorObservation {
            data: self.state_vec(),
        }
    }
}

#[async_trait]
impl Environment for BatteryEnv {
    type Observation = VectorObservation;
    type Action = ContinuousAction;
    type State = VectorState;

    fn observation_space(&self) -> Box<dyn gridrl_core::ObservationSpace<Observation = Self::Observation>> {
        let (mut low, mut high) = self.profile.bounds();
        low.push(0.0);
        high.push(self.config.capacity);
        let shape = vec![low.len()];

        Box::new(BoxObservationSpace { low, high, shape })
    }

    fn action_space(&self) -> Box<dyn gridrl_core::ActionSpace<Action = Self::Action>> {
        let space = ContinuousSpace::new(vec![-self.config.power], vec![self.config.power])
            .expect("bounds have matching dimensions");
        Box::new(space)
    }

    fn state_labels(&self) -> Vec<String> {
        let mut labels = self.profile.labels().to_vec();
        labels.push(CHARGE_LABEL.to_string());
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
        self.charge = self.config.initial_charge * self.config.capacity;
        self.step_index = 0;
        Ok((self.observation(), StepInfo::default()))
    }

    async fn step(&mut self, action: Self::Action) -> Result<Step<Self::Observation, Self::State>> {
        if self.step_index >= self.profile.len() {
            return Err(RLError::Environment(
                "episode is finished, reset the environment".into(),
            ));
        }
        let setpoint = match action.0.as_slice() {
            [setpoint] => *setpoint,
            values => {
                return Err(RLError::InvalidAction(format!(
                    "expected a single power setpoint, got {} values",
                    values.len()
                )))
            }
        };
        let price = self.price();

        // clip the setpoint to the power rating, then to what the store allows
        let setpoint = setpoint.clamp(-self.config.power, self.config.power);
        let old_charge = self.charge;
        let new_charge = (old_charge + setpoint / STEPS_PER_HOUR).clamp(0.0, self.config.capacity);
        let rate = (new_charge - old_charge) * STEPS_PER_HOUR;
        self.charge = new_charge;

        // discharge pays the round-trip efficiency before power reaches the grid
        let losses = if rate < 0.0 {
            -rate * (1.0 - self.config.efficiency)
        } else {
            0.0
        };
        let net_export = if rate < 0.0 {
            -rate * self.config.efficiency
        } else {
            -rate
        };
        let reward = Reward(net_export * price / STEPS_PER_HOUR);

        self.step_index += 1;
        let done = self.step_index >= self.profile.len();

        tracing::debug!(
            setpoint,
            rate,
            charge = self.charge,
            losses,
            reward = reward.0,
            "battery step"
        );

        let mut info = StepInfo::default();
        info.insert("Rate [MW]", rate);
        info.insert("Loss [MW]", losses);

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
