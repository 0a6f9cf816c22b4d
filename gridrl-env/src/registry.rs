//! Environment registry for construction by id
//!
//! `make_env("flex", config)` builds an environment the way the experiment
//! scripts expect: parameters come from the `params` map of
//! [`EnvironmentConfig`] and fall back to each environment's defaults.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use gridrl_core::{
    Action, ActionSpace, ContinuousAction, ContinuousSpace, DiscreteAction, DiscreteSpace,
    Environment, EnvironmentConfig, RLError, Result, Step, StepInfo, VectorObservation,
    VectorState,
};

use crate::battery::{BatteryConfig, BatteryEnv};
use crate::flex::{FlexConfig, FlexEnv};
use crate::profile::Profile;

/// Action accepted by registry-built environments
#[derive(Debug, Clone)]
pub enum EnergyAction {
    /// Discrete command (flexibility asset)
    Discrete(DiscreteAction),
    /// Continuous setpoint (battery)
    Continuous(ContinuousAction),
}

impl Action for EnergyAction {
    fn to_vec(&self) -> Vec<f64> {
        match self {
            Self::Discrete(action) => action.to_vec(),
            Self::Continuous(action) => action.to_vec(),
        }
    }
}

/// Action space of a registry-built environment
#[derive(Debug, Clone)]
pub enum EnergyActionSpace {
    /// Discrete choices
    Discrete(DiscreteSpace),
    /// Box-bounded setpoints
    Continuous(ContinuousSpace),
}

impl ActionSpace for EnergyActionSpace {
    type Action = EnergyAction;

    fn sample(&self) -> Self::Action {
        match self {
            Self::Discrete(space) => EnergyAction::Discrete(space.sample()),
            Self::Continuous(space) => EnergyAction::Continuous(space.sample()),
        }
    }

    fn contains(&self, action: &Self::Action) -> bool {
        match (self, action) {
            (Self::Discrete(space), EnergyAction::Discrete(action)) => space.contains(action),
            (Self::Continuous(space), EnergyAction::Continuous(action)) => space.contains(action),
            _ => false,
        }
    }

    fn dim(&self) -> Option<usize> {
        match self {
            Self::Discrete(space) => space.dim(),
            Self::Continuous(space) => space.dim(),
        }
    }
}

/// An environment built by the registry
#[derive(Debug)]
pub enum EnergyEnv {
    /// Flexibility asset environment
    Flex(FlexEnv),
    /// Battery storage environment
    Battery(BatteryEnv),
}

#[async_trait]
impl Environment for EnergyEnv {
    type Observation = VectorObservation;
    type Action = EnergyAction;
    type State = VectorState;

    fn observation_space(&self) -> Box<dyn gridrl_core::ObservationSpace<Observation = Self::Observation>> {
        match self {
            Self::Flex(env) => env.observation_space(),
            Self::Battery(env) => env.observation_space(),
        }
    }

    fn action_space(&self) -> Box<dyn ActionSpace<Action = Self::Action>> {
        let space = match self {
            Self::Flex(_) => EnergyActionSpace::Discrete(DiscreteSpace::new(3)),
            Self::Battery(env) => {
                let power = env.power_rating();
                let space = ContinuousSpace::new(vec![-power], vec![power])
                    .expect("bounds have matching dimensions");
                EnergyActionSpace::Continuous(space)
            }
        };
        Box::new(space)
    }

    fn state_labels(&self) -> Vec<String> {
        match self {
            Self::Flex(env) => env.state_labels(),
            Self::Battery(env) => env.state_labels(),
        }
    }

    fn state_variable(&self, name: &str) -> Result<f64> {
        match self {
            Self::Flex(env) => env.state_variable(name),
            Self::Battery(env) => env.state_variable(name),
        }
    }

    async fn reset(&mut self) -> Result<(Self::Observation, StepInfo)> {
        match self {
            Self::Flex(env) => env.reset().await,
            Self::Battery(env) => env.reset().await,
        }
    }

    async fn step(&mut self, action: Self::Action) -> Result<Step<Self::Observation, Self::State>> {
        match (self, action) {
            (Self::Flex(env), EnergyAction::Discrete(action)) => env.step(action).await,
            (Self::Battery(env), EnergyAction::Continuous(action)) => env.step(action).await,
            (Self::Flex(_), EnergyAction::Continuous(_)) => Err(RLError::InvalidAction(
                "flex takes a discrete action".into(),
            )),
            (Self::Battery(_), EnergyAction::Discrete(_)) => Err(RLError::InvalidAction(
                "battery takes a continuous action".into(),
            )),
        }
    }
}

type EnvConstructor = Box<dyn Fn(EnvironmentConfig) -> Result<EnergyEnv> + Send + Sync>;

lazy_static::lazy_static! {
    static ref REGISTRY: Arc<Mutex<EnvRegistry>> = Arc::new(Mutex::new(EnvRegistry::with_defaults()));
}

fn parse_params<T>(config: &EnvironmentConfig) -> Result<T>
where
    T: DeserializeOwned,
{
    let value = serde_json::Value::Object(config.params.clone());
    serde_json::from_value(value).map_err(RLError::from)
}

/// Global environment registry
pub struct EnvRegistry {
    /// Registered environments
    envs: HashMap<String, EnvConstructor>,
}

impl EnvRegistry {
    fn new() -> Self {
        Self {
            envs: HashMap::new(),
        }
    }

    /// Registry preloaded with the energy environments
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("flex", |config| {
            let flex_config: FlexConfig = parse_params(&config)?;
            FlexEnv::new(flex_config, Profile::example()).map(EnergyEnv::Flex)
        });
        registry.register("battery", |config| {
            let battery_config: BatteryConfig = parse_params(&config)?;
            BatteryEnv::new(battery_config, Profile::example()).map(EnergyEnv::Battery)
        });
        registry
    }

    /// Register an environment
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn(EnvironmentConfig) -> Result<EnergyEnv> + Send + Sync + 'static,
    {
        self.envs.insert(name.into(), Box::new(constructor));
    }

    /// Create an environment by name
    pub fn make(&self, name: &str, config: EnvironmentConfig) -> Result<EnergyEnv> {
        self.envs
            .get(name)
            .ok_or_else(|| RLError::Environment(format!("Unknown environment: {name}")))
            .and_then(|constructor| constructor(config))
    }

    /// List registered environments
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        self.envs.keys().cloned().collect()
    }
}

/// Register an environment globally
pub fn register_env<F>(name: impl Into<String>, constructor: F)
where
    F: Fn(EnvironmentConfig) -> Result<EnergyEnv> + Send + Sync + 'static,
{
    REGISTRY.lock().unwrap().register(name, constructor);
}

/// Create an environment by name
pub fn make_env(name: &str, config: EnvironmentConfig) -> Result<EnergyEnv> {
    REGISTRY.lock().unwrap().make(name, config)
}

/// List all registered environments
pub fn list_envs() -> Vec<String> {
    REGISTRY.lock().unwrap().list()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battery::CHARGE_LABEL;

    fn config_with(params: serde_json::Value) -> EnvironmentConfig {
        EnvironmentConfig {
            params: params.as_object().cloned().unwrap_or_default(),
            ..EnvironmentConfig::default()
        }
    }

    #[tokio::test]
    async fn make_flex_by_id() {
        let mut env = make_env("flex", EnvironmentConfig::default()).unwrap();
        env.reset().await.unwrap();

        let step = env
            .step(EnergyAction::Discrete(DiscreteAction(0)))
            .await
            .unwrap();
        assert!(step.reward.0 < 0.0);
        assert_eq!(env.state_variable("Flex down cycle [steps]").unwrap(), 1.0);
    }

    #[tokio::test]
    async fn make_battery_with_params() {
        let params = serde_json::json!({
            "initial_charge": 0.5,
            "capacity": 4.0,
            "efficiency": 0.9,
        });
        let mut env = make_env("battery", config_with(params)).unwrap();
        env.reset().await.unwrap();

        assert_eq!(env.state_variable(CHARGE_LABEL).unwrap(), 2.0);
    }

    #[tokio::test]
    async fn mismatched_action_kind_rejected() {
        let mut env = make_env("flex", EnvironmentConfig::default()).unwrap();
        env.reset().await.unwrap();

        let err = env
            .step(EnergyAction::Continuous(ContinuousAction(vec![1.0])))
            .await
            .unwrap_err();
        assert!(matches!(err, RLError::InvalidAction(_)));
    }

    #[test]
    fn unknown_id_rejected() {
        let err = make_env("wind-farm", EnvironmentConfig::default()).unwrap_err();
        assert!(matches!(err, RLError::Environment(_)));
    }

    #[test]
    fn default_registry_lists_energy_envs() {
        let mut names = list_envs();
        names.sort();
        assert!(names.contains(&"battery".to_string()));
        assert!(names.contains(&"flex".to_string()));
    }

    #[test]
    fn action_space_matches_environment() {
        let env = make_env("battery", EnvironmentConfig::default()).unwrap();
        let space = env.action_space();

        let action = space.sample();
        assert!(space.contains(&action));
        assert!(!space.contains(&EnergyAction::Discrete(DiscreteAction(0))));
    }
}
