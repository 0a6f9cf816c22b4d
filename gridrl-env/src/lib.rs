//! Energy system reinforcement learning environments for gridrl
//!
//! This crate provides simulated energy environments behind the
//! reset/step protocol of `gridrl-core`:
//! - A flexibility asset with a reduction/penalty/relaxation cycle
//! - A battery storage system trading against the electricity price
//!
//! Environments are driven by a [`Profile`] of named state variables
//! (electricity prices) and can be built by id through the registry.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod battery;
pub mod flex;
pub mod profile;
pub mod registry;
pub mod wrappers;

// Re-export environments
pub use battery::{BatteryConfig, BatteryEnv, CHARGE_LABEL};
pub use flex::{FlexAction, FlexConfig, FlexCycle, FlexEnv};
pub use profile::{Profile, ELECTRICITY_PRICE_LABEL};
pub use registry::{
    list_envs, make_env, register_env, EnergyAction, EnergyActionSpace, EnergyEnv, EnvRegistry,
};
pub use wrappers::{Normalize, RewardWrapper, TimeLimit};

// Re-export core types
pub use gridrl_core::{
    Action, ActionSpace, Environment, EnvironmentConfig, Episode, Observation, ObservationSpace,
    Reward, State, StateSpace, Step,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        make_env, BatteryEnv, EnvRegistry, FlexAction, FlexCycle, FlexEnv, Normalize, Profile,
        TimeLimit,
    };
    pub use gridrl_core::prelude::*;
}
