//! Example: DQN agent learning to operate the flexibility asset

use gridrl_agent::{DQNAgent, DQNConfig};
use gridrl_core::{
    Agent, AgentConfig, Environment, ObservationSpace, TrackedEnvironment, Transition,
};
use gridrl_env::{FlexConfig, FlexEnv, Normalize, TimeLimit};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let total_steps = 20_000;
    let agent_config = DQNConfig {
        base: AgentConfig {
            learning_rate: 1e-4,
            discount: 0.97,
            batch_size: 32,
            buffer_size: 2_000,
            ..AgentConfig::default()
        },
        tau: 0.001,
        layers: vec![10, 10, 10],
        epsilon_decay_fraction: 0.3,
        total_steps,
        double_q: true,
        ..DQNConfig::default()
    };

    // Standardized observations over a day-long episode
    let env = FlexEnv::with_example_profile(FlexConfig::default())?;
    let obs_dim = env.observation_space().shape().iter().product();
    let env = TimeLimit::new(env, 288);
    let mut env = TrackedEnvironment::new(Normalize::new(env, obs_dim));

    let mut agent = DQNAgent::new(obs_dim, 3, agent_config);

    let mut steps_taken = 0;
    let mut episode_rewards = Vec::new();

    while steps_taken < total_steps {
        let (mut observation, _info) = env.reset().await?;
        let mut total_reward = 0.0;

        loop {
            let action = agent.act(&observation).await?;
            let step = env.step(action).await?;
            total_reward += step.reward.0;
            steps_taken += 1;

            let transition = Transition {
                observation: observation.clone(),
                action,
                reward: step.reward,
                next_observation: step.observation.clone(),
                done: step.done,
            };
            agent.observe(&transition).await?;

            if step.done || step.truncated {
                break;
            }

            observation = step.observation;
        }

        episode_rewards.push(total_reward);
        if episode_rewards.len() % 10 == 0 {
            let recent: f64 = episode_rewards.iter().rev().take(10).sum::<f64>() / 10.0;
            println!(
                "Episode {:>4}: last-10 avg reward = {:>8.2}, epsilon = {:.3}, loss = {:?}",
                episode_rewards.len(),
                recent,
                agent.epsilon(),
                agent.metrics().loss,
            );
        }
    }

    let avg_reward: f64 = episode_rewards.iter().sum::<f64>() / episode_rewards.len() as f64;
    println!("\nAverage reward over {} episodes: {avg_reward:.2}", episode_rewards.len());

    agent.save(std::path::Path::new("flex_dqn_agent.json")).await?;
    env.close().await?;

    Ok(())
}
