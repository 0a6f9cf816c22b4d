//! Example: random agent driving the flexibility environment

use gridrl_agent::RandomAgent;
use gridrl_core::{Agent, DiscreteSpace, Environment, TrackedEnvironment, VectorObservation};
use gridrl_env::{FlexConfig, FlexEnv, TimeLimit};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Flexibility environment over the example price profile
    let env = FlexEnv::with_example_profile(FlexConfig::default())?;
    let env = TimeLimit::new(env, 288);
    let mut env = TrackedEnvironment::new(env);

    // Random agent over the three flex commands
    let agent: RandomAgent<VectorObservation, _> = RandomAgent::new(DiscreteSpace::new(3));

    // Run episodes
    let num_episodes = 10;
    let mut episode_rewards = Vec::new();

    for episode in 0..num_episodes {
        let (mut observation, _info) = env.reset().await?;
        let mut total_reward = 0.0;
        let mut steps = 0;

        loop {
            let action = agent.act(&observation).await?;
            let step = env.step(action).await?;
            total_reward += step.reward.0;
            steps += 1;

            if step.done || step.truncated {
                break;
            }

            observation = step.observation;
        }

        episode_rewards.push(total_reward);
        println!(
            "Episode {}: Total Reward = {:.2}, Steps = {}",
            episode + 1,
            total_reward,
            steps
        );
    }

    let avg_reward: f64 = episode_rewards.iter().sum::<f64>() / episode_rewards.len() as f64;
    println!("\nAverage Reward over {num_episodes} episodes: {avg_reward:.2}");

    env.close().await?;

    Ok(())
}
