// control_loop.rs
//
// Episode driver: reset, encode, select, step, learn. Persists the table at a
// fixed episode interval and always before returning, including after a
// cancellation request.

use crate::config::{SimulationConfig, TrainingConfig};
use crate::flow_analyzer::state_encoder::encode;
use crate::learning::agent::QLearningAgent;
use crate::shared_data::{EpisodeStats, TrainingReport};
use crate::simulation_engine::simulation::IntersectionEnvironment;
use crate::training::cancellation::CancellationToken;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::thread;
use std::time::Duration;

pub struct ControlLoop {
    config: TrainingConfig,
    env: IntersectionEnvironment,
    agent: QLearningAgent,
    rng: StdRng,
    token: CancellationToken,
}

impl ControlLoop {
    /// Builds environment, agent (restoring the table if configured) and the
    /// seeded generator from one config.
    pub fn new(config: &SimulationConfig, token: CancellationToken) -> Self {
        let training = config.training.clone();
        let agent = QLearningAgent::with_table(
            &config.agent,
            &training.table_path,
            training.load_existing,
        );
        Self {
            env: IntersectionEnvironment::new(config),
            agent,
            rng: StdRng::seed_from_u64(config.seed),
            token,
            config: training,
        }
    }

    pub fn from_parts(
        config: TrainingConfig,
        env: IntersectionEnvironment,
        agent: QLearningAgent,
        rng: StdRng,
        token: CancellationToken,
    ) -> Self {
        Self {
            config,
            env,
            agent,
            rng,
            token,
        }
    }

    pub fn agent(&self) -> &QLearningAgent {
        &self.agent
    }

    pub fn into_agent(self) -> QLearningAgent {
        self.agent
    }

    pub fn run(&mut self) -> TrainingReport {
        let mut report = TrainingReport::default();

        for episode in 0..self.config.episodes {
            if self.token.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let stats = self.run_episode(episode);
            let finished = stats.completed;
            log::info!(
                "Episode {} | Steps: {} | Reward: {:.1} | Epsilon: {:.3}",
                episode + 1,
                stats.steps,
                stats.total_reward,
                stats.epsilon
            );
            report.episodes.push(stats);

            if !finished {
                report.cancelled = true;
                log::info!("Training interrupted, saving and exiting...");
                break;
            }
            if (episode + 1) % self.config.save_interval == 0 {
                self.persist();
            }
        }

        self.persist();
        report
    }

    fn run_episode(&mut self, episode: usize) -> EpisodeStats {
        let mut state = encode(&self.env.reset());
        let mut total_reward = 0.0;
        let mut steps = 0;
        let mut interrupted = false;

        for step in 0..self.config.max_steps {
            if self.token.is_cancelled() {
                interrupted = true;
                break;
            }

            let action = self.agent.choose_action(&state, &mut self.rng);
            let outcome = self.env.step_action(action, &mut self.rng);
            let next_state = encode(&outcome.observation);
            self.agent
                .update(&state, action, outcome.reward, &next_state, outcome.done);

            state = next_state;
            total_reward += outcome.reward;
            steps += 1;

            log::debug!(
                "Step {}, Action: {:?}, NS green: {}, Vehicles: {}, Reward: {:.2}",
                step,
                action,
                outcome.observation.ns_green,
                self.env.vehicles().len(),
                outcome.reward
            );

            if self.config.tick_delay_ms > 0 {
                thread::sleep(Duration::from_millis(self.config.tick_delay_ms));
            }
            if outcome.done {
                break;
            }
        }

        if !interrupted {
            self.agent.decay_exploration();
            self.agent.rewards_history.push(total_reward);
        }

        EpisodeStats {
            episode: episode + 1,
            steps,
            total_reward,
            epsilon: self.agent.epsilon(),
            vehicles_passed: self.env.vehicles_passed(),
            mean_waiting_vehicles: self.env.mean_waiting_vehicles(),
            switches: self.env.switch_count(),
            completed: !interrupted,
        }
    }

    fn persist(&self) {
        if let Err(e) = self.agent.save(&self.config.table_path) {
            log::warn!(
                "Failed to save Q-table to {}: {}",
                self.config.table_path.display(),
                e
            );
        }
    }
}
