// evaluation.rs
//
// Runs a fixed policy (learned greedy or rule-based) without learning, either
// on simulated arrivals or on a recorded feed.

use crate::control_system::traffic_light_controller::Action;
use crate::flow_analyzer::state_encoder::{encode, EncodedState};
use crate::flow_analyzer::traffic_analyzer::RuleBasedAnalyzer;
use crate::learning::agent::QLearningAgent;
use crate::shared_data::{EpisodeStats, FeedRecord, Observation, TrainingReport};
use crate::simulation_engine::simulation::IntersectionEnvironment;
use crate::training::cancellation::CancellationToken;
use rand::Rng;

pub trait SignalPolicy {
    fn select_action(&mut self, observation: &Observation, state: &EncodedState, step: usize)
        -> Action;
}

/// Learned policy with exploration switched off.
pub struct GreedyPolicy<'a> {
    pub agent: &'a QLearningAgent,
}

impl SignalPolicy for GreedyPolicy<'_> {
    fn select_action(&mut self, _: &Observation, state: &EncodedState, _: usize) -> Action {
        self.agent.greedy_action(state)
    }
}

impl SignalPolicy for RuleBasedAnalyzer {
    fn select_action(&mut self, observation: &Observation, _: &EncodedState, step: usize) -> Action {
        self.recommend_action(observation, step)
    }
}

/// Plays `episodes` episodes of up to `max_steps` ticks. With a feed, every
/// episode replays the records from the start and ends when they run out.
pub fn evaluate_policy<P: SignalPolicy, R: Rng>(
    env: &mut IntersectionEnvironment,
    policy: &mut P,
    episodes: usize,
    max_steps: usize,
    feed: Option<&[FeedRecord]>,
    rng: &mut R,
    token: &CancellationToken,
) -> TrainingReport {
    let mut report = TrainingReport::default();

    for episode in 0..episodes {
        if token.is_cancelled() {
            report.cancelled = true;
            break;
        }

        let mut observation = env.reset();
        let mut total_reward = 0.0;
        let mut steps = 0;
        let limit = feed.map_or(max_steps, |records| records.len().min(max_steps));

        for step in 0..limit {
            if token.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let state = encode(&observation);
            let action = policy.select_action(&observation, &state, step);
            let outcome = match feed {
                Some(records) => env.step_action_with_feed(action, &records[step], rng),
                None => env.step_action(action, rng),
            };
            total_reward += outcome.reward;
            steps += 1;
            observation = outcome.observation;
            if outcome.done {
                break;
            }
        }

        log::info!(
            "Episode {} complete | Steps: {} | Reward: {:.1}",
            episode + 1,
            steps,
            total_reward
        );
        report.episodes.push(EpisodeStats {
            episode: episode + 1,
            steps,
            total_reward,
            epsilon: 0.0,
            vehicles_passed: env.vehicles_passed(),
            mean_waiting_vehicles: env.mean_waiting_vehicles(),
            switches: env.switch_count(),
            completed: !report.cancelled,
        });
        if report.cancelled {
            break;
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn record(north: usize, east: usize) -> FeedRecord {
        FeedRecord {
            north,
            south: 0,
            east,
            west: 0,
            emergency_ns: false,
            emergency_ew: false,
        }
    }

    #[test]
    fn feed_length_bounds_each_episode() {
        let mut env = IntersectionEnvironment::new(&SimulationConfig::default());
        let mut policy = RuleBasedAnalyzer::default();
        let mut rng = StdRng::seed_from_u64(11);
        let feed = vec![record(1, 0), record(2, 3), record(2, 4)];

        let report = evaluate_policy(
            &mut env,
            &mut policy,
            2,
            100,
            Some(&feed),
            &mut rng,
            &CancellationToken::new(),
        );
        assert_eq!(report.episodes.len(), 2);
        assert!(report.episodes.iter().all(|e| e.steps == 3 && e.completed));
    }

    #[test]
    fn greedy_policy_runs_without_learning() {
        let config = SimulationConfig::default();
        let agent = QLearningAgent::new(&config.agent);
        let mut env = IntersectionEnvironment::new(&config);
        let mut policy = GreedyPolicy { agent: &agent };
        let mut rng = StdRng::seed_from_u64(11);

        let report = evaluate_policy(
            &mut env,
            &mut policy,
            1,
            50,
            None,
            &mut rng,
            &CancellationToken::new(),
        );
        assert_eq!(report.episodes[0].steps, 50);
        assert_eq!(report.episodes[0].epsilon, 0.0);
        assert_eq!(agent.table().visited_states(), 0);
    }

    #[test]
    fn cancelled_token_stops_before_first_episode() {
        let mut env = IntersectionEnvironment::new(&SimulationConfig::default());
        let mut policy = RuleBasedAnalyzer::default();
        let mut rng = StdRng::seed_from_u64(11);
        let token = CancellationToken::new();
        token.cancel();

        let report = evaluate_policy(&mut env, &mut policy, 3, 50, None, &mut rng, &token);
        assert!(report.cancelled);
        assert!(report.episodes.is_empty());
    }
}
