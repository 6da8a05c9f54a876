// agent.rs

use crate::config::AgentConfig;
use crate::control_system::traffic_light_controller::Action;
use crate::error::PersistError;
use crate::flow_analyzer::state_encoder::EncodedState;
use crate::global_variables::ACTION_COUNT;
use crate::learning::persistence::atomic_write;
use crate::learning::q_table::{QTable, TableFile, TableMismatch};
use rand::Rng;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// What happened when a table file was read. Every variant other than
/// `Loaded` leaves the agent with a zeroed table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { visited_states: usize },
    Missing,
    Unreadable(String),
    Mismatch(TableMismatch),
}

/// Tabular Q-learning with epsilon-greedy exploration.
pub struct QLearningAgent {
    table: QTable,
    learning_rate: f64,
    discount_factor: f64,
    epsilon: f64,
    min_epsilon: f64,
    decay_rate: f64,
    /// Total reward of every finished episode, oldest first.
    pub rewards_history: Vec<f64>,
}

impl QLearningAgent {
    /// Fresh agent with a zeroed table.
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            table: QTable::new(),
            learning_rate: config.learning_rate,
            discount_factor: config.discount_factor,
            // Never start below the floor.
            epsilon: config.exploration_rate.max(config.min_exploration_rate),
            min_epsilon: config.min_exploration_rate,
            decay_rate: config.exploration_decay,
            rewards_history: Vec::new(),
        }
    }

    /// Builds the agent and, if asked to, restores the table at `path`.
    pub fn with_table(config: &AgentConfig, path: &Path, load_existing: bool) -> Self {
        let mut agent = Self::new(config);
        if load_existing {
            agent.load(path);
        }
        agent
    }

    /// Epsilon-greedy selection. Always returns a valid action.
    pub fn choose_action<R: Rng>(&self, state: &EncodedState, rng: &mut R) -> Action {
        if rng.random::<f64>() < self.epsilon {
            Action::ALL[rng.random_range(0..ACTION_COUNT)]
        } else {
            self.greedy_action(state)
        }
    }

    pub fn greedy_action(&self, state: &EncodedState) -> Action {
        self.table.best_action(state)
    }

    /// One temporal-difference step. A terminal transition sets the entry
    /// to exactly `reward`.
    pub fn update(
        &mut self,
        state: &EncodedState,
        action: Action,
        reward: f64,
        next_state: &EncodedState,
        done: bool,
    ) {
        let current = self.table.get(state, action);
        let new_value = if done {
            reward
        } else {
            let target = reward + self.discount_factor * self.table.max_value(next_state);
            current + self.learning_rate * (target - current)
        };
        self.table.set(state, action, new_value);
    }

    /// Called once per finished episode; never drops below the floor.
    pub fn decay_exploration(&mut self) {
        self.epsilon = (self.epsilon * self.decay_rate).max(self.min_epsilon);
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn q_values(&self, state: &EncodedState) -> [f64; ACTION_COUNT] {
        self.table.row(state)
    }

    pub fn table(&self) -> &QTable {
        &self.table
    }

    pub fn save(&self, path: &Path) -> Result<(), PersistError> {
        let payload = serde_json::to_vec(&self.table.to_file())?;
        atomic_write(path, &payload)?;
        log::info!(
            "Model saved to {} ({} states)",
            path.display(),
            self.table.visited_states()
        );
        Ok(())
    }

    /// Restores the table from `path`. Missing, unreadable or mismatched
    /// files leave a zeroed table behind; loading never fails.
    pub fn load(&mut self, path: &Path) -> LoadOutcome {
        let outcome = match read_table_file(path) {
            Ok(file) => match QTable::from_file(file) {
                Ok(table) => {
                    let visited_states = table.visited_states();
                    self.table = table;
                    LoadOutcome::Loaded { visited_states }
                }
                Err(mismatch) => LoadOutcome::Mismatch(mismatch),
            },
            Err(outcome) => outcome,
        };

        match &outcome {
            LoadOutcome::Loaded { visited_states } => log::info!(
                "Loaded existing Q-table from {} ({} states)",
                path.display(),
                visited_states
            ),
            LoadOutcome::Missing => {
                self.table = QTable::new();
                log::info!("No table at {}, created new Q-table", path.display());
            }
            LoadOutcome::Unreadable(reason) => {
                self.table = QTable::new();
                log::warn!("Could not load model from {}: {}", path.display(), reason);
            }
            LoadOutcome::Mismatch(mismatch) => {
                self.table = QTable::new();
                log::warn!(
                    "Q-table at {} does not fit ({:?}), creating a new Q-table",
                    path.display(),
                    mismatch
                );
            }
        }
        outcome
    }
}

fn read_table_file(path: &Path) -> Result<TableFile, LoadOutcome> {
    let raw = fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => LoadOutcome::Missing,
        _ => LoadOutcome::Unreadable(e.to_string()),
    })?;
    serde_json::from_slice(&raw).map_err(|e| LoadOutcome::Unreadable(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn agent() -> QLearningAgent {
        QLearningAgent::new(&AgentConfig::default())
    }

    fn state(north: u8) -> EncodedState {
        EncodedState {
            north,
            light_ns: 1,
            ..EncodedState::default()
        }
    }

    #[test]
    fn td_update_from_zero_table() {
        let mut agent = agent();
        agent.update(&state(1), Action::NsGreen, 10.0, &state(2), false);
        assert!((agent.q_values(&state(1))[0] - 1.0).abs() < 1e-12);
        assert_eq!(agent.q_values(&state(1))[1], 0.0);
    }

    #[test]
    fn td_update_bootstraps_from_next_state() {
        let mut agent = agent();
        agent.update(&state(2), Action::EwGreen, 4.0, &state(3), true);
        agent.update(&state(1), Action::NsGreen, 1.0, &state(2), false);
        // 0 + 0.1 * (1 + 0.95 * 4 - 0)
        assert!((agent.q_values(&state(1))[0] - 0.48).abs() < 1e-12);
    }

    #[test]
    fn terminal_update_sets_reward_exactly() {
        let mut agent = agent();
        agent.update(&state(1), Action::EwGreen, 7.0, &state(1), false);
        agent.update(&state(1), Action::EwGreen, -3.5, &state(4), true);
        assert_eq!(agent.q_values(&state(1))[1], -3.5);
    }

    #[test]
    fn greedy_when_epsilon_is_zero() {
        let mut config = AgentConfig::default();
        config.exploration_rate = 0.0;
        let mut agent = QLearningAgent::new(&config);
        agent.update(&state(0), Action::EwGreen, 2.0, &state(0), true);
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..100 {
            assert_eq!(agent.choose_action(&state(0), &mut rng), Action::EwGreen);
        }
    }

    #[test]
    fn full_exploration_uses_both_actions() {
        let mut config = AgentConfig::default();
        config.exploration_rate = 1.0;
        let agent = QLearningAgent::new(&config);
        let mut rng = StdRng::seed_from_u64(5);
        let picks: Vec<_> = (0..200)
            .map(|_| agent.choose_action(&state(0), &mut rng))
            .collect();
        assert!(picks.contains(&Action::NsGreen));
        assert!(picks.contains(&Action::EwGreen));
    }

    #[test]
    fn epsilon_decays_to_floor() {
        let mut agent = agent();
        let mut previous = agent.epsilon();
        for _ in 0..1000 {
            agent.decay_exploration();
            assert!(agent.epsilon() <= previous);
            assert!(agent.epsilon() >= 0.01);
            previous = agent.epsilon();
        }
        assert_eq!(agent.epsilon(), 0.01);
    }

    #[test]
    fn epsilon_starts_at_floor_when_configured_below_it() {
        let config = AgentConfig {
            exploration_rate: 0.005,
            min_exploration_rate: 0.2,
            ..AgentConfig::default()
        };
        let mut agent = QLearningAgent::new(&config);
        assert_eq!(agent.epsilon(), 0.2);
        agent.decay_exploration();
        assert_eq!(agent.epsilon(), 0.2);
    }

    proptest::proptest! {
        #[test]
        fn epsilon_never_increases_or_undershoots(
            start in 0.0f64..=1.0,
            floor in 0.0f64..=0.5,
            decay in 0.5f64..=1.0,
            episodes in 1usize..300,
        ) {
            let config = AgentConfig {
                exploration_rate: start,
                min_exploration_rate: floor,
                exploration_decay: decay,
                ..AgentConfig::default()
            };
            let mut agent = QLearningAgent::new(&config);
            for _ in 0..episodes {
                let before = agent.epsilon();
                agent.decay_exploration();
                proptest::prop_assert!(agent.epsilon() <= before);
                proptest::prop_assert!(agent.epsilon() >= floor);
            }
        }
    }
}
