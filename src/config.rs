// config.rs
//
// Every tunable of the simulator, the controller and the learner. Loaded from
// a JSON file; missing fields fall back to the reference values below.

use crate::error::ConfigError;
use crate::global_variables::{
    DEFAULT_REWARD_PLOT_PATH, DEFAULT_STATS_PATH, DEFAULT_TABLE_PATH, ENV_EPISODES, ENV_MAX_STEPS,
    ENV_SEED, ENV_TABLE_PATH,
};
use crate::shared_data::PerDirection;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed for the single generator shared by spawning and exploration.
    pub seed: u64,
    pub training: TrainingConfig,
    pub agent: AgentConfig,
    pub arrivals: ArrivalConfig,
    pub geometry: GeometryConfig,
    pub controller: ControllerConfig,
    pub reward: RewardConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            training: TrainingConfig::default(),
            agent: AgentConfig::default(),
            arrivals: ArrivalConfig::default(),
            geometry: GeometryConfig::default(),
            controller: ControllerConfig::default(),
            reward: RewardConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub episodes: usize,
    pub max_steps: usize,
    /// Tick count after which the environment reports `done`.
    pub horizon: usize,
    /// Persist the table every `save_interval` completed episodes.
    pub save_interval: usize,
    pub load_existing: bool,
    pub table_path: PathBuf,
    pub stats_path: PathBuf,
    /// Reward-per-episode chart written after training.
    pub plot_path: PathBuf,
    /// Real-time pacing between ticks, 0 for headless runs.
    pub tick_delay_ms: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            episodes: 10,
            max_steps: 1000,
            horizon: 1000,
            save_interval: 2,
            load_existing: true,
            table_path: PathBuf::from(DEFAULT_TABLE_PATH),
            stats_path: PathBuf::from(DEFAULT_STATS_PATH),
            plot_path: PathBuf::from(DEFAULT_REWARD_PLOT_PATH),
            tick_delay_ms: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub learning_rate: f64,
    pub discount_factor: f64,
    pub exploration_rate: f64,
    pub min_exploration_rate: f64,
    pub exploration_decay: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            discount_factor: 0.95,
            exploration_rate: 0.5,
            min_exploration_rate: 0.01,
            exploration_decay: 0.99,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrivalConfig {
    /// Bernoulli spawn probability per direction per tick.
    pub spawn_probabilities: PerDirection<f64>,
    pub emergency_probability: f64,
    pub normal_speed: f64,
    pub emergency_speed: f64,
    pub normal_size: f64,
    pub emergency_size: f64,
    /// Maximum lateral offset from the lane centre at spawn.
    pub lateral_jitter: f64,
}

impl Default for ArrivalConfig {
    fn default() -> Self {
        Self {
            spawn_probabilities: PerDirection::new(0.05, 0.05, 0.03, 0.03),
            emergency_probability: 0.1,
            normal_speed: 2.0,
            emergency_speed: 3.0,
            normal_size: 8.0,
            emergency_size: 12.0,
            lateral_jitter: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    pub width: f64,
    pub height: f64,
    /// Half the side of the square junction footprint around the centre.
    pub footprint_half_extent: f64,
    /// Distance of the spawn points from the edge they enter from.
    pub spawn_inset: f64,
    /// Vehicles are removed once they are this far outside the area.
    pub bounds_margin: f64,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            footprint_half_extent: 100.0,
            spawn_inset: 50.0,
            bounds_margin: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Dwell timer after a reset.
    pub initial_dwell: u32,
    /// Dwell timer after an expiry that did not switch.
    pub reevaluation_interval: u32,
    /// Average red-axis wait (ticks) that forces a switch.
    pub starvation_threshold: f64,
    pub low_volume_threshold: usize,
    pub high_volume_threshold: usize,
    pub base_time: f64,
    pub traffic_weight: f64,
    pub traffic_cap: f64,
    pub emergency_bonus: f64,
    pub wait_weight: f64,
    pub wait_cap: f64,
    pub max_duration: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            initial_dwell: 10,
            reevaluation_interval: 5,
            starvation_threshold: 20.0,
            low_volume_threshold: 2,
            high_volume_threshold: 4,
            base_time: 10.0,
            traffic_weight: 2.0,
            traffic_cap: 20.0,
            emergency_bonus: 10.0,
            wait_weight: 0.5,
            wait_cap: 15.0,
            max_duration: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Per vehicle moving on the green axis.
    pub green_move_weight: f64,
    /// Per vehicle moving against a red light (emergency or clearing the junction).
    pub other_move_weight: f64,
    /// Per accumulated waiting tick across all vehicles.
    pub wait_penalty: f64,
    /// Per emergency vehicle held up by a red light.
    pub emergency_wait_penalty: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            green_move_weight: 1.0,
            other_move_weight: 0.5,
            wait_penalty: 0.1,
            emergency_wait_penalty: 5.0,
        }
    }
}

impl SimulationConfig {
    /// Reads a JSON config file. Fields not present keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        let config: SimulationConfig = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Loads `path` if given (defaults otherwise), applies environment
    /// overrides and validates the result.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(episodes) = parse_override::<usize>(ENV_EPISODES)? {
            self.training.episodes = episodes;
        }
        if let Some(max_steps) = parse_override::<usize>(ENV_MAX_STEPS)? {
            self.training.max_steps = max_steps;
        }
        if let Some(seed) = parse_override::<u64>(ENV_SEED)? {
            self.seed = seed;
        }
        if let Ok(path) = env::var(ENV_TABLE_PATH) {
            self.training.table_path = PathBuf::from(path);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let probabilities = [
            ("spawn_probabilities.north", self.arrivals.spawn_probabilities.north),
            ("spawn_probabilities.south", self.arrivals.spawn_probabilities.south),
            ("spawn_probabilities.east", self.arrivals.spawn_probabilities.east),
            ("spawn_probabilities.west", self.arrivals.spawn_probabilities.west),
            ("emergency_probability", self.arrivals.emergency_probability),
            ("exploration_rate", self.agent.exploration_rate),
            ("min_exploration_rate", self.agent.min_exploration_rate),
            ("discount_factor", self.agent.discount_factor),
            ("exploration_decay", self.agent.exploration_decay),
        ];
        for (name, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if !(self.agent.learning_rate > 0.0 && self.agent.learning_rate <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "learning_rate must be within (0, 1], got {}",
                self.agent.learning_rate
            )));
        }
        if self.agent.exploration_rate < self.agent.min_exploration_rate {
            return Err(ConfigError::Invalid(format!(
                "exploration_rate {} is below min_exploration_rate {}",
                self.agent.exploration_rate, self.agent.min_exploration_rate
            )));
        }
        if self.training.save_interval == 0 {
            return Err(ConfigError::Invalid(
                "save_interval must be at least 1".to_string(),
            ));
        }
        let reward = &self.reward;
        if reward.green_move_weight <= 0.0
            || reward.other_move_weight <= 0.0
            || reward.wait_penalty <= 0.0
            || reward.emergency_wait_penalty < 0.0
        {
            return Err(ConfigError::Invalid(
                "movement and wait weights must be positive, emergency_wait_penalty non-negative"
                    .to_string(),
            ));
        }
        if self.controller.max_duration == 0 {
            return Err(ConfigError::Invalid(
                "max_duration must be at least 1 tick".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_override<T: FromStr>(var: &str) -> Result<Option<T>, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidOverride {
                var: var.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}
