// global_variables.rs

// Default file locations
pub const DEFAULT_CONFIG_PATH: &str = "traffic_rl.json";
pub const DEFAULT_TABLE_PATH: &str = "q_table.json";
pub const DEFAULT_STATS_PATH: &str = "episode_stats.csv";
pub const DEFAULT_REWARD_PLOT_PATH: &str = "rewards.png";

// Environment overrides
pub const ENV_EPISODES: &str = "TRAFFIC_RL_EPISODES";
pub const ENV_MAX_STEPS: &str = "TRAFFIC_RL_MAX_STEPS";
pub const ENV_SEED: &str = "TRAFFIC_RL_SEED";
pub const ENV_TABLE_PATH: &str = "TRAFFIC_RL_TABLE_PATH";

// Encoded state layout: (north, south, east, west, light_ns,
// emergency_ns, emergency_ew, north_wait, south_wait, east_wait, west_wait)
pub const STATE_ARITY: usize = 11;
pub const STATE_DIMENSIONS: [usize; STATE_ARITY] = [5, 5, 5, 5, 2, 5, 5, 5, 5, 5, 5];
pub const ACTION_COUNT: usize = 2;

// Discretisation
pub const MAX_ENCODED_COUNT: usize = 4;
pub const WAIT_BIN_TICKS: u32 = 10;
