// traffic_monitoring_system_main.rs
//
// Summarises a training run from its episode CSV and redraws the reward chart.
use adaptive_traffic_signal::global_variables::{DEFAULT_REWARD_PLOT_PATH, DEFAULT_STATS_PATH};
use adaptive_traffic_signal::monitoring::traffic_monitoring_system::{
    generate_report, plot_rewards, print_report, read_episode_stats,
};
use std::env;
use std::path::PathBuf;
use std::process;

fn main() {
    env_logger::init();

    let stats_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATS_PATH));
    let plot_path = env::args()
        .nth(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_REWARD_PLOT_PATH));

    let episodes = match read_episode_stats(&stats_path) {
        Ok(episodes) => episodes,
        Err(e) => {
            eprintln!("Failed to read {}: {}", stats_path.display(), e);
            process::exit(1);
        }
    };

    match generate_report(&episodes) {
        Some(summary) => print_report(&summary),
        None => {
            println!("No episodes recorded in {}", stats_path.display());
            return;
        }
    }
    if let Err(e) = plot_rewards(&plot_path, &episodes) {
        eprintln!("Failed to plot rewards: {}", e);
    }
}
