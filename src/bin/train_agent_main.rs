// train_agent_main.rs
use adaptive_traffic_signal::monitoring::traffic_monitoring_system::{
    generate_report, log_episode_stats, plot_rewards, print_report,
};
use adaptive_traffic_signal::global_variables::DEFAULT_CONFIG_PATH;
use adaptive_traffic_signal::{CancellationToken, ControlLoop, SimulationConfig};
use std::env;
use std::path::PathBuf;
use std::process;

#[tokio::main]
async fn main() {
    env_logger::init();

    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| Some(PathBuf::from(DEFAULT_CONFIG_PATH)).filter(|p| p.exists()));
    let config = match SimulationConfig::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };
    let stats_path = config.training.stats_path.clone();
    let plot_path = config.training.plot_path.clone();

    // Ctrl-C requests a graceful stop; the loop saves the table before returning.
    let token = CancellationToken::new();
    let interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Interrupt received, finishing current step...");
            interrupt.cancel();
        }
    });

    log::info!(
        "Training for {} episodes of up to {} steps (seed {})",
        config.training.episodes,
        config.training.max_steps,
        config.seed
    );
    let training = tokio::task::spawn_blocking(move || {
        let mut control_loop = ControlLoop::new(&config, token);
        control_loop.run()
    });
    let report = match training.await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Training task failed: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = log_episode_stats(&stats_path, &report.episodes) {
        log::warn!("Failed to write episode stats to {}: {}", stats_path.display(), e);
    }
    if !report.episodes.is_empty() {
        if let Err(e) = plot_rewards(&plot_path, &report.episodes) {
            log::warn!("Failed to plot rewards: {}", e);
        }
    }
    if let Some(summary) = generate_report(&report.episodes) {
        print_report(&summary);
    }
    if report.cancelled {
        println!("Training interrupted after {} episodes", report.episodes.len());
    }
}
