// traffic_monitoring_system.rs

use crate::shared_data::EpisodeStats;
use plotters::prelude::*;
use serde::Serialize;
use std::error::Error;
use std::fs::{File, OpenOptions};
use std::path::Path;

/// Generic helper to append a record to a CSV file, writing the header only
/// when the file is new.
fn log_to_csv<T: Serialize>(path: &Path, record: &T) -> Result<(), Box<dyn Error>> {
    let file_exists = path.exists();
    let file = OpenOptions::new().append(true).create(true).open(path)?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);
    wtr.serialize(record)?;
    wtr.flush()?;
    Ok(())
}

pub fn log_episode_stats(path: &Path, episodes: &[EpisodeStats]) -> Result<(), Box<dyn Error>> {
    for stats in episodes {
        log_to_csv(path, stats)?;
    }
    Ok(())
}

pub fn read_episode_stats(path: &Path) -> Result<Vec<EpisodeStats>, Box<dyn Error>> {
    let file = File::open(path)?;
    let mut rdr = csv::Reader::from_reader(file);
    let mut episodes = Vec::new();
    for result in rdr.deserialize() {
        let record: EpisodeStats = result?;
        episodes.push(record);
    }
    Ok(episodes)
}

/// Aggregate view over a set of episode records.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSummary {
    pub episodes: usize,
    pub completed: usize,
    pub best_reward: f64,
    pub mean_reward: f64,
    pub last_epsilon: f64,
    pub mean_waiting_vehicles: f64,
    pub vehicles_passed: usize,
}

pub fn generate_report(episodes: &[EpisodeStats]) -> Option<ReportSummary> {
    let last = episodes.last()?;
    let n = episodes.len() as f64;
    Some(ReportSummary {
        episodes: episodes.len(),
        completed: episodes.iter().filter(|e| e.completed).count(),
        best_reward: episodes
            .iter()
            .map(|e| e.total_reward)
            .fold(f64::NEG_INFINITY, f64::max),
        mean_reward: episodes.iter().map(|e| e.total_reward).sum::<f64>() / n,
        last_epsilon: last.epsilon,
        mean_waiting_vehicles: episodes.iter().map(|e| e.mean_waiting_vehicles).sum::<f64>() / n,
        vehicles_passed: episodes.iter().map(|e| e.vehicles_passed).sum(),
    })
}

pub fn print_report(summary: &ReportSummary) {
    println!("Report Summary:");
    println!("Episodes: {} ({} completed)", summary.episodes, summary.completed);
    println!("Best reward: {:.1}", summary.best_reward);
    println!("Mean reward: {:.1}", summary.mean_reward);
    println!("Final epsilon: {:.3}", summary.last_epsilon);
    println!(
        "Mean vehicles waiting per tick: {:.2}",
        summary.mean_waiting_vehicles
    );
    println!("Vehicles passed: {}", summary.vehicles_passed);
}

/// Renders total reward per episode as a line chart.
pub fn plot_rewards(path: &Path, episodes: &[EpisodeStats]) -> Result<(), Box<dyn Error>> {
    if episodes.is_empty() {
        return Err("no episodes to plot".into());
    }

    let mut min_reward = episodes
        .iter()
        .map(|e| e.total_reward)
        .fold(f64::INFINITY, f64::min);
    let mut max_reward = episodes
        .iter()
        .map(|e| e.total_reward)
        .fold(f64::NEG_INFINITY, f64::max);
    if (max_reward - min_reward).abs() < f64::EPSILON {
        min_reward -= 1.0;
        max_reward += 1.0;
    }
    let last_episode = episodes.len() as f64 + 1.0;

    let backend = BitMapBackend::new(path, (1000, 500));
    let root = backend.into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Rewards per Episode", ("sans-serif", 20))
        .margin(40)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..last_episode, min_reward..max_reward)?;

    chart
        .configure_mesh()
        .x_desc("Episode")
        .y_desc("Total Reward")
        .draw()?;
    chart.draw_series(LineSeries::new(
        episodes.iter().map(|e| (e.episode as f64, e.total_reward)),
        &BLUE,
    ))?;
    chart.draw_series(
        episodes
            .iter()
            .map(|e| Circle::new((e.episode as f64, e.total_reward), 3, BLUE.filled())),
    )?;

    root.present()?;
    log::info!("Reward plot saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn stats(episode: usize, total_reward: f64, completed: bool) -> EpisodeStats {
        EpisodeStats {
            episode,
            steps: 1000,
            total_reward,
            epsilon: 0.5,
            vehicles_passed: 10,
            mean_waiting_vehicles: 1.5,
            switches: 4,
            completed,
        }
    }

    #[test]
    fn csv_log_appends_with_single_header() {
        let dir = std::env::temp_dir().join("traffic_rl_monitoring_csv");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("episode_stats.csv");

        log_episode_stats(&path, &[stats(1, -10.0, true)]).unwrap();
        log_episode_stats(&path, &[stats(2, 5.0, true), stats(3, 2.0, false)]).unwrap();

        let restored = read_episode_stats(&path).unwrap();
        assert_eq!(restored.len(), 3);
        assert_eq!(restored[1].total_reward, 5.0);
        assert!(!restored[2].completed);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn report_aggregates_episodes() {
        let summary = generate_report(&[stats(1, -10.0, true), stats(2, 4.0, false)]).unwrap();
        assert_eq!(summary.episodes, 2);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.best_reward, 4.0);
        assert_eq!(summary.mean_reward, -3.0);
        assert_eq!(summary.vehicles_passed, 20);
        assert!(generate_report(&[]).is_none());
    }
}
