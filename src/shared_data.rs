// shared_data.rs

use crate::control_system::traffic_light_controller::SwitchReason;
use crate::simulation_engine::vehicles::Direction;
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// One value per approach direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerDirection<T> {
    pub north: T,
    pub south: T,
    pub east: T,
    pub west: T,
}

impl<T> PerDirection<T> {
    pub fn new(north: T, south: T, east: T, west: T) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }
}

impl<T> Index<Direction> for PerDirection<T> {
    type Output = T;

    fn index(&self, direction: Direction) -> &T {
        match direction {
            Direction::North => &self.north,
            Direction::South => &self.south,
            Direction::East => &self.east,
            Direction::West => &self.west,
        }
    }
}

impl<T> IndexMut<Direction> for PerDirection<T> {
    fn index_mut(&mut self, direction: Direction) -> &mut T {
        match direction {
            Direction::North => &mut self.north,
            Direction::South => &mut self.south,
            Direction::East => &mut self.east,
            Direction::West => &mut self.west,
        }
    }
}

/// Raw readings of the intersection after a tick. The state encoder turns
/// this into the table key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Vehicles present per direction.
    pub counts: PerDirection<usize>,
    /// Emergency vehicles present on the north-south axis.
    pub emergency_ns: usize,
    /// Emergency vehicles present on the east-west axis.
    pub emergency_ew: usize,
    /// Longest waiting counter among the vehicles of each direction.
    pub wait_ticks: PerDirection<u32>,
    /// Vehicles that could not move during the last tick, per direction.
    pub waiting_this_tick: PerDirection<u32>,
    pub ns_green: bool,
    pub dwell_timer: u32,
}

/// Per-tick record handed over by an external vehicle counter (camera
/// pipeline or recorded feed). Replaces the simulated spawner for that tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedRecord {
    pub north: usize,
    pub south: usize,
    pub east: usize,
    pub west: usize,
    #[serde(default)]
    pub emergency_ns: bool,
    #[serde(default)]
    pub emergency_ew: bool,
}

impl FeedRecord {
    pub fn counts(&self) -> PerDirection<usize> {
        PerDirection::new(self.north, self.south, self.east, self.west)
    }
}

/// Result of a single environment tick.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub observation: Observation,
    pub reward: f64,
    pub done: bool,
    /// Set when the signal switched during this tick.
    pub switched: Option<SwitchReason>,
}

/// Summary of one episode, also the CSV row written by the monitoring system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeStats {
    pub episode: usize,
    pub steps: usize,
    pub total_reward: f64,
    pub epsilon: f64,
    pub vehicles_passed: usize,
    /// Mean number of vehicles held at a red light per tick.
    pub mean_waiting_vehicles: f64,
    pub switches: usize,
    pub completed: bool,
}

/// Everything a run of the control loop produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingReport {
    pub episodes: Vec<EpisodeStats>,
    pub cancelled: bool,
}

impl TrainingReport {
    pub fn rewards(&self) -> Vec<f64> {
        self.episodes.iter().map(|e| e.total_reward).collect()
    }
}
