// arrivals.rs
//
// Vehicle arrival model: independent Bernoulli spawning per direction, plus the
// live-feed path that tops the scene up to externally counted occupancy.

use crate::config::ArrivalConfig;
use crate::shared_data::{FeedRecord, PerDirection};
use crate::simulation_engine::intersections::Intersection;
use crate::simulation_engine::vehicles::{Axis, Direction, Vehicle};
use rand::Rng;
use std::error::Error;
use std::fs::File;
use std::path::Path;

pub struct VehicleArrivalModel {
    config: ArrivalConfig,
    next_vehicle_id: u64,
}

impl VehicleArrivalModel {
    pub fn new(config: ArrivalConfig) -> Self {
        Self {
            config,
            next_vehicle_id: 1,
        }
    }

    pub fn config(&self) -> &ArrivalConfig {
        &self.config
    }

    /// One Bernoulli trial per direction. Directions never influence each other.
    pub fn spawn<R: Rng + ?Sized>(
        &mut self,
        intersection: &Intersection,
        rng: &mut R,
    ) -> Vec<Vehicle> {
        let mut spawned = Vec::new();
        for direction in Direction::ALL {
            let p = self.config.spawn_probabilities[direction];
            if sample(rng, p) {
                let is_emergency = sample(rng, self.config.emergency_probability);
                spawned.push(self.spawn_vehicle(direction, is_emergency, intersection, rng));
            }
        }
        spawned
    }

    /// Builds a vehicle at the direction's entry point with lateral jitter.
    pub fn spawn_vehicle<R: Rng + ?Sized>(
        &mut self,
        direction: Direction,
        is_emergency: bool,
        intersection: &Intersection,
        rng: &mut R,
    ) -> Vehicle {
        let (mut x, mut y) = intersection.spawn_point(direction);
        let jitter = self.config.lateral_jitter;
        let offset = if jitter > 0.0 {
            rng.random_range(-jitter..=jitter)
        } else {
            0.0
        };
        match direction.axis() {
            Axis::NorthSouth => x += offset,
            Axis::EastWest => y += offset,
        }

        let (speed, size) = if is_emergency {
            (self.config.emergency_speed, self.config.emergency_size)
        } else {
            (self.config.normal_speed, self.config.normal_size)
        };

        let vehicle = Vehicle::new(
            self.next_vehicle_id,
            direction,
            (x, y),
            speed,
            size,
            is_emergency,
        );
        self.next_vehicle_id += 1;
        vehicle
    }

    /// Brings the approaching vehicles up to the occupancy reported by an
    /// external counter. Vehicles past the junction edge are not counted.
    /// Directions already at or above the reported count are left alone; an
    /// axis flagged as carrying an emergency vehicle gets one if none is
    /// approaching.
    pub fn top_up_from_feed<R: Rng + ?Sized>(
        &mut self,
        record: &FeedRecord,
        present: &[Vehicle],
        intersection: &Intersection,
        rng: &mut R,
    ) -> Vec<Vehicle> {
        let reported = record.counts();
        let approaching: Vec<&Vehicle> = present
            .iter()
            .filter(|v| intersection.is_approaching(v))
            .collect();
        let mut counts: PerDirection<usize> = PerDirection::default();
        for vehicle in &approaching {
            counts[vehicle.direction] += 1;
        }

        let mut spawned = Vec::new();
        for (axis, flagged) in [
            (Axis::NorthSouth, record.emergency_ns),
            (Axis::EastWest, record.emergency_ew),
        ] {
            let has_emergency = approaching
                .iter()
                .any(|v| v.is_emergency && v.axis() == axis);
            if flagged && !has_emergency {
                let [first, second] = axis.directions();
                let direction = if reported[first] == 0 && reported[second] > 0 {
                    second
                } else {
                    first
                };
                spawned.push(self.spawn_vehicle(direction, true, intersection, rng));
                counts[direction] += 1;
            }
        }

        for direction in Direction::ALL {
            while counts[direction] < reported[direction] {
                spawned.push(self.spawn_vehicle(direction, false, intersection, rng));
                counts[direction] += 1;
            }
        }
        spawned
    }
}

fn sample<R: Rng + ?Sized>(rng: &mut R, probability: f64) -> bool {
    probability > 0.0 && rng.random::<f64>() < probability
}

/// Reads recorded feed ticks (`north,south,east,west,emergency_ns,emergency_ew`).
pub fn read_feed_csv(path: &Path) -> Result<Vec<FeedRecord>, Box<dyn Error>> {
    let file = File::open(path)?;
    let mut rdr = csv::Reader::from_reader(file);
    let mut records = Vec::new();
    for result in rdr.deserialize() {
        let record: FeedRecord = result?;
        records.push(record);
    }
    Ok(records)
}
