// simulation.rs
use crate::config::{RewardConfig, SimulationConfig};
use crate::control_system::traffic_light_controller::{
    Action, AxisSnapshot, SignalController, SignalState, SwitchReason, TrafficSnapshot,
};
use crate::error::EnvError;
use crate::shared_data::{FeedRecord, Observation, PerDirection, StepOutcome};
use crate::simulation_engine::arrivals::VehicleArrivalModel;
use crate::simulation_engine::intersections::Intersection;
use crate::simulation_engine::vehicles::{Axis, Vehicle};
use rand::Rng;
use std::convert::TryFrom;

/// Where this tick's new vehicles come from.
enum ArrivalInput<'a> {
    Simulated,
    Feed(&'a FeedRecord),
}

/// Vehicles that moved during a tick, split by whether their light was green.
#[derive(Debug, Default, Clone, Copy)]
struct MovementTally {
    moving_on_green: usize,
    moving_elsewhere: usize,
}

/// Discrete-time simulation of the four-way intersection. One call to
/// `step` is one tick: signal, arrivals, movement, removal, reward.
pub struct IntersectionEnvironment {
    intersection: Intersection,
    arrivals: VehicleArrivalModel,
    controller: SignalController,
    reward_config: RewardConfig,
    vehicles: Vec<Vehicle>,
    wait_accumulator: PerDirection<u32>,
    horizon: usize,
    step_count: usize,
    vehicles_passed: usize,
    held_vehicle_ticks: u64,
}

impl IntersectionEnvironment {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            intersection: Intersection::new(&config.geometry),
            arrivals: VehicleArrivalModel::new(config.arrivals.clone()),
            controller: SignalController::new(config.controller.clone()),
            reward_config: config.reward.clone(),
            vehicles: Vec::new(),
            wait_accumulator: PerDirection::default(),
            horizon: config.training.horizon,
            step_count: 0,
            vehicles_passed: 0,
            held_vehicle_ticks: 0,
        }
    }

    /// Clears the scene, restores north-south green and returns the first observation.
    pub fn reset(&mut self) -> Observation {
        self.vehicles.clear();
        self.controller.reset();
        self.wait_accumulator = PerDirection::default();
        self.step_count = 0;
        self.vehicles_passed = 0;
        self.held_vehicle_ticks = 0;
        self.observe()
    }

    /// Advances one tick with simulated arrivals. `action` must be 0
    /// (north-south green) or 1 (east-west green); anything else is rejected
    /// before the environment is touched.
    pub fn step<R: Rng>(&mut self, action: usize, rng: &mut R) -> Result<StepOutcome, EnvError> {
        let action = Action::try_from(action)?;
        Ok(self.step_action(action, rng))
    }

    pub fn step_action<R: Rng>(&mut self, action: Action, rng: &mut R) -> StepOutcome {
        self.advance(action, ArrivalInput::Simulated, rng)
    }

    /// Same as `step`, but this tick's arrivals come from an external counter
    /// instead of the stochastic spawner.
    pub fn step_with_feed<R: Rng>(
        &mut self,
        action: usize,
        record: &FeedRecord,
        rng: &mut R,
    ) -> Result<StepOutcome, EnvError> {
        let action = Action::try_from(action)?;
        Ok(self.step_action_with_feed(action, record, rng))
    }

    pub fn step_action_with_feed<R: Rng>(
        &mut self,
        action: Action,
        record: &FeedRecord,
        rng: &mut R,
    ) -> StepOutcome {
        self.advance(action, ArrivalInput::Feed(record), rng)
    }

    fn advance<R: Rng>(
        &mut self,
        action: Action,
        input: ArrivalInput<'_>,
        rng: &mut R,
    ) -> StepOutcome {
        // 1. Signal
        let snapshot = self.traffic_snapshot();
        let switched: Option<SwitchReason> = self.controller.evaluate(action, &snapshot);

        // 2. Arrivals
        let spawned = match input {
            ArrivalInput::Simulated => self.arrivals.spawn(&self.intersection, rng),
            ArrivalInput::Feed(record) => {
                self.arrivals
                    .top_up_from_feed(record, &self.vehicles, &self.intersection, rng)
            }
        };
        self.vehicles.extend(spawned);

        // 3. Movement
        let tally = self.move_vehicles();

        // 4. Removal
        let before = self.vehicles.len();
        let intersection = &self.intersection;
        self.vehicles.retain(|v| intersection.in_bounds(v));
        self.vehicles_passed += before - self.vehicles.len();

        // 5. Reward
        let reward = self.compute_reward(&tally);

        // 6. Horizon
        self.step_count += 1;
        let done = self.step_count >= self.horizon;

        StepOutcome {
            observation: self.observe(),
            reward,
            done,
            switched,
        }
    }

    fn move_vehicles(&mut self) -> MovementTally {
        self.wait_accumulator = PerDirection::default();
        let signal = self.controller.state();
        let mut tally = MovementTally::default();

        for vehicle in self.vehicles.iter_mut() {
            let green = signal.is_green(vehicle.axis());
            let committed = self.intersection.in_footprint(vehicle);
            if vehicle.is_emergency || green || committed {
                vehicle.advance();
                if green {
                    tally.moving_on_green += 1;
                } else {
                    tally.moving_elsewhere += 1;
                }
            } else {
                vehicle.hold();
                self.wait_accumulator[vehicle.direction] += 1;
                self.held_vehicle_ticks += 1;
            }
        }
        tally
    }

    fn compute_reward(&self, tally: &MovementTally) -> f64 {
        let c = &self.reward_config;
        let total_wait: u64 = self.vehicles.iter().map(|v| v.waiting_ticks as u64).sum();
        let red = self.controller.state().red_axis();
        let blocked_emergency = self
            .vehicles
            .iter()
            .filter(|v| v.is_emergency && v.axis() == red && self.intersection.is_approaching(v))
            .count();

        c.green_move_weight * tally.moving_on_green as f64
            + c.other_move_weight * tally.moving_elsewhere as f64
            - c.wait_penalty * total_wait as f64
            - c.emergency_wait_penalty * blocked_emergency as f64
    }

    /// Per-axis queue readings handed to the signal controller.
    pub fn traffic_snapshot(&self) -> TrafficSnapshot {
        TrafficSnapshot {
            ns: self.axis_snapshot(Axis::NorthSouth),
            ew: self.axis_snapshot(Axis::EastWest),
        }
    }

    fn axis_snapshot(&self, axis: Axis) -> AxisSnapshot {
        let mut snapshot = AxisSnapshot::default();
        let mut total_wait = 0u64;
        for vehicle in self.vehicles.iter().filter(|v| v.axis() == axis) {
            snapshot.queued += 1;
            total_wait += vehicle.waiting_ticks as u64;
            if vehicle.is_emergency {
                snapshot.emergency_count += 1;
                if self.intersection.is_approaching(vehicle) {
                    snapshot.approaching_emergency += 1;
                }
            }
        }
        if snapshot.queued > 0 {
            snapshot.average_wait = total_wait as f64 / snapshot.queued as f64;
        }
        snapshot
    }

    pub fn observe(&self) -> Observation {
        let mut observation = Observation {
            waiting_this_tick: self.wait_accumulator,
            ns_green: self.controller.state().ns_green(),
            dwell_timer: self.controller.dwell_timer(),
            ..Observation::default()
        };
        for vehicle in &self.vehicles {
            observation.counts[vehicle.direction] += 1;
            let longest = &mut observation.wait_ticks[vehicle.direction];
            *longest = (*longest).max(vehicle.waiting_ticks);
            if vehicle.is_emergency {
                match vehicle.axis() {
                    Axis::NorthSouth => observation.emergency_ns += 1,
                    Axis::EastWest => observation.emergency_ew += 1,
                }
            }
        }
        observation
    }

    /// Places a vehicle directly into the scene (scripted scenarios, replays).
    pub fn insert_vehicle(&mut self, vehicle: Vehicle) {
        self.vehicles.push(vehicle);
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn intersection(&self) -> &Intersection {
        &self.intersection
    }

    pub fn signal_state(&self) -> SignalState {
        self.controller.state()
    }

    pub fn dwell_timer(&self) -> u32 {
        self.controller.dwell_timer()
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn switch_count(&self) -> usize {
        self.controller.switch_count()
    }

    /// Vehicles that left the simulation area since the last reset.
    pub fn vehicles_passed(&self) -> usize {
        self.vehicles_passed
    }

    /// Mean number of held vehicles per tick since the last reset.
    pub fn mean_waiting_vehicles(&self) -> f64 {
        if self.step_count == 0 {
            0.0
        } else {
            self.held_vehicle_ticks as f64 / self.step_count as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation_engine::vehicles::Direction;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn quiet_config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.arrivals.spawn_probabilities = PerDirection::default();
        config
    }

    fn vehicle(id: u64, direction: Direction, position: (f64, f64), emergency: bool) -> Vehicle {
        Vehicle::new(id, direction, position, 2.0, 8.0, emergency)
    }

    #[test]
    fn red_axis_vehicle_waits_and_accumulates() {
        let mut env = IntersectionEnvironment::new(&quiet_config());
        let mut rng = StdRng::seed_from_u64(1);
        env.reset();
        env.insert_vehicle(vehicle(1, Direction::East, (50.0, 300.0), false));
        env.insert_vehicle(vehicle(2, Direction::North, (400.0, 550.0), false));

        let outcome = env.step(0, &mut rng).unwrap();
        let east = &env.vehicles()[0];
        let north = &env.vehicles()[1];
        assert_eq!((east.x, east.waiting_ticks), (50.0, 1));
        assert_eq!((north.y, north.waiting_ticks), (548.0, 0));
        assert_eq!(outcome.observation.waiting_this_tick.east, 1);
        assert_eq!(outcome.observation.wait_ticks.east, 1);
        // +1 for the moving northbound vehicle, -0.1 for one waiting tick.
        assert!((outcome.reward - 0.9).abs() < 1e-9);
    }

    #[test]
    fn vehicle_inside_footprint_finishes_crossing_on_red() {
        let mut env = IntersectionEnvironment::new(&quiet_config());
        let mut rng = StdRng::seed_from_u64(1);
        env.reset();
        env.insert_vehicle(vehicle(1, Direction::East, (350.0, 300.0), false));
        let outcome = env.step(0, &mut rng).unwrap();
        assert_eq!(env.vehicles()[0].x, 352.0);
        assert!((outcome.reward - 0.5).abs() < 1e-9);
    }

    #[test]
    fn vehicles_leaving_bounds_are_removed() {
        let mut env = IntersectionEnvironment::new(&quiet_config());
        let mut rng = StdRng::seed_from_u64(1);
        env.reset();
        env.insert_vehicle(vehicle(1, Direction::North, (400.0, -19.0), false));
        env.step(0, &mut rng).unwrap();
        assert!(env.vehicles().is_empty());
        assert_eq!(env.vehicles_passed(), 1);
    }

    #[test]
    fn done_at_horizon() {
        let mut config = quiet_config();
        config.training.horizon = 3;
        let mut env = IntersectionEnvironment::new(&config);
        let mut rng = StdRng::seed_from_u64(1);
        env.reset();
        assert!(!env.step(0, &mut rng).unwrap().done);
        assert!(!env.step(0, &mut rng).unwrap().done);
        assert!(env.step(0, &mut rng).unwrap().done);
    }

    #[test]
    fn feed_replaces_spawner() {
        let mut env = IntersectionEnvironment::new(&SimulationConfig::default());
        let mut rng = StdRng::seed_from_u64(1);
        env.reset();
        let record = FeedRecord {
            north: 2,
            south: 0,
            east: 0,
            west: 1,
            emergency_ns: false,
            emergency_ew: false,
        };
        let outcome = env.step_with_feed(0, &record, &mut rng).unwrap();
        assert_eq!(outcome.observation.counts, PerDirection::new(2, 0, 0, 1));
    }
}
