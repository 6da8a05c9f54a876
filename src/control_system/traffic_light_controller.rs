// traffic_light_controller.rs
//
// Two-phase signal for the single intersection. The learner requests an axis;
// the controller decides whether the signal actually switches this tick.

use crate::config::ControllerConfig;
use crate::error::EnvError;
use crate::simulation_engine::vehicles::Axis;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightState {
    Green,
    Red,
}

impl LightState {
    pub fn opposite(self) -> LightState {
        match self {
            LightState::Green => LightState::Red,
            LightState::Red => LightState::Green,
        }
    }
}

/// Both axis lights. `ew` is always the opposite of `ns`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalState {
    pub ns: LightState,
    pub ew: LightState,
}

impl SignalState {
    pub fn with_green(axis: Axis) -> Self {
        let ns = match axis {
            Axis::NorthSouth => LightState::Green,
            Axis::EastWest => LightState::Red,
        };
        Self {
            ns,
            ew: ns.opposite(),
        }
    }

    pub fn green_axis(&self) -> Axis {
        match self.ns {
            LightState::Green => Axis::NorthSouth,
            LightState::Red => Axis::EastWest,
        }
    }

    pub fn red_axis(&self) -> Axis {
        self.green_axis().opposite()
    }

    pub fn is_green(&self, axis: Axis) -> bool {
        self.green_axis() == axis
    }

    pub fn ns_green(&self) -> bool {
        self.ns == LightState::Green
    }

    fn flip(&mut self) {
        *self = SignalState::with_green(self.red_axis());
    }
}

/// The learner's request for the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    NsGreen = 0,
    EwGreen = 1,
}

impl Action {
    pub const ALL: [Action; 2] = [Action::NsGreen, Action::EwGreen];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn requested_axis(self) -> Axis {
        match self {
            Action::NsGreen => Axis::NorthSouth,
            Action::EwGreen => Axis::EastWest,
        }
    }

    pub fn for_axis(axis: Axis) -> Action {
        match axis {
            Axis::NorthSouth => Action::NsGreen,
            Axis::EastWest => Action::EwGreen,
        }
    }
}

impl TryFrom<usize> for Action {
    type Error = EnvError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Action::NsGreen),
            1 => Ok(Action::EwGreen),
            other => Err(EnvError::InvalidAction(other)),
        }
    }
}

/// Queue readings for one axis at the start of a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AxisSnapshot {
    /// Vehicles present on the axis.
    pub queued: usize,
    pub emergency_count: usize,
    /// Emergency vehicles that have not yet reached the junction.
    pub approaching_emergency: usize,
    /// Mean waiting counter over the axis' vehicles, 0 when empty.
    pub average_wait: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrafficSnapshot {
    pub ns: AxisSnapshot,
    pub ew: AxisSnapshot,
}

impl TrafficSnapshot {
    pub fn axis(&self, axis: Axis) -> &AxisSnapshot {
        match axis {
            Axis::NorthSouth => &self.ns,
            Axis::EastWest => &self.ew,
        }
    }
}

/// Why the signal switched, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwitchReason {
    EmergencyOverride,
    Starvation,
    AgentRequest,
    VolumeImbalance,
}

pub struct SignalController {
    config: ControllerConfig,
    state: SignalState,
    dwell_timer: u32,
    switch_count: usize,
}

impl SignalController {
    pub fn new(config: ControllerConfig) -> Self {
        let dwell_timer = config.initial_dwell;
        Self {
            config,
            state: SignalState::with_green(Axis::NorthSouth),
            dwell_timer,
            switch_count: 0,
        }
    }

    /// North-south green with a fresh dwell timer.
    pub fn reset(&mut self) {
        self.state = SignalState::with_green(Axis::NorthSouth);
        self.dwell_timer = self.config.initial_dwell;
        self.switch_count = 0;
    }

    pub fn state(&self) -> SignalState {
        self.state
    }

    pub fn dwell_timer(&self) -> u32 {
        self.dwell_timer
    }

    pub fn switch_count(&self) -> usize {
        self.switch_count
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Runs once per tick. Overrides bypass the dwell timer; otherwise a
    /// switch is only considered once the timer has run out. The timer
    /// decrements by one at the end of every call.
    pub fn evaluate(
        &mut self,
        requested: Action,
        snapshot: &TrafficSnapshot,
    ) -> Option<SwitchReason> {
        let decision = self.decide(requested, snapshot);

        match decision {
            Some(reason) => {
                self.state.flip();
                let green = snapshot.axis(self.state.green_axis());
                self.dwell_timer = self.green_duration(green);
                self.switch_count += 1;
                log::debug!(
                    "Signal switched to {:?} green ({:?}), dwell {} ticks",
                    self.state.green_axis(),
                    reason,
                    self.dwell_timer
                );
            }
            None if self.dwell_timer == 0 => {
                self.dwell_timer = self.config.reevaluation_interval;
            }
            None => {}
        }

        self.dwell_timer = self.dwell_timer.saturating_sub(1);
        decision
    }

    fn decide(&self, requested: Action, snapshot: &TrafficSnapshot) -> Option<SwitchReason> {
        let green = snapshot.axis(self.state.green_axis());
        let red = snapshot.axis(self.state.red_axis());

        // An emergency already served by the green axis holds the phase.
        if red.approaching_emergency > 0 && green.approaching_emergency == 0 {
            return Some(SwitchReason::EmergencyOverride);
        }
        if red.queued > 0 && red.average_wait >= self.config.starvation_threshold {
            return Some(SwitchReason::Starvation);
        }
        if self.dwell_timer > 0 {
            return None;
        }
        if requested.requested_axis() == self.state.red_axis() {
            return Some(SwitchReason::AgentRequest);
        }
        let imbalance = green.queued < self.config.low_volume_threshold
            && red.queued > self.config.high_volume_threshold;
        let idle_green = green.queued == 0 && red.queued > 0;
        if imbalance || idle_green {
            return Some(SwitchReason::VolumeImbalance);
        }
        None
    }

    /// Green phase length for the axis about to turn green, clamped to
    /// `[1, max_duration]`.
    pub fn green_duration(&self, axis: &AxisSnapshot) -> u32 {
        let c = &self.config;
        let traffic = (axis.queued as f64 * c.traffic_weight).min(c.traffic_cap);
        let emergency = axis.emergency_count as f64 * c.emergency_bonus;
        let wait = (axis.average_wait * c.wait_weight).min(c.wait_cap);
        let total = c.base_time + traffic + emergency + wait;
        let max = c.max_duration.max(1) as f64;
        total.clamp(1.0, max).round() as u32
    }
}
