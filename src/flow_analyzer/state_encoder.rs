// state_encoder.rs

use crate::global_variables::{MAX_ENCODED_COUNT, STATE_ARITY, WAIT_BIN_TICKS};
use crate::shared_data::Observation;
use serde::{Deserialize, Serialize};

/// Bounded discrete view of an observation, used only as a table key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncodedState {
    pub north: u8,
    pub south: u8,
    pub east: u8,
    pub west: u8,
    pub light_ns: u8,
    pub emergency_ns: u8,
    pub emergency_ew: u8,
    pub north_wait: u8,
    pub south_wait: u8,
    pub east_wait: u8,
    pub west_wait: u8,
}

impl EncodedState {
    /// Fixed index tuple in table dimension order.
    pub fn to_index(&self) -> [usize; STATE_ARITY] {
        [
            self.north as usize,
            self.south as usize,
            self.east as usize,
            self.west as usize,
            self.light_ns as usize,
            self.emergency_ns as usize,
            self.emergency_ew as usize,
            self.north_wait as usize,
            self.south_wait as usize,
            self.east_wait as usize,
            self.west_wait as usize,
        ]
    }
}

pub fn clip_count(count: usize) -> u8 {
    count.min(MAX_ENCODED_COUNT) as u8
}

/// Waiting ticks in bins of ten, clipped to the last bin.
pub fn bin_wait(wait_ticks: u32) -> u8 {
    (wait_ticks / WAIT_BIN_TICKS).min(MAX_ENCODED_COUNT as u32) as u8
}

pub fn encode(observation: &Observation) -> EncodedState {
    let counts = &observation.counts;
    let waits = &observation.wait_ticks;
    EncodedState {
        north: clip_count(counts.north),
        south: clip_count(counts.south),
        east: clip_count(counts.east),
        west: clip_count(counts.west),
        light_ns: u8::from(observation.ns_green),
        emergency_ns: clip_count(observation.emergency_ns),
        emergency_ew: clip_count(observation.emergency_ew),
        north_wait: bin_wait(waits.north),
        south_wait: bin_wait(waits.south),
        east_wait: bin_wait(waits.east),
        west_wait: bin_wait(waits.west),
    }
}
