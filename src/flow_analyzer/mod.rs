// flow_analyzer/mod.rs

pub mod state_encoder;
pub mod traffic_analyzer;
