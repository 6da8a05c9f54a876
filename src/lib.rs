// lib.rs
//
// Adaptive signal control for a single four-way intersection: a discrete-time
// traffic microsimulation and a tabular Q-learning agent that decides when
// the signal should switch.

pub mod config;
pub mod control_system;
pub mod error;
pub mod flow_analyzer;
pub mod global_variables;
pub mod learning;
pub mod monitoring;
pub mod shared_data;
pub mod simulation_engine;
pub mod training;

pub use config::SimulationConfig;
pub use control_system::traffic_light_controller::{Action, SignalController, SignalState};
pub use error::{ConfigError, EnvError, PersistError};
pub use flow_analyzer::state_encoder::{encode, EncodedState};
pub use learning::agent::QLearningAgent;
pub use simulation_engine::simulation::IntersectionEnvironment;
pub use training::cancellation::CancellationToken;
pub use training::control_loop::ControlLoop;
