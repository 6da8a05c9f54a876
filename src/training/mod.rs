// training/mod.rs

pub mod cancellation;
pub mod control_loop;
pub mod evaluation;
