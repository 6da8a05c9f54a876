// learning/mod.rs

pub mod agent;
pub mod persistence;
pub mod q_table;
