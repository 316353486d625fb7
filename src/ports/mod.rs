//! Port traits: the boundary between the engine and its collaborators.

pub mod config_port;
pub mod data_port;
pub mod strategy_sink;
