//! Concrete adapter implementations for ports.

pub mod caching_data_port;
pub mod csv_adapter;
pub mod file_config_adapter;
pub mod json_strategy_sink;
