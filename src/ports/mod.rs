//! Capability traits the pipelines depend on.

pub mod chart_port;
pub mod config_port;
pub mod data_port;
