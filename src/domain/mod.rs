//! Core domain types and analytics. No I/O happens here.

pub mod chart;
pub mod config;
pub mod error;
pub mod game;
pub mod portfolio;
pub mod price;
pub mod regression;
pub mod returns;
pub mod stats;
