//! quantwork: CAPM regression, portfolio risk/return and Nash equilibria.
//!
//! Hexagonal architecture: analytics in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], console output in [`report`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
pub mod report;
