//! Core domain types and logic: trade-day arithmetic, rolling statistics,
//! signal pairing, backtest simulation and performance metrics.

pub mod series;
pub mod calendar;
pub mod rolling;
pub mod signal;
pub mod periods;
pub mod backtest;
pub mod metrics;
pub mod config_validation;
pub mod error;
