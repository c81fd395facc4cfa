//! Core domain types and logic.

pub mod error;
pub mod unit;
pub mod decimal;
pub mod measurement;
pub mod series;
pub mod internal_value;
pub mod sandbox;
pub mod rejection;
pub mod algorithm;
pub mod runner;
pub mod config_validation;
