//! Beestat - Honeybee Colony Report Generator
//!
//! Loads U.S. honeybee colony and stressor tables, cleans and joins them,
//! aggregates them for charts and tests whether net colony change differs
//! from zero.

pub mod charts;
pub mod cli;
pub mod config;
pub mod data;
pub mod pipeline;
pub mod report;
pub mod stats;
