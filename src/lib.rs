//! Common functionality for the decarbonisation pathway simulator.
#![warn(missing_docs)]
pub mod asset;
pub mod carbon_budget;
pub mod cli;
pub mod config;
pub mod constraints;
pub mod demand;
pub mod emissions;
pub mod id;
pub mod input;
pub mod log;
pub mod output;
pub mod pathway;
pub mod rampup;
pub mod ranking;
pub mod region;
pub mod simulation;
pub mod technology;
pub mod transition;
pub mod units;

#[cfg(test)]
mod fixture;
