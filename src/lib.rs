//! Common functionality for mgplan.
//!
//! mgplan assembles a mixed-integer linear programme which jointly decides which candidate
//! resources of a microgrid to build (and how big) and how every resource is dispatched across a
//! set of scenarios, minimising discounted lifecycle cost.
#![warn(missing_docs)]
pub mod cli;
pub mod id;
pub mod input;
pub mod log;
pub mod network;
pub mod optimisation;
pub mod output;
pub mod profile;
pub mod resource;
pub mod scenario;
pub mod settings;
pub mod topology;
pub mod units;
pub mod value;
pub mod writer;

#[cfg(test)]
mod fixture;
