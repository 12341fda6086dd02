//! Sequential deployment of compiled contracts to an EVM network.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod artifacts;
pub mod cli;
pub mod client;
mod commands;
pub mod constants;
pub mod errors;
pub mod plans;
pub mod runner;
pub mod types;
pub mod utils;
