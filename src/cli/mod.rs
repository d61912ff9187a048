//! CLI-specific functionality for the PPC optimizer
//!
//! This module contains argument parsing and configuration discovery.

pub mod args;
pub mod config;

pub use args::{Args, Commands, ExecutionMode, RunConfig, VerifyConfig};
pub use config::{ConfigDiscovery, LoadedConfig};
