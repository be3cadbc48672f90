//! CLI command implementations

pub mod completions;
pub mod config;
pub mod horse;
pub mod owner;
