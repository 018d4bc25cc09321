//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (credential store, aggregator and advisor set-up)
//! - `serve` - Web server command
//! - `snapshot` - Snapshot and context commands
//! - `advisor` - Ask, insights and model catalog commands

pub mod advisor;
pub mod core;
pub mod serve;
pub mod snapshot;

// Re-export command functions for main.rs
pub use advisor::*;
pub use core::*;
pub use serve::*;
pub use snapshot::*;
