//! Shared utilities for breather
//!
//! This crate provides:
//! - ID types (ActivityName, EventName, SignalId)
//! - Wall-clock timestamps shared between processes, with mock time support
//! - Error types
//! - Default paths for config, data and the shared store

mod error;
mod ids;
mod paths;
mod time;

pub use error::*;
pub use ids::*;
pub use paths::*;
pub use time::*;
