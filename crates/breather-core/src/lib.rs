//! Restriction lifecycle for breather
//!
//! This crate is the heart of breather, containing:
//! - The lifecycle state machine (Idle -> Allowance -> Blocking -> BreakComplete)
//!   as pure functions returning effect lists
//! - The executor that carries effects out against the store and host adapters
//! - One entry point per execution context: controller, background monitor,
//!   shield content provider, and the foreground poller

mod controller;
mod effects;
mod executor;
mod lifecycle;
mod monitor;
mod poller;
mod shield;

pub use controller::*;
pub use effects::*;
pub use executor::*;
pub use lifecycle::*;
pub use monitor::*;
pub use poller::*;
pub use shield::*;
