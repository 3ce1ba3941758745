//! Linux host adapter for breather
//!
//! Provides:
//! - A restriction engine that publishes the shield list as a JSON file for
//!   an external enforcer (launcher, DNS filter) to pick up
//! - A scheduler that persists armed intervals and dispatches due ones
//! - Desktop notifications via `notify-send`

mod files;
mod notify;
mod scheduler;
mod shield;

pub use files::*;
pub use notify::*;
pub use scheduler::*;
pub use shield::*;
