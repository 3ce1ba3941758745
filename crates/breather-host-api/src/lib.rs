//! Host adapter trait interfaces for breather
//!
//! This crate defines the interface between the lifecycle core and the
//! platform capabilities it instructs. It contains no platform code itself.

mod capabilities;
mod mock;
mod traits;

pub use capabilities::*;
pub use mock::*;
pub use traits::*;
