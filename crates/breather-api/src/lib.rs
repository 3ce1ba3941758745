//! Shared data model for breather
//!
//! These types are what the three execution contexts agree on when they
//! read and write the shared store:
//! - The user's selection and restriction configuration
//! - The mutable restriction state and the phase derived from it
//! - Restart signals posted by background contexts
//! - Shield render requests and content

mod shield;
mod signals;
mod types;

pub use shield::*;
pub use signals::*;
pub use types::*;
