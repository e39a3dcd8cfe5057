//! API request handlers.

pub mod health;
pub mod magnet;

pub use health::*;
pub use magnet::*;
