//! Persistence layer for Feedwatch.
//!
//! This crate provides crash-safe persistence for the notification baseline
//! and the subscriber list using atomic file operations (write to a temp
//! file, then rename).
//!
//! # Example
//!
//! ```no_run
//! use feedwatch_persistence::BaselineStore;
//!
//! let store = BaselineStore::new("/home/user/.feedwatch/state/baseline.json");
//!
//! // First run: no file yet, everything is new
//! let baseline = store.load().unwrap();
//!
//! // ... reconcile ...
//!
//! store.save(&baseline).unwrap();
//! ```

pub mod atomic;
pub mod baseline_store;
pub mod error;
pub mod subscriber_store;

pub use baseline_store::BaselineStore;
pub use error::{PersistenceError, Result};
pub use subscriber_store::SubscriberStore;
