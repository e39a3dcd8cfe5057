//! Core data models for Feedwatch.
//!
//! This crate provides the fundamental data types shared by the feed
//! ingester, the reconciler, the caption renderer and the persistence
//! layer: release identifiers, feed entries, variants and the baseline.

pub mod baseline;
pub mod ids;
pub mod release;

// Re-export main types
pub use baseline::Baseline;
pub use ids::ReleaseId;
pub use release::{FeedEntry, Release, ReleaseMeta, Variant};
