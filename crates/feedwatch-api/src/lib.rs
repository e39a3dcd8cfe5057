//! HTTP server for Feedwatch.
//!
//! Notification captions link every variant to this server rather than to a
//! magnet URI directly. The server resolves the link on demand:
//!
//! - `GET /magnet/{id}/{type_label}` - `302` to the magnet URI, `400` when the
//!   detail page can't be fetched or has no matching row
//! - `GET /health` - liveness probe
//!
//! # Example
//!
//! ```ignore
//! use feedwatch_api::{ApiConfig, AppState, serve};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let state = AppState::new(ApiConfig::default(), resolver);
//!     serve(state).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;
pub mod types;

pub use config::ApiConfig;
pub use error::{ApiError, Result};
pub use router::{create_router, serve};
pub use state::AppState;
