//! Application state shared across handlers.

use std::sync::Arc;

use feedwatch_core::MagnetResolver;

use crate::config::ApiConfig;

/// Application state shared across all handlers.
///
/// Holds no mutable data: every request is resolved independently.
#[derive(Clone)]
pub struct AppState {
    /// API configuration.
    pub config: Arc<ApiConfig>,
    /// Magnet resolver.
    pub resolver: Arc<MagnetResolver>,
}

impl AppState {
    /// Creates a new AppState.
    pub fn new(config: ApiConfig, resolver: MagnetResolver) -> Self {
        Self {
            config: Arc::new(config),
            resolver: Arc::new(resolver),
        }
    }
}
