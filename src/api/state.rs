//! Shared state for the HTTP API.

use crate::service::ChunkService;
use std::sync::Arc;

/// State shared across all API handlers.
///
/// The service (and through it the store and model) is constructed once at
/// startup and injected here rather than living in process-wide state.
pub struct ApiState {
    pub service: Arc<ChunkService>,
}

impl ApiState {
    pub fn new(service: Arc<ChunkService>) -> Self {
        Self { service }
    }
}
