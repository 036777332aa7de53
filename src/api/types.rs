//! Shared types for the API layer.

use std::sync::Arc;

use crate::api::error::ApiError;
use crate::service::ReportAnalyzer;

// ═══════════════════════════════════════════════════════════
// API context: shared state for the router
// ═══════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct ApiContext {
    pub analyzer: Arc<ReportAnalyzer>,
}

impl ApiContext {
    pub fn new(analyzer: Arc<ReportAnalyzer>) -> Self {
        Self { analyzer }
    }

    /// Run `f` on the blocking pool. Storage, classification and the
    /// notification clients all block.
    pub async fn blocking<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&ReportAnalyzer) -> Result<T, ApiError> + Send + 'static,
        T: Send + 'static,
    {
        let analyzer = Arc::clone(&self.analyzer);
        tokio::task::spawn_blocking(move || f(&analyzer))
            .await
            .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?
    }
}
