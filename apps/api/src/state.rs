use std::sync::Arc;

use crate::ranking::service::RankingService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// The ranking pipeline. Holds the process-wide generation handle.
    pub ranking: Arc<RankingService>,
    /// Bearer secret compared by the auth middleware.
    pub api_key: Arc<str>,
}
