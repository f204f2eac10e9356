pub mod health;
pub mod signals;
pub mod triggers;

use crate::config::Config;
use crate::db::Repository;
use crate::orchestration::{CatalogSync, SignalRunner};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Config,
    pub runner: Arc<SignalRunner>,
    pub catalog: Arc<CatalogSync>,
}

impl AppState {
    pub fn new(
        repo: Arc<Repository>,
        config: Config,
        runner: Arc<SignalRunner>,
        catalog: Arc<CatalogSync>,
    ) -> Self {
        Self {
            repo,
            config,
            runner,
            catalog,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/signals", get(signals::get_signals))
        .route("/v1/signals/recompute", post(triggers::recompute_signals))
        .route("/v1/catalog/sync", post(triggers::sync_catalog))
        .layer(cors)
        .with_state(state)
}
