use crate::db::store::Store;
use crate::handlers::{oauth, publish};
use crate::service::connections::ConnectionService;
use crate::service::publisher::Publisher;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

#[derive(Clone)]
pub struct BeamState {
    pub store: Store,
    pub connections: Arc<ConnectionService>,
    pub publisher: Arc<Publisher>,
    pub service_key: Arc<str>,
}

impl BeamState {
    pub fn new(
        store: Store,
        connections: Arc<ConnectionService>,
        publisher: Arc<Publisher>,
        service_key: Arc<str>,
    ) -> Self {
        Self {
            store,
            connections,
            publisher,
            service_key,
        }
    }
}

pub fn beam_router(state: BeamState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/projects/{project_id}/oauth", post(oauth::init_oauth))
        .route("/oauth/callback", get(oauth::oauth_callback))
        .route(
            "/projects/{project_id}/connection",
            get(oauth::connection_status).delete(oauth::disconnect),
        )
        .route("/projects/{project_id}/boards", get(oauth::boards))
        .route("/pins/{pin_id}/publish", post(publish::publish_one))
        .route("/pins/publish", post(publish::publish_many))
        .route("/pins/{pin_id}/reset", post(publish::reset_pin))
        .route("/jobs/publish-due", post(publish::publish_due))
        .route("/jobs/refresh-sweep", post(publish::refresh_sweep))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
