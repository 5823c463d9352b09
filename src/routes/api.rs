use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{announce, api};
use crate::state::AppState;
use std::sync::Arc;

/// Create the HTTP router
///
/// - `GET /` health check
/// - `POST /twiml` provider voice webhook
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(api::health_check))
        .route("/twiml", post(announce::twiml_handler))
        .layer(TraceLayer::new_for_http())
}
