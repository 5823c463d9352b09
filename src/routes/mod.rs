pub mod api;
pub mod media;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// All routes with state attached.
pub fn create_router(state: Arc<AppState>) -> Router {
    api::create_api_router()
        .merge(media::create_media_router())
        .with_state(state)
}
