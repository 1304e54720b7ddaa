pub mod catalog;
pub mod health;
pub mod popular;
pub mod reads;

use axum::extract::DefaultBodyLimit;
use axum::Router;

use crate::middleware::request_id;
use crate::response::AppError;
use crate::state::AppState;

/// Request bodies here are tiny JSON objects.
const MAX_BODY_SIZE: usize = 16 * 1024;

pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .nest("/reads", reads::router(state.clone()))
        .nest("/popular", popular::router())
        .nest("/catalog", catalog::router())
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE));

    Router::new()
        .nest("/api", api_routes)
        .nest("/health", health::router())
        .fallback(fallback_404)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .with_state(state)
}

async fn fallback_404() -> AppError {
    AppError::not_found("NOT_FOUND", "Not found")
}
