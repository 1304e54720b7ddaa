use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;

use crate::auth::Caller;
use crate::extractors::{JsonBody, QueryParams};
use crate::ingest::ReadRequest;
use crate::middleware::rate_limit;
use crate::period::PeriodSpec;
use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    let ingest = Router::new()
        .route("/", post(record_read))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            rate_limit::rate_limit_middleware,
        ));

    Router::new()
        .route("/ticket/:content_id", get(issue_ticket))
        .route("/:content_id/count", get(count_for))
        .merge(ingest)
}

async fn issue_ticket(
    caller: Caller,
    State(state): State<AppState>,
    Path(content_id): Path<u64>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let ticket = state.service().issue_ticket(content_id, &caller).await?;
    Ok(ok(ticket))
}

/// Accepted and deliberately skipped reads look the same to the client.
async fn record_read(
    caller: Caller,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ReadRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    state.service().record_read(req, &caller).await?;
    Ok(ok(()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReadCountResponse {
    content_id: u64,
    count: Option<u64>,
}

async fn count_for(
    State(state): State<AppState>,
    Path(content_id): Path<u64>,
    QueryParams(spec): QueryParams<PeriodSpec>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let count = state.service().count_for(content_id, &spec).await?;
    Ok(ok(ReadCountResponse { content_id, count }))
}
