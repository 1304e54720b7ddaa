//! Host-facing sync of the content catalog. Every route needs an admin token.

use axum::extract::{Path, State};
use axum::routing::{post, put};
use axum::Router;
use chrono::Utc;
use serde::Deserialize;

use crate::auth::AdminAuth;
use crate::extractors::JsonBody;
use crate::response::{ok, AppError};
use crate::state::AppState;
use crate::store::operations::contents::ContentItem;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/migrate-legacy", post(migrate_legacy))
        .route("/:content_id", put(upsert_content).delete(remove_content))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertContentRequest {
    kind: String,
    status: String,
    legacy_total: Option<u64>,
}

async fn upsert_content(
    admin: AdminAuth,
    State(state): State<AppState>,
    Path(content_id): Path<u64>,
    JsonBody(req): JsonBody<UpsertContentRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    if req.kind.trim().is_empty() || req.status.trim().is_empty() {
        return Err(AppError::bad_request(
            "INVALID_ARGUMENT",
            "kind and status are required",
        ));
    }

    let item = ContentItem::new(content_id, req.kind.trim(), req.status.trim());
    state
        .service()
        .sync_content(item.clone(), req.legacy_total)
        .await?;
    tracing::info!(admin = %admin.admin_id, content_id, kind = %item.kind, "Catalog entry synced");
    Ok(ok(item))
}

async fn remove_content(
    admin: AdminAuth,
    State(state): State<AppState>,
    Path(content_id): Path<u64>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    state.service().remove_content(content_id).await?;
    tracing::info!(admin = %admin.admin_id, content_id, "Catalog entry removed");
    Ok(ok(()))
}

async fn migrate_legacy(
    admin: AdminAuth,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let report = state
        .service()
        .migrate_legacy(Utc::now().date_naive())
        .await?;
    tracing::info!(
        admin = %admin.admin_id,
        migrated = report.migrated,
        skipped = report.skipped,
        "Legacy totals migrated on demand"
    );
    Ok(ok(report))
}
