use axum::http::{Method, StatusCode};
use axum::Router;
use serde_json::json;

use most_read::config::Config;

use super::auth::admin_header;
use super::http::{request, response_json};

/// Syncs a catalog entry through the admin route.
pub async fn sync_content(app: &Router, config: &Config, id: u64, kind: &str, status: &str) {
    let resp = request(
        app,
        Method::PUT,
        &format!("/api/catalog/{id}"),
        Some(json!({ "kind": kind, "status": status })),
        &[admin_header(config)],
    )
    .await;
    let (code, _, body) = response_json(resp).await;
    assert_eq!(code, StatusCode::OK, "catalog sync failed: {body}");
}

pub async fn publish_post(app: &Router, config: &Config, id: u64) {
    sync_content(app, config, id, "post", "publish").await;
}

/// Fetches a ticket and returns its token; panics if the ticket is disabled.
pub async fn ticket_token(app: &Router, id: u64) -> String {
    let resp = request(app, Method::GET, &format!("/api/reads/ticket/{id}"), None, &[]).await;
    let (code, _, body) = response_json(resp).await;
    assert_eq!(code, StatusCode::OK, "ticket failed: {body}");
    body["data"]["token"]
        .as_str()
        .expect("enabled ticket carries a token")
        .to_string()
}
