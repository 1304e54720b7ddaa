use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::util::ServiceExt;

/// Drives one request through the router without binding a socket.
pub async fn request(
    app: &Router,
    method: Method,
    path: &str,
    body: Option<Value>,
    headers: &[(&str, String)],
) -> Response {
    let builder = headers
        .iter()
        .fold(Request::builder().method(method).uri(path), |b, (k, v)| {
            b.header(*k, v.as_str())
        });

    let req = match body {
        Some(payload) => builder
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("build request");

    app.clone().oneshot(req).await.expect("router is infallible")
}

pub async fn get_json(app: &Router, path: &str) -> (StatusCode, Value) {
    let (status, _, body) = response_json(request(app, Method::GET, path, None, &[]).await).await;
    (status, body)
}

/// Status, headers and the body parsed as JSON (`{}` for an empty body).
pub async fn response_json(resp: Response) -> (StatusCode, HeaderMap, Value) {
    let (parts, body) = resp.into_parts();
    let bytes = body.collect().await.expect("read body").to_bytes();

    let json = if bytes.is_empty() {
        serde_json::json!({})
    } else {
        serde_json::from_slice::<Value>(&bytes).unwrap_or_else(|e| {
            panic!("body is not JSON ({e}): {}", String::from_utf8_lossy(&bytes))
        })
    };

    (parts.status, parts.headers, json)
}

pub fn assert_json_error(body: &Value, code: &str) {
    assert_eq!(body["success"], false, "expected an error envelope: {body}");
    assert_eq!(body["code"], code);
    assert!(body["message"].is_string());
}

pub fn assert_status_ok_json(status: StatusCode, body: &Value) {
    assert!(status.is_success(), "unexpected status {status}: {body}");
    assert_eq!(body["success"], true);
    assert!(body.get("data").is_some());
}
