use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tokio::sync::Mutex;

use crate::constants::RATE_LIMIT_PRUNE_THRESHOLD;
use crate::response::AppError;
use crate::state::AppState;

#[derive(Debug, Clone)]
struct WindowEntry {
    count: u64,
    window_start: Instant,
}

/// Fixed-window request counter keyed by client IP.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    window_secs: u64,
    max_requests: u64,
    prune_threshold: usize,
    entries: Arc<Mutex<HashMap<IpAddr, WindowEntry>>>,
}

#[derive(Debug, Clone)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub limit: u64,
    pub remaining: u64,
    pub reset_at: u64,
}

impl RateLimiter {
    pub fn new(window_secs: u64, max_requests: u64) -> Self {
        Self::with_prune_threshold(window_secs, max_requests, RATE_LIMIT_PRUNE_THRESHOLD)
    }

    pub fn with_prune_threshold(window_secs: u64, max_requests: u64, prune_threshold: usize) -> Self {
        Self {
            window_secs,
            max_requests,
            prune_threshold,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn check(&self, ip: IpAddr) -> RateLimitResult {
        let now = Instant::now();
        let mut map = self.entries.lock().await;

        if map.len() >= self.prune_threshold && !map.contains_key(&ip) {
            let before = map.len();
            map.retain(|_, value| now.duration_since(value.window_start).as_secs() < self.window_secs);
            tracing::debug!(before, after = map.len(), "Pruned stale rate limit windows");
        }

        let entry = map.entry(ip).or_insert(WindowEntry {
            count: 0,
            window_start: now,
        });

        if now.duration_since(entry.window_start).as_secs() >= self.window_secs {
            entry.count = 0;
            entry.window_start = now;
        }

        let allowed = entry.count < self.max_requests;
        if allowed {
            entry.count += 1;
        }

        let remaining = self.max_requests.saturating_sub(entry.count);
        let elapsed = now.duration_since(entry.window_start).as_secs();
        let reset_after = self.window_secs.saturating_sub(elapsed);
        let reset_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
            + reset_after;

        RateLimitResult {
            allowed,
            limit: self.max_requests,
            remaining,
            reset_at,
        }
    }

    pub async fn tracked(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitState {
    pub limiter: RateLimiter,
}

impl RateLimitState {
    pub fn new(window_secs: u64, max_requests: u64) -> Self {
        Self {
            limiter: RateLimiter::new(window_secs, max_requests),
        }
    }
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let ip = extract_client_ip(req.headers(), state.config().trust_proxy);
    let result = state.rate_limit().limiter.check(ip).await;

    if !result.allowed {
        tracing::warn!(%ip, limit = result.limit, "Rate limit exceeded");
        let mut response = AppError::too_many_requests("Too many requests").into_response();
        apply_rate_limit_headers(&mut response, &result);
        if let Ok(v) = state.config().rate_limit.window_secs.to_string().parse() {
            response.headers_mut().insert("retry-after", v);
        }
        return response;
    }

    let mut response = next.run(req).await;
    apply_rate_limit_headers(&mut response, &result);
    response
}

fn apply_rate_limit_headers(response: &mut Response, result: &RateLimitResult) {
    if let Ok(v) = result.limit.to_string().parse() {
        response.headers_mut().insert("ratelimit-limit", v);
    }
    if let Ok(v) = result.remaining.to_string().parse() {
        response.headers_mut().insert("ratelimit-remaining", v);
    }
    if let Ok(v) = result.reset_at.to_string().parse() {
        response.headers_mut().insert("ratelimit-reset", v);
    }
}

pub fn extract_client_ip(headers: &HeaderMap, trust_proxy: bool) -> IpAddr {
    if trust_proxy {
        if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
            if let Some(first) = forwarded.split(',').next() {
                if let Ok(ip) = first.trim().parse() {
                    return ip;
                }
            }
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<IpAddr>().ok())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[tokio::test]
    async fn within_limit_is_allowed() {
        let limiter = RateLimiter::new(60, 2);
        let ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
        assert!(limiter.check(ip).await.allowed);
        let second = limiter.check(ip).await;
        assert!(second.allowed);
        assert_eq!(second.remaining, 0);
        assert!(!limiter.check(ip).await.allowed);
    }

    #[tokio::test]
    async fn windows_are_per_ip() {
        let limiter = RateLimiter::new(60, 1);
        assert!(limiter.check(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))).await.allowed);
        assert!(limiter.check(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2))).await.allowed);
    }

    #[tokio::test]
    async fn expired_windows_are_pruned_inline() {
        let limiter = RateLimiter::with_prune_threshold(0, 5, 2);
        limiter.check(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))).await;
        limiter.check(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2))).await;
        assert_eq!(limiter.tracked().await, 2);

        limiter.check(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 3))).await;
        assert_eq!(limiter.tracked().await, 1);
    }

    #[test]
    fn extract_ip_fallbacks() {
        let headers = HeaderMap::new();
        let ip = extract_client_ip(&headers, false);
        assert_eq!(ip, IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[test]
    fn forwarded_for_only_when_trusted() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9, 10.0.0.1"));
        assert_eq!(
            extract_client_ip(&headers, true),
            "203.0.113.9".parse::<IpAddr>().unwrap()
        );
        assert_eq!(extract_client_ip(&headers, false), IpAddr::V4(Ipv4Addr::LOCALHOST));
    }
}
