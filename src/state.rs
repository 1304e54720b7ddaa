use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::middleware::rate_limit::RateLimitState;
use crate::service::ReadService;

#[derive(Clone)]
pub struct AppState {
    service: Arc<ReadService>,
    rate_limit: Arc<RateLimitState>,
    config: Arc<Config>,
    started_at: Instant,
}

impl AppState {
    pub fn new(service: Arc<ReadService>, config: &Config) -> Self {
        let rate_limit = Arc::new(RateLimitState::new(
            config.rate_limit.window_secs,
            config.rate_limit.max_requests,
        ));

        Self {
            service,
            rate_limit,
            config: Arc::new(config.clone()),
            started_at: Instant::now(),
        }
    }

    pub fn service(&self) -> &ReadService {
        &self.service
    }

    pub fn rate_limit(&self) -> &Arc<RateLimitState> {
        &self.rate_limit
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
