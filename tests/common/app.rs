use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tempfile::TempDir;

use most_read::auth::ReadTokenSigner;
use most_read::config::{Config, CountingConfig, RateLimitConfig};
use most_read::options::CounterOptions;
use most_read::routes::build_router;
use most_read::service::ReadService;
use most_read::state::AppState;
use most_read::store::Store;

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub config: Config,
    _temp_dir: TempDir,
}

fn test_config(sled_path: String, api_limit: u64, counting: CountingConfig) -> Config {
    // Built directly; set_var would race across parallel tests.
    Config {
        host: std::net::IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
        port: 3000,
        log_level: "info".to_string(),
        enable_file_logs: false,
        log_dir: "./logs".to_string(),
        sled_path,
        read_token_secret: format!("integration-read-secret-{}", uuid::Uuid::new_v4()),
        read_token_ttl_secs: 600,
        session_jwt_secret: format!("integration-session-secret-{}", uuid::Uuid::new_v4()),
        admin_jwt_secret: format!("integration-admin-secret-{}", uuid::Uuid::new_v4()),
        cors_origin: "http://localhost:8080".to_string(),
        trust_proxy: false,
        store_timeout_ms: 5_000,
        rate_limit: RateLimitConfig {
            window_secs: 60,
            max_requests: api_limit,
        },
        counting,
    }
}

pub fn spawn_with(api_limit: u64, counting: CountingConfig) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let sled_path = temp_dir.path().join("most-read-test.sled");
    let config = test_config(sled_path.to_string_lossy().to_string(), api_limit, counting);

    let store = Arc::new(Store::open(&config.sled_path).expect("open store"));
    store.run_migrations().expect("run migrations");

    let signer = ReadTokenSigner::new(&config.read_token_secret, config.read_token_ttl_secs)
        .expect("read token signer");
    let service = Arc::new(ReadService::new(
        store,
        signer,
        CounterOptions::from_config(&config.counting),
        Duration::from_millis(config.store_timeout_ms),
    ));
    let state = AppState::new(service, &config);
    let app = build_router(state.clone());

    TestApp {
        app,
        state,
        config,
        _temp_dir: temp_dir,
    }
}

pub fn spawn_test_app() -> TestApp {
    spawn_with(100, CountingConfig::default())
}
