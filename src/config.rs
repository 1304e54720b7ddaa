use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use std::fmt;

use crate::constants::{
    DEFAULT_ELIGIBLE_TYPE, DEFAULT_READ_COOLDOWN_MS, DEFAULT_READ_TOKEN_TTL_SECS,
    DEFAULT_STORE_TIMEOUT_MS,
};

#[derive(Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub sled_path: String,
    pub read_token_secret: String,
    pub read_token_ttl_secs: u64,
    pub session_jwt_secret: String,
    pub admin_jwt_secret: String,
    pub cors_origin: String,
    pub trust_proxy: bool,
    pub store_timeout_ms: u64,
    pub rate_limit: RateLimitConfig,
    pub counting: CountingConfig,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub window_secs: u64,
    pub max_requests: u64,
}

/// Counting policy knobs a host can override without code changes.
#[derive(Debug, Clone)]
pub struct CountingConfig {
    pub cooldown_ms: u64,
    pub eligible_types: Vec<String>,
    pub breakdown_periods: Vec<String>,
    pub exclude_authenticated: bool,
    pub excluded_capability: Option<String>,
}

impl Default for CountingConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: DEFAULT_READ_COOLDOWN_MS,
            eligible_types: vec![DEFAULT_ELIGIBLE_TYPE.to_string()],
            breakdown_periods: vec!["week".to_string(), "month".to_string(), "year".to_string()],
            exclude_authenticated: true,
            excluded_capability: None,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("enable_file_logs", &self.enable_file_logs)
            .field("log_dir", &self.log_dir)
            .field("sled_path", &self.sled_path)
            .field("read_token_secret", &"***REDACTED***")
            .field("read_token_ttl_secs", &self.read_token_ttl_secs)
            .field("session_jwt_secret", &"***REDACTED***")
            .field("admin_jwt_secret", &"***REDACTED***")
            .field("cors_origin", &self.cors_origin)
            .field("trust_proxy", &self.trust_proxy)
            .field("store_timeout_ms", &self.store_timeout_ms)
            .field("rate_limit", &self.rate_limit)
            .field("counting", &self.counting)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = CountingConfig::default();
        Self {
            host: env_or_parse("HOST", IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))),
            port: env_or_parse("PORT", 3000_u16),
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            sled_path: env_or("SLED_PATH", "./data/most-read.sled"),
            read_token_secret: env_or(
                "READ_TOKEN_SECRET",
                "change_me_to_random_64_chars_change_me_to_random_64_chars",
            ),
            read_token_ttl_secs: env_or_parse("READ_TOKEN_TTL_SECS", DEFAULT_READ_TOKEN_TTL_SECS),
            session_jwt_secret: env_or(
                "SESSION_JWT_SECRET",
                "change_me_to_the_host_session_secret_change_me_to_the_host",
            ),
            admin_jwt_secret: env_or(
                "ADMIN_JWT_SECRET",
                "change_me_to_another_random_64_chars_change_me_to_another",
            ),
            cors_origin: env_or("CORS_ORIGIN", "http://localhost:8080"),
            trust_proxy: env_or_bool("TRUST_PROXY", false),
            store_timeout_ms: env_or_parse("STORE_TIMEOUT_MS", DEFAULT_STORE_TIMEOUT_MS),
            rate_limit: RateLimitConfig {
                window_secs: env_or_parse("RATE_LIMIT_WINDOW_SECS", 60_u64),
                max_requests: env_or_parse("RATE_LIMIT_MAX", 120_u64),
            },
            counting: CountingConfig {
                cooldown_ms: env_or_parse("READ_COOLDOWN_MS", defaults.cooldown_ms),
                eligible_types: env_or_list("ELIGIBLE_TYPES", defaults.eligible_types),
                breakdown_periods: env_or_list("BREAKDOWN_PERIODS", defaults.breakdown_periods),
                exclude_authenticated: env_or_bool(
                    "EXCLUDE_AUTHENTICATED",
                    defaults.exclude_authenticated,
                ),
                excluded_capability: env::var("EXCLUDED_CAPABILITY")
                    .ok()
                    .map(|raw| raw.trim().to_string())
                    .filter(|cap| !cap.is_empty()),
            },
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

/// Comma separated list. An explicitly empty value yields an empty list.
pub fn env_or_list(key: &str, default: Vec<String>) -> Vec<String> {
    match env::var(key) {
        Ok(raw) => raw
            .split(',')
            .map(|part| part.trim().to_ascii_lowercase())
            .filter(|part| !part.is_empty())
            .collect(),
        Err(_) => default,
    }
}
