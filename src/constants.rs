/// How far back an all-time query reaches, in years.
pub const ALL_TIME_YEARS: u32 = 100;

/// Days covered by a rolling "week" before today.
pub const WEEK_DAYS: i64 = 7;

/// Default client cooldown between two counted reads (ms).
pub const DEFAULT_READ_COOLDOWN_MS: u64 = 3_600_000;

/// Default read token lifetime (seconds).
pub const DEFAULT_READ_TOKEN_TTL_SECS: u64 = 12 * 3600;

/// Content kind counted when none is configured.
pub const DEFAULT_ELIGIBLE_TYPE: &str = "post";

/// Status a content item needs to appear in rankings.
pub const PUBLISHED_STATUS: &str = "publish";

/// Default bound on a single store call (ms).
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 2_000;

/// Default page size for most-popular queries.
pub const DEFAULT_POPULAR_LIMIT: usize = 5;

/// Upper bound on the most-popular page size.
pub const MAX_POPULAR_LIMIT: usize = 100;

/// Limiter map size at which expired windows are pruned inline.
pub const RATE_LIMIT_PRUNE_THRESHOLD: usize = 10_000;
