/// User-Agent header for outgoing requests.
pub const USER_AGENT: &str = concat!(
    env!("CARGO_PKG_NAME"),
    "/",
    env!("CARGO_PKG_VERSION"),
    ", (",
    env!("CARGO_PKG_REPOSITORY"),
    ")"
);

/// The environment variable that points to the config file.
pub const CONFIG_ENV_VAR: &str = "POLYRANK_CONFIG";

/// The number of times a single record fetch is repeated after
/// a transport error, before the track is marked as failed.
pub const FETCH_RETRIES: u32 = 3;

/// The delay before the first repetition of a failed request.
/// It doubles with every further repetition.
pub const BACKOFF_BASE_MILLIS: u64 = 500;

/// The maximum number of automatic re-attempts for a failed track.
///
/// Once reached, the track stays failed until it is retried manually.
pub const MAX_RETRY_ATTEMPTS: u32 = 5;

/// The time between two sweeps over failed tracks.
pub const AUTO_RETRY_INTERVAL_SECS: u64 = 7;

/// Every automatic re-attempt is delayed by a random duration in this range,
/// so that failed tracks are not retried all at once.
pub const SWEEP_JITTER_MILLIS: (u64, u64) = (500, 2500);

/// Every track is fetched after a random delay in this range,
/// to avoid bursting the leaderboard service with ~40 requests at once.
pub const STAGGER_MILLIS: (u64, u64) = (10, 110);

/// The number of entries on a page when browsing a leaderboard.
pub const PAGE_SIZE: u32 = 10;
