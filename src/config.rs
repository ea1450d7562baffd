use std::path::PathBuf;
use std::time::Duration;

use anyhow::{ensure, Context};
use serde::Deserialize;

use kodub::ApiSettings;

use crate::constants::*;
use crate::tracks::Category;

/// Application config.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    /// Where and how to reach the leaderboard service.
    pub api: ApiSettings,

    /// Request repetitions and background retries.
    pub retry: RetryConfig,

    /// Tracks that are looked up in addition to the built-in ones.
    pub extra_tracks: Vec<ExtraTrack>,
}

/// A track that is not part of the built-in registry.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ExtraTrack {
    pub id: String,
    pub name: String,
    #[serde(default = "community")]
    pub category: Category,
}

fn community() -> Category {
    Category::Community
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// The number of repetitions of a record fetch after a transport error.
    pub fetch_retries: u32,

    /// The delay before the first repetition. Doubles for every further one.
    pub backoff_base_millis: u64,

    /// The maximum number of background re-attempts per track.
    pub max_retry_attempts: u32,

    /// The time between two sweeps over failed tracks.
    pub sweep_interval_secs: u64,

    pub sweep_jitter_min_millis: u64,
    pub sweep_jitter_max_millis: u64,

    pub stagger_min_millis: u64,
    pub stagger_max_millis: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            fetch_retries: FETCH_RETRIES,
            backoff_base_millis: BACKOFF_BASE_MILLIS,
            max_retry_attempts: MAX_RETRY_ATTEMPTS,
            sweep_interval_secs: AUTO_RETRY_INTERVAL_SECS,
            sweep_jitter_min_millis: SWEEP_JITTER_MILLIS.0,
            sweep_jitter_max_millis: SWEEP_JITTER_MILLIS.1,
            stagger_min_millis: STAGGER_MILLIS.0,
            stagger_max_millis: STAGGER_MILLIS.1,
        }
    }
}

impl RetryConfig {
    /// The delay before repeating a request for the `n`-th time (starting at zero).
    pub fn backoff(&self, n: u32) -> Duration {
        let factor = 2u64.saturating_pow(n);
        Duration::from_millis(self.backoff_base_millis.saturating_mul(factor))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// A random delay before a background re-attempt.
    pub fn sweep_jitter(&self) -> Duration {
        random_millis(self.sweep_jitter_min_millis, self.sweep_jitter_max_millis)
    }

    /// A random delay before fetching a track.
    pub fn stagger(&self) -> Duration {
        random_millis(self.stagger_min_millis, self.stagger_max_millis)
    }
}

fn random_millis(min: u64, max: u64) -> Duration {
    use rand::Rng;

    if min >= max {
        return Duration::from_millis(min);
    }
    Duration::from_millis(rand::thread_rng().gen_range(min..=max))
}

impl Config {
    /// Read the config file listed in the `POLYRANK_CONFIG` environment variable,
    /// or use the default config if that variable is not set.
    pub fn load() -> anyhow::Result<Config> {
        let config = match std::env::var(CONFIG_ENV_VAR) {
            Ok(f) => Config::from_file(PathBuf::from(f))?,
            Err(_) => {
                log::debug!("'{}' not set, using default config", CONFIG_ENV_VAR);
                Config::default()
            }
        };
        check_config(&config)?;
        Ok(config)
    }

    fn from_file(f: PathBuf) -> anyhow::Result<Config> {
        let f_str = std::fs::read_to_string(&f)
            .with_context(|| format!("cannot read config file '{}'", f.display()))?;
        Config::from_toml(&f_str)
            .with_context(|| format!("failed to parse config file '{}'", f.display()))
    }

    pub fn from_toml(s: &str) -> anyhow::Result<Config> {
        Ok(toml::from_str(s)?)
    }
}

/// Try to catch configuration errors early.
pub fn check_config(config: &Config) -> anyhow::Result<()> {
    let retry = &config.retry;
    ensure!(
        retry.max_retry_attempts >= 1,
        "config: 'max_retry_attempts' must be at least 1"
    );
    ensure!(
        retry.sweep_interval_secs > 0,
        "config: 'sweep_interval_secs' must be positive"
    );
    ensure!(
        retry.sweep_jitter_min_millis <= retry.sweep_jitter_max_millis,
        "config: 'sweep_jitter_min_millis' must not be larger than 'sweep_jitter_max_millis'"
    );
    ensure!(
        retry.stagger_min_millis <= retry.stagger_max_millis,
        "config: 'stagger_min_millis' must not be larger than 'stagger_max_millis'"
    );
    ensure!(
        !config.api.leaderboard_url.is_empty() && !config.api.user_url.is_empty(),
        "config: API URLs must not be empty"
    );
    ensure!(
        !config.api.version.is_empty(),
        "config: 'version' must not be empty"
    );
    for track in &config.extra_tracks {
        ensure!(
            !track.id.trim().is_empty(),
            "config: extra track '{}' has no ID",
            track.name
        );
    }
    Ok(())
}
