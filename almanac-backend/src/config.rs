use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable names - single source of truth
pub mod env_vars {
    pub const DATA_DIR: &str = "ALMANAC_DATA_DIR";
    pub const HORIZON_DAYS: &str = "ALMANAC_HORIZON_DAYS";
    pub const RESYNC_INTERVAL_SECS: &str = "ALMANAC_RESYNC_INTERVAL_SECS";
    pub const CACHE_STALENESS_SECS: &str = "ALMANAC_CACHE_STALENESS_SECS";
    pub const SEARCH_FANOUT_THRESHOLD: &str = "ALMANAC_SEARCH_FANOUT_THRESHOLD";
    pub const SEARCH_MAX_WORKERS: &str = "ALMANAC_SEARCH_MAX_WORKERS";
    pub const SEARCH_UNIT_TIMEOUT_MS: &str = "ALMANAC_SEARCH_UNIT_TIMEOUT_MS";
    pub const NOTIFY_FADE_SECS: &str = "ALMANAC_NOTIFY_FADE_SECS";
}

/// Default values
pub mod defaults {
    pub const DATA_DIR: &str = ".almanac";
    pub const DB_FILE: &str = "almanac.db";
    pub const DOCUMENTS_DIR: &str = "documents";
    /// -1 = unbounded look-forward horizon
    pub const HORIZON_DAYS: i64 = -1;
    pub const RESYNC_INTERVAL_SECS: u64 = 300;
    pub const CACHE_STALENESS_SECS: u64 = 60;
    pub const SEARCH_FANOUT_THRESHOLD: usize = 32;
    pub const SEARCH_MAX_WORKERS: usize = 8;
    pub const SEARCH_UNIT_TIMEOUT_MS: u64 = 2000;
    pub const NOTIFY_FADE_SECS: u32 = 10;
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[derive(Clone, Debug)]
pub struct Config {
    pub data_dir: PathBuf,
    pub horizon_days: i64,
    pub resync_interval_secs: u64,
    pub cache_staleness_secs: u64,
    pub search_fanout_threshold: usize,
    pub search_max_workers: usize,
    pub search_unit_timeout_ms: u64,
    pub notify_fade_secs: u32,
}

impl Config {
    pub fn from_env() -> Self {
        let data_dir = env::var(env_vars::DATA_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(defaults::DATA_DIR));

        Self {
            data_dir,
            horizon_days: env_parsed(env_vars::HORIZON_DAYS, defaults::HORIZON_DAYS),
            resync_interval_secs: env_parsed(
                env_vars::RESYNC_INTERVAL_SECS,
                defaults::RESYNC_INTERVAL_SECS,
            ),
            cache_staleness_secs: env_parsed(
                env_vars::CACHE_STALENESS_SECS,
                defaults::CACHE_STALENESS_SECS,
            ),
            search_fanout_threshold: env_parsed(
                env_vars::SEARCH_FANOUT_THRESHOLD,
                defaults::SEARCH_FANOUT_THRESHOLD,
            ),
            search_max_workers: env_parsed(
                env_vars::SEARCH_MAX_WORKERS,
                defaults::SEARCH_MAX_WORKERS,
            ),
            search_unit_timeout_ms: env_parsed(
                env_vars::SEARCH_UNIT_TIMEOUT_MS,
                defaults::SEARCH_UNIT_TIMEOUT_MS,
            ),
            notify_fade_secs: env_parsed(env_vars::NOTIFY_FADE_SECS, defaults::NOTIFY_FADE_SECS),
        }
    }

    /// Path to the index database inside the data directory.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(defaults::DB_FILE)
    }

    /// Root directory for per-entry document files.
    pub fn documents_dir(&self) -> PathBuf {
        self.data_dir.join(defaults::DOCUMENTS_DIR)
    }

    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }
}

/// Create the data and documents directories if they don't exist.
/// This should be called at startup before any store is opened.
pub fn initialize_data_dirs(config: &Config) -> std::io::Result<()> {
    std::fs::create_dir_all(&config.data_dir)?;
    std::fs::create_dir_all(config.documents_dir())?;
    log::info!("[CONFIG] Data directory: {:?}", config.data_dir);
    Ok(())
}
