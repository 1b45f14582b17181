use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub tmdb: TmdbConfig,

    #[serde(default)]
    pub probe: ProbeConfig,

    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub ratings: RatingsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// SQLite catalog file (tilde expanded)
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("starfin.sqlite")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TmdbConfig {
    /// TMDB v3 API key (overridden by `TMDB_API_KEY`)
    #[serde(default)]
    pub api_key: String,

    /// Language requested for titles and overviews
    #[serde(default = "default_tmdb_language")]
    pub language: String,

    #[serde(default = "default_tmdb_base_url")]
    pub base_url: String,
}

fn default_tmdb_language() -> String {
    "en-US".to_string()
}

fn default_tmdb_base_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            language: default_tmdb_language(),
            base_url: default_tmdb_base_url(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProbeConfig {
    /// Path to the mediainfo executable (overridden by `MEDIAINFO_PATH`).
    /// Looked up on `PATH` when unset.
    #[serde(default)]
    pub mediainfo_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatchConfig {
    /// How often pending writes are checked for stability
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// How often `start` looks for volumes added or removed by other commands
    #[serde(default = "default_volume_refresh")]
    pub volume_refresh_secs: u64,
}

fn default_poll_interval() -> u64 {
    5
}

fn default_volume_refresh() -> u64 {
    30
}

impl WatchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn volume_refresh(&self) -> Duration {
        Duration::from_secs(self.volume_refresh_secs)
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            volume_refresh_secs: default_volume_refresh(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScanConfig {
    /// Concurrent workers building entries during an initial volume scan
    #[serde(default = "default_scan_workers")]
    pub workers: usize,
}

fn default_scan_workers() -> usize {
    20
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: default_scan_workers(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RatingsConfig {
    /// Scrape IMDb and Letterboxd ratings during enrichment
    #[serde(default = "default_ratings_enabled")]
    pub enabled: bool,
}

fn default_ratings_enabled() -> bool {
    true
}

impl Default for RatingsConfig {
    fn default() -> Self {
        Self {
            enabled: default_ratings_enabled(),
        }
    }
}
