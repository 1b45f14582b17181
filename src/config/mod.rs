mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable overriding `tmdb.api_key`.
pub const TMDB_API_KEY_ENV: &str = "TMDB_API_KEY";
/// Environment variable overriding `probe.mediainfo_path`.
pub const MEDIAINFO_PATH_ENV: &str = "MEDIAINFO_PATH";

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    prepare(&mut config, |key| std::env::var(key).ok());
    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./starfin.toml",
        "~/.config/starfin/config.toml",
        "/etc/starfin/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    let mut config = Config::default();
    prepare(&mut config, |key| std::env::var(key).ok());
    validate_config(&config)?;
    Ok(config)
}

/// Apply environment overrides and expand `~` in paths.
fn prepare(config: &mut Config, env: impl Fn(&str) -> Option<String>) {
    if let Some(key) = env(TMDB_API_KEY_ENV).filter(|key| !key.is_empty()) {
        config.tmdb.api_key = key;
    }
    if let Some(path) = env(MEDIAINFO_PATH_ENV).filter(|path| !path.is_empty()) {
        config.probe.mediainfo_path = Some(PathBuf::from(path));
    }

    config.database.path = expand(&config.database.path);
    if let Some(path) = config.probe.mediainfo_path.as_mut() {
        *path = expand(path);
    }
}

fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref())
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.watch.poll_interval_secs == 0 {
        anyhow::bail!("watch.poll_interval_secs cannot be 0");
    }

    if config.watch.volume_refresh_secs == 0 {
        anyhow::bail!("watch.volume_refresh_secs cannot be 0");
    }

    if config.scan.workers == 0 {
        anyhow::bail!("scan.workers cannot be 0");
    }

    if config.tmdb.base_url.trim().is_empty() {
        anyhow::bail!("tmdb.base_url cannot be empty");
    }

    if config.tmdb.api_key.is_empty() {
        tracing::warn!(
            "No TMDB API key configured (set tmdb.api_key or {}); films will keep their filename titles",
            TMDB_API_KEY_ENV
        );
    }

    Ok(())
}
