use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default maximum bytes per analysis chunk fetch.
pub const DEFAULT_CHUNK_SIZE: u32 = 262_144;

/// Analysis feed-loop parameters (optional `[analysis]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Maximum bytes requested from the origin per chunk.
    pub chunk_size: u32,
    /// Upper bound on chunk requests per analysis run; the run fails past it.
    pub max_requests: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_requests: 4096,
        }
    }
}

/// Transport settings shared by every curl handle (optional `[http]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    /// Abort if throughput stays below this many bytes/s for `low_speed_time_secs`.
    pub low_speed_limit: u32,
    pub low_speed_time_secs: u64,
    /// Hard cap for metadata probes and chunk fetches. Proxy relays use only the
    /// low-speed abort so long downloads are not cut off.
    pub timeout_secs: u64,
    pub max_redirects: u32,
    /// Static `host:port:address` pins, as with `curl --resolve`.
    pub resolve: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 15,
            low_speed_limit: 1024,
            low_speed_time_secs: 30,
            timeout_secs: 60,
            max_redirects: 10,
            resolve: Vec::new(),
        }
    }
}

/// Global configuration loaded from `~/.config/mprobe/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MprobeConfig {
    /// Listen address for `mprobe serve`.
    pub bind: String,
    /// Skip the private/loopback address checks. Local development only.
    pub allow_private_targets: bool,
    /// `max-age` advertised on `/info` responses.
    pub info_cache_secs: u32,
    pub analysis: AnalysisConfig,
    pub http: HttpConfig,
}

impl Default for MprobeConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            allow_private_targets: false,
            info_cache_secs: 60,
            analysis: AnalysisConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("mprobe")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<MprobeConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = MprobeConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from(&path)
}

/// Load configuration from an explicit file.
pub fn load_from(path: &Path) -> Result<MprobeConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: MprobeConfig =
        toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))?;
    if cfg.analysis.chunk_size == 0 {
        anyhow::bail!("{}: analysis.chunk_size must be at least 1", path.display());
    }
    Ok(cfg)
}
