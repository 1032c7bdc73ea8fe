//! Configuration for the vpcviz server.
//!
//! Layered defaults → TOML file → `VPCVIZ_` environment (nested keys split
//! on `__`, e.g. `VPCVIZ_INVENTORY__REGION`), credential resolution
//! (env var, then plaintext), and translation to `vpcviz_core`'s
//! `InventoryConfig` / `EngineConfig`.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use vpcviz_core::{EngineConfig, InventoryConfig, TlsVerification};

const ENV_PREFIX: &str = "VPCVIZ_";
const REDACTED: &str = "<redacted>";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no inventory API key configured (checked {checked})")]
    NoCredentials { checked: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// How `/vpc` and `/stack` behave.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedMode {
    /// Rendered HTML on `/vpc` and `/stack`.
    #[default]
    Render,
    /// Live WebSocket feeds on `/vpc` and `/stack`; HTML moves to `/view/*`.
    Push,
}

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    #[serde(default)]
    pub feed_mode: FeedMode,

    /// Served under `/assets`.
    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,

    #[serde(default)]
    pub inventory: InventorySection,

    #[serde(default)]
    pub engine: EngineSection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            feed_mode: FeedMode::default(),
            assets_dir: default_assets_dir(),
            inventory: InventorySection::default(),
            engine: EngineSection::default(),
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}
fn default_assets_dir() -> PathBuf {
    PathBuf::from("assets")
}

/// `[inventory]`: where the inventory API lives and how to reach it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InventorySection {
    /// Base URL of the inventory API.
    pub endpoint: Option<String>,

    #[serde(default = "default_region")]
    pub region: String,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: Option<String>,

    /// API key (plaintext; prefer `api_key_env`).
    pub api_key: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_page_size")]
    pub page_size: i32,

    #[serde(default)]
    pub insecure: bool,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,
}

impl Default for InventorySection {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: default_region(),
            api_key_env: default_api_key_env(),
            api_key: None,
            timeout_secs: default_timeout(),
            page_size: default_page_size(),
            insecure: false,
            ca_cert: None,
        }
    }
}

fn default_region() -> String {
    "us-east-1".into()
}
#[allow(clippy::unnecessary_wraps)]
fn default_api_key_env() -> Option<String> {
    Some("VPCVIZ_API_KEY".into())
}
fn default_timeout() -> u64 {
    30
}
fn default_page_size() -> i32 {
    100
}

/// `[engine]`: refresh and push cadence.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineSection {
    /// Seconds between refreshes. 0 = refresh once at startup only.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// Seconds between pushes to each live viewer. Values below 1 are
    /// raised to 1.
    #[serde(default = "default_push_interval")]
    pub push_interval_secs: u64,

    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval(),
            push_interval_secs: default_push_interval(),
            fetch_concurrency: default_fetch_concurrency(),
        }
    }
}

fn default_refresh_interval() -> u64 {
    60
}
fn default_push_interval() -> u64 {
    10
}
fn default_fetch_concurrency() -> usize {
    4
}

impl Config {
    /// Pretty TOML with the plaintext API key masked.
    pub fn to_toml_redacted(&self) -> Result<String, ConfigError> {
        let mut shown = self.clone();
        if shown.inventory.api_key.is_some() {
            shown.inventory.api_key = Some(REDACTED.into());
        }
        Ok(toml::to_string_pretty(&shown)?)
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "vpcviz", "vpcviz").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("vpcviz");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from defaults, the TOML file at `path` (or the
/// platform path), and the environment. A missing file is not an error.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the inventory API key: `api_key_env` first, then plaintext.
pub fn resolve_api_key(section: &InventorySection) -> Result<SecretString, ConfigError> {
    // 1. Named env var
    if let Some(ref env_name) = section.api_key_env {
        if let Ok(val) = std::env::var(env_name) {
            if !val.is_empty() {
                return Ok(SecretString::from(val));
            }
        }
    }

    // 2. Plaintext in config
    if let Some(ref key) = section.api_key {
        return Ok(SecretString::from(key.clone()));
    }

    let checked = section
        .api_key_env
        .as_ref()
        .map_or_else(|| "inventory.api_key".to_owned(), |env| {
            format!("${env} and inventory.api_key")
        });
    Err(ConfigError::NoCredentials { checked })
}

// ── Translation to core config ──────────────────────────────────────

/// Build an `InventoryConfig`, resolving credentials along the way.
pub fn to_inventory_config(section: &InventorySection) -> Result<InventoryConfig, ConfigError> {
    let raw = section
        .endpoint
        .as_deref()
        .ok_or_else(|| ConfigError::Validation {
            field: "inventory.endpoint".into(),
            reason: "not set".into(),
        })?;
    let endpoint: url::Url = raw.parse().map_err(|_| ConfigError::Validation {
        field: "inventory.endpoint".into(),
        reason: format!("invalid URL: {raw}"),
    })?;

    let api_key = resolve_api_key(section)?;

    let tls = if section.insecure {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = section.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    Ok(InventoryConfig {
        endpoint,
        api_key,
        region: section.region.clone(),
        tls,
        timeout: Duration::from_secs(section.timeout_secs),
        page_size: section.page_size,
    })
}

pub fn to_engine_config(section: &EngineSection) -> EngineConfig {
    EngineConfig {
        refresh_interval: Duration::from_secs(section.refresh_interval_secs),
        push_interval: Duration::from_secs(section.push_interval_secs.max(1)),
        fetch_concurrency: section.fetch_concurrency.max(1),
    }
}
