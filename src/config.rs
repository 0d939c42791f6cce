//! Runtime configuration.
//!
//! Loaded from a YAML file named by `REGISTRY_CONFIG`, or else from environment
//! variables. A `.env` file is read first when present.

use std::path::Path;

use anyhow::{anyhow, Context};
use chrono::Duration;
use serde::Deserialize;

pub const CONFIG_PATH_VAR: &str = "REGISTRY_CONFIG";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RegistryConfig {
    pub database_url: String,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Pre-shared admin credential. Absent or empty disables it.
    #[serde(default)]
    pub admin_token: Option<String>,
    #[serde(default = "default_taxonomy_ttl")]
    pub taxonomy_ttl_secs: u64,
    #[serde(default)]
    pub geocoder: GeocoderConfig,
    #[serde(default = "default_true")]
    pub cors_allow_any: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub cache_ttl_secs: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: concat!("org-registry/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 5,
            cache_ttl_secs: 24 * 60 * 60,
        }
    }
}

/// A TTL in seconds as a `Duration`, rejecting values chrono cannot represent.
pub fn ttl(secs: u64) -> anyhow::Result<Duration> {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| anyhow!("TTL of {} seconds is out of range", secs))
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_taxonomy_ttl() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

impl RegistryConfig {
    /// `.env`, then the YAML file in `REGISTRY_CONFIG` if set, else the environment.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) if !path.is_empty() => Self::from_file(path),
            _ => Self::from_env(),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("reading {}", path.as_ref().display()))?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config: RegistryConfig = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value source. Unparseable numbers are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let number = |key: &str, default: u64| -> anyhow::Result<u64> {
            match get(key) {
                Some(v) => v
                    .parse()
                    .with_context(|| format!("{} must be a number, got {:?}", key, v)),
                None => Ok(default),
            }
        };

        let database_url = get("DATABASE_URL").ok_or_else(|| anyhow!("DATABASE_URL is not set"))?;
        let defaults = GeocoderConfig::default();

        Ok(Self {
            database_url,
            bind_addr: get("BIND_ADDR").unwrap_or_else(default_bind_addr),
            admin_token: get("ADMIN_TOKEN"),
            taxonomy_ttl_secs: number("TAXONOMY_TTL_SECS", default_taxonomy_ttl())?,
            geocoder: GeocoderConfig {
                base_url: get("GEOCODER_BASE_URL").unwrap_or(defaults.base_url),
                user_agent: get("GEOCODER_USER_AGENT").unwrap_or(defaults.user_agent),
                timeout_secs: number("GEOCODER_TIMEOUT_SECS", defaults.timeout_secs)?,
                cache_ttl_secs: number("GEOCODER_CACHE_TTL_SECS", defaults.cache_ttl_secs)?,
            },
            cors_allow_any: get("CORS_ALLOW_ANY")
                .map_or(true, |v| !v.eq_ignore_ascii_case("false")),
        })
    }
}
