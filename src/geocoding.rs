//! Place name → coordinates.
//!
//! [`NominatimGeocoder`] calls the OpenStreetMap search API and keeps its own
//! TTL cache keyed by the query string. It shares nothing with the taxonomy
//! cache.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration as StdDuration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::config::{ttl, GeocoderConfig};
use crate::error::{RegistryError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// `Ok(None)` when the place is unknown.
    async fn geocode(&self, city: &str, region: &str, country: &str)
        -> Result<Option<Coordinates>>;
}

/// `"city, region, country"`, or `"city, country"` when region is empty.
pub fn place_query(city: &str, region: &str, country: &str) -> String {
    if region.is_empty() {
        format!("{}, {}", city, country)
    } else {
        format!("{}, {}, {}", city, region, country)
    }
}

// ── Nominatim ──

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    coords: Coordinates,
    expires_at: DateTime<Utc>,
}

pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
    user_agent: String,
    cache_ttl: Duration,
    clock: Arc<dyn Clock>,
    cache: RwLock<HashMap<String, CacheEntry>>,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocoderConfig, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(StdDuration::from_secs(config.timeout_secs))
            .build()?;
        let cache_ttl = ttl(config.cache_ttl_secs).context("GEOCODER_CACHE_TTL_SECS")?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
            cache_ttl,
            clock,
            cache: RwLock::new(HashMap::new()),
        })
    }

    fn cached(&self, query: &str) -> Option<Coordinates> {
        let cache = self.cache.read().ok()?;
        cache
            .get(query)
            .filter(|entry| self.clock.now() < entry.expires_at)
            .map(|entry| entry.coords)
    }

    fn remember(&self, query: String, coords: Coordinates) -> Result<()> {
        let expires_at = self.clock.now() + self.cache_ttl;
        self.cache
            .write()
            .map_err(|e| anyhow!("Lock: {}", e))?
            .insert(query, CacheEntry { coords, expires_at });
        Ok(())
    }

    async fn search(&self, query: &str) -> anyhow::Result<Vec<SearchHit>> {
        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("format", "json"), ("limit", "1"), ("q", query)])
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "geocoding service returned status {}",
                response.status()
            ));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(
        &self,
        city: &str,
        region: &str,
        country: &str,
    ) -> Result<Option<Coordinates>> {
        let query = place_query(city, region, country);
        if let Some(coords) = self.cached(&query) {
            debug!(%query, "geocode cache hit");
            return Ok(Some(coords));
        }

        let hits = self.search(&query).await.map_err(|e| {
            warn!(%query, error = %e, "geocoding request failed");
            RegistryError::GeocodingUnavailable(e.to_string())
        })?;
        let Some(hit) = hits.into_iter().next() else {
            return Ok(None);
        };
        let coords = Coordinates {
            lat: hit.lat.parse().map_err(|_| {
                RegistryError::GeocodingUnavailable(format!("bad latitude {:?}", hit.lat))
            })?,
            lng: hit.lon.parse().map_err(|_| {
                RegistryError::GeocodingUnavailable(format!("bad longitude {:?}", hit.lon))
            })?,
        };
        self.remember(query, coords)?;
        Ok(Some(coords))
    }
}

// ── StaticGeocoder ──

/// Fixed lookup table keyed by [`place_query`]. Used in tests and offline runs.
#[derive(Debug, Default)]
pub struct StaticGeocoder {
    places: HashMap<String, Coordinates>,
    unavailable: bool,
}

impl StaticGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_place(
        mut self,
        city: &str,
        region: &str,
        country: &str,
        coords: Coordinates,
    ) -> Self {
        self.places.insert(place_query(city, region, country), coords);
        self
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn geocode(
        &self,
        city: &str,
        region: &str,
        country: &str,
    ) -> Result<Option<Coordinates>> {
        if self.unavailable {
            return Err(RegistryError::GeocodingUnavailable("offline".into()));
        }
        Ok(self.places.get(&place_query(city, region, country)).copied())
    }
}
