//! Nominatim geocoding client.
//!
//! Free-text place search used by the planner's address lookup and the
//! suggestion search. The wire format returns lat/lon as strings; both
//! are parsed to floats and validated before a result is surfaced.

use std::time::Duration;

use log::debug;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{NavError, Result};
use crate::GeoPoint;

/// Public Nominatim endpoint. Override with [`GeocodingClient::with_base_url`].
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(12);
const USER_AGENT: &str = "route-navigator/0.1";

/// A geocoded place: coordinate plus display label.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub coordinate: GeoPoint,
    pub label: String,
}

#[derive(Debug, Deserialize)]
struct NominatimEntry {
    lat: String,
    lon: String,
    display_name: Option<String>,
}

/// Constructed service object around the geocoding endpoint.
pub struct GeocodingClient {
    client: Client,
    base_url: String,
}

impl GeocodingClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_NOMINATIM_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| NavError::Internal {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Geocode a free-text query to its best match.
    ///
    /// `Ok(None)` means the query produced no results; network failure
    /// is a recoverable `GeocodingUnavailable` error.
    pub async fn search_address(&self, query: &str) -> Result<Option<Place>> {
        let mut places = self.search_places(query, 1).await?;
        Ok(if places.is_empty() {
            None
        } else {
            Some(places.remove(0))
        })
    }

    /// Geocode a free-text query to up to `limit` matches.
    pub async fn search_places(&self, query: &str, limit: usize) -> Result<Vec<Place>> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(NavError::invalid_input("empty geocoding query"));
        }

        let url = format!(
            "{}/search?q={}&format=json&limit={}",
            self.base_url,
            urlencode(trimmed),
            limit
        );
        debug!("[geocoding] GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| NavError::geocoding(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NavError::geocoding(format!("HTTP {}", status)));
        }

        let entries: Vec<NominatimEntry> = response
            .json()
            .await
            .map_err(|e| NavError::geocoding(format!("bad response body: {}", e)))?;

        Ok(entries
            .into_iter()
            .filter_map(|entry| parse_entry(entry, trimmed))
            .collect())
    }
}

fn parse_entry(entry: NominatimEntry, query: &str) -> Option<Place> {
    let latitude: f64 = entry.lat.parse().ok()?;
    let longitude: f64 = entry.lon.parse().ok()?;
    let coordinate = GeoPoint::new(latitude, longitude);
    if !coordinate.is_valid() {
        return None;
    }
    Some(Place {
        coordinate,
        label: entry.display_name.unwrap_or_else(|| query.to_string()),
    })
}

/// Percent-encode a query string for the search URL.
fn urlencode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
