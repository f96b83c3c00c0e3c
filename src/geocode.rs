//! Geocoding collaborator.
//!
//! Confirms place-name candidates the lexicon does not know. Failures and
//! timeouts never abort extraction; the candidate is simply dropped and the
//! question proceeds with whatever else resolved.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::CollaboratorError;

/// ISO 3166-1 alpha-2 codes the reanalysis datasets cover; lookups outside
/// these countries are rejected up front.
pub const REANALYSIS_COUNTRY_CODES: [&str; 7] = ["pk", "in", "lk", "np", "bt", "bd", "af"];

/// A place confirmed by the geocoder.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedPlace {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Place-name confirmation seam.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Look a candidate up, restricted to the given alpha-2 country codes.
    /// `Ok(None)` means the service answered and the name is not a settlement.
    async fn lookup(
        &self,
        candidate: &str,
        country_codes: &[&str],
    ) -> Result<Option<GeocodedPlace>, CollaboratorError>;
}

/// Nominatim-backed geocoder.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
    timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct NominatimResult {
    lat: String,
    lon: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    addresstype: String,
    #[serde(default, rename = "type")]
    place_type: String,
}

/// Address types that count as a settlement.
const SETTLEMENT_TYPES: [&str; 4] = ["city", "town", "village", "hamlet"];

impl NominatimGeocoder {
    pub fn new(
        base_url: impl Into<String>,
        user_agent: &str,
        timeout_secs: u64,
    ) -> Result<Self, CollaboratorError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CollaboratorError::Geocoding(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            timeout_secs,
        })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn lookup(
        &self,
        candidate: &str,
        country_codes: &[&str],
    ) -> Result<Option<GeocodedPlace>, CollaboratorError> {
        let url = format!("{}/search", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", candidate),
                ("format", "json"),
                ("limit", "1"),
                ("countrycodes", &country_codes.join(",")),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CollaboratorError::Timeout(self.timeout_secs)
                } else {
                    CollaboratorError::Geocoding(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(CollaboratorError::Geocoding(format!(
                "geocoder returned {}",
                response.status()
            )));
        }

        let results: Vec<NominatimResult> = response
            .json()
            .await
            .map_err(|e| CollaboratorError::Geocoding(e.to_string()))?;

        let Some(first) = results.into_iter().next() else {
            debug!(candidate, "geocoder found nothing");
            return Ok(None);
        };

        let is_settlement = SETTLEMENT_TYPES.contains(&first.addresstype.as_str())
            || SETTLEMENT_TYPES.contains(&first.place_type.as_str())
            || first.place_type == "administrative";
        if !is_settlement {
            debug!(candidate, addresstype = %first.addresstype, "not a settlement");
            return Ok(None);
        }

        let (latitude, longitude) = match (first.lat.parse(), first.lon.parse()) {
            (Ok(lat), Ok(lon)) => (lat, lon),
            _ => {
                warn!(candidate, "geocoder returned unparseable coordinates");
                return Ok(None);
            }
        };

        Ok(Some(GeocodedPlace {
            name: if first.name.is_empty() {
                candidate.to_string()
            } else {
                first.name
            },
            latitude,
            longitude,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test double answering from a fixed list.
    struct StaticGeocoder {
        places: Vec<String>,
    }

    #[async_trait]
    impl Geocoder for StaticGeocoder {
        async fn lookup(
            &self,
            candidate: &str,
            _country_codes: &[&str],
        ) -> Result<Option<GeocodedPlace>, CollaboratorError> {
            let lower = candidate.to_lowercase();
            Ok(self
                .places
                .iter()
                .find(|p| p.to_lowercase() == lower)
                .map(|p| GeocodedPlace {
                    name: p.clone(),
                    latitude: 0.0,
                    longitude: 0.0,
                }))
        }
    }

    #[tokio::test]
    async fn test_static_geocoder_matches_case_insensitively() {
        let geo = StaticGeocoder {
            places: vec!["Gangtok".to_string()],
        };
        let hit = geo.lookup("gangtok", &["in"]).await.unwrap();
        assert_eq!(hit.unwrap().name, "Gangtok");
        assert!(geo.lookup("nowhere", &["in"]).await.unwrap().is_none());
    }
}
