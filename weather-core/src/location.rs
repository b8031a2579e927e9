//! One-shot "where am I" lookups used by the locate action.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::fmt::Debug;

use crate::{error::LocationError, model::Coordinates};

pub const IP_API_URL: &str = "http://ip-api.com/json";

#[async_trait]
pub trait LocationProvider: Send + Sync + Debug {
    async fn last_known_location(&self) -> Result<Coordinates, LocationError>;
}

/// A position supplied up front, e.g. from config or command-line flags.
/// `None` behaves like a device that has no fix yet.
#[derive(Debug, Clone, Default)]
pub struct FixedLocation {
    position: Option<Coordinates>,
    permitted: bool,
}

impl FixedLocation {
    pub fn new(position: Option<Coordinates>) -> Self {
        Self {
            position,
            permitted: true,
        }
    }

    /// A provider the user refused access to.
    pub fn denied() -> Self {
        Self {
            position: None,
            permitted: false,
        }
    }
}

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn last_known_location(&self) -> Result<Coordinates, LocationError> {
        if !self.permitted {
            return Err(LocationError::PermissionDenied);
        }
        self.position.ok_or(LocationError::Unavailable)
    }
}

/// Approximate position derived from the public IP address.
#[derive(Debug, Clone)]
pub struct IpLocation {
    url: String,
    http: Client,
}

impl Default for IpLocation {
    fn default() -> Self {
        Self::new(IP_API_URL)
    }
}

impl IpLocation {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http: Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    lat: Option<f64>,
    lon: Option<f64>,
    message: Option<String>,
}

#[async_trait]
impl LocationProvider for IpLocation {
    async fn last_known_location(&self) -> Result<Coordinates, LocationError> {
        let res = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| LocationError::Failed(e.to_string()))?;

        if !res.status().is_success() {
            return Err(LocationError::Failed(format!(
                "geolocation service answered {}",
                res.status()
            )));
        }

        let parsed: IpApiResponse = res
            .json()
            .await
            .map_err(|e| LocationError::Failed(e.to_string()))?;

        match (parsed.status.as_str(), parsed.lat, parsed.lon) {
            ("success", Some(lat), Some(lon)) => Ok(Coordinates { lat, lon }),
            _ => {
                tracing::debug!(message = ?parsed.message, "geolocation returned no fix");
                Err(LocationError::Unavailable)
            }
        }
    }
}
