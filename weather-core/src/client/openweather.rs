use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::{
    error::FetchError,
    model::{Condition, Coordinates, UnitSystem, WeatherRecord},
};

use super::WeatherClient;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Client for the OpenWeather current weather endpoint.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    base_url: String,
    http: Client,
}

impl Default for OpenWeatherClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl OpenWeatherClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch_current(
        &self,
        query: &[(&str, String)],
        label: &str,
    ) -> Result<WeatherRecord, FetchError> {
        let url = format!("{}/weather", self.base_url);

        tracing::debug!(%url, %label, "requesting current weather");

        let res = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(label.to_string()));
        }

        if !status.is_success() {
            return Err(FetchError::Rejected {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let parsed: OwCurrentResponse =
            serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))?;

        Ok(parsed.into_record())
    }
}

#[derive(Debug, Deserialize)]
struct OwCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: u8,
    pressure: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

// Coordinate lookups over open water come back without a country.
#[derive(Debug, Default, Deserialize)]
struct OwSys {
    #[serde(default)]
    country: String,
    #[serde(default)]
    sunrise: i64,
    #[serde(default)]
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    coord: OwCoord,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    wind: OwWind,
    #[serde(default)]
    sys: OwSys,
    dt: Option<i64>,
}

impl OwCurrentResponse {
    fn into_record(self) -> WeatherRecord {
        WeatherRecord {
            name: self.name,
            country: self.sys.country,
            coord: Coordinates {
                lat: self.coord.lat,
                lon: self.coord.lon,
            },
            temperature: self.main.temp,
            feels_like: self.main.feels_like,
            humidity_pct: self.main.humidity,
            pressure_hpa: self.main.pressure,
            wind_speed: self.wind.speed,
            conditions: self
                .weather
                .into_iter()
                .map(|w| Condition {
                    description: w.description,
                    icon: w.icon,
                })
                .collect(),
            sunrise: self.sys.sunrise,
            sunset: self.sys.sunset,
            observed_at: self.dt.and_then(unix_to_utc),
        }
    }
}

#[async_trait]
impl WeatherClient for OpenWeatherClient {
    async fn fetch_by_city(
        &self,
        name: &str,
        api_key: &str,
        units: UnitSystem,
    ) -> Result<WeatherRecord, FetchError> {
        self.fetch_current(
            &[
                ("q", name.to_string()),
                ("appid", api_key.to_string()),
                ("units", units.as_str().to_string()),
            ],
            name,
        )
        .await
    }

    async fn fetch_by_coordinates(
        &self,
        lat: f64,
        lon: f64,
        api_key: &str,
        units: UnitSystem,
    ) -> Result<WeatherRecord, FetchError> {
        let label = format!("{lat},{lon}");
        self.fetch_current(
            &[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("appid", api_key.to_string()),
                ("units", units.as_str().to_string()),
            ],
            &label,
        )
        .await
    }
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(ts, 0)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}
