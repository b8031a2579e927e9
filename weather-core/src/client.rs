use crate::{
    error::FetchError,
    model::{UnitSystem, WeatherRecord},
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

pub use openweather::OpenWeatherClient;

/// Remote weather lookups. Each call is a single independent request: no
/// retry, no caching.
#[async_trait]
pub trait WeatherClient: Send + Sync + Debug {
    async fn fetch_by_city(
        &self,
        name: &str,
        api_key: &str,
        units: UnitSystem,
    ) -> Result<WeatherRecord, FetchError>;

    async fn fetch_by_coordinates(
        &self,
        lat: f64,
        lon: f64,
        api_key: &str,
        units: UnitSystem,
    ) -> Result<WeatherRecord, FetchError>;
}

/// Icon image for an OpenWeather condition code such as `10d`.
pub fn icon_url(icon: &str) -> String {
    format!("https://openweathermap.org/img/wn/{icon}@2x.png")
}
