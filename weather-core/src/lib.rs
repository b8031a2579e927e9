//! Core library for the `weather` lookup client.
//!
//! This crate defines:
//! - The remote weather client (OpenWeather current conditions)
//! - Configuration and locally persisted preferences
//! - The screen controller that turns user actions into fetches
//! - Display formatting for the weather card
//!
//! It is used by `weather-cli`, but any other front end can drive the same
//! [`Screen`].

pub mod client;
pub mod config;
pub mod error;
pub mod format;
pub mod location;
pub mod model;
pub mod prefs;
pub mod screen;
pub mod view;

pub use client::{OpenWeatherClient, WeatherClient};
pub use config::Config;
pub use error::{FetchError, LocationError};
pub use location::{FixedLocation, IpLocation, LocationProvider};
pub use model::{Condition, Coordinates, FavoriteCity, UnitSystem, WeatherQuery, WeatherRecord};
pub use prefs::{FilePreferences, MemoryPreferences, Preferences};
pub use screen::{FavoriteChange, Notice, Screen, ScreenState};
pub use view::{MapMarker, ScreenView, WeatherView};
