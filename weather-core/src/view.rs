use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use std::fmt::Display;

use crate::{
    client::icon_url,
    format::{
        capitalize_first, format_clock, format_humidity, format_pressure, format_temperature,
        format_updated, format_wind,
    },
    model::{UnitSystem, WeatherRecord},
};

/// Pin for the map widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub lat: f64,
    pub lon: f64,
    pub label: String,
}

/// Every text field of the weather card, ready to show.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherView {
    pub city: String,
    pub country: String,
    pub temperature: String,
    pub description: String,
    pub feels_like: String,
    pub humidity: String,
    pub wind: String,
    pub pressure: String,
    pub sunrise: String,
    pub sunset: String,
    pub updated: String,
    pub icon_url: Option<String>,
    pub marker: MapMarker,
    pub is_favorite: bool,
}

impl WeatherView {
    /// Render `record` with times shown in `tz`. The "Updated" line uses the
    /// service's observation time, or `fetched_at` when it sent none.
    pub fn render<Tz>(
        record: &WeatherRecord,
        unit: UnitSystem,
        is_favorite: bool,
        fetched_at: DateTime<Utc>,
        tz: &Tz,
    ) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let condition = record.primary_condition();

        Self {
            city: record.name.clone(),
            country: record.country.clone(),
            temperature: format_temperature(record.temperature, unit),
            description: condition
                .map(|c| capitalize_first(&c.description))
                .unwrap_or_default(),
            feels_like: format_temperature(record.feels_like, unit),
            humidity: format_humidity(record.humidity_pct),
            wind: format_wind(record.wind_speed, unit),
            pressure: format_pressure(record.pressure_hpa),
            sunrise: format_clock(record.sunrise, tz),
            sunset: format_clock(record.sunset, tz),
            updated: format_updated(&record.observed_at.unwrap_or(fetched_at).with_timezone(tz)),
            icon_url: condition.map(|c| icon_url(&c.icon)),
            marker: MapMarker {
                lat: record.coord.lat,
                lon: record.coord.lon,
                label: record.name.clone(),
            },
            is_favorite,
        }
    }
}

/// What the whole screen shows at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenView {
    pub loading: bool,
    pub error_visible: bool,
    pub unit: UnitSystem,
    pub weather: Option<WeatherView>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Condition, Coordinates};
    use chrono::FixedOffset;

    fn record() -> WeatherRecord {
        let sunrise = Utc.with_ymd_and_hms(2024, 3, 1, 3, 15, 0).unwrap().timestamp();
        let sunset = Utc.with_ymd_and_hms(2024, 3, 1, 15, 40, 0).unwrap().timestamp();
        WeatherRecord {
            name: "Nairobi".into(),
            country: "KE".into(),
            coord: Coordinates { lat: -1.28, lon: 36.82 },
            temperature: 23.7,
            feels_like: 22.2,
            humidity_pct: 55,
            pressure_hpa: 1013.0,
            wind_speed: 3.46,
            conditions: vec![Condition {
                description: "light rain".into(),
                icon: "10d".into(),
            }],
            sunrise,
            sunset,
            observed_at: None,
        }
    }

    #[test]
    fn renders_all_fields() {
        let eat = FixedOffset::east_opt(3 * 3600).unwrap();
        let fetched_at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let view = WeatherView::render(&record(), UnitSystem::Metric, true, fetched_at, &eat);

        assert_eq!(view.city, "Nairobi");
        assert_eq!(view.country, "KE");
        assert_eq!(view.temperature, "24°C");
        assert_eq!(view.feels_like, "22°C");
        assert_eq!(view.description, "Light rain");
        assert_eq!(view.humidity, "55%");
        assert_eq!(view.wind, "3.5 m/s");
        assert_eq!(view.pressure, "1013 hPa");
        assert_eq!(view.sunrise, "06:15");
        assert_eq!(view.sunset, "18:40");
        assert_eq!(view.updated, "Updated: Mar 01, 12:00");
        assert_eq!(
            view.icon_url.as_deref(),
            Some("https://openweathermap.org/img/wn/10d@2x.png")
        );
        assert_eq!(view.marker.label, "Nairobi");
        assert!(view.is_favorite);
    }

    #[test]
    fn updated_line_prefers_observation_time() {
        let eat = FixedOffset::east_opt(3 * 3600).unwrap();
        let mut rec = record();
        rec.observed_at = Some(Utc.with_ymd_and_hms(2024, 3, 1, 8, 40, 0).unwrap());
        let fetched_at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let view = WeatherView::render(&rec, UnitSystem::Metric, false, fetched_at, &eat);

        assert_eq!(view.updated, "Updated: Mar 01, 11:40");
    }

    #[test]
    fn imperial_uses_fahrenheit_and_mph() {
        let mut rec = record();
        rec.temperature = 74.6;
        rec.wind_speed = 7.74;
        let view = WeatherView::render(&rec, UnitSystem::Imperial, false, Utc::now(), &Utc);

        assert_eq!(view.temperature, "75°F");
        assert_eq!(view.wind, "7.7 mph");
    }

    #[test]
    fn no_conditions_leaves_description_empty() {
        let mut rec = record();
        rec.conditions.clear();
        let view = WeatherView::render(&rec, UnitSystem::Metric, false, Utc::now(), &Utc);

        assert_eq!(view.description, "");
        assert!(view.icon_url.is_none());
    }
}
