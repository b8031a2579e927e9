//! Display formatting for weather fields.

use chrono::{DateTime, TimeZone};
use std::fmt::Display;

use crate::model::UnitSystem;

/// Rounded integer with the unit glyph, e.g. `24°C`.
pub fn format_temperature(value: f64, unit: UnitSystem) -> String {
    format!("{}{}", value.round() as i64, unit.temperature_glyph())
}

pub fn format_humidity(pct: u8) -> String {
    format!("{pct}%")
}

pub fn format_pressure(hpa: f64) -> String {
    format!("{} hPa", hpa.round() as i64)
}

/// One decimal with `m/s` or `mph`.
pub fn format_wind(speed: f64, unit: UnitSystem) -> String {
    format!("{:.1} {}", speed, unit.speed_label())
}

/// `HH:mm` in `tz` for an epoch-seconds timestamp.
pub fn format_clock<Tz>(epoch_secs: i64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match DateTime::from_timestamp(epoch_secs, 0) {
        Some(utc) => utc.with_timezone(tz).format("%H:%M").to_string(),
        None => "--:--".to_string(),
    }
}

pub fn format_updated<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!("Updated: {}", at.format("%b %d, %H:%M"))
}

/// Upper-cases the first character and leaves the rest untouched.
pub fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
