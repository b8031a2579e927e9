//! Plain-text rendering of the screen for the terminal.

use chrono::{DateTime, Local};
use std::fmt::Write;
use weather_core::{FavoriteCity, Notice, ScreenView};

pub fn screen(view: &ScreenView) -> String {
    let mut out = String::new();

    if view.loading {
        out.push_str("Loading...\n");
        return out;
    }

    if view.error_visible {
        out.push_str("Could not load weather. Use retry to try again.\n");
        return out;
    }

    let Some(w) = &view.weather else {
        return out;
    };

    let star = if w.is_favorite { " ★" } else { "" };
    let _ = writeln!(out, "{}, {}{}", w.city, w.country, star);
    let _ = writeln!(out, "  {}  {}", w.temperature, w.description);
    let _ = writeln!(out, "  Feels like {}", w.feels_like);
    let _ = writeln!(
        out,
        "  Humidity {}   Wind {}   Pressure {}",
        w.humidity, w.wind, w.pressure
    );
    let _ = writeln!(out, "  Sunrise {}   Sunset {}", w.sunrise, w.sunset);
    let _ = writeln!(out, "  Map {:.4}, {:.4}", w.marker.lat, w.marker.lon);
    if let Some(icon) = &w.icon_url {
        let _ = writeln!(out, "  Icon {icon}");
    }
    let _ = writeln!(out, "  {}", w.updated);

    out
}

pub fn notice(notice: &Notice) -> String {
    format!("! {notice}")
}

pub fn favorites(favorites: &[FavoriteCity]) -> String {
    if favorites.is_empty() {
        return "No favorite cities yet.\n".to_string();
    }

    let mut out = String::new();
    for (i, city) in favorites.iter().enumerate() {
        let added = DateTime::from_timestamp_millis(city.added_at)
            .map(|t| t.with_timezone(&Local).format("%b %d, %Y").to_string())
            .unwrap_or_default();
        let _ = writeln!(out, "{:>2}. {:<28} {}", i + 1, city.display_name(), added);
    }
    out
}
