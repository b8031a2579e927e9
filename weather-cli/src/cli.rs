use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use weather_core::{
    Config, Coordinates, FavoriteCity, FilePreferences, FixedLocation, IpLocation,
    LocationProvider, OpenWeatherClient, Preferences, Screen,
};

use crate::{interactive, render};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather lookup client")]
pub struct Cli {
    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key and the default city.
    Configure,

    /// Show weather for a city, or for the last searched one.
    Show {
        /// City name, e.g. "Nairobi" or "Paris,FR".
        city: Option<String>,
    },

    /// Show weather for the current location.
    Locate {
        /// Latitude; skips location lookup when given with --lon.
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,
    },

    /// Switch between metric and imperial and show the last city again.
    Unit,

    /// Add or remove a city from favorites.
    Favorite {
        /// City to look up first; defaults to the last searched one.
        city: Option<String>,
    },

    /// Manage favorite cities.
    Favorites {
        #[command(subcommand)]
        action: Option<FavoritesAction>,
    },

    /// Prompt loop: type a city, or a `:command`.
    Interactive,
}

#[derive(Debug, Subcommand)]
pub enum FavoritesAction {
    /// List favorites (default).
    List,

    /// Remove a favorite.
    Remove { name: String, country: String },

    /// Show weather for a favorite.
    Open { name: String },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = Config::load()?;

        match self.command {
            Command::Configure => configure(config)?,
            Command::Show { city } => {
                let mut screen = open_screen(&config, None)?;
                match city {
                    Some(city) => {
                        if !screen.search(&city) {
                            bail!("City name must not be empty");
                        }
                    }
                    None => screen.start(),
                }
                screen.settle().await;
                print_screen(&mut screen);
            }
            Command::Locate { lat, lon } => {
                let fix = lat.zip(lon).map(|(lat, lon)| Coordinates { lat, lon });
                let mut screen = open_screen(&config, fix)?;
                screen.locate();
                screen.settle().await;
                print_screen(&mut screen);
            }
            Command::Unit => {
                let mut screen = open_screen(&config, None)?;
                screen.start();
                screen.settle().await;
                let unit = screen.toggle_unit();
                println!("Units: {unit}");
                screen.settle().await;
                print_screen(&mut screen);
            }
            Command::Favorite { city } => {
                let mut screen = open_screen(&config, None)?;
                match city {
                    Some(city) if screen.search(&city) => {}
                    _ => screen.start(),
                }
                screen.settle().await;
                screen.toggle_favorite();
                print_screen(&mut screen);
            }
            Command::Favorites { action } => {
                favorites(&config, action.unwrap_or(FavoritesAction::List)).await?;
            }
            Command::Interactive => {
                let screen = open_screen(&config, None)?;
                interactive::run(screen).await?;
            }
        }

        Ok(())
    }
}

fn configure(mut config: Config) -> anyhow::Result<()> {
    let api_key = inquire::Password::new("OpenWeather API key:")
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    if api_key.trim().is_empty() {
        bail!("API key must not be empty");
    }

    let default_city = inquire::Text::new("Default city:")
        .with_default(config.default_city())
        .prompt()
        .context("Failed to read default city")?;

    config.set_api_key(api_key.trim().to_string());
    config.default_city = Some(default_city.trim().to_string()).filter(|c| !c.is_empty());
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn favorites(config: &Config, action: FavoritesAction) -> anyhow::Result<()> {
    match action {
        FavoritesAction::List => {
            let prefs = FilePreferences::open(Config::preferences_file_path()?)?;
            print!("{}", render::favorites(prefs.favorites()));
        }
        FavoritesAction::Remove { name, country } => {
            let mut prefs = FilePreferences::open(Config::preferences_file_path()?)?;
            let city = remove_favorite(&mut prefs, &name, &country)?;
            println!("Removed {} from favorites", city.display_name());
        }
        FavoritesAction::Open { name } => {
            let mut screen = open_screen(config, None)?;
            let Some(city) = screen
                .favorites()
                .iter()
                .find(|f| f.name.eq_ignore_ascii_case(&name))
                .cloned()
            else {
                bail!("{name} is not a favorite");
            };
            screen.select_favorite(&city);
            screen.settle().await;
            print_screen(&mut screen);
        }
    }
    Ok(())
}

/// Local only: no API key needed.
fn remove_favorite(
    prefs: &mut impl Preferences,
    name: &str,
    country: &str,
) -> anyhow::Result<FavoriteCity> {
    let Some(city) = prefs
        .favorites()
        .iter()
        .find(|f| f.matches(name, country))
        .cloned()
    else {
        bail!("{name}, {country} is not a favorite");
    };
    prefs.remove_favorite(&city)?;
    Ok(city)
}

/// Wire the screen to the real API, the preferences file and a location
/// source: explicit coordinates, then the configured position, then IP lookup.
fn open_screen(
    config: &Config,
    fix: Option<Coordinates>,
) -> anyhow::Result<Screen<FilePreferences>> {
    let api_key = config.resolve_api_key()?;
    let prefs = FilePreferences::open(Config::preferences_file_path()?)?;

    let locator: Arc<dyn LocationProvider> = match fix.or(config.location) {
        Some(coords) => Arc::new(FixedLocation::new(Some(coords))),
        None => Arc::new(IpLocation::default()),
    };

    tracing::debug!(base_url = %config.base_url(), prefs = %prefs.path().display(), "opening screen");

    Ok(Screen::new(
        Arc::new(OpenWeatherClient::new(config.base_url())),
        locator,
        prefs,
        api_key,
    )
    .with_default_city(config.default_city()))
}

fn print_screen<P: Preferences>(screen: &mut Screen<P>) {
    for notice in screen.take_notices() {
        eprintln!("{}", render::notice(&notice));
    }
    print!("{}", render::screen(&screen.view()));
}
