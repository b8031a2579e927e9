//! The weather screen: turns user actions into fetches and fetch results
//! into display state.
//!
//! Every fetch and every location fix runs as a tokio task owned by the
//! [`Screen`]. A user request aborts the fetch and the location lookup in
//! flight, so the latest request always wins; dropping the screen aborts
//! whatever is still running. Completions come back over a channel and are
//! applied by [`Screen::process_next`]. A task that panics still reports a
//! failure, so [`Screen::settle`] always returns.

use chrono::{DateTime, Local, TimeZone, Utc};
use std::{fmt, fmt::Display, sync::Arc};
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    client::WeatherClient,
    config::DEFAULT_CITY,
    error::{FetchError, LocationError},
    location::LocationProvider,
    model::{Coordinates, FavoriteCity, UnitSystem, WeatherQuery, WeatherRecord},
    prefs::Preferences,
    view::{ScreenView, WeatherView},
};

#[derive(Debug, Clone, PartialEq)]
pub enum ScreenState {
    Idle,
    Loading,
    Displayed(WeatherRecord),
    Error,
}

/// Short user-facing messages, shown once.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    CityNotFound,
    NetworkError(String),
    LocationPermissionDenied,
    LocationUnavailable,
    LocationError(String),
    FavoriteAdded,
    FavoriteRemoved,
}

impl Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::CityNotFound => f.write_str("City not found"),
            Notice::NetworkError(cause) => write!(f, "Network error: {cause}"),
            Notice::LocationPermissionDenied => f.write_str("Location permission denied"),
            Notice::LocationUnavailable => f.write_str("Unable to get location"),
            Notice::LocationError(cause) => write!(f, "Location error: {cause}"),
            Notice::FavoriteAdded => f.write_str("Added to favorites"),
            Notice::FavoriteRemoved => f.write_str("Removed from favorites"),
        }
    }
}

impl From<&FetchError> for Notice {
    fn from(err: &FetchError) -> Self {
        match err {
            FetchError::NotFound(_) => Notice::CityNotFound,
            FetchError::Transport(cause) => Notice::NetworkError(cause.clone()),
            other => Notice::NetworkError(other.to_string()),
        }
    }
}

impl From<&LocationError> for Notice {
    fn from(err: &LocationError) -> Self {
        match err {
            LocationError::PermissionDenied => Notice::LocationPermissionDenied,
            LocationError::Unavailable => Notice::LocationUnavailable,
            LocationError::Failed(cause) => Notice::LocationError(cause.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteChange {
    Added,
    Removed,
}

#[derive(Debug)]
enum Completion {
    Fetched {
        seq: u64,
        query: WeatherQuery,
        result: Result<WeatherRecord, FetchError>,
    },
    Located {
        seq: u64,
        result: Result<Coordinates, LocationError>,
    },
}

#[derive(Debug)]
struct Task {
    seq: u64,
    handle: JoinHandle<()>,
}

/// Sends `fallback` if the task is dropped before reporting its own result.
/// That happens when it panics or is aborted; an aborted task's seq is
/// already stale, so only the panic is ever applied.
struct ReportGuard {
    tx: mpsc::UnboundedSender<Completion>,
    fallback: Option<Completion>,
}

impl ReportGuard {
    fn new(tx: mpsc::UnboundedSender<Completion>, fallback: Completion) -> Self {
        Self {
            tx,
            fallback: Some(fallback),
        }
    }

    fn finish(mut self, completion: Completion) {
        self.fallback = None;
        let _ = self.tx.send(completion);
    }
}

impl Drop for ReportGuard {
    fn drop(&mut self) {
        if let Some(fallback) = self.fallback.take() {
            let _ = self.tx.send(fallback);
        }
    }
}

pub struct Screen<P: Preferences> {
    client: Arc<dyn WeatherClient>,
    locator: Arc<dyn LocationProvider>,
    prefs: P,
    api_key: String,
    default_city: String,

    unit: UnitSystem,
    state: ScreenState,
    fetched_at: Option<DateTime<Utc>>,
    is_favorite: bool,
    refreshing: bool,
    /// The query most recently sent, successful or not.
    last_attempt: Option<WeatherQuery>,
    notices: Vec<Notice>,

    next_seq: u64,
    fetch_task: Option<Task>,
    locate_task: Option<Task>,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
}

impl<P: Preferences> fmt::Debug for Screen<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Screen")
            .field("unit", &self.unit)
            .field("state", &self.state)
            .field("last_attempt", &self.last_attempt)
            .field("fetch_in_flight", &self.fetch_task.is_some())
            .field("locate_in_flight", &self.locate_task.is_some())
            .finish_non_exhaustive()
    }
}

impl<P: Preferences> Screen<P> {
    pub fn new(
        client: Arc<dyn WeatherClient>,
        locator: Arc<dyn LocationProvider>,
        prefs: P,
        api_key: impl Into<String>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let unit = prefs.unit();

        Self {
            client,
            locator,
            prefs,
            api_key: api_key.into(),
            default_city: DEFAULT_CITY.to_string(),
            unit,
            state: ScreenState::Idle,
            fetched_at: None,
            is_favorite: false,
            refreshing: false,
            last_attempt: None,
            notices: Vec::new(),
            next_seq: 0,
            fetch_task: None,
            locate_task: None,
            tx,
            rx,
        }
    }

    /// City loaded by [`Screen::start`] when nothing was searched before.
    pub fn with_default_city(mut self, city: impl Into<String>) -> Self {
        self.default_city = city.into();
        self
    }

    pub fn state(&self) -> &ScreenState {
        &self.state
    }

    pub fn unit(&self) -> UnitSystem {
        self.unit
    }

    pub fn record(&self) -> Option<&WeatherRecord> {
        match &self.state {
            ScreenState::Displayed(record) => Some(record),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, ScreenState::Loading)
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing
    }

    pub fn is_favorite(&self) -> bool {
        self.is_favorite
    }

    pub fn last_attempt(&self) -> Option<&WeatherQuery> {
        self.last_attempt.as_ref()
    }

    pub fn preferences(&self) -> &P {
        &self.prefs
    }

    pub fn favorites(&self) -> &[FavoriteCity] {
        self.prefs.favorites()
    }

    /// Notices raised since the last call.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Load the last searched city, or the default one on first run.
    pub fn start(&mut self) {
        let city = self
            .prefs
            .last_city()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| self.default_city.clone());
        self.submit(WeatherQuery::City(city));
    }

    /// Search by city name. Blank input is ignored.
    pub fn search(&mut self, text: &str) -> bool {
        let city = text.trim();
        if city.is_empty() {
            return false;
        }
        self.submit(WeatherQuery::City(city.to_string()));
        true
    }

    pub fn select_favorite(&mut self, city: &FavoriteCity) {
        self.submit(WeatherQuery::City(city.name.clone()));
    }

    /// Pull-to-refresh: re-fetch the displayed city, if any.
    pub fn refresh(&mut self) -> bool {
        let Some(name) = self.record().map(|r| r.name.clone()) else {
            self.refreshing = false;
            return false;
        };
        self.refreshing = true;
        self.submit(WeatherQuery::City(name));
        true
    }

    /// Replay the query that failed. Only offered from the error state.
    pub fn retry(&mut self) -> bool {
        if self.state != ScreenState::Error {
            return false;
        }
        let query = self
            .last_attempt
            .clone()
            .or_else(|| self.prefs.last_city().map(WeatherQuery::City));
        match query {
            Some(query) => {
                self.submit(query);
                true
            }
            None => false,
        }
    }

    /// Flip the unit system. A displayed city, or one still loading, is
    /// fetched again in the new units.
    pub fn toggle_unit(&mut self) -> UnitSystem {
        self.unit = match self.prefs.toggle_unit() {
            Ok(unit) => unit,
            Err(err) => {
                tracing::warn!(error = %err, "failed to persist unit preference");
                self.unit.toggled()
            }
        };

        tracing::debug!(unit = %self.unit, "unit system toggled");

        let requery = match &self.state {
            ScreenState::Displayed(record) => Some(WeatherQuery::City(record.name.clone())),
            ScreenState::Loading => self.last_attempt.clone(),
            ScreenState::Idle | ScreenState::Error => None,
        };
        if let Some(query) = requery {
            self.submit(query);
        }

        self.unit
    }

    /// Add or remove the displayed city from favorites.
    pub fn toggle_favorite(&mut self) -> Option<FavoriteChange> {
        let record = self.record()?;
        let city = FavoriteCity::from_record(record, Utc::now());

        let change = if self.prefs.is_favorite(&city.name, &city.country) {
            if let Err(err) = self.prefs.remove_favorite(&city) {
                tracing::warn!(error = %err, city = %city.display_name(), "failed to persist favorite removal");
            }
            self.notices.push(Notice::FavoriteRemoved);
            FavoriteChange::Removed
        } else {
            if let Err(err) = self.prefs.add_favorite(city.clone()) {
                tracing::warn!(error = %err, city = %city.display_name(), "failed to persist new favorite");
            }
            self.notices.push(Notice::FavoriteAdded);
            FavoriteChange::Added
        };

        self.update_favorite_status();
        Some(change)
    }

    /// Delete an entry from the favorites list.
    pub fn remove_favorite(&mut self, city: &FavoriteCity) -> bool {
        let removed = match self.prefs.remove_favorite(city) {
            Ok(removed) => removed,
            Err(err) => {
                tracing::warn!(error = %err, city = %city.display_name(), "failed to persist favorite removal");
                true
            }
        };
        self.update_favorite_status();
        removed
    }

    /// Ask the location provider for a fix; a fix triggers a coordinate fetch.
    /// Failures only raise a notice.
    pub fn locate(&mut self) {
        if let Some(prev) = self.locate_task.take() {
            prev.handle.abort();
        }

        let seq = self.bump_seq();
        let locator = Arc::clone(&self.locator);
        let tx = self.tx.clone();

        let handle = tokio::spawn(async move {
            let guard = ReportGuard::new(tx, Completion::Located {
                seq,
                result: Err(LocationError::Failed("location task panicked".into())),
            });
            let result = locator.last_known_location().await;
            guard.finish(Completion::Located { seq, result });
        });

        self.locate_task = Some(Task { seq, handle });
    }

    /// Wait for the next relevant completion and apply it. Returns `false`
    /// once nothing is in flight.
    pub async fn process_next(&mut self) -> bool {
        loop {
            if self.fetch_task.is_none() && self.locate_task.is_none() {
                return false;
            }
            let Some(completion) = self.rx.recv().await else {
                return false;
            };
            if self.apply(completion) {
                return true;
            }
        }
    }

    /// Apply completions until nothing is in flight.
    pub async fn settle(&mut self) {
        while self.process_next().await {}
    }

    /// Abort everything in flight. A screen left loading goes back to idle.
    pub fn cancel(&mut self) {
        self.abort_tasks();
        self.refreshing = false;
        if self.state == ScreenState::Loading {
            self.state = ScreenState::Idle;
        }
    }

    pub fn view(&self) -> ScreenView {
        self.view_in(&Local)
    }

    pub fn view_in<Tz>(&self, tz: &Tz) -> ScreenView
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let weather = self.record().map(|record| {
            WeatherView::render(
                record,
                self.unit,
                self.is_favorite,
                self.fetched_at.unwrap_or_else(Utc::now),
                tz,
            )
        });

        ScreenView {
            loading: self.is_loading(),
            error_visible: self.state == ScreenState::Error,
            unit: self.unit,
            weather,
        }
    }

    fn bump_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Issue a user request. A location lookup still pending would land
    /// after it, so it is dropped too.
    fn submit(&mut self, query: WeatherQuery) {
        if let Some(prev) = self.locate_task.take() {
            tracing::debug!(seq = prev.seq, "dropping pending location lookup");
            prev.handle.abort();
        }
        self.dispatch(query);
    }

    fn dispatch(&mut self, query: WeatherQuery) {
        if let Some(prev) = self.fetch_task.take() {
            tracing::debug!(seq = prev.seq, "superseding in-flight request");
            prev.handle.abort();
        }

        let seq = self.bump_seq();
        let client = Arc::clone(&self.client);
        let api_key = self.api_key.clone();
        let units = self.unit;
        let tx = self.tx.clone();

        tracing::info!(seq, query = %query, units = %units, "fetching weather");

        self.last_attempt = Some(query.clone());
        self.state = ScreenState::Loading;

        let handle = tokio::spawn(async move {
            let guard = ReportGuard::new(tx, Completion::Fetched {
                seq,
                query: query.clone(),
                result: Err(FetchError::Transport("weather request task panicked".into())),
            });
            let result = match &query {
                WeatherQuery::City(name) => client.fetch_by_city(name, &api_key, units).await,
                WeatherQuery::Coordinates(c) => {
                    client.fetch_by_coordinates(c.lat, c.lon, &api_key, units).await
                }
            };
            guard.finish(Completion::Fetched { seq, query, result });
        });

        self.fetch_task = Some(Task { seq, handle });
    }

    /// Returns `false` for completions of superseded tasks.
    fn apply(&mut self, completion: Completion) -> bool {
        match completion {
            Completion::Fetched { seq, query, result } => {
                if self.fetch_task.as_ref().map(|t| t.seq) != Some(seq) {
                    tracing::debug!(seq, "dropping stale fetch result");
                    return false;
                }
                self.fetch_task = None;
                self.refreshing = false;

                match result {
                    Ok(record) => self.show(&query, record),
                    Err(err) => self.fail(&query, &err),
                }
                true
            }
            Completion::Located { seq, result } => {
                if self.locate_task.as_ref().map(|t| t.seq) != Some(seq) {
                    tracing::debug!(seq, "dropping stale location fix");
                    return false;
                }
                self.locate_task = None;

                match result {
                    Ok(coords) => self.dispatch(WeatherQuery::Coordinates(coords)),
                    Err(err) => {
                        tracing::warn!(error = %err, "location lookup failed");
                        self.notices.push(Notice::from(&err));
                    }
                }
                true
            }
        }
    }

    fn show(&mut self, query: &WeatherQuery, record: WeatherRecord) {
        let last_city = match query {
            WeatherQuery::City(name) => name.as_str(),
            WeatherQuery::Coordinates(_) => record.name.as_str(),
        };
        if let Err(err) = self.prefs.save_last_city(last_city) {
            tracing::warn!(error = %err, "failed to persist last searched city");
        }

        tracing::info!(city = %record.name, country = %record.country, "weather displayed");

        self.fetched_at = Some(Utc::now());
        self.state = ScreenState::Displayed(record);
        self.update_favorite_status();
    }

    fn fail(&mut self, query: &WeatherQuery, err: &FetchError) {
        tracing::warn!(query = %query, error = %err, "weather fetch failed");
        self.notices.push(Notice::from(err));
        self.state = ScreenState::Error;
    }

    fn update_favorite_status(&mut self) {
        self.is_favorite = self
            .record()
            .is_some_and(|r| self.prefs.is_favorite(&r.name, &r.country));
    }

    fn abort_tasks(&mut self) {
        for task in [self.fetch_task.take(), self.locate_task.take()]
            .into_iter()
            .flatten()
        {
            task.handle.abort();
        }
    }
}

impl<P: Preferences> Drop for Screen<P> {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}
