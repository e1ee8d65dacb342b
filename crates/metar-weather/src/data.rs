//! Throttled METAR fetcher holding the latest decoded report.

use metar_core::{NetworkError, ReqwestErrorExt};
use parking_lot::RwLock;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::instrument;
use url::Url;

use crate::metar::Metar;
use crate::types::{Airport, MetarError};

pub const DEFAULT_BASE_URL: &str = "https://tgftp.nws.noaa.gov/data/observations/metar/stations/";
pub const DEFAULT_MIN_TIME_BETWEEN_UPDATES: Duration = Duration::from_secs(3600);
const REQUEST_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = concat!("metar-weather/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Directory holding one `<CODE>.TXT` file per station
    pub base_url: String,
    /// Minimum time between two successful fetches
    pub min_time_between_updates: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            min_time_between_updates: DEFAULT_MIN_TIME_BETWEEN_UPDATES,
        }
    }
}

/// What a call to [`MetarData::update`] did
#[derive(Debug)]
pub enum UpdateOutcome {
    /// Last success is too recent; nothing was fetched
    Throttled,
    /// A new report replaced the snapshot
    Updated,
    /// Fetching or decoding failed; the previous snapshot was kept
    Failed(MetarError),
}

impl UpdateOutcome {
    pub fn is_updated(&self) -> bool {
        matches!(self, UpdateOutcome::Updated)
    }
}

/// Latest report for one airport, refreshed at most once per interval
#[derive(Debug)]
pub struct MetarData {
    airport: Airport,
    client: Client,
    station_url: Url,
    min_interval: Duration,
    last_success: Mutex<Option<Instant>>,
    snapshot: RwLock<Option<Arc<Metar>>>,
}

/// Resolve `<base_url>/<CODE>.TXT`, tolerating a base without trailing slash
pub fn station_url(base_url: &str, code: &str) -> Result<Url, MetarError> {
    let mut base = Url::parse(base_url)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base.join(&format!("{}.TXT", code))?)
}

/// First line of `body` that starts with the station code, trimmed
pub fn find_report_line<'a>(body: &'a str, code: &str) -> Option<&'a str> {
    body.lines()
        .find(|line| line.starts_with(code))
        .map(str::trim)
}

impl MetarData {
    /// Build the fetcher. Performs no network I/O.
    pub fn new(airport: Airport, options: &FetchOptions) -> Result<Self, MetarError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(ReqwestErrorExt::into_network_error)?;
        let station_url = station_url(&options.base_url, &airport.code)?;

        Ok(Self {
            airport,
            client,
            station_url,
            min_interval: options.min_time_between_updates,
            last_success: Mutex::new(None),
            snapshot: RwLock::new(None),
        })
    }

    pub fn airport(&self) -> &Airport {
        &self.airport
    }

    pub fn station_url(&self) -> &Url {
        &self.station_url
    }

    /// Latest decoded report, `None` until the first successful fetch
    pub fn snapshot(&self) -> Option<Arc<Metar>> {
        self.snapshot.read().clone()
    }

    /// Fetch a new report unless the last success is within the interval.
    ///
    /// Failures are logged and leave the snapshot untouched. Concurrent
    /// callers are serialized, so only one of them fetches.
    #[instrument(skip(self), fields(airport = %self.airport.code))]
    pub async fn update(&self) -> UpdateOutcome {
        let mut last_success = self.last_success.lock().await;
        if let Some(at) = *last_success {
            if at.elapsed() < self.min_interval {
                tracing::debug!("Skipping fetch, last update {:?} ago", at.elapsed());
                return UpdateOutcome::Throttled;
            }
        }

        // Measured from the start of the last successful fetch
        let started = Instant::now();
        match self.fetch_report().await {
            Ok(metar) => {
                tracing::info!("METAR {}", metar.raw);
                *self.snapshot.write() = Some(Arc::new(metar));
                *last_success = Some(started);
                UpdateOutcome::Updated
            }
            Err(e) => {
                tracing::error!("Error retrieving {} data: {}", self.airport.code, e);
                UpdateOutcome::Failed(e)
            }
        }
    }

    /// One unthrottled fetch, line match and decode
    #[instrument(skip(self), fields(airport = %self.airport.code), level = "debug")]
    pub async fn fetch_report(&self) -> Result<Metar, MetarError> {
        let response = self
            .client
            .get(self.station_url.clone())
            .send()
            .await
            .map_err(ReqwestErrorExt::into_network_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::ServerError {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("unknown").to_string(),
            }
            .into());
        }

        let body = response
            .text()
            .await
            .map_err(ReqwestErrorExt::into_network_error)?;

        let line = find_report_line(&body, &self.airport.code)
            .ok_or_else(|| MetarError::NoReport(self.airport.code.clone()))?;

        Metar::parse(line).map_err(|e| {
            tracing::warn!("Rejected METAR code: {}", line);
            MetarError::Parse(e)
        })
    }
}
