//! Sensor entities projecting one measurement out of the shared report.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metar_core::{Entity, SensorValue};
use std::sync::Arc;

use crate::data::MetarData;
use crate::metar::Metar;
use crate::types::SensorKind;

/// `time.ctime()` layout
const CTIME_FORMAT: &str = "%a %b %e %H:%M:%S %Y";
const LIST_SEPARATOR: &str = "; ";

/// The report has no value for this measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Condition is currently not available: {0}")]
pub struct MissingField(pub SensorKind);

/// Relative humidity in percent from temperature and dewpoint in °C.
///
/// Uses the Magnus approximation of saturation vapour pressure.
pub fn relative_humidity(temperature: f64, dewpoint: f64) -> f64 {
    let magnus = |t: f64| ((17.625 * t) / (243.04 + t)).exp();
    100.0 * magnus(dewpoint) / magnus(temperature)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Extract one measurement from a decoded report
pub fn project(kind: SensorKind, metar: &Metar, now: DateTime<Utc>) -> Result<SensorValue, MissingField> {
    let missing = MissingField(kind);
    let value = match kind {
        SensorKind::Time => {
            let observed = metar.time.resolve(now).ok_or(missing)?;
            SensorValue::Text(observed.format(CTIME_FORMAT).to_string())
        }
        SensorKind::Weather => SensorValue::Text(metar.present_weather(LIST_SEPARATOR).ok_or(missing)?),
        SensorKind::Temperature => SensorValue::Number(metar.temperature.ok_or(missing)?),
        SensorKind::Dewpoint => SensorValue::Number(metar.dewpoint.ok_or(missing)?),
        SensorKind::Humidity => {
            let temperature = metar.temperature.ok_or(missing)?;
            let dewpoint = metar.dewpoint.ok_or(missing)?;
            SensorValue::Number(round_to(relative_humidity(temperature, dewpoint), 1))
        }
        SensorKind::Wind => SensorValue::Text(metar.wind.as_ref().ok_or(missing)?.describe()),
        SensorKind::WindSpeed => {
            SensorValue::Number(round_to(metar.wind.as_ref().ok_or(missing)?.speed_kmh(), 1))
        }
        SensorKind::WindDirection => {
            let direction = metar.wind.as_ref().and_then(|w| w.direction).ok_or(missing)?;
            SensorValue::Number(f64::from(direction))
        }
        SensorKind::Pressure => SensorValue::Number(round_to(metar.pressure.ok_or(missing)?.hpa(), 1)),
        SensorKind::Visibility => SensorValue::Number(metar.visibility.ok_or(missing)?.meters.round()),
        SensorKind::Precipitation => SensorValue::Number(round_to(metar.precip_1hr_mm().ok_or(missing)?, 2)),
        SensorKind::Sky => SensorValue::Text(metar.sky_conditions(LIST_SEPARATOR).ok_or(missing)?),
    };
    Ok(value)
}

/// One measurement of one airport, bound to the airport's shared fetcher
pub struct MetarSensor {
    kind: SensorKind,
    data: Arc<MetarData>,
    state: Option<SensorValue>,
}

impl MetarSensor {
    pub fn new(data: Arc<MetarData>, kind: SensorKind) -> Self {
        Self {
            kind,
            data,
            state: None,
        }
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    /// Re-project the current snapshot; no-op while there is none
    fn refresh_state(&mut self, now: DateTime<Utc>) {
        let Some(snapshot) = self.data.snapshot() else {
            return;
        };

        match project(self.kind, &snapshot, now) {
            Ok(value) => {
                tracing::debug!("{} {}: {}", self.data.airport().code, self.kind.key(), value);
                self.state = Some(value);
            }
            Err(e) => {
                self.state = None;
                tracing::warn!("{}", e);
            }
        }
    }
}

#[async_trait]
impl Entity for MetarSensor {
    fn name(&self) -> String {
        format!("{} {}", self.data.airport().name, self.kind.label())
    }

    fn unique_id(&self) -> String {
        format!(
            "metar_{}_{}",
            self.data.airport().code.to_ascii_lowercase(),
            self.kind.key()
        )
    }

    fn state(&self) -> Option<SensorValue> {
        self.state.clone()
    }

    fn unit_of_measurement(&self) -> Option<&str> {
        self.kind.unit()
    }

    async fn update(&mut self) {
        // Failures are logged by the fetcher; a stale snapshot still projects
        self.data.update().await;
        self.refresh_state(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FetchOptions;
    use crate::types::Airport;
    use chrono::TimeZone;

    const KJFK: &str = "KJFK 191751Z 24012G22KT 10SM -RA FEW050 BKN250 18/09 A3002 RMK AO2 T01830094 P0002";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 18, 0, 0).unwrap()
    }

    fn value(kind: SensorKind, report: &str) -> Result<SensorValue, MissingField> {
        project(kind, &Metar::parse(report).unwrap(), now())
    }

    #[test]
    fn test_relative_humidity() {
        let rh = relative_humidity(20.0, 15.0);
        assert!((rh - 72.9).abs() < 0.05, "got {}", rh);
        assert!((relative_humidity(10.0, 10.0) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_numeric_projections() {
        assert_eq!(value(SensorKind::Temperature, KJFK), Ok(SensorValue::Number(18.3)));
        assert_eq!(value(SensorKind::Dewpoint, KJFK), Ok(SensorValue::Number(9.4)));
        assert_eq!(value(SensorKind::Humidity, KJFK), Ok(SensorValue::Number(56.1)));
        assert_eq!(value(SensorKind::WindSpeed, KJFK), Ok(SensorValue::Number(22.2)));
        assert_eq!(value(SensorKind::WindDirection, KJFK), Ok(SensorValue::Number(240.0)));
        assert_eq!(value(SensorKind::Pressure, KJFK), Ok(SensorValue::Number(1016.6)));
        assert_eq!(value(SensorKind::Visibility, KJFK), Ok(SensorValue::Number(16093.0)));
        assert_eq!(value(SensorKind::Precipitation, KJFK), Ok(SensorValue::Number(0.51)));
    }

    #[test]
    fn test_humidity_uses_dewpoint() {
        let report = "EDDF 191020Z 27005KT 9999 FEW030 20/15 Q1018";
        assert_eq!(value(SensorKind::Humidity, report), Ok(SensorValue::Number(72.9)));
    }

    #[test]
    fn test_text_projections() {
        assert_eq!(
            value(SensorKind::Time, KJFK),
            Ok(SensorValue::Text("Mon Oct 19 17:51:00 2026".into()))
        );
        assert_eq!(
            value(SensorKind::Wind, KJFK),
            Ok(SensorValue::Text("WSW at 12 knots, gusting to 22 knots".into()))
        );
        assert_eq!(value(SensorKind::Weather, KJFK), Ok(SensorValue::Text("light rain".into())));
        assert_eq!(
            value(SensorKind::Sky, KJFK),
            Ok(SensorValue::Text(
                "a few clouds at 5000 feet; broken clouds at 25000 feet".into()
            ))
        );
    }

    #[test]
    fn test_missing_fields() {
        let sparse = "LFPG 191030Z VRB02KT CAVOK 15/// Q1020";
        assert_eq!(value(SensorKind::Weather, sparse), Err(MissingField(SensorKind::Weather)));
        assert_eq!(value(SensorKind::Dewpoint, sparse), Err(MissingField(SensorKind::Dewpoint)));
        assert_eq!(value(SensorKind::Humidity, sparse), Err(MissingField(SensorKind::Humidity)));
        assert_eq!(
            value(SensorKind::WindDirection, sparse),
            Err(MissingField(SensorKind::WindDirection))
        );
        assert_eq!(
            value(SensorKind::Precipitation, sparse),
            Err(MissingField(SensorKind::Precipitation))
        );
        assert_eq!(value(SensorKind::Temperature, sparse), Ok(SensorValue::Number(15.0)));
    }

    #[test]
    fn test_entity_naming() {
        let airport = Airport::new("Schiphol", "EHAM");
        let data = Arc::new(MetarData::new(airport, &FetchOptions::default()).unwrap());
        let sensor = MetarSensor::new(data, SensorKind::WindSpeed);

        assert_eq!(sensor.name(), "Schiphol Wind speed");
        assert_eq!(sensor.unique_id(), "metar_eham_wind_speed");
        assert_eq!(sensor.unit_of_measurement(), Some("km/h"));
        assert_eq!(sensor.state(), None);
    }

    #[test]
    fn test_refresh_without_snapshot_keeps_unknown() {
        let airport = Airport::new("Schiphol", "EHAM");
        let data = Arc::new(MetarData::new(airport, &FetchOptions::default()).unwrap());
        let mut sensor = MetarSensor::new(data, SensorKind::Temperature);

        sensor.refresh_state(now());
        assert_eq!(sensor.state(), None);
    }
}
