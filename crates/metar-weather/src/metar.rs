//! METAR report decoding.
//!
//! Decodes the groups the sensors need (station, time, wind, visibility,
//! present weather, sky, temperature, pressure) plus the `T` and `P`
//! remarks. Runway visual range, wind shear and trend groups are recognised
//! and skipped. Any other body group is a parse error.

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use thiserror::Error;

const KNOTS_TO_KMH: f64 = 1.852;
const MPS_TO_KMH: f64 = 3.6;
const INHG_TO_HPA: f64 = 33.8639;
const STATUTE_MILE_M: f64 = 1609.344;
const INCH_MM: f64 = 25.4;

/// Rejection of malformed report text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Empty report")]
    Empty,

    #[error("Invalid station identifier: {0}")]
    InvalidStation(String),

    #[error("Missing observation time")]
    MissingTime,

    #[error("Invalid observation time: {0}")]
    InvalidTime(String),

    #[error("Unparsed groups in body: {}", .0.join(" "))]
    UnparsedGroups(Vec<String>),
}

/// Day of month and UTC time of the observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservationTime {
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
}

impl ObservationTime {
    fn parse(group: &str) -> Result<Self, ParseError> {
        let digits = group
            .strip_suffix('Z')
            .filter(|d| d.len() == 6 && d.bytes().all(|b| b.is_ascii_digit()))
            .ok_or_else(|| ParseError::InvalidTime(group.to_string()))?;

        let field = |range: std::ops::Range<usize>| digits[range].parse::<u32>().unwrap_or(99);
        let time = Self {
            day: field(0..2),
            hour: field(2..4),
            minute: field(4..6),
        };

        if !(1..=31).contains(&time.day) || time.hour > 23 || time.minute > 59 {
            return Err(ParseError::InvalidTime(group.to_string()));
        }
        Ok(time)
    }

    /// Full timestamp, taking month and year from `now`.
    ///
    /// A day later than today's belongs to the previous month.
    pub fn resolve(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let today = now.date_naive();
        let month_start = NaiveDate::from_ymd_opt(today.year(), today.month(), 1)?;
        let month_start = if self.day > today.day() {
            month_start.checked_sub_months(Months::new(1))?
        } else {
            month_start
        };

        month_start
            .with_day(self.day)?
            .and_hms_opt(self.hour, self.minute, 0)
            .map(|dt| dt.and_utc())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedUnit {
    Knots,
    MetersPerSecond,
    KilometersPerHour,
}

impl SpeedUnit {
    fn to_kmh(self, value: f64) -> f64 {
        match self {
            SpeedUnit::Knots => value * KNOTS_TO_KMH,
            SpeedUnit::MetersPerSecond => value * MPS_TO_KMH,
            SpeedUnit::KilometersPerHour => value,
        }
    }

    fn label(self) -> &'static str {
        match self {
            SpeedUnit::Knots => "knots",
            SpeedUnit::MetersPerSecond => "meters per second",
            SpeedUnit::KilometersPerHour => "km/h",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Wind {
    /// True direction in degrees, `None` when reported as variable
    pub direction: Option<u16>,
    pub speed: f64,
    pub gust: Option<f64>,
    pub unit: SpeedUnit,
    /// Extremes of a variable direction, from a `dddVddd` group
    pub variable_range: Option<(u16, u16)>,
}

impl Wind {
    fn parse(group: &str) -> Option<Option<Self>> {
        let (body, unit) = if let Some(b) = group.strip_suffix("KT") {
            (b, SpeedUnit::Knots)
        } else if let Some(b) = group.strip_suffix("MPS") {
            (b, SpeedUnit::MetersPerSecond)
        } else if let Some(b) = group.strip_suffix("KMH") {
            (b, SpeedUnit::KilometersPerHour)
        } else {
            return None;
        };

        if body.len() < 5 || !body.is_ascii() {
            return None;
        }
        if body.bytes().all(|b| b == b'/') {
            return Some(None);
        }

        let (dir, rest) = body.split_at(3);
        let direction = match dir {
            "VRB" => None,
            d if is_digits(d) => Some(d.parse::<u16>().ok()?),
            _ => return None,
        };

        let (speed, gust) = match rest.split_once('G') {
            Some((s, g)) => (s, Some(g)),
            None => (rest, None),
        };
        if !(2..=3).contains(&speed.len()) || !is_digits(speed) {
            return None;
        }
        let gust = match gust {
            Some(g) if (2..=3).contains(&g.len()) && is_digits(g) => Some(g.parse::<f64>().ok()?),
            Some(_) => return None,
            None => None,
        };

        Some(Some(Self {
            direction,
            speed: speed.parse().ok()?,
            gust,
            unit,
            variable_range: None,
        }))
    }

    pub fn is_calm(&self) -> bool {
        self.speed == 0.0 && self.gust.is_none()
    }

    pub fn speed_kmh(&self) -> f64 {
        self.unit.to_kmh(self.speed)
    }

    pub fn gust_kmh(&self) -> Option<f64> {
        self.gust.map(|g| self.unit.to_kmh(g))
    }

    /// Plain-language description, e.g. `WSW at 10 knots, gusting to 20 knots`
    pub fn describe(&self) -> String {
        if self.is_calm() {
            return "calm".to_string();
        }

        let heading = match self.direction {
            Some(deg) => compass_point(deg).to_string(),
            None => "variable".to_string(),
        };
        let mut text = format!("{} at {:.0} {}", heading, self.speed, self.unit.label());
        if let Some(gust) = self.gust {
            text.push_str(&format!(", gusting to {:.0} {}", gust, self.unit.label()));
        }
        if let Some((from, to)) = self.variable_range {
            text.push_str(&format!(", varying from {} to {} degrees", from, to));
        }
        text
    }
}

/// 16-point compass name for a direction in degrees
pub fn compass_point(degrees: u16) -> &'static str {
    const POINTS: [&str; 16] = [
        "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW",
        "NW", "NNW",
    ];
    let idx = ((f64::from(degrees % 360) + 11.25) / 22.5) as usize % 16;
    POINTS[idx]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    LessThan,
    GreaterThan,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Visibility {
    pub meters: f64,
    pub bound: Option<Bound>,
}

impl Visibility {
    fn parse_metric(group: &str) -> Option<Self> {
        let digits = group.get(..4).filter(|d| is_digits(d))?;
        let rest = &group[4..];
        if !matches!(rest, "" | "NDV" | "N" | "NE" | "E" | "SE" | "S" | "SW" | "W" | "NW") {
            return None;
        }
        Some(match digits {
            "9999" => Self {
                meters: 10_000.0,
                bound: Some(Bound::GreaterThan),
            },
            d => Self {
                meters: d.parse().ok()?,
                bound: None,
            },
        })
    }

    fn parse_miles(group: &str) -> Option<Self> {
        let value = group.strip_suffix("SM")?;
        let (bound, value) = if let Some(v) = value.strip_prefix('M') {
            (Some(Bound::LessThan), v)
        } else if let Some(v) = value.strip_prefix('P') {
            (Some(Bound::GreaterThan), v)
        } else {
            (None, value)
        };
        Some(Self {
            meters: parse_fraction(value)? * STATUTE_MILE_M,
            bound,
        })
    }
}

/// `3`, `1/2` or `1 1/2`
fn parse_fraction(value: &str) -> Option<f64> {
    let mut total = 0.0;
    for part in value.split(' ') {
        total += match part.split_once('/') {
            Some((n, d)) if is_digits(n) && is_digits(d) => {
                let d: f64 = d.parse().ok()?;
                if d == 0.0 {
                    return None;
                }
                n.parse::<f64>().ok()? / d
            }
            None if is_digits(part) => part.parse::<f64>().ok()?,
            _ => return None,
        };
    }
    Some(total)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intensity {
    Light,
    Moderate,
    Heavy,
    Vicinity,
}

const DESCRIPTORS: [(&str, &str); 8] = [
    ("MI", "shallow"),
    ("PR", "partial"),
    ("BC", "patches of"),
    ("DR", "low drifting"),
    ("BL", "blowing"),
    ("SH", "showers"),
    ("TS", "thunderstorm"),
    ("FZ", "freezing"),
];

const PHENOMENA: [(&str, &str); 22] = [
    ("DZ", "drizzle"),
    ("RA", "rain"),
    ("SN", "snow"),
    ("SG", "snow grains"),
    ("IC", "ice crystals"),
    ("PL", "ice pellets"),
    ("GR", "hail"),
    ("GS", "snow pellets"),
    ("UP", "unknown precipitation"),
    ("BR", "mist"),
    ("FG", "fog"),
    ("FU", "smoke"),
    ("VA", "volcanic ash"),
    ("DU", "dust"),
    ("SA", "sand"),
    ("HZ", "haze"),
    ("PY", "spray"),
    ("PO", "sand whirls"),
    ("SQ", "squalls"),
    ("FC", "funnel cloud"),
    ("SS", "sandstorm"),
    ("DS", "dust storm"),
];

fn lookup(table: &[(&'static str, &'static str)], code: &str) -> Option<&'static str> {
    table.iter().find(|(c, _)| *c == code).map(|(_, name)| *name)
}

/// One present-weather group such as `-SHRA` or `VCFG`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherGroup {
    pub intensity: Intensity,
    pub descriptor: Option<&'static str>,
    pub phenomena: Vec<&'static str>,
}

impl WeatherGroup {
    fn parse(group: &str) -> Option<Self> {
        if !group.is_ascii() {
            return None;
        }
        let (intensity, mut rest) = if let Some(r) = group.strip_prefix('+') {
            (Intensity::Heavy, r)
        } else if let Some(r) = group.strip_prefix('-') {
            (Intensity::Light, r)
        } else if let Some(r) = group.strip_prefix("VC") {
            (Intensity::Vicinity, r)
        } else {
            (Intensity::Moderate, group)
        };

        let descriptor = rest
            .get(..2)
            .and_then(|code| DESCRIPTORS.iter().find(|(c, _)| *c == code))
            .map(|(c, _)| *c);
        if descriptor.is_some() {
            rest = &rest[2..];
        }

        if rest.len() % 2 != 0 {
            return None;
        }
        let mut phenomena = Vec::new();
        while !rest.is_empty() {
            let code = PHENOMENA.iter().find(|(c, _)| *c == &rest[..2])?.0;
            phenomena.push(code);
            rest = &rest[2..];
        }

        if descriptor.is_none() && phenomena.is_empty() {
            return None;
        }
        Some(Self {
            intensity,
            descriptor,
            phenomena,
        })
    }

    /// Plain-language description, e.g. `light rain showers`
    pub fn describe(&self) -> String {
        let phenomena = self
            .phenomena
            .iter()
            .filter_map(|code| lookup(&PHENOMENA, code))
            .collect::<Vec<_>>()
            .join(" and ");

        let core = match (self.descriptor, phenomena.is_empty()) {
            (Some("SH"), false) => format!("{} showers", phenomena),
            (Some("TS"), false) => format!("thunderstorm with {}", phenomena),
            (Some(d), false) => format!("{} {}", lookup(&DESCRIPTORS, d).unwrap_or(d), phenomena),
            (Some(d), true) => lookup(&DESCRIPTORS, d).unwrap_or(d).to_string(),
            (None, _) => phenomena,
        };

        match self.intensity {
            Intensity::Light => format!("light {}", core),
            Intensity::Heavy => format!("heavy {}", core),
            Intensity::Vicinity => format!("{} in the vicinity", core),
            Intensity::Moderate => core,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkyCover {
    /// SKC or CLR
    Clear,
    NoSignificantCloud,
    NoCloudDetected,
    Few,
    Scattered,
    Broken,
    Overcast,
    VerticalVisibility,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudType {
    Cumulonimbus,
    ToweringCumulus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkyCondition {
    pub cover: SkyCover,
    /// Base (or vertical visibility) in feet
    pub height_ft: Option<u32>,
    pub cloud: Option<CloudType>,
}

impl SkyCondition {
    fn parse(group: &str) -> Option<Self> {
        let bare = |cover| {
            Some(Self {
                cover,
                height_ft: None,
                cloud: None,
            })
        };
        match group {
            "SKC" | "CLR" => return bare(SkyCover::Clear),
            "NSC" => return bare(SkyCover::NoSignificantCloud),
            "NCD" => return bare(SkyCover::NoCloudDetected),
            _ => {}
        }

        let (cover, rest) = if let Some(r) = group.strip_prefix("VV") {
            (SkyCover::VerticalVisibility, r)
        } else {
            let cover = match group.get(..3)? {
                "FEW" => SkyCover::Few,
                "SCT" => SkyCover::Scattered,
                "BKN" => SkyCover::Broken,
                "OVC" => SkyCover::Overcast,
                _ => return None,
            };
            (cover, &group[3..])
        };

        let height = rest.get(..3)?;
        let height_ft = match height {
            "///" => None,
            h if is_digits(h) => Some(h.parse::<u32>().ok()? * 100),
            _ => return None,
        };
        let cloud = match &rest[3..] {
            "" | "///" => None,
            "CB" => Some(CloudType::Cumulonimbus),
            "TCU" => Some(CloudType::ToweringCumulus),
            _ => return None,
        };
        if cover == SkyCover::VerticalVisibility && cloud.is_some() {
            return None;
        }

        Some(Self {
            cover,
            height_ft,
            cloud,
        })
    }

    /// Plain-language description, e.g. `broken clouds at 2500 feet`
    pub fn describe(&self) -> String {
        let layer = match (self.cover, self.cloud) {
            (SkyCover::Clear, _) => return "clear".to_string(),
            (SkyCover::NoSignificantCloud, _) => return "no significant clouds".to_string(),
            (SkyCover::NoCloudDetected, _) => return "no clouds detected".to_string(),
            (SkyCover::VerticalVisibility, _) => {
                return match self.height_ft {
                    Some(ft) => format!("indefinite ceiling, vertical visibility to {} feet", ft),
                    None => "indefinite ceiling".to_string(),
                };
            }
            (SkyCover::Few, None) => "a few clouds",
            (SkyCover::Scattered, None) => "scattered clouds",
            (SkyCover::Broken, None) => "broken clouds",
            (SkyCover::Overcast, None) => "overcast",
            (SkyCover::Few, Some(CloudType::Cumulonimbus)) => "a few cumulonimbus",
            (SkyCover::Scattered, Some(CloudType::Cumulonimbus)) => "scattered cumulonimbus",
            (SkyCover::Broken, Some(CloudType::Cumulonimbus)) => "broken cumulonimbus",
            (SkyCover::Overcast, Some(CloudType::Cumulonimbus)) => "overcast cumulonimbus",
            (SkyCover::Few, Some(CloudType::ToweringCumulus)) => "a few towering cumulus",
            (SkyCover::Scattered, Some(CloudType::ToweringCumulus)) => "scattered towering cumulus",
            (SkyCover::Broken, Some(CloudType::ToweringCumulus)) => "broken towering cumulus",
            (SkyCover::Overcast, Some(CloudType::ToweringCumulus)) => "overcast towering cumulus",
        };
        match self.height_ft {
            Some(ft) => format!("{} at {} feet", layer, ft),
            None => layer.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pressure {
    Hectopascals(f64),
    InchesOfMercury(f64),
}

impl Pressure {
    fn parse(group: &str) -> Option<Option<Self>> {
        let (kind, value) = (group.get(..1)?, group.get(1..)?);
        if value.len() != 4 || !matches!(kind, "Q" | "A") {
            return None;
        }
        if value == "////" {
            return Some(None);
        }
        if !is_digits(value) {
            return None;
        }
        let raw: f64 = value.parse().ok()?;
        Some(Some(match kind {
            "Q" => Pressure::Hectopascals(raw),
            _ => Pressure::InchesOfMercury(raw / 100.0),
        }))
    }

    pub fn hpa(&self) -> f64 {
        match *self {
            Pressure::Hectopascals(v) => v,
            Pressure::InchesOfMercury(v) => v * INHG_TO_HPA,
        }
    }
}

/// `M05` style whole-degree value
fn parse_whole_degrees(value: &str) -> Option<f64> {
    let (negative, digits) = match value.strip_prefix('M') {
        Some(d) => (true, d),
        None => (false, value),
    };
    if digits.len() != 2 || !is_digits(digits) {
        return None;
    }
    let v: f64 = digits.parse().ok()?;
    Some(if negative { -v } else { v })
}

/// `12/M01`, `12/` or `12///`
fn parse_temperatures(group: &str) -> Option<(Option<f64>, Option<f64>)> {
    let (temp, dew) = group.split_once('/')?;
    let temp = match temp {
        "//" => None,
        t => Some(parse_whole_degrees(t)?),
    };
    let dew = match dew {
        "" | "//" => None,
        d => Some(parse_whole_degrees(d)?),
    };
    if temp.is_none() && dew.is_none() {
        return None;
    }
    Some((temp, dew))
}

/// `snnn` tenths of a degree, sign digit 1 for negative
fn parse_tenths(value: &str) -> Option<f64> {
    if value.len() != 4 || !is_digits(value) {
        return None;
    }
    let magnitude = value[1..].parse::<f64>().ok()? / 10.0;
    match &value[..1] {
        "0" => Some(magnitude),
        "1" => Some(-magnitude),
        _ => None,
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_runway_visual_range(group: &str) -> bool {
    group.starts_with('R')
        && group.contains('/')
        && group[1..].bytes().next().is_some_and(|b| b.is_ascii_digit())
}

/// Decoded observation
#[derive(Debug, Clone, PartialEq)]
pub struct Metar {
    pub raw: String,
    pub station: String,
    pub time: ObservationTime,
    pub automated: bool,
    pub corrected: bool,
    pub wind: Option<Wind>,
    pub visibility: Option<Visibility>,
    pub cavok: bool,
    pub weather: Vec<WeatherGroup>,
    pub sky: Vec<SkyCondition>,
    /// Degrees Celsius
    pub temperature: Option<f64>,
    /// Degrees Celsius
    pub dewpoint: Option<f64>,
    pub pressure: Option<Pressure>,
    /// One-hour precipitation in inches
    pub precip_1hr_in: Option<f64>,
    pub remarks: Option<String>,
}

impl Metar {
    /// Decode a single report line
    pub fn parse(report: &str) -> Result<Self, ParseError> {
        let raw = report.trim();
        let tokens: Vec<&str> = raw.split_whitespace().collect();
        let (body, remarks) = match tokens.iter().position(|t| *t == "RMK") {
            Some(idx) => (&tokens[..idx], Some(&tokens[idx + 1..])),
            None => (&tokens[..], None),
        };

        let mut groups = body.iter().copied().peekable();
        if matches!(groups.peek(), Some(&"METAR") | Some(&"SPECI")) {
            groups.next();
        }

        let station = groups.next().ok_or(ParseError::Empty)?;
        if !(3..=4).contains(&station.len())
            || !station.bytes().all(|b| b.is_ascii_alphanumeric())
            || !station.as_bytes()[0].is_ascii_alphabetic()
        {
            return Err(ParseError::InvalidStation(station.to_string()));
        }

        let time = ObservationTime::parse(groups.next().ok_or(ParseError::MissingTime)?)?;

        let mut metar = Self {
            raw: raw.to_string(),
            station: station.to_string(),
            time,
            automated: false,
            corrected: false,
            wind: None,
            visibility: None,
            cavok: false,
            weather: Vec::new(),
            sky: Vec::new(),
            temperature: None,
            dewpoint: None,
            pressure: None,
            precip_1hr_in: None,
            remarks: remarks.filter(|r| !r.is_empty()).map(|r| r.join(" ")),
        };

        let mut unparsed = Vec::new();
        while let Some(group) = groups.next() {
            if metar.decode_body_group(group, &mut groups) {
                continue;
            }
            if matches!(group, "NOSIG" | "TEMPO" | "BECMG" | "WS") {
                break;
            }
            unparsed.push(group.to_string());
        }
        if !unparsed.is_empty() {
            return Err(ParseError::UnparsedGroups(unparsed));
        }

        if let Some(remarks) = remarks {
            metar.decode_remarks(remarks);
        }
        Ok(metar)
    }

    /// Returns false when `group` is not recognised
    fn decode_body_group<'a, I>(&mut self, group: &'a str, rest: &mut std::iter::Peekable<I>) -> bool
    where
        I: Iterator<Item = &'a str>,
    {
        match group {
            "AUTO" => {
                self.automated = true;
                return true;
            }
            "COR" | "CC" | "CCA" | "CCB" => {
                self.corrected = true;
                return true;
            }
            "CAVOK" => {
                self.cavok = true;
                self.visibility = Some(Visibility {
                    meters: 10_000.0,
                    bound: Some(Bound::GreaterThan),
                });
                return true;
            }
            "NSW" => return true,
            _ => {}
        }
        if is_colour_state(group) {
            return true;
        }
        // Missing group, or cloud type with unknown cover and base
        let unreported = group.trim_end_matches("CB").trim_end_matches("TCU");
        if !unreported.is_empty() && unreported.bytes().all(|b| b == b'/') {
            return true;
        }

        if self.wind.is_none() {
            if let Some(wind) = Wind::parse(group) {
                self.wind = wind;
                return true;
            }
        }
        if let Some(wind) = self.wind.as_mut() {
            if wind.variable_range.is_none()
                && group.len() == 7
                && group.is_ascii()
                && &group[3..4] == "V"
            {
                if let (Ok(from), Ok(to)) = (group[..3].parse(), group[4..].parse()) {
                    wind.variable_range = Some((from, to));
                    return true;
                }
            }
        }

        if let Some(vis) = Visibility::parse_metric(group) {
            // A second metric group is the minimum in one direction
            if self.visibility.is_none() {
                self.visibility = Some(vis);
            }
            return true;
        }
        if group.len() <= 2 && is_digits(group) {
            if let Some(next) = rest.peek().copied() {
                if next.ends_with("SM") && next.contains('/') {
                    rest.next();
                    if let Some(vis) = Visibility::parse_miles(&format!("{} {}", group, next)) {
                        self.visibility = Some(vis);
                        return true;
                    }
                    return false;
                }
            }
        }
        if let Some(vis) = Visibility::parse_miles(group) {
            self.visibility = Some(vis);
            return true;
        }
        if is_runway_visual_range(group) {
            return true;
        }

        if let Some(layer) = SkyCondition::parse(group) {
            self.sky.push(layer);
            return true;
        }
        if let Some((temp, dew)) = parse_temperatures(group) {
            self.temperature = temp;
            self.dewpoint = dew;
            return true;
        }
        if let Some(pressure) = Pressure::parse(group) {
            if self.pressure.is_none() {
                self.pressure = pressure;
            }
            return true;
        }
        if let Some(weather) = WeatherGroup::parse(group) {
            self.weather.push(weather);
            return true;
        }
        // Recent weather
        group.strip_prefix("RE").is_some_and(|w| WeatherGroup::parse(w).is_some())
    }

    fn decode_remarks(&mut self, remarks: &[&str]) {
        for group in remarks {
            if let Some(tenths) = group.strip_prefix('T').filter(|t| t.is_ascii()) {
                match tenths.len() {
                    8 => {
                        if let (Some(t), Some(d)) = (parse_tenths(&tenths[..4]), parse_tenths(&tenths[4..])) {
                            self.temperature = Some(t);
                            self.dewpoint = Some(d);
                        }
                    }
                    4 => {
                        if let Some(t) = parse_tenths(tenths) {
                            self.temperature = Some(t);
                        }
                    }
                    _ => {}
                }
            } else if let Some(hundredths) = group.strip_prefix('P') {
                if hundredths.len() == 4 && is_digits(hundredths) {
                    if let Ok(v) = hundredths.parse::<f64>() {
                        self.precip_1hr_in = Some(v / 100.0);
                    }
                }
            }
        }
    }

    /// Present weather groups joined by `sep`, `None` when none reported
    pub fn present_weather(&self, sep: &str) -> Option<String> {
        if self.weather.is_empty() {
            return None;
        }
        Some(
            self.weather
                .iter()
                .map(WeatherGroup::describe)
                .collect::<Vec<_>>()
                .join(sep),
        )
    }

    /// Sky layers joined by `sep`, `None` when no sky group was reported
    pub fn sky_conditions(&self, sep: &str) -> Option<String> {
        if self.sky.is_empty() {
            return self.cavok.then(|| "ceiling and visibility OK".to_string());
        }
        Some(
            self.sky
                .iter()
                .map(SkyCondition::describe)
                .collect::<Vec<_>>()
                .join(sep),
        )
    }

    /// One-hour precipitation in millimetres
    pub fn precip_1hr_mm(&self) -> Option<f64> {
        self.precip_1hr_in.map(|inches| inches * INCH_MM)
    }
}

/// Military airfield colour state, e.g. `BLU`, `BLACKGRN`, `WHT/AMB+`
fn is_colour_state(group: &str) -> bool {
    const COLOURS: [&str; 8] = ["BLU", "WHT", "GRN", "YLO1", "YLO2", "YLO", "AMB", "RED"];
    !group.is_empty()
        && group.split('/').all(|part| {
            let part = part.strip_prefix("BLACK").unwrap_or(part);
            let part = part.strip_suffix('+').unwrap_or(part);
            COLOURS.contains(&part)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const KJFK: &str = "KJFK 191751Z 24012G22KT 10SM FEW050 SCT250 18/09 A3002 RMK AO2 SLP165 T01830094 P0002";
    const EHAM: &str = "EHAM 191025Z 22015KT 190V250 9999 -SHRA BKN020CB 12/M01 Q1013 NOSIG";

    #[test]
    fn test_parse_us_report() {
        let metar = Metar::parse(KJFK).unwrap();

        assert_eq!(metar.station, "KJFK");
        assert_eq!(
            metar.time,
            ObservationTime {
                day: 19,
                hour: 17,
                minute: 51
            }
        );

        let wind = metar.wind.as_ref().unwrap();
        assert_eq!(wind.direction, Some(240));
        assert_eq!(wind.speed, 12.0);
        assert_eq!(wind.gust, Some(22.0));
        assert_eq!(wind.unit, SpeedUnit::Knots);
        assert!((wind.speed_kmh() - 22.224).abs() < 1e-9);

        let vis = metar.visibility.unwrap();
        assert!((vis.meters - 16_093.44).abs() < 1e-6);

        assert_eq!(metar.sky.len(), 2);
        // T group refines the whole-degree body values
        assert_eq!(metar.temperature, Some(18.3));
        assert_eq!(metar.dewpoint, Some(9.4));
        assert!((metar.pressure.unwrap().hpa() - 30.02 * INHG_TO_HPA).abs() < 1e-9);
        assert_eq!(metar.precip_1hr_in, Some(0.02));
        assert!((metar.precip_1hr_mm().unwrap() - 0.508).abs() < 1e-9);
        assert_eq!(metar.remarks.as_deref(), Some("AO2 SLP165 T01830094 P0002"));
    }

    #[test]
    fn test_parse_icao_report() {
        let metar = Metar::parse(EHAM).unwrap();

        let wind = metar.wind.as_ref().unwrap();
        assert_eq!(wind.variable_range, Some((190, 250)));
        assert_eq!(
            metar.visibility,
            Some(Visibility {
                meters: 10_000.0,
                bound: Some(Bound::GreaterThan)
            })
        );
        assert_eq!(metar.temperature, Some(12.0));
        assert_eq!(metar.dewpoint, Some(-1.0));
        assert_eq!(metar.pressure, Some(Pressure::Hectopascals(1013.0)));
        assert_eq!(metar.present_weather("; ").as_deref(), Some("light rain showers"));
        assert_eq!(
            metar.sky_conditions("; ").as_deref(),
            Some("broken cumulonimbus at 2000 feet")
        );
        assert_eq!(metar.remarks, None);
    }

    #[test]
    fn test_metar_prefix_and_modifiers() {
        let metar = Metar::parse("METAR KSFO 191756Z AUTO COR 00000KT 1 1/2SM BR OVC004 M02/M03 A2992").unwrap();
        assert!(metar.automated);
        assert!(metar.corrected);
        assert_eq!(metar.wind.as_ref().unwrap().describe(), "calm");
        assert!((metar.visibility.unwrap().meters - 1.5 * STATUTE_MILE_M).abs() < 1e-6);
        assert_eq!(metar.temperature, Some(-2.0));
        assert_eq!(metar.present_weather(", ").as_deref(), Some("mist"));
        assert_eq!(metar.sky_conditions(", ").as_deref(), Some("overcast at 400 feet"));
    }

    #[test]
    fn test_missing_groups() {
        let metar = Metar::parse("LFPG 191030Z /////KT //// // ///// Q////").unwrap();
        assert!(metar.wind.is_none());
        assert!(metar.visibility.is_none());
        assert!(metar.temperature.is_none());
        assert!(metar.pressure.is_none());
        assert!(metar.present_weather("; ").is_none());
        assert!(metar.sky_conditions("; ").is_none());
    }

    #[test]
    fn test_cavok_and_trend_groups() {
        let metar = Metar::parse("LEMD 191000Z 03005KT CAVOK 21/08 Q1021 TEMPO 4000 RA").unwrap();
        assert!(metar.cavok);
        assert!(metar.weather.is_empty());
        assert_eq!(
            metar.sky_conditions("; ").as_deref(),
            Some("ceiling and visibility OK")
        );
    }

    #[test]
    fn test_runway_range_and_recent_weather_are_skipped() {
        let metar =
            Metar::parse("EGLL 190650Z 27008KT 0800 R27L/1100U FG VV002 08/08 Q1008 RERA").unwrap();
        assert_eq!(metar.visibility.unwrap().meters, 800.0);
        assert_eq!(
            metar.sky_conditions("; ").as_deref(),
            Some("indefinite ceiling, vertical visibility to 200 feet")
        );
        assert_eq!(metar.weather.len(), 1);
    }

    #[test]
    fn test_rejects_bad_station() {
        assert_eq!(
            Metar::parse("12AB 191751Z 24012KT"),
            Err(ParseError::InvalidStation("12AB".into()))
        );
        assert_eq!(Metar::parse("   "), Err(ParseError::Empty));
    }

    #[test]
    fn test_rejects_bad_time() {
        assert_eq!(Metar::parse("KJFK"), Err(ParseError::MissingTime));
        assert_eq!(
            Metar::parse("KJFK 192551Z 24012KT"),
            Err(ParseError::InvalidTime("192551Z".into()))
        );
    }

    #[test]
    fn test_rejects_unparsed_groups() {
        let err = Metar::parse("KJFK 191751Z 24012KT 10SM GARBAGE 18/09 A3002").unwrap_err();
        assert_eq!(err, ParseError::UnparsedGroups(vec!["GARBAGE".into()]));
        assert_eq!(err.to_string(), "Unparsed groups in body: GARBAGE");
    }

    #[test]
    fn test_skips_military_colour_states() {
        let metar = Metar::parse("EGVN 191750Z 27010KT 9999 FEW030 15/08 Q1013 BLU").unwrap();
        assert_eq!(metar.temperature, Some(15.0));
        assert_eq!(metar.pressure.as_ref().map(Pressure::hpa), Some(1013.0));

        let metar = Metar::parse("EGXC 191750Z 27010KT 2500 BR OVC004 09/08 Q1008 BLACKAMB/YLO1+").unwrap();
        assert_eq!(metar.sky.len(), 1);

        assert!(!is_colour_state("BLUE"));
        assert!(!is_colour_state("RED/"));
    }

    #[test]
    fn test_wind_description() {
        let gusty = Wind::parse("24712G25KT").unwrap().unwrap();
        assert_eq!(gusty.describe(), "WSW at 12 knots, gusting to 25 knots");

        let mut variable = Wind::parse("VRB03MPS").unwrap().unwrap();
        variable.variable_range = Some((180, 240));
        assert_eq!(
            variable.describe(),
            "variable at 3 meters per second, varying from 180 to 240 degrees"
        );
        assert!((variable.speed_kmh() - 10.8).abs() < 1e-9);
    }

    #[test]
    fn test_compass_point() {
        assert_eq!(compass_point(0), "N");
        assert_eq!(compass_point(360), "N");
        assert_eq!(compass_point(247), "WSW");
        assert_eq!(compass_point(350), "N");
        assert_eq!(compass_point(95), "E");
    }

    #[test]
    fn test_weather_group_descriptions() {
        let cases = [
            ("+TSRA", "heavy thunderstorm with rain"),
            ("VCSH", "showers in the vicinity"),
            ("FZFG", "freezing fog"),
            ("-DZBR", "light drizzle and mist"),
        ];
        for (code, expected) in cases {
            assert_eq!(WeatherGroup::parse(code).unwrap().describe(), expected, "{}", code);
        }
        assert!(WeatherGroup::parse("FEW020").is_none());
        assert!(WeatherGroup::parse("-").is_none());
    }

    #[test]
    fn test_negative_tenths_remark() {
        let metar = Metar::parse("CYUL 191800Z 36010KT 15SM SKC M05/M12 A3010 RMK T10521121").unwrap();
        assert_eq!(metar.temperature, Some(-5.2));
        assert_eq!(metar.dewpoint, Some(-12.1));
        assert_eq!(metar.sky_conditions("; ").as_deref(), Some("clear"));
    }

    #[test]
    fn test_resolve_time_same_month() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 18, 0, 0).unwrap();
        let time = ObservationTime {
            day: 19,
            hour: 17,
            minute: 51,
        };
        assert_eq!(
            time.resolve(now),
            Some(Utc.with_ymd_and_hms(2026, 10, 19, 17, 51, 0).unwrap())
        );
    }

    #[test]
    fn test_resolve_time_previous_month() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 10, 0).unwrap();
        let time = ObservationTime {
            day: 31,
            hour: 23,
            minute: 50,
        };
        assert_eq!(
            time.resolve(now),
            Some(Utc.with_ymd_and_hms(2025, 12, 31, 23, 50, 0).unwrap())
        );
    }
}
