use std::cmp::Ordering;
use std::fmt;

use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time};

/// Calendar time of a reading, second resolution.
pub type Timestamp = PrimitiveDateTime;

/// One decoded DHT11 frame: humidity, temperature and checksum bytes
/// in the order they come off the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample {
    pub humidity_int: u8,
    pub humidity_frac: u8,
    pub temperature_int: u8,
    pub temperature_frac: u8,
    pub checksum: u8,
}

impl RawSample {
    pub const fn from_bytes(bytes: [u8; 5]) -> Self {
        Self {
            humidity_int: bytes[0],
            humidity_frac: bytes[1],
            temperature_int: bytes[2],
            temperature_frac: bytes[3],
            checksum: bytes[4],
        }
    }

    /// Build a sample from the four stored fields, filling in the checksum
    /// the sensor would have sent.
    pub fn from_fields(
        humidity_int: u8,
        humidity_frac: u8,
        temperature_int: u8,
        temperature_frac: u8,
    ) -> Self {
        let mut sample = Self {
            humidity_int,
            humidity_frac,
            temperature_int,
            temperature_frac,
            checksum: 0,
        };
        sample.checksum = sample.expected_checksum();
        sample
    }

    pub const fn to_bytes(&self) -> [u8; 5] {
        [
            self.humidity_int,
            self.humidity_frac,
            self.temperature_int,
            self.temperature_frac,
            self.checksum,
        ]
    }

    /// Low byte of the sum of the four data bytes.
    pub fn expected_checksum(&self) -> u8 {
        self.humidity_int
            .wrapping_add(self.humidity_frac)
            .wrapping_add(self.temperature_int)
            .wrapping_add(self.temperature_frac)
    }

    pub fn is_valid(&self) -> bool {
        self.checksum == self.expected_checksum()
    }

    pub fn humidity(&self) -> f64 {
        combine(self.humidity_int, self.humidity_frac)
    }

    pub fn temperature_c(&self) -> f64 {
        combine(self.temperature_int, self.temperature_frac)
    }
}

/// Number of decimal digits in `value`; zero counts as one digit.
pub fn digits(value: u8) -> u32 {
    match value {
        0..=9 => 1,
        10..=99 => 2,
        _ => 3,
    }
}

/// The fraction byte is read as the digits after the decimal point,
/// so `(26, 3)` is 26.3 and `(26, 23)` is 26.23.
fn combine(integer: u8, fraction: u8) -> f64 {
    f64::from(integer) + f64::from(fraction) / 10f64.powi(digits(fraction) as i32)
}

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn symbol(&self) -> char {
        match self {
            TemperatureUnit::Celsius => 'C',
            TemperatureUnit::Fahrenheit => 'F',
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "Celsius",
            TemperatureUnit::Fahrenheit => "Fahrenheit",
        }
    }
}

/// A converted reading. Fahrenheit is derived once at construction and
/// the fields are private so it cannot drift from the Celsius value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    temperature_c: f64,
    temperature_f: f64,
    humidity: f64,
    timestamp: Timestamp,
}

impl Reading {
    pub fn new(temperature_c: f64, humidity: f64, timestamp: Timestamp) -> Self {
        Self {
            temperature_c,
            temperature_f: celsius_to_fahrenheit(temperature_c),
            humidity,
            timestamp,
        }
    }

    pub fn from_raw(sample: &RawSample, timestamp: Timestamp) -> Self {
        Self::new(sample.temperature_c(), sample.humidity(), timestamp)
    }

    pub fn temperature_c(&self) -> f64 {
        self.temperature_c
    }

    pub fn temperature_f(&self) -> f64 {
        self.temperature_f
    }

    pub fn temperature(&self, unit: TemperatureUnit) -> f64 {
        match unit {
            TemperatureUnit::Celsius => self.temperature_c,
            TemperatureUnit::Fahrenheit => self.temperature_f,
        }
    }

    pub fn humidity(&self) -> f64 {
        self.humidity
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

/// Order two timestamps by year, month, day, hour, minute and second.
/// Sub-second parts are ignored.
pub fn compare_timestamps(a: &Timestamp, b: &Timestamp) -> Ordering {
    let key = |t: &Timestamp| {
        (
            t.year(),
            u8::from(t.month()),
            t.day(),
            t.hour(),
            t.minute(),
            t.second(),
        )
    };
    key(a).cmp(&key(b))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeError {
    InvalidDate { year: i32, month: u8, day: u8 },
    InvalidHour(u8),
    StartAfterEnd,
}

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDate { year, month, day } => {
                write!(f, "{year:04}-{month:02}-{day:02} is not a calendar date")
            }
            Self::InvalidHour(hour) => write!(f, "hour {hour} is outside 0-23"),
            Self::StartAfterEnd => write!(f, "start time is after end time"),
        }
    }
}

impl std::error::Error for RangeError {}

/// A point in time at hour granularity. Field order gives the
/// year, month, day, hour ordering used for range checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct HourStamp {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
}

impl HourStamp {
    pub fn from_datetime(dt: &OffsetDateTime) -> Self {
        Self {
            year: dt.year(),
            month: u8::from(dt.month()),
            day: dt.day(),
            hour: dt.hour(),
        }
    }

    /// The hour `hours` before `now`, or None when that lies outside
    /// the representable calendar.
    pub fn hours_before(now: &OffsetDateTime, hours: u32) -> Option<Self> {
        now.checked_sub(time::Duration::hours(i64::from(hours)))
            .map(|then| Self::from_datetime(&then))
    }

    /// Calendar time at `minute:second` within this hour.
    pub fn at(&self, minute: u8, second: u8) -> Result<Timestamp, RangeError> {
        let invalid_date = RangeError::InvalidDate {
            year: self.year,
            month: self.month,
            day: self.day,
        };
        let month = Month::try_from(self.month).map_err(|_| invalid_date)?;
        let date =
            Date::from_calendar_date(self.year, month, self.day).map_err(|_| invalid_date)?;
        let time = Time::from_hms(self.hour, minute, second)
            .map_err(|_| RangeError::InvalidHour(self.hour))?;
        Ok(PrimitiveDateTime::new(date, time))
    }
}

impl fmt::Display for HourStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}",
            self.year, self.month, self.day, self.hour
        )
    }
}

/// Inclusive query window: from the top of the start hour through
/// `:59:59` of the end hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: HourStamp,
    pub end: HourStamp,
}

impl TimeRange {
    pub fn new(start: HourStamp, end: HourStamp) -> Self {
        Self { start, end }
    }

    /// The `hours` leading up to and including the current hour.
    pub fn last_hours(now: &OffsetDateTime, hours: u32) -> Option<Self> {
        Some(Self::new(
            HourStamp::hours_before(now, hours)?,
            HourStamp::from_datetime(now),
        ))
    }

    pub fn is_ordered(&self) -> bool {
        self.start <= self.end
    }

    /// Concrete `[start, end]` bounds for a query.
    pub fn bounds(&self) -> Result<(Timestamp, Timestamp), RangeError> {
        if !self.is_ordered() {
            return Err(RangeError::StartAfterEnd);
        }
        Ok((self.start.at(0, 0)?, self.end.at(59, 59)?))
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}
