//! The packed sortable timestamp.
//!
//! A [`LongDateTime`] is a UTC instant packed into an `i64` as decimal
//! digits `yyyyMMddHHmmssffff`, where `ffff` counts 0.1 ms units. The
//! packing makes numeric order chronological order, which is the point:
//! the value sorts correctly in any store that can sort an integer.

use core::fmt;

use chrono::{DateTime, Datelike, Duration, Months, TimeZone, Timelike, Utc};
use serde_core::de::Error as _;
use serde_core::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const MIN_PACKED: i64 = 1_01_01_00_00_00_0000;
const MAX_PACKED: i64 = 9999_12_31_23_59_59_9999;

// -----------------------------------------------------------------------------
// Errors

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TimeError {
    #[error("date-time is outside 0001-01-01 00:00:00.0000 to 9999-12-31 23:59:59.9999")]
    OutOfRange,

    #[error("packed value {0} does not encode a valid calendar date-time")]
    InvalidCalendar(i64),

    #[error("date-time arithmetic overflowed")]
    Overflow,
}

// -----------------------------------------------------------------------------
// LongDateTime

/// A UTC timestamp packed as `yyyyMMddHHmmssffff`.
///
/// The derived ordering over the packed digits is chronological.
///
/// # Examples
///
/// ```
/// use morph_json::convert::LongDateTime;
///
/// let t = LongDateTime::from_packed(2024_05_01_12_30_00_0000).unwrap();
/// assert_eq!(t.to_string(), "2024-05-01 12:30:00.0000+00:00");
/// assert!(LongDateTime::MIN < t && t < LongDateTime::MAX);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LongDateTime(i64);

impl LongDateTime {
    /// `0001-01-01 00:00:00.0000`.
    pub const MIN: Self = Self(MIN_PACKED);

    /// `9999-12-31 23:59:59.9999`.
    pub const MAX: Self = Self(MAX_PACKED);

    /// Validates a packed value.
    ///
    /// `i64::MIN` and `i64::MAX` massage to [`MIN`](Self::MIN) and
    /// [`MAX`](Self::MAX) instead of erroring; anything else must be in
    /// range and encode a real calendar date-time.
    pub fn from_packed(value: i64) -> Result<Self, TimeError> {
        let value = match value {
            i64::MIN => MIN_PACKED,
            i64::MAX => MAX_PACKED,
            other => other,
        };
        if !(MIN_PACKED..=MAX_PACKED).contains(&value) {
            return Err(TimeError::OutOfRange);
        }
        if Parts::unpack(value).to_datetime().is_none() {
            return Err(TimeError::InvalidCalendar(value));
        }
        Ok(Self(value))
    }

    /// Packs a chrono instant. The chrono extrema massage to the bounds.
    pub fn from_datetime(date: DateTime<Utc>) -> Result<Self, TimeError> {
        if date == DateTime::<Utc>::MIN_UTC {
            return Ok(Self::MIN);
        }
        if date == DateTime::<Utc>::MAX_UTC {
            return Ok(Self::MAX);
        }
        let year = date.year();
        if !(1..=9999).contains(&year) {
            return Err(TimeError::OutOfRange);
        }
        // Leap-second nanos would pack as a 10000th fraction; clamp instead.
        let fraction = i64::from(date.nanosecond() / 100_000).min(9_999);
        let packed = i64::from(year) * 100_000_000_000_000
            + i64::from(date.month()) * 1_000_000_000_000
            + i64::from(date.day()) * 10_000_000_000
            + i64::from(date.hour()) * 100_000_000
            + i64::from(date.minute()) * 1_000_000
            + i64::from(date.second()) * 10_000
            + fraction;
        Ok(Self(packed))
    }

    /// The current instant. The clock year is always in range.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now()).unwrap_or(Self::MAX)
    }

    #[inline]
    pub const fn packed(self) -> i64 {
        self.0
    }

    pub fn to_datetime(self) -> DateTime<Utc> {
        // Every constructor validated the digits; the fallback is unreachable.
        Parts::unpack(self.0)
            .to_datetime()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    // -- arithmetic, through the calendar --

    pub fn add_days(self, days: i64) -> Result<Self, TimeError> {
        self.shift(Duration::try_days(days))
    }

    pub fn add_hours(self, hours: i64) -> Result<Self, TimeError> {
        self.shift(Duration::try_hours(hours))
    }

    pub fn add_minutes(self, minutes: i64) -> Result<Self, TimeError> {
        self.shift(Duration::try_minutes(minutes))
    }

    pub fn add_seconds(self, seconds: i64) -> Result<Self, TimeError> {
        self.shift(Duration::try_seconds(seconds))
    }

    pub fn add_milliseconds(self, milliseconds: i64) -> Result<Self, TimeError> {
        self.shift(Duration::try_milliseconds(milliseconds))
    }

    pub fn add_months(self, months: i32) -> Result<Self, TimeError> {
        let date = self.to_datetime();
        let shifted = if months >= 0 {
            date.checked_add_months(Months::new(months.unsigned_abs()))
        } else {
            date.checked_sub_months(Months::new(months.unsigned_abs()))
        }
        .ok_or(TimeError::Overflow)?;
        Self::from_datetime(shifted)
    }

    pub fn add_years(self, years: i32) -> Result<Self, TimeError> {
        let months = years.checked_mul(12).ok_or(TimeError::Overflow)?;
        self.add_months(months)
    }

    fn shift(self, amount: Option<Duration>) -> Result<Self, TimeError> {
        let shifted = self
            .to_datetime()
            .checked_add_signed(amount.ok_or(TimeError::Overflow)?)
            .ok_or(TimeError::Overflow)?;
        Self::from_datetime(shifted)
    }
}

// -----------------------------------------------------------------------------
// Digit access

struct Parts {
    year: i64,
    month: i64,
    day: i64,
    hour: i64,
    minute: i64,
    second: i64,
    fraction: i64,
}

impl Parts {
    fn unpack(value: i64) -> Self {
        Self {
            year: value / 100_000_000_000_000,
            month: value / 1_000_000_000_000 % 100,
            day: value / 10_000_000_000 % 100,
            hour: value / 100_000_000 % 100,
            minute: value / 1_000_000 % 100,
            second: value / 10_000 % 100,
            fraction: value % 10_000,
        }
    }

    fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let date = Utc
            .with_ymd_and_hms(
                self.year as i32,
                self.month as u32,
                self.day as u32,
                self.hour as u32,
                self.minute as u32,
                self.second as u32,
            )
            .single()?;
        date.checked_add_signed(Duration::microseconds(self.fraction * 100))
    }
}

// -----------------------------------------------------------------------------
// Traits

impl fmt::Display for LongDateTime {
    /// The friendly sortable form, `yyyy-MM-dd HH:mm:ss.ffff+00:00`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = Parts::unpack(self.0);
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:04}+00:00",
            p.year, p.month, p.day, p.hour, p.minute, p.second, p.fraction
        )
    }
}

impl Serialize for LongDateTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.0)
    }
}

impl<'de> Deserialize<'de> for LongDateTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let packed = i64::deserialize(deserializer)?;
        Self::from_packed(packed).map_err(D::Error::custom)
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_round_trip_through_packed() {
        assert_eq!(
            LongDateTime::from_packed(LongDateTime::MIN.packed()),
            Ok(LongDateTime::MIN)
        );
        assert_eq!(
            LongDateTime::from_packed(LongDateTime::MAX.packed()),
            Ok(LongDateTime::MAX)
        );
    }

    #[test]
    fn extrema_massage_to_the_bounds() {
        assert_eq!(LongDateTime::from_packed(i64::MAX), Ok(LongDateTime::MAX));
        assert_eq!(LongDateTime::from_packed(i64::MIN), Ok(LongDateTime::MIN));
        assert_eq!(
            LongDateTime::from_datetime(DateTime::<Utc>::MAX_UTC),
            Ok(LongDateTime::MAX)
        );
        assert_eq!(
            LongDateTime::from_datetime(DateTime::<Utc>::MIN_UTC),
            Ok(LongDateTime::MIN)
        );
    }

    #[test]
    fn out_of_range_and_bad_digits_error() {
        assert_eq!(LongDateTime::from_packed(0), Err(TimeError::OutOfRange));
        assert_eq!(
            LongDateTime::from_packed(LongDateTime::MAX.packed() + 1),
            Err(TimeError::OutOfRange)
        );
        let feb_30 = 2023_02_30_00_00_00_0000;
        assert_eq!(
            LongDateTime::from_packed(feb_30),
            Err(TimeError::InvalidCalendar(feb_30))
        );
        let second_61 = 2023_06_15_12_00_61_0000;
        assert_eq!(
            LongDateTime::from_packed(second_61),
            Err(TimeError::InvalidCalendar(second_61))
        );
    }

    #[test]
    fn packed_order_is_chronological() {
        let earlier = LongDateTime::from_packed(2023_12_31_23_59_59_9999).unwrap();
        let later = LongDateTime::from_packed(2024_01_01_00_00_00_0000).unwrap();
        assert!(earlier < later);
        assert!(earlier.to_datetime() < later.to_datetime());
    }

    #[test]
    fn chrono_round_trip_keeps_the_fraction() {
        let t = LongDateTime::from_packed(2024_05_01_12_30_45_1234).unwrap();
        assert_eq!(LongDateTime::from_datetime(t.to_datetime()), Ok(t));
    }

    #[test]
    fn displays_the_friendly_sortable_form() {
        let t = LongDateTime::from_packed(987_06_05_04_03_02_0100).unwrap();
        assert_eq!(t.to_string(), "0987-06-05 04:03:02.0100+00:00");
    }

    #[test]
    fn serializes_as_the_packed_integer() {
        let t = LongDateTime::from_packed(2024_05_01_12_30_00_0000).unwrap();
        assert_eq!(serde_json::to_string(&t).unwrap(), "202405011230000000");
        assert_eq!(
            serde_json::from_str::<LongDateTime>("202405011230000000").unwrap(),
            t
        );
        assert!(serde_json::from_str::<LongDateTime>("42").is_err());
    }

    #[test]
    fn arithmetic_goes_through_the_calendar() {
        let t = LongDateTime::from_packed(2024_01_31_00_00_00_0000).unwrap();
        assert_eq!(
            t.add_days(1).unwrap().packed(),
            2024_02_01_00_00_00_0000
        );
        // Month arithmetic clamps to the target month's length.
        assert_eq!(
            t.add_months(1).unwrap().packed(),
            2024_02_29_00_00_00_0000
        );
        assert_eq!(
            t.add_years(1).unwrap().packed(),
            2025_01_31_00_00_00_0000
        );
        assert_eq!(
            t.add_hours(-1).unwrap().packed(),
            2024_01_30_23_00_00_0000
        );
        assert_eq!(
            t.add_milliseconds(1).unwrap().packed(),
            2024_01_31_00_00_00_0010
        );
    }

    #[test]
    fn arithmetic_past_the_bounds_errors() {
        assert_eq!(LongDateTime::MAX.add_days(1), Err(TimeError::OutOfRange));
        assert_eq!(LongDateTime::MIN.add_seconds(-1), Err(TimeError::OutOfRange));
    }

    #[test]
    fn now_is_in_range() {
        let now = LongDateTime::now();
        let past = LongDateTime::from_packed(2020_01_01_00_00_00_0000).unwrap();
        assert!(past < now && now < LongDateTime::MAX);
    }
}
