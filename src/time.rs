//! Tick-based time values and their packed encodings.
//!
//! Both types count 100-nanosecond ticks. [`DateTime`] counts from midnight,
//! January 1st of year 1 and carries a [`DateTimeKind`]. [`TimeSpan`] is a signed
//! duration. Calendar arithmetic goes through [`chrono`], and both types convert to
//! and from the corresponding chrono types.
//!
//! ## Packed time word
//!
//! The optimized encodings share a little-endian bit-packed word:
//!
//! | bits | field |
//! |------|-------|
//! | 0 | negative (`TimeSpan`) / kind bit 0 (`DateTime`) |
//! | 1 | has days (`TimeSpan`) / kind bit 1 (`DateTime`) |
//! | 2 | has hours or minutes |
//! | 3 | has seconds |
//! | 4 | has milliseconds |
//! | 5..10 | hours |
//! | 10..16 | minutes, or seconds when they are the only component |
//! | 16..22 | seconds |
//! | 22..32 | milliseconds |
//!
//! The first two bytes are always written, a third when seconds accompany other
//! components, and a fourth when milliseconds are present.
//!
//! ## Examples
//!
//! ```rust
//! use fast_serializer::{DateTime, DateTimeKind, TimeSpan};
//!
//! let span = TimeSpan::new(1, 2, 3, 4, 5);
//! assert_eq!(span.days(), 1);
//! assert_eq!(span.milliseconds(), 5);
//!
//! let date = DateTime::from_ymd(2024, 2, 29, DateTimeKind::Utc).unwrap();
//! assert_eq!(date.to_naive().to_string(), "2024-02-29 00:00:00");
//! ```

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};

use crate::error::{Error, Result};
use crate::varint::{self, ByteRead};

pub const TICKS_PER_MILLISECOND: i64 = 10_000;
pub const TICKS_PER_SECOND: i64 = TICKS_PER_MILLISECOND * 1_000;
pub const TICKS_PER_MINUTE: i64 = TICKS_PER_SECOND * 60;
pub const TICKS_PER_HOUR: i64 = TICKS_PER_MINUTE * 60;
pub const TICKS_PER_DAY: i64 = TICKS_PER_HOUR * 24;

const NANOS_PER_TICK: i64 = 100;

const KIND_MASK: u32 = 0x03;
const NEGATIVE: u32 = 0x01;
const HAS_DAYS: u32 = 0x02;
const HAS_TIME: u32 = 0x04;
const HAS_SECONDS: u32 = 0x08;
const HAS_MILLISECONDS: u32 = 0x10;
const HOURS_SHIFT: u32 = 5;
const MINUTES_SHIFT: u32 = 10;
const SECONDS_SHIFT: u32 = 16;
const MILLISECONDS_SHIFT: u32 = 22;
// has-time clear with a non-zero hours field: raw ticks follow.
const TIMESPAN_ESCAPE: u32 = 0x1F << HOURS_SHIFT;

const YEAR_MASK: u32 = 0x3FFF;
const MONTH_SHIFT: u32 = 14;
const DAY_SHIFT: u32 = 18;
const HAS_TIME_OR_KIND: u32 = 1 << 23;

const RAW_KIND_SHIFT: u32 = 62;
const RAW_TICKS_MASK: u64 = (1 << RAW_KIND_SHIFT) - 1;

/// A signed duration measured in 100-nanosecond ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TimeSpan {
    ticks: i64,
}

impl TimeSpan {
    pub const ZERO: TimeSpan = TimeSpan { ticks: 0 };
    pub const MIN: TimeSpan = TimeSpan { ticks: i64::MIN };
    pub const MAX: TimeSpan = TimeSpan { ticks: i64::MAX };

    #[inline]
    #[must_use]
    pub const fn from_ticks(ticks: i64) -> Self {
        TimeSpan { ticks }
    }

    /// Builds a span from its components. Components may be negative and are summed.
    #[must_use]
    pub const fn new(days: i64, hours: i64, minutes: i64, seconds: i64, milliseconds: i64) -> Self {
        TimeSpan {
            ticks: days * TICKS_PER_DAY
                + hours * TICKS_PER_HOUR
                + minutes * TICKS_PER_MINUTE
                + seconds * TICKS_PER_SECOND
                + milliseconds * TICKS_PER_MILLISECOND,
        }
    }

    #[must_use]
    pub const fn from_days(days: i64) -> Self {
        TimeSpan::from_ticks(days * TICKS_PER_DAY)
    }

    #[must_use]
    pub const fn from_hours(hours: i64) -> Self {
        TimeSpan::from_ticks(hours * TICKS_PER_HOUR)
    }

    #[must_use]
    pub const fn from_seconds(seconds: i64) -> Self {
        TimeSpan::from_ticks(seconds * TICKS_PER_SECOND)
    }

    #[must_use]
    pub const fn from_milliseconds(milliseconds: i64) -> Self {
        TimeSpan::from_ticks(milliseconds * TICKS_PER_MILLISECOND)
    }

    #[inline]
    #[must_use]
    pub const fn ticks(&self) -> i64 {
        self.ticks
    }

    /// Whole days, truncated toward zero.
    #[must_use]
    pub const fn days(&self) -> i64 {
        self.ticks / TICKS_PER_DAY
    }

    #[must_use]
    pub const fn hours(&self) -> i64 {
        (self.ticks / TICKS_PER_HOUR) % 24
    }

    #[must_use]
    pub const fn minutes(&self) -> i64 {
        (self.ticks / TICKS_PER_MINUTE) % 60
    }

    #[must_use]
    pub const fn seconds(&self) -> i64 {
        (self.ticks / TICKS_PER_SECOND) % 60
    }

    #[must_use]
    pub const fn milliseconds(&self) -> i64 {
        (self.ticks / TICKS_PER_MILLISECOND) % 1000
    }

    /// True when the span has no sub-millisecond remainder.
    #[inline]
    #[must_use]
    pub const fn is_millisecond_aligned(&self) -> bool {
        self.ticks % TICKS_PER_MILLISECOND == 0
    }
}

impl From<TimeSpan> for chrono::Duration {
    fn from(span: TimeSpan) -> Self {
        chrono::Duration::seconds(span.ticks / TICKS_PER_SECOND)
            + chrono::Duration::nanoseconds((span.ticks % TICKS_PER_SECOND) * NANOS_PER_TICK)
    }
}

impl TryFrom<chrono::Duration> for TimeSpan {
    type Error = Error;

    /// Sub-tick precision is truncated.
    fn try_from(duration: chrono::Duration) -> Result<Self> {
        let seconds = duration.num_seconds();
        let nanos = (duration - chrono::Duration::seconds(seconds))
            .num_nanoseconds()
            .unwrap_or(0);
        seconds
            .checked_mul(TICKS_PER_SECOND)
            .and_then(|ticks| ticks.checked_add(nanos / NANOS_PER_TICK))
            .map(TimeSpan::from_ticks)
            .ok_or_else(|| Error::custom("duration out of TimeSpan range"))
    }
}

/// Whether a [`DateTime`] is local, UTC or neither.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum DateTimeKind {
    #[default]
    Unspecified = 0,
    Utc = 1,
    Local = 2,
}

impl TryFrom<u8> for DateTimeKind {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, u8> {
        match value {
            0 => Ok(DateTimeKind::Unspecified),
            1 => Ok(DateTimeKind::Utc),
            2 => Ok(DateTimeKind::Local),
            other => Err(other),
        }
    }
}

/// A point in time between 0001-01-01 and 9999-12-31, in 100-nanosecond ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct DateTime {
    ticks: i64,
    kind: DateTimeKind,
}

impl DateTime {
    pub const MAX_TICKS: i64 = 3_155_378_975_999_999_999;
    pub const MIN: DateTime = DateTime {
        ticks: 0,
        kind: DateTimeKind::Unspecified,
    };
    pub const MAX: DateTime = DateTime {
        ticks: DateTime::MAX_TICKS,
        kind: DateTimeKind::Unspecified,
    };

    /// # Errors
    ///
    /// Fails when `ticks` is outside `0..=MAX_TICKS`.
    pub fn from_ticks(ticks: i64, kind: DateTimeKind) -> Result<Self> {
        if !(0..=DateTime::MAX_TICKS).contains(&ticks) {
            return Err(Error::custom(format!("DateTime ticks out of range: {ticks}")));
        }
        Ok(DateTime { ticks, kind })
    }

    /// Midnight on the given date.
    ///
    /// # Errors
    ///
    /// Fails for dates that do not exist or fall outside years 1..=9999.
    pub fn from_ymd(year: i32, month: u32, day: u32, kind: DateTimeKind) -> Result<Self> {
        DateTime::from_ymd_hms_milli(year, month, day, 0, 0, 0, 0, kind)
    }

    /// # Errors
    ///
    /// Fails for invalid dates or times.
    #[allow(clippy::too_many_arguments)]
    pub fn from_ymd_hms_milli(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
        millisecond: u32,
        kind: DateTimeKind,
    ) -> Result<Self> {
        let naive = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_milli_opt(hour, minute, second, millisecond))
            .ok_or_else(|| {
                Error::custom(format!(
                    "invalid date/time {year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}.{millisecond:03}"
                ))
            })?;
        DateTime::from_naive(naive, kind)
    }

    /// # Errors
    ///
    /// Fails for dates outside years 1..=9999.
    pub fn from_naive(naive: NaiveDateTime, kind: DateTimeKind) -> Result<Self> {
        let days = i64::from(naive.date().num_days_from_ce()) - 1;
        let time = naive.time();
        let nanos = i64::from(time.nanosecond().min(999_999_999));
        let ticks = days
            .checked_mul(TICKS_PER_DAY)
            .map(|ticks| {
                ticks
                    + i64::from(time.num_seconds_from_midnight()) * TICKS_PER_SECOND
                    + nanos / NANOS_PER_TICK
            })
            .ok_or_else(|| Error::custom("date out of range"))?;
        DateTime::from_ticks(ticks, kind)
    }

    #[inline]
    #[must_use]
    pub const fn ticks(&self) -> i64 {
        self.ticks
    }

    #[inline]
    #[must_use]
    pub const fn kind(&self) -> DateTimeKind {
        self.kind
    }

    #[must_use]
    pub const fn with_kind(self, kind: DateTimeKind) -> Self {
        DateTime {
            ticks: self.ticks,
            kind,
        }
    }

    #[must_use]
    pub const fn time_of_day(&self) -> TimeSpan {
        TimeSpan::from_ticks(self.ticks % TICKS_PER_DAY)
    }

    #[inline]
    #[must_use]
    pub const fn is_millisecond_aligned(&self) -> bool {
        self.ticks % TICKS_PER_MILLISECOND == 0
    }

    /// Converts to a chrono date-time, dropping the kind.
    #[must_use]
    pub fn to_naive(&self) -> NaiveDateTime {
        let date = date_from_day_number(self.ticks / TICKS_PER_DAY);
        let tod = self.ticks % TICKS_PER_DAY;
        let time = NaiveTime::from_num_seconds_from_midnight_opt(
            (tod / TICKS_PER_SECOND) as u32,
            ((tod % TICKS_PER_SECOND) * NANOS_PER_TICK) as u32,
        )
        .unwrap_or_default();
        NaiveDateTime::new(date, time)
    }

    fn date_parts(&self) -> (i32, u32, u32) {
        let date = date_from_day_number(self.ticks / TICKS_PER_DAY);
        (date.year(), date.month(), date.day())
    }
}

// Ticks are validated on construction, so the day number always maps to a date.
fn date_from_day_number(days: i64) -> NaiveDate {
    NaiveDate::from_num_days_from_ce_opt(days as i32 + 1).unwrap_or(NaiveDate::MIN)
}

impl TryFrom<chrono::DateTime<Utc>> for DateTime {
    type Error = Error;

    fn try_from(value: chrono::DateTime<Utc>) -> Result<Self> {
        DateTime::from_naive(value.naive_utc(), DateTimeKind::Utc)
    }
}

impl From<DateTime> for NaiveDateTime {
    fn from(value: DateTime) -> Self {
        value.to_naive()
    }
}

// Writes the packed time word for the given components, starting from `packed`
// which already holds bits 0 and 1.
fn encode_time_word(mut packed: u32, parts: [u32; 4], out: &mut Vec<u8>) {
    let [hours, minutes, seconds, milliseconds] = parts;
    let mut optional = 0;
    if hours != 0 || minutes != 0 {
        packed |= HAS_TIME | (hours << HOURS_SHIFT) | (minutes << MINUTES_SHIFT);
    }
    if seconds != 0 {
        packed |= HAS_SECONDS;
        if packed & HAS_TIME == 0 && milliseconds == 0 {
            packed |= seconds << MINUTES_SHIFT;
        } else {
            packed |= seconds << SECONDS_SHIFT;
            optional = 1;
        }
    }
    if milliseconds != 0 {
        packed |= HAS_MILLISECONDS | (milliseconds << MILLISECONDS_SHIFT);
        optional = 2;
    }
    out.extend_from_slice(&packed.to_le_bytes()[..2 + optional]);
}

fn split_time(ticks: u64) -> [u32; 4] {
    let ticks = ticks % TICKS_PER_DAY as u64;
    [
        (ticks / TICKS_PER_HOUR as u64) as u32,
        (ticks / TICKS_PER_MINUTE as u64 % 60) as u32,
        (ticks / TICKS_PER_SECOND as u64 % 60) as u32,
        (ticks / TICKS_PER_MILLISECOND as u64 % 1000) as u32,
    ]
}

// Returns the packed word and the time-of-day ticks it describes, or None for the
// raw-ticks escape.
fn read_time_word<R: ByteRead>(input: &mut R) -> Result<Option<(u32, i64)>> {
    let start = input.offset();
    let [b0, b1] = input.read_array()?;
    let mut packed = u32::from(b0) | (u32::from(b1) << 8);
    let has_time = packed & HAS_TIME != 0;
    let has_seconds = packed & HAS_SECONDS != 0;
    let has_milliseconds = packed & HAS_MILLISECONDS != 0;
    if !has_time && (packed >> HOURS_SHIFT) & 0x1F != 0 {
        return Ok(None);
    }
    if has_milliseconds {
        let [b2, b3] = input.read_array()?;
        packed |= (u32::from(b2) << 16) | (u32::from(b3) << 24);
    } else if has_seconds && has_time {
        packed |= u32::from(input.next_byte()?) << 16;
    }

    let mut hours = 0;
    let mut minutes = 0;
    let mut seconds = 0;
    let mut milliseconds = 0;
    if has_time {
        hours = (packed >> HOURS_SHIFT) & 0x1F;
        minutes = (packed >> MINUTES_SHIFT) & 0x3F;
    }
    if has_seconds {
        seconds = if !has_time && !has_milliseconds {
            (packed >> MINUTES_SHIFT) & 0x3F
        } else {
            (packed >> SECONDS_SHIFT) & 0x3F
        };
    }
    if has_milliseconds {
        milliseconds = (packed >> MILLISECONDS_SHIFT) & 0x3FF;
    }
    if hours > 23 || minutes > 59 || seconds > 59 || milliseconds > 999 {
        return Err(Error::corrupt(start, "time component out of range"));
    }
    let ticks = i64::from(hours) * TICKS_PER_HOUR
        + i64::from(minutes) * TICKS_PER_MINUTE
        + i64::from(seconds) * TICKS_PER_SECOND
        + i64::from(milliseconds) * TICKS_PER_MILLISECOND;
    Ok(Some((packed, ticks)))
}

pub(crate) fn encode_raw_timespan(value: TimeSpan, out: &mut Vec<u8>) {
    out.extend_from_slice(&value.ticks.to_le_bytes());
}

pub(crate) fn read_raw_timespan<R: ByteRead>(input: &mut R) -> Result<TimeSpan> {
    Ok(TimeSpan::from_ticks(i64::from_le_bytes(input.read_array()?)))
}

/// Writes the packed form, or the escape word plus raw ticks when the span has a
/// sub-millisecond remainder.
pub(crate) fn encode_optimized_timespan(value: TimeSpan, out: &mut Vec<u8>) {
    if !value.is_millisecond_aligned() {
        out.extend_from_slice(&TIMESPAN_ESCAPE.to_le_bytes()[..2]);
        encode_raw_timespan(value, out);
        return;
    }
    let magnitude = value.ticks.unsigned_abs();
    let days = magnitude / TICKS_PER_DAY as u64;
    let mut packed = 0;
    if value.ticks < 0 {
        packed |= NEGATIVE;
    }
    if days != 0 {
        packed |= HAS_DAYS;
    }
    encode_time_word(packed, split_time(magnitude), out);
    if days != 0 {
        // |i64::MIN| / TICKS_PER_DAY is below 2^24.
        varint::encode_u32(days as u32, out);
    }
}

pub(crate) fn read_optimized_timespan<R: ByteRead>(input: &mut R) -> Result<TimeSpan> {
    let start = input.offset();
    let Some((packed, time)) = read_time_word(input)? else {
        return read_raw_timespan(input);
    };
    let days = if packed & HAS_DAYS != 0 {
        i64::from(varint::read_u32(input)?)
    } else {
        0
    };
    let magnitude = days
        .checked_mul(TICKS_PER_DAY)
        .and_then(|ticks| ticks.checked_add(time))
        .ok_or_else(|| Error::corrupt(start, "TimeSpan out of range"))?;
    let ticks = if packed & NEGATIVE != 0 {
        -magnitude
    } else {
        magnitude
    };
    Ok(TimeSpan::from_ticks(ticks))
}

pub(crate) fn encode_raw_datetime(value: DateTime, out: &mut Vec<u8>) {
    let bits = value.ticks as u64 | (u64::from(value.kind as u8) << RAW_KIND_SHIFT);
    out.extend_from_slice(&bits.to_le_bytes());
}

pub(crate) fn read_raw_datetime<R: ByteRead>(input: &mut R) -> Result<DateTime> {
    let start = input.offset();
    let bits = u64::from_le_bytes(input.read_array()?);
    let kind = DateTimeKind::try_from((bits >> RAW_KIND_SHIFT) as u8)
        .map_err(|k| Error::corrupt(start, format!("invalid DateTime kind {k}")))?;
    DateTime::from_ticks((bits & RAW_TICKS_MASK) as i64, kind)
        .map_err(|e| Error::corrupt(start, e))
}

/// Writes the packed date (and time-of-day when needed), or a zero date word plus
/// the raw form when the value has a sub-millisecond remainder.
pub(crate) fn encode_optimized_datetime(value: DateTime, out: &mut Vec<u8>) {
    if !value.is_millisecond_aligned() {
        out.extend_from_slice(&[0, 0, 0]);
        encode_raw_datetime(value, out);
        return;
    }
    let (year, month, day) = value.date_parts();
    let mut word = (year as u32 & YEAR_MASK) | (month << MONTH_SHIFT) | (day << DAY_SHIFT);
    let time = value.ticks % TICKS_PER_DAY;
    let kind = u32::from(value.kind as u8);
    if time != 0 || kind != 0 {
        word |= HAS_TIME_OR_KIND;
    }
    out.extend_from_slice(&word.to_le_bytes()[..3]);
    if word & HAS_TIME_OR_KIND != 0 {
        encode_time_word(kind, split_time(time as u64), out);
    }
}

pub(crate) fn read_optimized_datetime<R: ByteRead>(input: &mut R) -> Result<DateTime> {
    let start = input.offset();
    let [b0, b1, b2] = input.read_array()?;
    let word = u32::from(b0) | (u32::from(b1) << 8) | (u32::from(b2) << 16);
    let month = (word >> MONTH_SHIFT) & 0x0F;
    if month == 0 {
        return read_raw_datetime(input);
    }
    let year = (word & YEAR_MASK) as i32;
    let day = (word >> DAY_SHIFT) & 0x1F;
    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| Error::corrupt(start, format!("invalid date {year}-{month}-{day}")))?;
    let mut ticks = (i64::from(date.num_days_from_ce()) - 1) * TICKS_PER_DAY;
    let mut kind = DateTimeKind::Unspecified;
    if word & HAS_TIME_OR_KIND != 0 {
        let (packed, time) = read_time_word(input)?
            .ok_or_else(|| Error::corrupt(start, "unexpected escape in DateTime time word"))?;
        kind = DateTimeKind::try_from((packed & KIND_MASK) as u8)
            .map_err(|k| Error::corrupt(start, format!("invalid DateTime kind {k}")))?;
        ticks += time;
    }
    DateTime::from_ticks(ticks, kind).map_err(|e| Error::corrupt(start, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::varint::SliceCursor;

    fn span_len(span: TimeSpan) -> usize {
        let mut out = Vec::new();
        encode_optimized_timespan(span, &mut out);
        let decoded = read_optimized_timespan(&mut SliceCursor::new(&out)).unwrap();
        assert_eq!(decoded, span);
        out.len()
    }

    fn date_len(date: DateTime) -> usize {
        let mut out = Vec::new();
        encode_optimized_datetime(date, &mut out);
        let decoded = read_optimized_datetime(&mut SliceCursor::new(&out)).unwrap();
        assert_eq!(decoded, date);
        out.len()
    }

    #[test]
    fn test_timespan_components() {
        let span = TimeSpan::from_ticks(-(6 * TICKS_PER_DAY + 10 * TICKS_PER_HOUR + 33 * TICKS_PER_MINUTE));
        assert_eq!(span.days(), -6);
        assert_eq!(span.hours(), -10);
        assert_eq!(span.minutes(), -33);
    }

    #[test]
    fn test_timespan_packed_sizes() {
        assert_eq!(span_len(TimeSpan::ZERO), 2);
        assert_eq!(span_len(TimeSpan::from_days(1)), 3);
        assert_eq!(span_len(TimeSpan::from_seconds(30)), 2);
        assert_eq!(span_len(TimeSpan::from_milliseconds(999)), 4);
        assert_eq!(span_len(TimeSpan::new(0, 1, 2, 3, 0)), 3);
        assert_eq!(span_len(TimeSpan::new(1, 0, 0, 0, 1)), 5);
        assert_eq!(span_len(TimeSpan::new(140_000, 1, 2, 3, 0)), 6);
        assert_eq!(span_len(TimeSpan::new(140_000, 1, 2, 3, 4)), 7);
        assert_eq!(span_len(TimeSpan::from_hours(10_675_199)), 5);
        assert_eq!(span_len(TimeSpan::new(-6, -10, -33, -36, 0)), 4);
    }

    #[test]
    fn test_timespan_extremes_without_odd_ticks() {
        let max = TimeSpan::from_ticks(i64::MAX - i64::MAX % TICKS_PER_MILLISECOND);
        let min = TimeSpan::from_ticks(i64::MIN - i64::MIN % TICKS_PER_MILLISECOND);
        assert_eq!(span_len(max), 8);
        assert_eq!(span_len(min), 8);
    }

    #[test]
    fn test_timespan_odd_ticks_escape() {
        assert_eq!(span_len(TimeSpan::from_ticks(1)), 10);
        assert_eq!(span_len(TimeSpan::MAX), 10);
        assert_eq!(span_len(TimeSpan::MIN), 10);
    }

    #[test]
    fn test_datetime_packed_sizes() {
        let date = DateTime::from_ymd(2006, 7, 15, DateTimeKind::Unspecified).unwrap();
        assert_eq!(date_len(date), 3);
        let hm = DateTime::from_ymd_hms_milli(2006, 7, 15, 12, 30, 0, 0, DateTimeKind::Unspecified).unwrap();
        assert_eq!(date_len(hm), 5);
        let hms = DateTime::from_ymd_hms_milli(2006, 7, 15, 12, 30, 45, 0, DateTimeKind::Unspecified).unwrap();
        assert_eq!(date_len(hms), 6);
        let hmsm = DateTime::from_ymd_hms_milli(2006, 7, 15, 12, 30, 45, 7, DateTimeKind::Local).unwrap();
        assert_eq!(date_len(hmsm), 7);
    }

    #[test]
    fn test_datetime_kind_survives() {
        for kind in [DateTimeKind::Unspecified, DateTimeKind::Utc, DateTimeKind::Local] {
            let date = DateTime::from_ymd(1999, 12, 31, kind).unwrap();
            date_len(date);
            let odd = DateTime::from_ticks(date.ticks() + 1, kind).unwrap();
            assert_eq!(date_len(odd), 11);
        }
        assert_eq!(date_len(DateTime::MIN), 3);
        date_len(DateTime::MAX);
    }

    #[test]
    fn test_chrono_conversions() {
        let naive = NaiveDate::from_ymd_opt(2020, 1, 2)
            .unwrap()
            .and_hms_milli_opt(3, 4, 5, 678)
            .unwrap();
        let date = DateTime::from_naive(naive, DateTimeKind::Utc).unwrap();
        assert_eq!(date.to_naive(), naive);
        assert_eq!(DateTime::MAX.to_naive().to_string(), "9999-12-31 23:59:59.999999900");

        let span = TimeSpan::new(2, 3, 4, 5, 6);
        let duration: chrono::Duration = span.into();
        assert_eq!(TimeSpan::try_from(duration).unwrap(), span);
    }

    #[test]
    fn test_corrupt_date_word() {
        // month 13
        let word: u32 = 2000 | (13 << MONTH_SHIFT) | (1 << DAY_SHIFT);
        let bytes = word.to_le_bytes();
        let err = read_optimized_datetime(&mut SliceCursor::new(&bytes[..3])).unwrap_err();
        assert!(err.is_corrupt());
    }
}
