//! Calendar date arithmetic across UNIX, NTP, and Zigbee epochs
//!
//! Proleptic Gregorian calendar, valid only across the representable UNIX
//! window (1970-01-01 through 2038-01-19 03:14:07 UTC) - dates outside that
//! range are rejected rather than handled.

use core::fmt::Write as _;

use crate::error::{Result, Status};

/// NTP epoch (1900-01-01) to UNIX epoch (1970-01-01): 70 years + 17 leap days.
pub const NTP_UNIX_OFFSET: u32 = 2_208_988_800;
/// Zigbee epoch (2000-01-01) to UNIX epoch (1970-01-01): 30 years + 7 leap days.
pub const ZIGBEE_UNIX_OFFSET: u32 = 946_684_800;
/// Largest representable UNIX timestamp: 2038-01-19 03:14:07 UTC.
pub const UNIX_MAX: u32 = 0x7FFF_FFFF;

/// Timestamp format a raw `u32` is interpreted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Epoch {
    Unix,
    Ntp,
    Zigbee,
}

/// Month of year, 0-indexed to match [`CalendarDate::month`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Month {
    Jan = 0,
    Feb,
    Mar,
    Apr,
    May,
    Jun,
    Jul,
    Aug,
    Sep,
    Oct,
    Nov,
    Dec,
}

/// A calendar date/time, in the style of C's `struct tm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarDate {
    /// Years since 1900 (so UNIX year = `year + 1900`).
    pub year: u8,
    /// 0..11
    pub month: u8,
    /// 1..31
    pub day: u8,
    /// 0..23
    pub hour: u8,
    /// 0..59
    pub minute: u8,
    /// 0..59
    pub second: u8,
    /// 0..6, 0 = Sunday
    pub day_of_week: u8,
    /// 1..366
    pub day_of_year: u16,
    /// Signed seconds east of UTC.
    pub time_zone: i32,
}

const DAYS_IN_MONTH: [u8; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

pub fn is_leap_year(year: u32) -> bool {
    (year % 4 == 0) && (year % 100 != 0 || year % 400 == 0)
}

fn days_in_month(year: u32, month: u8) -> u8 {
    if month == 1 && is_leap_year(year) {
        29
    } else {
        DAYS_IN_MONTH[month as usize]
    }
}

/// §4.4: timestamp validity in a given epoch under a given timezone
/// offset, guarding both overflow applying `tz` and underflow converting
/// to UNIX.
pub fn is_valid_time(t: u32, epoch: Epoch, tz: i32) -> bool {
    let tz_ok = if tz < 0 {
        t > tz.unsigned_abs()
    } else {
        t <= u32::MAX - tz as u32
    };
    if !tz_ok {
        return false;
    }

    match epoch {
        Epoch::Unix => t <= UNIX_MAX,
        Epoch::Ntp => t >= NTP_UNIX_OFFSET,
        Epoch::Zigbee => (t as u64) + (ZIGBEE_UNIX_OFFSET as u64) <= UNIX_MAX as u64,
    }
}

/// Range-checks every field, including the 2038 clamp on the final
/// representable day.
pub fn is_valid_date(d: &CalendarDate) -> bool {
    if d.month > 11 || d.hour > 23 || d.minute > 59 || d.second > 59 {
        return false;
    }

    let year = d.year as u32 + 1900;
    if year < 1970 {
        return false;
    }
    if year == 2038 {
        if d.month > 0 || d.day > 19 {
            return false;
        }
        if d.day == 19 && (d.hour, d.minute, d.second) > (3, 14, 7) {
            return false;
        }
    } else if year > 2038 {
        return false;
    }

    if d.day < 1 || d.day > days_in_month(year, d.month) {
        return false;
    }
    true
}

/// UNIX timestamp -> calendar date, at the given timezone offset.
pub fn convert_time_to_date(t: u32, tz: i32) -> Result<CalendarDate> {
    if !is_valid_time(t, Epoch::Unix, tz) {
        return Err(Status::InvalidParameter);
    }

    let adjusted = if tz < 0 {
        t - tz.unsigned_abs()
    } else {
        t + tz as u32
    };

    let days = adjusted / 86_400;
    let secs_of_day = adjusted % 86_400;
    let day_of_week = ((days + 4) % 7) as u8;

    let mut year = 1970u32;
    let mut remaining_days = days;
    loop {
        let days_in_year = if is_leap_year(year) { 366 } else { 365 };
        if remaining_days < days_in_year {
            break;
        }
        remaining_days -= days_in_year;
        year += 1;
    }
    let day_of_year = (remaining_days + 1) as u16;

    let mut month = 0u8;
    let mut day_remaining = remaining_days;
    loop {
        let dim = days_in_month(year, month) as u32;
        if day_remaining < dim {
            break;
        }
        day_remaining -= dim;
        month += 1;
    }

    Ok(CalendarDate {
        year: (year - 1900) as u8,
        month,
        day: (day_remaining + 1) as u8,
        hour: (secs_of_day / 3600) as u8,
        minute: ((secs_of_day % 3600) / 60) as u8,
        second: (secs_of_day % 60) as u8,
        day_of_week,
        day_of_year,
        time_zone: tz,
    })
}

/// Calendar date -> UNIX timestamp, inverse of [`convert_time_to_date`].
pub fn convert_date_to_time(d: &CalendarDate) -> Result<u32> {
    if !is_valid_date(d) {
        return Err(Status::InvalidParameter);
    }

    let year = d.year as u32 + 1900;
    let mut days: u64 = 0;
    for y in 1970..year {
        days += if is_leap_year(y) { 366 } else { 365 };
    }
    for m in 0..d.month {
        days += days_in_month(year, m) as u64;
    }
    days += (d.day - 1) as u64;

    let local_seconds =
        days * 86_400 + d.hour as u64 * 3600 + d.minute as u64 * 60 + d.second as u64;

    let unix_t = if d.time_zone < 0 {
        local_seconds + d.time_zone.unsigned_abs() as u64
    } else {
        local_seconds
            .checked_sub(d.time_zone as u64)
            .ok_or(Status::InvalidParameter)?
    };

    if unix_t > UNIX_MAX as u64 {
        return Err(Status::InvalidParameter);
    }
    Ok(unix_t as u32)
}

/// Construct a [`CalendarDate`] from calendar fields, deriving
/// `day_of_week`/`day_of_year` by round-tripping through UNIX time so they
/// stay consistent with [`convert_time_to_date`].
pub fn build_datetime(
    year: u32,
    month: Month,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
    tz: i32,
) -> Result<CalendarDate> {
    if !(1970..=2038).contains(&year) {
        return Err(Status::InvalidParameter);
    }

    let draft = CalendarDate {
        year: (year - 1900) as u8,
        month: month as u8,
        day,
        hour,
        minute,
        second,
        day_of_week: 0,
        day_of_year: 0,
        time_zone: tz,
    };
    if !is_valid_date(&draft) {
        return Err(Status::InvalidParameter);
    }

    let t = convert_date_to_time(&draft)?;
    convert_time_to_date(t, tz)
}

/// Output layout selector for [`convert_date_to_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// `YYYY-MM-DD HH:MM:SS`
    IsoSeconds,
    /// `MM/DD/YYYY`
    UsDateOnly,
}

/// Render a date as text in the given layout.
pub fn convert_date_to_str(d: &CalendarDate, fmt: DateFormat) -> heapless::String<32> {
    let mut s = heapless::String::new();
    match fmt {
        DateFormat::IsoSeconds => {
            let _ = write!(
                s,
                "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                d.year as u32 + 1900,
                d.month + 1,
                d.day,
                d.hour,
                d.minute,
                d.second
            );
        }
        DateFormat::UsDateOnly => {
            let _ = write!(s, "{:02}/{:02}/{:04}", d.month + 1, d.day, d.year as u32 + 1900);
        }
    }
    s
}

pub fn unix_to_ntp(t: u32) -> Result<u32> {
    if !is_valid_time(t, Epoch::Unix, 0) {
        return Err(Status::InvalidParameter);
    }
    t.checked_add(NTP_UNIX_OFFSET).ok_or(Status::InvalidParameter)
}

pub fn ntp_to_unix(t: u32) -> Result<u32> {
    if !is_valid_time(t, Epoch::Ntp, 0) {
        return Err(Status::InvalidParameter);
    }
    Ok(t - NTP_UNIX_OFFSET)
}

pub fn unix_to_zigbee(t: u32) -> Result<u32> {
    if !is_valid_time(t, Epoch::Unix, 0) {
        return Err(Status::InvalidParameter);
    }
    t.checked_sub(ZIGBEE_UNIX_OFFSET).ok_or(Status::InvalidParameter)
}

pub fn zigbee_to_unix(t: u32) -> Result<u32> {
    if !is_valid_time(t, Epoch::Zigbee, 0) {
        return Err(Status::InvalidParameter);
    }
    Ok(t + ZIGBEE_UNIX_OFFSET)
}
