//! Cadence rules for recurring broadcasts.
//!
//! A [`Recurrence`] pairs an interval (day, hour, or minute) with an anchor
//! offset within that interval. Occurrences are aligned to UTC interval
//! boundaries: `Daily { 12, 30 }` fires at 12:30 every calendar day,
//! `Hourly { 15 }` at minute 15 of every hour, `Minutely { 45 }` at second
//! 45 of every minute.
//!
//! The user-facing spelling matches what the bot dialogue collects: an
//! interval keyword plus a time fragment, e.g. `day 12:30`, `hour :15`,
//! `minute :45`.
use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use thiserror::Error;

/// How often, and at which offset within the interval, an advert fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recurrence {
    /// Every calendar day at `hour:minute` UTC.
    Daily { hour: u32, minute: u32 },
    /// Every hour at the given minute.
    Hourly { minute: u32 },
    /// Every minute at the given second.
    Minutely { second: u32 },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecurrenceError {
    #[error("unknown interval {0:?}, expected one of day, hour, minute")]
    UnknownInterval(String),
    #[error("time {time:?} does not match the {expected:?} format")]
    InvalidTime { time: String, expected: &'static str },
    #[error("{field} {value} is out of range (max {max})")]
    OutOfRange {
        field: &'static str,
        value: u32,
        max: u32,
    },
    #[error("recurrence {0:?} is not of the form \"<interval> <time>\"")]
    InvalidSpec(String),
}

impl Recurrence {
    /// Parses the interval keyword and time fragment collected by the bot
    /// dialogue: `("day", "hh:mm")`, `("hour", ":mm")`, or `("minute", ":ss")`.
    pub fn parse(interval: &str, time: &str) -> Result<Self, RecurrenceError> {
        match interval {
            "day" => {
                let (hour, minute) =
                    time.split_once(':')
                        .ok_or_else(|| RecurrenceError::InvalidTime {
                            time: time.to_owned(),
                            expected: "hh:mm",
                        })?;
                let hour = parse_field(hour, time, "hh:mm")?;
                let minute = parse_field(minute, time, "hh:mm")?;
                Self::daily(hour, minute)
            }
            "hour" => {
                let minute = parse_anchored(time, ":mm")?;
                Self::hourly(minute)
            }
            "minute" => {
                let second = parse_anchored(time, ":ss")?;
                Self::minutely(second)
            }
            other => Err(RecurrenceError::UnknownInterval(other.to_owned())),
        }
    }

    pub fn daily(hour: u32, minute: u32) -> Result<Self, RecurrenceError> {
        check_range("hour", hour, 23)?;
        check_range("minute", minute, 59)?;
        Ok(Self::Daily { hour, minute })
    }

    pub fn hourly(minute: u32) -> Result<Self, RecurrenceError> {
        check_range("minute", minute, 59)?;
        Ok(Self::Hourly { minute })
    }

    pub fn minutely(second: u32) -> Result<Self, RecurrenceError> {
        check_range("second", second, 59)?;
        Ok(Self::Minutely { second })
    }

    /// The earliest occurrence strictly after `after`.
    ///
    /// Because occurrences sit on fixed interval boundaries, this is also
    /// the skip-forward rule for missed ticks: advancing a stale fire time
    /// past `now` lands on exactly this instant, however many occurrences
    /// were missed in between.
    pub fn next_occurrence(&self, after: DateTime<Utc>) -> DateTime<Utc> {
        let (period, offset) = match *self {
            Self::Daily { hour, minute } => (
                TimeDelta::days(1),
                TimeDelta::hours(i64::from(hour)) + TimeDelta::minutes(i64::from(minute)),
            ),
            Self::Hourly { minute } => {
                (TimeDelta::hours(1), TimeDelta::minutes(i64::from(minute)))
            }
            Self::Minutely { second } => {
                (TimeDelta::minutes(1), TimeDelta::seconds(i64::from(second)))
            }
        };
        // Truncation only fails for out-of-range timestamps, which cannot be
        // produced from a valid clock reading plus day-or-shorter periods.
        let mut candidate = after
            .duration_trunc(period)
            .unwrap_or(after)
            .checked_add_signed(offset)
            .unwrap_or(after);
        while candidate <= after {
            candidate += period;
        }
        candidate
    }
}

fn check_range(field: &'static str, value: u32, max: u32) -> Result<(), RecurrenceError> {
    if value > max {
        Err(RecurrenceError::OutOfRange { field, value, max })
    } else {
        Ok(())
    }
}

fn parse_field(digits: &str, time: &str, expected: &'static str) -> Result<u32, RecurrenceError> {
    digits
        .parse()
        .map_err(|_| RecurrenceError::InvalidTime {
            time: time.to_owned(),
            expected,
        })
}

/// Parses the `":mm"` / `":ss"` fragments used for the sub-daily intervals.
fn parse_anchored(time: &str, expected: &'static str) -> Result<u32, RecurrenceError> {
    let digits = time
        .strip_prefix(':')
        .ok_or_else(|| RecurrenceError::InvalidTime {
            time: time.to_owned(),
            expected,
        })?;
    parse_field(digits, time, expected)
}

impl Display for Recurrence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Daily { hour, minute } => write!(f, "day {hour:02}:{minute:02}"),
            Self::Hourly { minute } => write!(f, "hour :{minute:02}"),
            Self::Minutely { second } => write!(f, "minute :{second:02}"),
        }
    }
}

impl FromStr for Recurrence {
    type Err = RecurrenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (interval, time) = s
            .split_once(' ')
            .ok_or_else(|| RecurrenceError::InvalidSpec(s.to_owned()))?;
        Self::parse(interval, time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 15, h, m, s).unwrap()
    }

    #[test]
    fn parses_each_interval() {
        assert_eq!(
            Recurrence::parse("day", "12:30").unwrap(),
            Recurrence::Daily {
                hour: 12,
                minute: 30
            }
        );
        assert_eq!(
            Recurrence::parse("hour", ":15").unwrap(),
            Recurrence::Hourly { minute: 15 }
        );
        assert_eq!(
            Recurrence::parse("minute", ":45").unwrap(),
            Recurrence::Minutely { second: 45 }
        );
    }

    #[test]
    fn rejects_unknown_interval() {
        assert_matches!(
            Recurrence::parse("week", "12:30"),
            Err(RecurrenceError::UnknownInterval(interval)) if interval == "week"
        );
    }

    #[test]
    fn rejects_malformed_times() {
        assert_matches!(
            Recurrence::parse("day", "1230"),
            Err(RecurrenceError::InvalidTime { expected: "hh:mm", .. })
        );
        assert_matches!(
            Recurrence::parse("day", "aa:30"),
            Err(RecurrenceError::InvalidTime { .. })
        );
        assert_matches!(
            Recurrence::parse("hour", "15"),
            Err(RecurrenceError::InvalidTime { expected: ":mm", .. })
        );
        assert_matches!(
            Recurrence::parse("minute", ":4x"),
            Err(RecurrenceError::InvalidTime { expected: ":ss", .. })
        );
    }

    #[test]
    fn rejects_out_of_range_fields() {
        assert_matches!(
            Recurrence::parse("day", "24:00"),
            Err(RecurrenceError::OutOfRange {
                field: "hour",
                value: 24,
                max: 23
            })
        );
        assert_matches!(
            Recurrence::parse("hour", ":60"),
            Err(RecurrenceError::OutOfRange {
                field: "minute",
                ..
            })
        );
        assert_matches!(
            Recurrence::parse("minute", ":75"),
            Err(RecurrenceError::OutOfRange {
                field: "second",
                ..
            })
        );
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for spec in ["day 09:05", "hour :30", "minute :00"] {
            let recurrence: Recurrence = spec.parse().unwrap();
            assert_eq!(recurrence.to_string(), spec);
        }
    }

    #[test]
    fn from_str_requires_interval_and_time() {
        assert_matches!(
            "day".parse::<Recurrence>(),
            Err(RecurrenceError::InvalidSpec(_))
        );
    }

    #[test]
    fn hourly_next_occurrence_within_the_hour() {
        let recurrence = Recurrence::Hourly { minute: 30 };
        assert_eq!(recurrence.next_occurrence(at(10, 5, 0)), at(10, 30, 0));
    }

    #[test]
    fn hourly_next_occurrence_rolls_over() {
        let recurrence = Recurrence::Hourly { minute: 30 };
        assert_eq!(recurrence.next_occurrence(at(10, 31, 0)), at(11, 30, 0));
    }

    #[test]
    fn occurrence_is_strictly_after() {
        let recurrence = Recurrence::Hourly { minute: 30 };
        assert_eq!(recurrence.next_occurrence(at(10, 30, 0)), at(11, 30, 0));
    }

    #[test]
    fn daily_next_occurrence() {
        let recurrence = Recurrence::Daily {
            hour: 9,
            minute: 15,
        };
        assert_eq!(recurrence.next_occurrence(at(8, 0, 0)), at(9, 15, 0));
        let next = recurrence.next_occurrence(at(9, 15, 0));
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 4, 16, 9, 15, 0).unwrap());
    }

    #[test]
    fn daily_is_smallest_boundary_after_now() {
        let recurrence = Recurrence::Daily {
            hour: 23,
            minute: 59,
        };
        let now = at(23, 59, 30);
        let next = recurrence.next_occurrence(now);
        assert!(next > now);
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 4, 16, 23, 59, 0).unwrap());
        // Nothing of the same cadence fits between now and next.
        assert!(next - now < TimeDelta::days(1));
    }

    #[test]
    fn minutely_next_occurrence() {
        let recurrence = Recurrence::Minutely { second: 45 };
        assert_eq!(recurrence.next_occurrence(at(10, 5, 10)), at(10, 5, 45));
        assert_eq!(recurrence.next_occurrence(at(10, 5, 50)), at(10, 6, 45));
    }

    #[test]
    fn skips_missed_occurrences() {
        let recurrence = Recurrence::Minutely { second: 0 };
        // Many minutes elapsed; the next occurrence is the first boundary
        // after `now`, not a backlog of one per missed minute.
        assert_eq!(recurrence.next_occurrence(at(10, 30, 12)), at(10, 31, 0));
    }
}
