//! Sampling policies and reference-timestamp generation.
//!
//! A scan asks for captures "every N hours" or "every day at these times".
//! This module turns that request plus a `[start, end]` bound into a lazy,
//! finite, strictly-ordered sequence of reference instants that the
//! selector walks. Two policies exist:
//!
//! - [`SamplingPolicy::FixedInterval`]: top-of-the-hour aligned, stepping a
//!   fixed (possibly fractional) number of hours, last value ≤ `end`
//! - [`SamplingPolicy::FixedTimesOfDay`]: the cross product of every
//!   calendar day in the bound with one or more times of day, each time
//!   carrying its own UTC offset or falling back to an explicit default
//!
//! Both generators are pure functions of their inputs: no I/O, no shared
//! state, safe to rebuild and re-consume. Boundary days of the
//! times-of-day policy may yield instants slightly outside `[start, end]`;
//! the selector treats those as simply unmatched.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, TimeZone, Timelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::timestamp::{parse_offset, TimestampError};

static TIME_OF_DAY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2}):(\d{2})(?::(\d{2}))?(Z|z|[+-]\d{2}:?\d{2})?$").unwrap());

/// A configuration error in a sampling policy. Fails fast, never retried.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Interval policies need a positive, finite number of hours.
    #[error("sampling interval must be a positive number of hours, got {hours}")]
    NonPositiveInterval { hours: f64 },

    /// Times-of-day policies need at least one time.
    #[error("fixed times-of-day policy requires at least one time")]
    EmptyTimes,
}

/// One time of day, optionally pinned to a UTC offset.
///
/// When `offset` is `None` the generator substitutes the caller's default
/// offset; the host timezone is never consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfDay {
    pub time: NaiveTime,
    pub offset: Option<FixedOffset>,
}

impl TimeOfDay {
    pub fn new(time: NaiveTime) -> Self {
        Self { time, offset: None }
    }

    pub fn with_offset(time: NaiveTime, offset: FixedOffset) -> Self {
        Self {
            time,
            offset: Some(offset),
        }
    }
}

impl FromStr for TimeOfDay {
    type Err = TimestampError;

    /// Parse forms like `09:00`, `18:30:00`, `09:00-05:00`, `21:15+05:30`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = TIME_OF_DAY_PATTERN
            .captures(s.trim())
            .ok_or_else(|| TimestampError::Unparseable(s.to_string()))?;
        let hour: u32 = caps[1].parse().map_err(|_| TimestampError::Unparseable(s.to_string()))?;
        let minute: u32 = caps[2].parse().map_err(|_| TimestampError::Unparseable(s.to_string()))?;
        let second: u32 = caps
            .get(3)
            .map(|m| m.as_str().parse())
            .transpose()
            .map_err(|_| TimestampError::Unparseable(s.to_string()))?
            .unwrap_or(0);
        let time = NaiveTime::from_hms_opt(hour, minute, second)
            .ok_or_else(|| TimestampError::Unparseable(s.to_string()))?;
        let offset = caps.get(4).map(|m| parse_offset(m.as_str())).transpose()?;
        Ok(Self { time, offset })
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.offset {
            Some(off) => write!(f, "{}{}", self.time.format("%H:%M:%S"), off),
            None => write!(f, "{}", self.time.format("%H:%M:%S")),
        }
    }
}

/// How reference timestamps are laid over a date range.
///
/// Pure configuration; building one performs no validation, generating
/// from one does.
#[derive(Debug, Clone, PartialEq)]
pub enum SamplingPolicy {
    /// One reference every `hours` hours, aligned to the top of the hour.
    FixedInterval { hours: f64 },
    /// One reference per calendar day per time of day.
    FixedTimesOfDay { times: Vec<TimeOfDay> },
}

impl SamplingPolicy {
    /// Generate the reference-timestamp sequence for this policy.
    ///
    /// The sequence is lazy and finite; consuming it never allocates the
    /// whole range. `default_offset` applies to times of day that carry no
    /// offset of their own.
    ///
    /// # Errors
    ///
    /// [`PolicyError`] for a non-positive interval or an empty set of
    /// times.
    pub fn reference_times(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        default_offset: FixedOffset,
    ) -> Result<Box<dyn Iterator<Item = DateTime<Utc>>>, PolicyError> {
        match self {
            Self::FixedInterval { hours } => {
                Ok(Box::new(fixed_interval(start, end, *hours)?))
            }
            Self::FixedTimesOfDay { times } => Ok(Box::new(fixed_times_of_day(
                start,
                end,
                times.clone(),
                default_offset,
            )?)),
        }
    }
}

/// References every `hours` hours from `start` (truncated to the top of
/// the hour) through `end` inclusive.
///
/// Truncation zeroes minutes, seconds, and subseconds on the bound's own
/// local clock, so a `-s "2020-01-01 10:17" -i 1` scan samples 10:00,
/// 11:00, … in the bound's offset.
///
/// # Errors
///
/// [`PolicyError::NonPositiveInterval`] unless `hours` is finite, positive,
/// and at least one millisecond long.
pub fn fixed_interval(
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    hours: f64,
) -> Result<impl Iterator<Item = DateTime<Utc>>, PolicyError> {
    if !hours.is_finite() || hours <= 0.0 {
        return Err(PolicyError::NonPositiveInterval { hours });
    }
    let step_ms = (hours * 3_600_000.0).round() as i64;
    if step_ms <= 0 {
        return Err(PolicyError::NonPositiveInterval { hours });
    }
    let step = Duration::milliseconds(step_ms);

    let first = start
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .expect("top of the hour is always representable")
        .with_timezone(&Utc);
    let end_utc = end.with_timezone(&Utc);

    Ok(std::iter::successors(Some(first), move |t| Some(*t + step))
        .take_while(move |t| *t <= end_utc))
}

/// One reference per calendar day per time of day, for every day from
/// `start.date()` through `end.date()` inclusive.
///
/// Dates are taken on the bounds' own local clocks. Within a day, times
/// are yielded in the order given. A time's own offset wins over
/// `default_offset`. Boundary days can produce instants before `start` or
/// after `end`; those are yielded anyway and left for the selector to
/// skip.
///
/// # Errors
///
/// [`PolicyError::EmptyTimes`] if `times` is empty.
pub fn fixed_times_of_day(
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    times: Vec<TimeOfDay>,
    default_offset: FixedOffset,
) -> Result<impl Iterator<Item = DateTime<Utc>>, PolicyError> {
    if times.is_empty() {
        return Err(PolicyError::EmptyTimes);
    }
    let first_day = start.date_naive();
    let last_day = end.date_naive();

    let days = std::iter::successors(Some(first_day), |d| d.succ_opt())
        .take_while(move |d| *d <= last_day);

    Ok(days.flat_map(move |day| {
        times
            .clone()
            .into_iter()
            .filter_map(move |tod| {
                let offset = tod.offset.unwrap_or(default_offset);
                offset
                    .from_local_datetime(&day.and_time(tod.time))
                    .single()
                    .map(|t| t.with_timezone(&Utc))
            })
            .collect::<Vec<_>>()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc_offset() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<FixedOffset> {
        utc_offset().with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_interval_truncates_to_top_of_hour() {
        let refs: Vec<_> =
            fixed_interval(at(2020, 1, 1, 10, 17, 45), at(2020, 1, 1, 12, 0, 0), 1.0)
                .unwrap()
                .collect();
        assert_eq!(
            refs,
            vec![
                Utc.with_ymd_and_hms(2020, 1, 1, 10, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2020, 1, 1, 11, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2020, 1, 1, 12, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn test_interval_end_is_inclusive() {
        let refs: Vec<_> =
            fixed_interval(at(2020, 1, 1, 0, 0, 0), at(2020, 1, 1, 6, 0, 0), 3.0)
                .unwrap()
                .collect();
        assert_eq!(refs.len(), 3); // 00:00, 03:00, 06:00
        assert_eq!(*refs.last().unwrap(), Utc.with_ymd_and_hms(2020, 1, 1, 6, 0, 0).unwrap());
    }

    #[test]
    fn test_interval_fractional_hours() {
        let refs: Vec<_> =
            fixed_interval(at(2020, 1, 1, 9, 0, 0), at(2020, 1, 1, 10, 0, 0), 0.5)
                .unwrap()
                .collect();
        assert_eq!(refs.len(), 3); // 09:00, 09:30, 10:00
        assert_eq!(refs[1], Utc.with_ymd_and_hms(2020, 1, 1, 9, 30, 0).unwrap());
    }

    #[test]
    fn test_interval_rejects_non_positive() {
        assert!(matches!(
            fixed_interval(at(2020, 1, 1, 0, 0, 0), at(2020, 1, 2, 0, 0, 0), 0.0),
            Err(PolicyError::NonPositiveInterval { .. })
        ));
        assert!(matches!(
            fixed_interval(at(2020, 1, 1, 0, 0, 0), at(2020, 1, 2, 0, 0, 0), -2.0),
            Err(PolicyError::NonPositiveInterval { .. })
        ));
        assert!(matches!(
            fixed_interval(at(2020, 1, 1, 0, 0, 0), at(2020, 1, 2, 0, 0, 0), f64::NAN),
            Err(PolicyError::NonPositiveInterval { .. })
        ));
    }

    #[test]
    fn test_interval_empty_when_start_past_end() {
        let refs: Vec<_> =
            fixed_interval(at(2020, 1, 2, 0, 0, 0), at(2020, 1, 1, 0, 0, 0), 1.0)
                .unwrap()
                .collect();
        assert!(refs.is_empty());
    }

    #[test]
    fn test_times_of_day_cross_product() {
        // start=2020-01-01, end=2020-01-03, times=[09:00, 18:00] -> 6 refs.
        let times = vec![
            TimeOfDay::new(NaiveTime::from_hms_opt(9, 0, 0).unwrap()),
            TimeOfDay::new(NaiveTime::from_hms_opt(18, 0, 0).unwrap()),
        ];
        let refs: Vec<_> = fixed_times_of_day(
            at(2020, 1, 1, 0, 0, 0),
            at(2020, 1, 3, 0, 0, 0),
            times,
            utc_offset(),
        )
        .unwrap()
        .collect();

        let expect = |d: u32, h: u32| Utc.with_ymd_and_hms(2020, 1, d, h, 0, 0).unwrap();
        assert_eq!(
            refs,
            vec![
                expect(1, 9),
                expect(1, 18),
                expect(2, 9),
                expect(2, 18),
                expect(3, 9),
                expect(3, 18),
            ]
        );
    }

    #[test]
    fn test_times_of_day_preserves_given_order() {
        let times = vec![
            TimeOfDay::new(NaiveTime::from_hms_opt(18, 0, 0).unwrap()),
            TimeOfDay::new(NaiveTime::from_hms_opt(9, 0, 0).unwrap()),
        ];
        let refs: Vec<_> = fixed_times_of_day(
            at(2020, 1, 1, 0, 0, 0),
            at(2020, 1, 1, 23, 0, 0),
            times,
            utc_offset(),
        )
        .unwrap()
        .collect();
        assert_eq!(refs[0].hour(), 18);
        assert_eq!(refs[1].hour(), 9);
    }

    #[test]
    fn test_times_of_day_own_offset_wins() {
        // 09:00 at -05:00 is 14:00 UTC even with a UTC default.
        let times = vec![TimeOfDay::with_offset(
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            FixedOffset::west_opt(5 * 3600).unwrap(),
        )];
        let refs: Vec<_> = fixed_times_of_day(
            at(2020, 1, 1, 0, 0, 0),
            at(2020, 1, 1, 23, 0, 0),
            times,
            utc_offset(),
        )
        .unwrap()
        .collect();
        assert_eq!(refs, vec![Utc.with_ymd_and_hms(2020, 1, 1, 14, 0, 0).unwrap()]);
    }

    #[test]
    fn test_times_of_day_boundary_days_can_escape_range() {
        // 09:00 on the start day precedes a noon start bound; it is still
        // yielded, the selector just finds no use for it.
        let times = vec![TimeOfDay::new(NaiveTime::from_hms_opt(9, 0, 0).unwrap())];
        let refs: Vec<_> = fixed_times_of_day(
            at(2020, 1, 1, 12, 0, 0),
            at(2020, 1, 2, 12, 0, 0),
            times,
            utc_offset(),
        )
        .unwrap()
        .collect();
        assert_eq!(refs.len(), 2);
        assert!(refs[0] < at(2020, 1, 1, 12, 0, 0).with_timezone(&Utc));
    }

    #[test]
    fn test_times_of_day_rejects_empty() {
        assert!(matches!(
            fixed_times_of_day(
                at(2020, 1, 1, 0, 0, 0),
                at(2020, 1, 2, 0, 0, 0),
                vec![],
                utc_offset()
            ),
            Err(PolicyError::EmptyTimes)
        ));
    }

    #[test]
    fn test_time_of_day_from_str() {
        let plain: TimeOfDay = "09:00".parse().unwrap();
        assert_eq!(plain.time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert!(plain.offset.is_none());

        let with_seconds: TimeOfDay = "18:30:15".parse().unwrap();
        assert_eq!(with_seconds.time, NaiveTime::from_hms_opt(18, 30, 15).unwrap());

        let with_offset: TimeOfDay = "09:00-05:00".parse().unwrap();
        assert_eq!(
            with_offset.offset.unwrap().local_minus_utc(),
            -5 * 3600
        );

        let zulu: TimeOfDay = "21:15Z".parse().unwrap();
        assert_eq!(zulu.offset.unwrap().local_minus_utc(), 0);
    }

    #[test]
    fn test_time_of_day_from_str_rejects_garbage() {
        assert!("9am".parse::<TimeOfDay>().is_err());
        assert!("25:00".parse::<TimeOfDay>().is_err());
        assert!("".parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn test_policy_reference_times_dispatch() {
        let policy = SamplingPolicy::FixedInterval { hours: 6.0 };
        let refs: Vec<_> = policy
            .reference_times(at(2020, 1, 1, 0, 0, 0), at(2020, 1, 1, 23, 0, 0), utc_offset())
            .unwrap()
            .collect();
        assert_eq!(refs.len(), 4); // 00, 06, 12, 18

        let policy = SamplingPolicy::FixedInterval { hours: -1.0 };
        assert!(policy
            .reference_times(at(2020, 1, 1, 0, 0, 0), at(2020, 1, 1, 23, 0, 0), utc_offset())
            .is_err());
    }
}
