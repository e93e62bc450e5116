//! Unix-style 5-field cron parser (spec.md §4.H).
//!
//! Each field is one of `*`, an integer, a range `a-b`, a comma-separated
//! list of the preceding, or any of those followed by `/step`. Day-of-month
//! and day-of-week are unioned when both are constrained, matching
//! traditional Unix cron rather than requiring both to match.

use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike};

use crate::error::BackupError;

/// A single cron field, represented as a bitmask over its legal range plus
/// whether it was given as a bare `*` (distinct from an explicit full range,
/// which matters for the day-of-month/day-of-week union rule).
#[derive(Debug, Clone, PartialEq, Eq)]
struct FieldSpec {
    mask: u64,
    is_star: bool,
}

impl FieldSpec {
    fn matches(&self, value: u32) -> bool {
        self.mask & (1u64 << value) != 0
    }
}

fn parse_field(raw: &str, min: u32, max: u32) -> Result<FieldSpec, BackupError> {
    let mut mask: u64 = 0;
    let mut is_star = raw == "*";

    for part in raw.split(',') {
        let (range_part, step) = match part.split_once('/') {
            Some((r, s)) => {
                let step: u32 = s
                    .parse()
                    .map_err(|_| BackupError::CronInvalid(format!("invalid step in '{part}'")))?;
                if step == 0 {
                    return Err(BackupError::CronInvalid(format!("step must be > 0 in '{part}'")));
                }
                (r, step)
            }
            None => (part, 1),
        };

        let (lo, hi) = if range_part == "*" {
            (min, max)
        } else if let Some((a, b)) = range_part.split_once('-') {
            let lo: u32 = a
                .parse()
                .map_err(|_| BackupError::CronInvalid(format!("invalid range start in '{part}'")))?;
            let hi: u32 = b
                .parse()
                .map_err(|_| BackupError::CronInvalid(format!("invalid range end in '{part}'")))?;
            if lo > hi {
                return Err(BackupError::CronInvalid(format!(
                    "range start greater than end in '{part}'"
                )));
            }
            (lo, hi)
        } else {
            let v: u32 = range_part
                .parse()
                .map_err(|_| BackupError::CronInvalid(format!("invalid value '{part}'")))?;
            (v, v)
        };

        if lo < min || hi > max {
            return Err(BackupError::CronInvalid(format!(
                "value out of range [{min}-{max}] in '{part}'"
            )));
        }

        let mut v = lo;
        while v <= hi {
            mask |= 1u64 << v;
            v += step;
        }
    }

    if mask == 0 {
        return Err(BackupError::CronInvalid(format!(
            "field '{raw}' matches no values"
        )));
    }

    Ok(FieldSpec { mask, is_star })
}

/// A parsed 5-field cron expression, bound to no particular time zone —
/// the zone is supplied per call to [`CronSchedule::next_after`].
#[derive(Debug, Clone)]
pub struct CronSchedule {
    minute: FieldSpec,
    hour: FieldSpec,
    day_of_month: FieldSpec,
    month: FieldSpec,
    day_of_week: FieldSpec,
    source: String,
}

impl CronSchedule {
    pub fn parse(expr: &str) -> Result<Self, BackupError> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(BackupError::CronInvalid(format!(
                "expected exactly 5 fields, got {}: '{expr}'",
                fields.len()
            )));
        }

        let minute = parse_field(fields[0], 0, 59)?;
        let hour = parse_field(fields[1], 0, 23)?;
        let day_of_month = parse_field(fields[2], 1, 31)?;
        let month = parse_field(fields[3], 1, 12)?;
        // day-of-week: 0-7, both 0 and 7 mean Sunday.
        let mut day_of_week = parse_field(fields[4], 0, 7)?;
        if day_of_week.mask & (1 << 7) != 0 {
            day_of_week.mask |= 1 << 0;
        }

        Ok(Self {
            minute,
            hour,
            day_of_month,
            month,
            day_of_week,
            source: expr.to_string(),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    fn day_matches(&self, dom: u32, dow: u32) -> bool {
        match (self.day_of_month.is_star, self.day_of_week.is_star) {
            (true, true) => true,
            (true, false) => self.day_of_week.matches(dow),
            (false, true) => self.day_of_month.matches(dom),
            (false, false) => self.day_of_month.matches(dom) || self.day_of_week.matches(dow),
        }
    }

    /// Find the least instant strictly greater than `from` whose wall-clock
    /// fields all match, in `from`'s time zone. Fast-forwards whole
    /// months/days when those fields can't match rather than stepping
    /// minute-by-minute the entire way, so a far-future query (e.g. the next
    /// Feb 29) stays cheap.
    pub fn next_after<Tz: TimeZone>(&self, from: DateTime<Tz>) -> Option<DateTime<Tz>> {
        let tz = from.timezone();
        let mut candidate = (from.clone() + Duration::minutes(1))
            .with_second(0)
            .unwrap()
            .with_nanosecond(0)
            .unwrap();

        // Bound the search so an unsatisfiable expression (shouldn't happen
        // after `parse`'s validation, but e.g. Feb 30 via day-of-month=30
        // and month=2) terminates instead of looping forever.
        let limit = candidate.clone() + Duration::days(366 * 5);

        while candidate < limit {
            if !self.month.matches(candidate.month()) {
                candidate = first_of_next_month(&tz, &candidate)?;
                continue;
            }
            let dom = candidate.day();
            let dow = candidate.weekday().num_days_from_sunday();
            if !self.day_matches(dom, dow) {
                candidate = (candidate + Duration::days(1))
                    .with_hour(0)?
                    .with_minute(0)?
                    .with_second(0)?
                    .with_nanosecond(0)?;
                continue;
            }
            if !self.hour.matches(candidate.hour()) {
                candidate = (candidate + Duration::hours(1))
                    .with_minute(0)?
                    .with_second(0)?
                    .with_nanosecond(0)?;
                continue;
            }
            if !self.minute.matches(candidate.minute()) {
                candidate += Duration::minutes(1);
                continue;
            }
            return Some(candidate);
        }
        None
    }
}

fn first_of_next_month<Tz: TimeZone>(tz: &Tz, from: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    let (year, month) = if from.month() == 12 {
        (from.year() + 1, 1)
    } else {
        (from.year(), from.month() + 1)
    };
    tz.with_ymd_and_hms(year, month, 1, 0, 0, 0).single()
}
