use std::str::FromStr;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};

use crate::error::{Result, SchedulerError};

/// A parsed schedule expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    /// `@every <duration>`: fixed interval, measured from the previous firing.
    Every(StdDuration),
    Cron(CronSpec),
}

/// Six cron fields as bitsets, seconds first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSpec {
    seconds: u64,
    minutes: u64,
    hours: u64,
    days_of_month: u64,
    months: u64,
    days_of_week: u64,
    dom_star: bool,
    dow_star: bool,
}

struct Field {
    name: &'static str,
    min: u32,
    max: u32,
    names: &'static [&'static str],
}

const SECONDS: Field = Field { name: "second", min: 0, max: 59, names: &[] };
const MINUTES: Field = Field { name: "minute", min: 0, max: 59, names: &[] };
const HOURS: Field = Field { name: "hour", min: 0, max: 23, names: &[] };
const DAYS_OF_MONTH: Field = Field { name: "day of month", min: 1, max: 31, names: &[] };
const MONTHS: Field = Field {
    name: "month",
    min: 1,
    max: 12,
    names: &[
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ],
};
const DAYS_OF_WEEK: Field = Field {
    name: "day of week",
    min: 0,
    max: 6,
    names: &["sun", "mon", "tue", "wed", "thu", "fri", "sat"],
};

/// Searching further ahead than this means the expression can never fire
/// (e.g. `0 0 0 30 2 *`).
const MAX_YEARS_AHEAD: i32 = 5;

impl Schedule {
    pub fn parse(expression: &str) -> Result<Self> {
        expression.parse()
    }

    /// The first firing strictly after `after`, or `None` if there is none.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Schedule::Every(interval) => {
                Some(after + Duration::from_std(*interval).ok()?)
            }
            Schedule::Cron(spec) => spec.next_after(after),
        }
    }
}

impl FromStr for Schedule {
    type Err = SchedulerError;

    fn from_str(expression: &str) -> Result<Self> {
        let invalid = |reason: String| SchedulerError::InvalidSchedule {
            expression: expression.to_string(),
            reason,
        };

        let trimmed = expression.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty expression".to_string()));
        }

        if let Some(descriptor) = trimmed.strip_prefix('@') {
            let (word, arg) = match descriptor.split_once(char::is_whitespace) {
                Some((w, a)) => (w, a.trim()),
                None => (descriptor, ""),
            };
            let expanded = match word.to_ascii_lowercase().as_str() {
                "every" => return parse_interval(arg).map(Schedule::Every).map_err(invalid),
                "yearly" | "annually" => "0 0 0 1 1 *",
                "monthly" => "0 0 0 1 * *",
                "weekly" => "0 0 0 * * 0",
                "daily" | "midnight" => "0 0 0 * * *",
                "hourly" => "0 0 * * * *",
                other => return Err(invalid(format!("unknown descriptor @{other}"))),
            };
            if !arg.is_empty() {
                return Err(invalid(format!("@{word} takes no argument")));
            }
            return CronSpec::from_fields(&expanded.split(' ').collect::<Vec<_>>())
                .map(Schedule::Cron)
                .map_err(invalid);
        }

        let mut fields: Vec<&str> = trimmed.split_whitespace().collect();
        match fields.len() {
            6 => {}
            5 => fields.insert(0, "0"),
            n => return Err(invalid(format!("expected 5 or 6 fields, found {n}"))),
        }
        CronSpec::from_fields(&fields)
            .map(Schedule::Cron)
            .map_err(invalid)
    }
}

impl CronSpec {
    fn from_fields(fields: &[&str]) -> std::result::Result<Self, String> {
        let (seconds, _) = parse_field(fields[0], &SECONDS)?;
        let (minutes, _) = parse_field(fields[1], &MINUTES)?;
        let (hours, _) = parse_field(fields[2], &HOURS)?;
        let (days_of_month, dom_star) = parse_field(fields[3], &DAYS_OF_MONTH)?;
        let (months, _) = parse_field(fields[4], &MONTHS)?;
        let (days_of_week, dow_star) = parse_field(fields[5], &DAYS_OF_WEEK)?;
        Ok(Self {
            seconds,
            minutes,
            hours,
            days_of_month,
            months,
            days_of_week,
            dom_star,
            dow_star,
        })
    }

    fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut t = after.with_nanosecond(0)? + Duration::seconds(1);
        let last_year = t.year() + MAX_YEARS_AHEAD;

        loop {
            if t.year() > last_year {
                return None;
            }
            if !has(self.months, t.month()) {
                let (y, m) = if t.month() == 12 {
                    (t.year() + 1, 1)
                } else {
                    (t.year(), t.month() + 1)
                };
                t = Utc.with_ymd_and_hms(y, m, 1, 0, 0, 0).single()?;
                continue;
            }
            if !self.day_matches(t) {
                t = Utc
                    .with_ymd_and_hms(t.year(), t.month(), t.day(), 0, 0, 0)
                    .single()?
                    + Duration::days(1);
                continue;
            }
            if !has(self.hours, t.hour()) {
                t = t.with_minute(0)?.with_second(0)? + Duration::hours(1);
                continue;
            }
            if !has(self.minutes, t.minute()) {
                t = t.with_second(0)? + Duration::minutes(1);
                continue;
            }
            if !has(self.seconds, t.second()) {
                t += Duration::seconds(1);
                continue;
            }
            return Some(t);
        }
    }

    /// A restricted day-of-month and a restricted day-of-week combine with OR;
    /// if either is `*` both have to match.
    fn day_matches(&self, t: DateTime<Utc>) -> bool {
        let dom = has(self.days_of_month, t.day());
        let dow = has(self.days_of_week, t.weekday().num_days_from_sunday());
        if self.dom_star || self.dow_star {
            dom && dow
        } else {
            dom || dow
        }
    }
}

fn has(bits: u64, value: u32) -> bool {
    bits & (1 << value) != 0
}

/// Returns the bitset and whether the field is an unrestricted `*`/`?`.
fn parse_field(field: &str, spec: &Field) -> std::result::Result<(u64, bool), String> {
    let mut bits = 0u64;
    let mut star = false;
    for part in field.split(',') {
        let (b, s) = parse_part(part, spec)?;
        bits |= b;
        star |= s;
    }
    Ok((bits, star))
}

fn parse_part(part: &str, spec: &Field) -> std::result::Result<(u64, bool), String> {
    let (range, step) = match part.split_once('/') {
        Some((r, s)) => {
            let step: u32 = s
                .parse()
                .map_err(|_| format!("bad step {s:?} in {} field", spec.name))?;
            if step == 0 {
                return Err(format!("step of zero in {} field", spec.name));
            }
            (r, Some(step))
        }
        None => (part, None),
    };

    let (start, end, wildcard) = if range == "*" || range == "?" {
        (spec.min, spec.max, true)
    } else if let Some((lo, hi)) = range.split_once('-') {
        (value(lo, spec)?, value(hi, spec)?, false)
    } else {
        let v = value(range, spec)?;
        // "N/step" runs from N to the end of the field.
        (v, if step.is_some() { spec.max } else { v }, false)
    };

    if start < spec.min || end > spec.max {
        return Err(format!(
            "{part:?} is outside {}-{} in {} field",
            spec.min, spec.max, spec.name
        ));
    }
    if start > end {
        return Err(format!("range {part:?} is backwards in {} field", spec.name));
    }

    let step = step.unwrap_or(1);
    let bits = (start..=end)
        .step_by(step as usize)
        .fold(0u64, |acc, v| acc | (1 << v));
    Ok((bits, wildcard && step == 1))
}

fn value(token: &str, spec: &Field) -> std::result::Result<u32, String> {
    if let Ok(n) = token.parse::<u32>() {
        return Ok(n);
    }
    let lower = token.to_ascii_lowercase();
    spec.names
        .iter()
        .position(|n| *n == lower)
        .map(|i| spec.min + i as u32)
        .ok_or_else(|| format!("unknown value {token:?} in {} field", spec.name))
}

/// Parses `90s`, `15m`, `1h30m`, `1.5h`, `500ms`. Positive sub-second
/// intervals are raised to one second.
fn parse_interval(text: &str) -> std::result::Result<StdDuration, String> {
    if text.is_empty() {
        return Err("@every needs a duration, e.g. @every 5m".to_string());
    }

    let mut total_ms = 0f64;
    let mut rest = text;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| format!("duration {text:?} is missing a unit"))?;
        let (num, tail) = rest.split_at(num_len);
        let amount: f64 = num
            .parse()
            .map_err(|_| format!("bad number in duration {text:?}"))?;

        let (unit_ms, unit_len) = if tail.starts_with("ms") {
            (1.0, 2)
        } else if tail.starts_with('h') {
            (3_600_000.0, 1)
        } else if tail.starts_with('m') {
            (60_000.0, 1)
        } else if tail.starts_with('s') {
            (1_000.0, 1)
        } else {
            return Err(format!("unknown unit in duration {text:?}"));
        };
        total_ms += amount * unit_ms;
        rest = &tail[unit_len..];
    }

    if total_ms <= 0.0 {
        return Err(format!("duration {text:?} must be positive"));
    }
    let secs = (total_ms / 1000.0).floor().max(1.0);
    Ok(StdDuration::from_secs(secs as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    fn next(expr: &str, after: DateTime<Utc>) -> DateTime<Utc> {
        Schedule::parse(expr).unwrap().next_after(after).unwrap()
    }

    #[test]
    fn six_field_every_five_minutes() {
        let after = at(2024, 3, 1, 10, 2, 30);
        assert_eq!(next("0 */5 * * * *", after), at(2024, 3, 1, 10, 5, 0));
        assert_eq!(
            next("0 */5 * * * *", at(2024, 3, 1, 10, 5, 0)),
            at(2024, 3, 1, 10, 10, 0)
        );
    }

    #[test]
    fn five_fields_fire_on_second_zero() {
        let after = at(2024, 3, 1, 10, 2, 30);
        assert_eq!(next("*/15 * * * *", after), at(2024, 3, 1, 10, 15, 0));
    }

    #[test]
    fn every_second() {
        let after = at(2024, 3, 1, 10, 0, 0);
        assert_eq!(next("* * * * * *", after), at(2024, 3, 1, 10, 0, 1));
    }

    #[test]
    fn rolls_over_year_end() {
        let after = at(2024, 12, 31, 23, 59, 59);
        assert_eq!(next("@hourly", after), at(2025, 1, 1, 0, 0, 0));
        assert_eq!(next("@yearly", after), at(2025, 1, 1, 0, 0, 0));
    }

    #[test]
    fn descriptors() {
        let after = at(2024, 3, 6, 12, 0, 0); // Wednesday
        assert_eq!(next("@daily", after), at(2024, 3, 7, 0, 0, 0));
        assert_eq!(next("@midnight", after), at(2024, 3, 7, 0, 0, 0));
        assert_eq!(next("@weekly", after), at(2024, 3, 10, 0, 0, 0));
        assert_eq!(next("@monthly", after), at(2024, 4, 1, 0, 0, 0));
        assert_eq!(next("@annually", after), at(2025, 1, 1, 0, 0, 0));
    }

    #[test]
    fn names_ranges_and_lists() {
        // Weekdays at 09:30.
        let after = at(2024, 3, 8, 10, 0, 0); // Friday after 09:30
        assert_eq!(next("0 30 9 * * MON-FRI", after), at(2024, 3, 11, 9, 30, 0));
        assert_eq!(next("0 0 8,20 * jun *", after), at(2024, 6, 1, 8, 0, 0));
        assert_eq!(next("0 0 0 1 ? *", after), at(2024, 4, 1, 0, 0, 0));
    }

    #[test]
    fn start_with_step_runs_to_field_end() {
        let after = at(2024, 3, 1, 10, 50, 0);
        assert_eq!(next("0 5/20 * * * *", after), at(2024, 3, 1, 11, 5, 0));
        assert_eq!(next("0 5/20 * * * *", at(2024, 3, 1, 10, 30, 0)), at(2024, 3, 1, 10, 45, 0));
    }

    #[test]
    fn restricted_day_fields_combine_with_or() {
        // 15th of the month or any Monday.
        let after = at(2024, 3, 6, 0, 0, 0); // Wednesday
        assert_eq!(next("0 0 0 15 * 1", after), at(2024, 3, 11, 0, 0, 0));
        assert_eq!(next("0 0 0 15 * 1", at(2024, 3, 11, 0, 0, 0)), at(2024, 3, 15, 0, 0, 0));
    }

    #[test]
    fn impossible_date_never_fires() {
        let schedule = Schedule::parse("0 0 0 30 2 *").unwrap();
        assert_eq!(schedule.next_after(at(2024, 1, 1, 0, 0, 0)), None);
    }

    #[test]
    fn every_intervals() {
        assert_eq!(
            Schedule::parse("@every 1h30m").unwrap(),
            Schedule::Every(StdDuration::from_secs(5400))
        );
        assert_eq!(
            Schedule::parse("@every 90s").unwrap(),
            Schedule::Every(StdDuration::from_secs(90))
        );
        assert_eq!(
            Schedule::parse("@every 1.5m").unwrap(),
            Schedule::Every(StdDuration::from_secs(90))
        );
        assert_eq!(
            Schedule::parse("@every 200ms").unwrap(),
            Schedule::Every(StdDuration::from_secs(1))
        );
        let after = at(2024, 3, 1, 10, 0, 0);
        assert_eq!(next("@every 10m", after), at(2024, 3, 1, 10, 10, 0));
    }

    #[test]
    fn rejects_malformed_expressions() {
        for bad in [
            "",
            "   ",
            "* * * *",
            "* * * * * * *",
            "60 * * * * *",
            "* * 24 * * *",
            "* * * 0 * *",
            "* * * * 13 *",
            "* * * * * 7",
            "*/0 * * * * *",
            "5-1 * * * * *",
            "* * * * foo *",
            "@fortnightly",
            "@every",
            "@every 0s",
            "@every 10",
            "@every 5x",
            "@daily 5",
        ] {
            let err = Schedule::parse(bad);
            assert!(err.is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn error_names_the_expression() {
        let err = Schedule::parse("not a cron").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("not a cron"), "{msg}");
    }
}
