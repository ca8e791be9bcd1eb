//! Parsing of human-readable counts and timestamps.
//!
//! Engagement counts show up as `1.2K`, `5,300`, `12 comments`; post times
//! as `3 hours ago`, `5h`, `Yesterday at 9:14 PM`, `Monday`, ISO strings or
//! epoch seconds. Neither parser ever fails: [`parse_count`] returns `0`
//! and [`parse_time`] returns `None` when nothing recognisable is found,
//! and the caller substitutes its default.

use super::patterns::{
    ARTICLE_RELATIVE_TIME, BARE_COUNT, EPOCH, GROUPED_COUNT, MONTH_DAY, RELATIVE_TIME,
    SUFFIX_COUNT,
};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday};

/// Parse a free-form count.
///
/// Recognised, in priority order:
/// 1. suffix notation `<n>[.<decimals>]<K|M|B>` (case-insensitive), truncated
/// 2. comma-grouped integers (`1,234`)
/// 3. bare digit runs
///
/// Returns `0` when no number is present. Callers must read `0` as
/// "not found".
///
/// # Examples
///
/// ```
/// use group_post_scraper::extract::metrics::parse_count;
/// assert_eq!(parse_count("1.2K"), 1200);
/// assert_eq!(parse_count("5,300"), 5300);
/// assert_eq!(parse_count("no numbers here"), 0);
/// ```
pub fn parse_count(text: &str) -> u64 {
    if let Some(caps) = SUFFIX_COUNT.captures(text) {
        let whole = caps[1].parse::<u64>().unwrap_or(0);
        let multiplier: u64 = match caps[3].to_ascii_lowercase().as_str() {
            "k" => 1_000,
            "m" => 1_000_000,
            _ => 1_000_000_000,
        };
        // Integer arithmetic keeps `1.2K` at exactly 1200.
        let fraction = caps
            .get(2)
            .map(|m| scale_fraction(m.as_str(), multiplier))
            .unwrap_or(0);
        return whole.saturating_mul(multiplier).saturating_add(fraction);
    }

    if let Some(m) = GROUPED_COUNT.find(text) {
        let digits: String = m.as_str().chars().filter(char::is_ascii_digit).collect();
        if let Ok(n) = digits.parse::<u64>() {
            return n;
        }
    }

    BARE_COUNT
        .find(text)
        .and_then(|m| m.as_str().parse::<u64>().ok())
        .unwrap_or(0)
}

/// `digits` are the decimals after the point; returns `0.digits * multiplier`
/// truncated.
fn scale_fraction(digits: &str, multiplier: u64) -> u64 {
    // Anything past nine decimals cannot change the result for B.
    let digits = &digits[..digits.len().min(9)];
    let numerator = digits.parse::<u64>().unwrap_or(0);
    let denominator = 10u64.pow(digits.len() as u32);
    numerator.saturating_mul(multiplier) / denominator
}

/// Fixed duration of one unit; months are 30 days and years 365.
fn unit_duration(unit: &str) -> Option<Duration> {
    let unit = unit.to_ascii_lowercase();
    let d = match unit.as_str() {
        "s" | "sec" | "secs" | "second" | "seconds" => Duration::seconds(1),
        "m" | "min" | "mins" | "minute" | "minutes" => Duration::minutes(1),
        "h" | "hr" | "hrs" | "hour" | "hours" => Duration::hours(1),
        "d" | "day" | "days" => Duration::days(1),
        "w" | "wk" | "wks" | "week" | "weeks" => Duration::weeks(1),
        "mo" | "mos" | "month" | "months" => Duration::days(30),
        "y" | "yr" | "yrs" | "year" | "years" => Duration::days(365),
        _ => return None,
    };
    Some(d)
}

const WEEKDAYS: [(&str, Weekday); 7] = [
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
];

/// Parse a relative or absolute post time against `now`.
///
/// Recognised forms:
/// - epoch integers (9-11 digits seconds, 12-13 digits milliseconds)
/// - ISO-8601 / RFC 3339 datetimes and plain `YYYY-MM-DD` dates
/// - `just now` / `now`
/// - `N <unit>(s) ago` and shorthand like `5h`, `3d`, `2 wks`
/// - `a minute ago`, `an hour ago`
/// - `today`, `yesterday`
/// - weekday names: the most recent past occurrence; the same weekday as
///   today means seven days ago
/// - month-day forms (`January 2`, `Jan 2 at 3:04 pm`, `March 5, 2024`)
///
/// Returns `None` when nothing matches.
pub fn parse_time(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if EPOCH.is_match(trimmed) {
        let raw = trimmed.parse::<i64>().ok()?;
        return if trimmed.len() >= 12 {
            Utc.timestamp_millis_opt(raw).single()
        } else {
            Utc.timestamp_opt(raw, 0).single()
        };
    }

    if let Some(t) = parse_iso(trimmed) {
        return Some(t);
    }

    let lower = trimmed.to_lowercase();

    if lower == "now" || lower.contains("just now") {
        return Some(now);
    }

    if let Some(caps) = RELATIVE_TIME.captures(&lower) {
        let n = caps[1].parse::<i32>().ok()?;
        let unit = unit_duration(&caps[2])?;
        return now.checked_sub_signed(unit * n);
    }

    if let Some(caps) = ARTICLE_RELATIVE_TIME.captures(&lower) {
        let unit = unit_duration(&caps[1])?;
        return now.checked_sub_signed(unit);
    }

    if lower.contains("yesterday") {
        return now.checked_sub_signed(Duration::hours(24));
    }
    if lower.contains("today") {
        return Some(now);
    }

    if let Some((_, weekday)) = WEEKDAYS.iter().find(|(name, _)| lower.contains(name)) {
        return Some(most_recent_weekday(*weekday, now));
    }

    parse_month_day(&lower, now)
}

/// Most recent occurrence of `weekday` strictly before today.
fn most_recent_weekday(weekday: Weekday, now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.weekday().num_days_from_monday() as i64;
    let target = weekday.num_days_from_monday() as i64;
    let mut diff = (today - target).rem_euclid(7);
    if diff == 0 {
        diff = 7;
    }
    now - Duration::days(diff)
}

fn parse_iso(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(text) {
        return Some(t.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%dT%H:%M:%S%.f%z"] {
        if let Ok(t) = DateTime::parse_from_str(text, format) {
            return Some(t.with_timezone(&Utc));
        }
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&t));
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(|d| Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN)))
}

fn parse_month_day(lower: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let caps = MONTH_DAY.captures(lower)?;
    let month = match &caps[1] {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        _ => 12,
    };
    let day = caps[2].parse::<u32>().ok()?;
    let explicit_year = caps.get(3).and_then(|m| m.as_str().parse::<i32>().ok());

    let (mut hour, minute) = match (caps.get(4), caps.get(5)) {
        (Some(h), Some(m)) => (h.as_str().parse::<u32>().ok()?, m.as_str().parse::<u32>().ok()?),
        _ => (0, 0),
    };
    match caps.get(6).map(|m| m.as_str()) {
        Some("pm") if hour < 12 => hour += 12,
        Some("am") if hour == 12 => hour = 0,
        _ => {}
    }

    let build = |year: i32| {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(hour, minute, 0))
            .map(|t| Utc.from_utc_datetime(&t))
    };

    match explicit_year {
        Some(year) => build(year),
        None => {
            let candidate = build(now.year())?;
            if candidate > now {
                build(now.year() - 1)
            } else {
                Some(candidate)
            }
        }
    }
}
