//! Relative time phrases to concrete date windows.
//!
//! Planners write `"time": "this weekend"`; tools want dates. The
//! interpreter recognises a small fixed vocabulary relative to a base
//! instant (normally `now_iso` from memory) and returns a [`DateWindow`].
//! Anything else is left for the caller to pass through untouched.

use chrono::{DateTime, Datelike, Days, Local, NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Inclusive date range, serialized as `{"start_date": "YYYY-MM-DD", "end_date": ...}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl DateWindow {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
        }
    }

    pub fn day(date: NaiveDate) -> Self {
        Self::new(date, date)
    }

    pub fn to_value(&self) -> Value {
        json!({
            "start_date": self.start_date.format("%Y-%m-%d").to_string(),
            "end_date": self.end_date.format("%Y-%m-%d").to_string(),
        })
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    /// Midpoint of the window, rounding down. Reversed windows are reordered.
    pub fn center(&self) -> NaiveDate {
        let (start, end) = if self.start_date <= self.end_date {
            (self.start_date, self.end_date)
        } else {
            (self.end_date, self.start_date)
        };
        let span = (end - start).num_days().max(0) as u64;
        start.checked_add_days(Days::new(span / 2)).unwrap_or(start)
    }
}

/// Parse an ISO-8601 date-time or date.
pub fn parse_base_instant(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn weekday_from_name(name: &str) -> Option<Weekday> {
    Some(match name {
        "mon" | "monday" => Weekday::Mon,
        "tue" | "tues" | "tuesday" => Weekday::Tue,
        "wed" | "wednesday" => Weekday::Wed,
        "thu" | "thurs" | "thursday" => Weekday::Thu,
        "fri" | "friday" => Weekday::Fri,
        "sat" | "saturday" => Weekday::Sat,
        "sun" | "sunday" => Weekday::Sun,
        _ => return None,
    })
}

/// Interpret `phrase` relative to `now_iso`, or the local clock when
/// `now_iso` is absent or unparsable.
pub fn interpret(phrase: &str, now_iso: Option<&str>) -> Option<DateWindow> {
    let base = now_iso
        .and_then(parse_base_instant)
        .map(|dt| dt.date())
        .unwrap_or_else(|| Local::now().date_naive());
    interpret_at(phrase, base)
}

/// Interpret `phrase` relative to a fixed base date.
///
/// ```
/// use chrono::NaiveDate;
/// use proact_rs::agent::time_phrase::interpret_at;
///
/// let saturday = NaiveDate::from_ymd_opt(2025, 9, 13).unwrap();
/// let window = interpret_at("next monday", saturday).unwrap();
/// assert_eq!(window.start_date, NaiveDate::from_ymd_opt(2025, 9, 22).unwrap());
/// ```
pub fn interpret_at(phrase: &str, base: NaiveDate) -> Option<DateWindow> {
    let phrase = phrase.trim().to_lowercase();
    let words: Vec<&str> = phrase.split_whitespace().collect();
    let offset = u64::from(base.weekday().num_days_from_monday());

    match words.as_slice() {
        ["today"] => Some(DateWindow::day(base)),
        ["yesterday"] => base.pred_opt().map(DateWindow::day),
        ["tomorrow"] => base.succ_opt().map(DateWindow::day),
        ["this", "week"] => {
            let monday = base.checked_sub_days(Days::new(offset))?;
            let sunday = monday.checked_add_days(Days::new(6))?;
            Some(DateWindow::new(monday, sunday))
        }
        ["this", "weekend"] => {
            // Sunday of the current week; on a Sunday that is today.
            let sunday = base.checked_add_days(Days::new(6 - offset))?;
            let saturday = sunday.pred_opt()?;
            Some(DateWindow::new(saturday, sunday))
        }
        [day] => weekday_window(base, day, false),
        ["this", day] => weekday_window(base, day, false),
        ["next", day] => weekday_window(base, day, true),
        _ => None,
    }
}

fn weekday_window(base: NaiveDate, name: &str, next_week: bool) -> Option<DateWindow> {
    let target = weekday_from_name(name)?;
    let today = base.weekday().num_days_from_monday();
    let mut ahead = u64::from((target.num_days_from_monday() + 7 - today) % 7);
    if next_week {
        ahead += 7;
    }
    base.checked_add_days(Days::new(ahead)).map(DateWindow::day)
}
