// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolution of relative date and clock-time expressions.
//!
//! Recognizes English and Portuguese phrasing:
//! - day offsets: "today"/"hoje", "tomorrow"/"amanhã", "day after tomorrow"/
//!   "depois de amanhã", "in N days"/"em N dias"/"daqui a N dias";
//! - weekdays: "monday", "next friday", "segunda-feira", "próxima sexta";
//! - absolute ISO dates (`YYYY-MM-DD`);
//! - clock times: "14:25", "14h25", "14h", "2pm", "2:30 pm".
//!
//! Matching is case- and accent-insensitive. When a text holds several date
//! expressions, the last one wins. Resolution never fails: anything
//! unrecognized falls back to the reference date and an empty time.

use std::sync::LazyLock;

use chrono::{Datelike, Days, Local, NaiveDate, NaiveDateTime, Weekday};
use regex::{Captures, Regex};

static DATE_EXPRESSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        \b(?P<after_tomorrow>day\s+after\s+tomorrow|depois\s+de\s+amanha)\b
        | \b(?P<tomorrow>tomorrow|amanha)\b
        | \b(?P<today>today|hoje)\b
        | \b(?:in|em|daqui\s+a)\s+(?P<days>\d{1,3})\s+(?:days?|dias?)\b
        | \b(?P<weekday>monday|tuesday|wednesday|thursday|friday|saturday|sunday
            |segunda|terca|quarta|quinta|sexta|sabado|domingo)\b
        | \b(?P<iso>\d{4}-\d{2}-\d{2})\b
        ",
    )
    .expect("date expression regex is valid")
});

static TIME_EXPRESSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        \b(?P<h12>1[0-2]|0?[1-9])(?::(?P<m12>[0-5]\d))?\s*(?P<meridiem>am|pm)\b
        | \b(?P<hour>[01]?\d|2[0-3])\s*(?:[:h]\s*(?P<minute>[0-5]\d)\b|(?:h|hrs?|horas?)\b)
        ",
    )
    .expect("time expression regex is valid")
});

static CANONICAL_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[01]\d|2[0-3]):[0-5]\d$").expect("canonical time regex is valid")
});

/// The reference instant every resolution in one call is anchored to.
///
/// Captured once per pipeline run and passed explicitly; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemporalContext {
    now: NaiveDateTime,
}

impl TemporalContext {
    /// Capture the current local wall-clock time.
    pub fn capture() -> Self {
        Self::at(Local::now().naive_local())
    }

    pub fn at(now: NaiveDateTime) -> Self {
        Self { now }
    }

    /// Anchor to midnight of the given date.
    pub fn on(date: NaiveDate) -> Self {
        Self::at(date.and_time(chrono::NaiveTime::MIN))
    }

    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date()
    }

    pub fn today_iso(&self) -> String {
        self.today().format("%Y-%m-%d").to_string()
    }

    /// English weekday name of the reference date, e.g. "Monday".
    pub fn weekday_name(&self) -> &'static str {
        weekday_name(self.today().weekday())
    }

    /// The reference date shifted by `days`.
    pub fn plus_days(&self, days: u64) -> NaiveDate {
        self.today()
            .checked_add_days(Days::new(days))
            .unwrap_or(self.today())
    }

    /// Resolve an expression against this context.
    pub fn resolve(&self, expression: &str) -> Resolution {
        resolve(self.now, expression)
    }
}

/// Absolute date plus optional clock time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub date: NaiveDate,
    /// `"hh:mm"` or empty.
    pub time: String,
}

/// Resolve `expression` relative to `reference`.
pub fn resolve(reference: NaiveDateTime, expression: &str) -> Resolution {
    let ctx = TemporalContext::at(reference);
    Resolution {
        date: resolve_date(&ctx, expression).unwrap_or_else(|| ctx.today()),
        time: resolve_time(expression).unwrap_or_default(),
    }
}

/// The date named by the last recognized date expression, if any.
pub fn resolve_date(ctx: &TemporalContext, expression: &str) -> Option<NaiveDate> {
    let text = normalize(expression);
    DATE_EXPRESSION
        .captures_iter(&text)
        .filter_map(|caps| date_from_captures(ctx, &caps))
        .last()
}

/// The clock time named by the last recognized time expression, as `"hh:mm"`.
pub fn resolve_time(expression: &str) -> Option<String> {
    let text = normalize(expression);
    TIME_EXPRESSION
        .captures_iter(&text)
        .filter_map(|caps| time_from_captures(&caps))
        .last()
}

/// Whether `time` is already in canonical zero-padded `"hh:mm"` form.
pub fn is_canonical_time(time: &str) -> bool {
    CANONICAL_TIME.is_match(time)
}

/// Parse a strict ISO calendar date.
pub fn parse_iso_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").ok()
}

fn date_from_captures(ctx: &TemporalContext, caps: &Captures<'_>) -> Option<NaiveDate> {
    if caps.name("today").is_some() {
        return Some(ctx.today());
    }
    if caps.name("tomorrow").is_some() {
        return Some(ctx.plus_days(1));
    }
    if caps.name("after_tomorrow").is_some() {
        return Some(ctx.plus_days(2));
    }
    if let Some(days) = caps.name("days") {
        return days.as_str().parse::<u64>().ok().map(|n| ctx.plus_days(n));
    }
    if let Some(name) = caps.name("weekday") {
        let target = parse_weekday(name.as_str())?;
        return Some(ctx.plus_days(days_until(ctx.today().weekday(), target)));
    }
    caps.name("iso").and_then(|iso| parse_iso_date(iso.as_str()))
}

fn time_from_captures(caps: &Captures<'_>) -> Option<String> {
    if let Some(hour) = caps.name("h12") {
        let hour: u32 = hour.as_str().parse().ok()?;
        let minute: u32 = match caps.name("m12") {
            Some(m) => m.as_str().parse().ok()?,
            None => 0,
        };
        let pm = caps.name("meridiem").is_some_and(|m| m.as_str() == "pm");
        let hour = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, true) => h + 12,
            (h, false) => h,
        };
        return Some(format!("{hour:02}:{minute:02}"));
    }
    let hour: u32 = caps.name("hour")?.as_str().parse().ok()?;
    let minute: u32 = match caps.name("minute") {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    Some(format!("{hour:02}:{minute:02}"))
}

/// Days from `from` to the next `target`, strictly in the future (1..=7).
fn days_until(from: Weekday, target: Weekday) -> u64 {
    let offset =
        (7 + target.num_days_from_monday() - from.num_days_from_monday()) % 7;
    if offset == 0 { 7 } else { u64::from(offset) }
}

fn parse_weekday(name: &str) -> Option<Weekday> {
    Some(match name {
        "monday" | "segunda" => Weekday::Mon,
        "tuesday" | "terca" => Weekday::Tue,
        "wednesday" | "quarta" => Weekday::Wed,
        "thursday" | "quinta" => Weekday::Thu,
        "friday" | "sexta" => Weekday::Fri,
        "saturday" | "sabado" => Weekday::Sat,
        "sunday" | "domingo" => Weekday::Sun,
        _ => return None,
    })
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Lowercase and fold the Portuguese diacritics to ASCII.
fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}
