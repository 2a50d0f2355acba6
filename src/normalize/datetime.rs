use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Timelike};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Days a yearless date may fall behind the reference date before it is
/// read as next year's.
const ROLLOVER_GRACE_DAYS: i64 = 30;

// "Tue, 10 Jun 2025 18:00"
static SHORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z]+),\s+(\d{1,2})\s+([A-Za-z]{3})\s+(\d{4})\s+(\d{1,2}):(\d{2})")
        .expect("valid short datetime regex")
});

// "Friday, June 13 · 5:30 - 8:30pm GMT+1"
static LONG_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"([A-Za-z]+),\s+([A-Za-z]+)\s+(\d{1,2})\s*·\s*(\d{1,2})(?::(\d{2}))?\s*([AaPp][Mm])?\s*[-–]\s*(\d{1,2})(?::(\d{2}))?\s*([AaPp][Mm])?",
    )
    .expect("valid long range regex")
});

// "September 30 · 10am - October 1 · 4pm GMT+1"
static DAYLESS_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z]+)\s+(\d{1,2})\s*·\s*(\d{1,2})(?::(\d{2}))?\s*([AaPp][Mm])?")
        .expect("valid dayless range regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventDateTime {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl EventDateTime {
    pub fn date_string(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    pub fn time_string(&self) -> String {
        self.time.format("%H:%M").to_string()
    }
}

/// Outcome of trying one datetime shape against a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeMatch {
    NoMatch,
    /// The pattern matched but the values do not form a real date or time.
    Invalid,
    Parsed(EventDateTime),
}

pub struct DatetimeShape {
    pub name: &'static str,
    pub parse: fn(&str, NaiveDate) -> ShapeMatch,
}

/// Tried in order; the first shape whose pattern matches decides the result.
pub const SHAPES: [DatetimeShape; 3] = [
    DatetimeShape {
        name: "short",
        parse: parse_short,
    },
    DatetimeShape {
        name: "long_range",
        parse: parse_long_range,
    },
    DatetimeShape {
        name: "dayless_range",
        parse: parse_dayless_range,
    },
];

/// Parses a free-text event datetime. `reference` supplies the year for
/// shapes that omit it.
pub fn parse_datetime_text(text: &str, reference: NaiveDate) -> Option<EventDateTime> {
    let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        return None;
    }
    for shape in SHAPES.iter() {
        match (shape.parse)(&cleaned, reference) {
            ShapeMatch::NoMatch => continue,
            ShapeMatch::Invalid => {
                log::debug!("{} datetime shape matched invalid values: {cleaned}", shape.name);
                return None;
            }
            ShapeMatch::Parsed(value) => return Some(value),
        }
    }
    None
}

pub fn parse_short(text: &str, _reference: NaiveDate) -> ShapeMatch {
    let Some(caps) = SHORT_RE.captures(text) else {
        return ShapeMatch::NoMatch;
    };
    let parsed = (|| {
        let day = number(&caps, 2)?;
        let month = month_number(caps.get(3)?.as_str())?;
        let year = caps.get(4)?.as_str().parse::<i32>().ok()?;
        let hour = number(&caps, 5)?;
        let minute = number(&caps, 6)?;
        Some(EventDateTime {
            date: NaiveDate::from_ymd_opt(year, month, day)?,
            time: NaiveTime::from_hms_opt(hour, minute, 0)?,
        })
    })();
    into_match(parsed)
}

pub fn parse_long_range(text: &str, reference: NaiveDate) -> ShapeMatch {
    let Some(caps) = LONG_RANGE_RE.captures(text) else {
        return ShapeMatch::NoMatch;
    };
    let parsed = (|| {
        let month = month_number(caps.get(2)?.as_str())?;
        let day = number(&caps, 3)?;
        let start_hour = number(&caps, 4)?;
        let start_minute = optional_minute(&caps, 5)?;
        let start_period = period(&caps, 6);
        let end_hour = number(&caps, 7)?;
        let end_period = period(&caps, 9);

        let period = start_period.or(match end_period {
            Some(_) if start_hour > end_hour => Some(Period::Am),
            other => other,
        });
        let hour = to_24_hour(start_hour, period.unwrap_or(Period::Am));
        Some(EventDateTime {
            date: infer_date(month, day, reference)?,
            time: NaiveTime::from_hms_opt(hour, start_minute, 0)?,
        })
    })();
    into_match(parsed)
}

pub fn parse_dayless_range(text: &str, reference: NaiveDate) -> ShapeMatch {
    let Some(caps) = DAYLESS_RANGE_RE.captures(text) else {
        return ShapeMatch::NoMatch;
    };
    let parsed = (|| {
        let month = month_number(caps.get(1)?.as_str())?;
        let day = number(&caps, 2)?;
        let hour = number(&caps, 3)?;
        let minute = optional_minute(&caps, 4)?;
        let hour = to_24_hour(hour, period(&caps, 5).unwrap_or(Period::Am));
        Some(EventDateTime {
            date: infer_date(month, day, reference)?,
            time: NaiveTime::from_hms_opt(hour, minute, 0)?,
        })
    })();
    into_match(parsed)
}

/// Converts an RFC 3339 timestamp into local date and time in `tz`.
pub fn format_iso_datetime(iso: &str, tz: Tz) -> Option<EventDateTime> {
    let local = DateTime::parse_from_rfc3339(iso.trim()).ok()?.with_timezone(&tz);
    Some(EventDateTime {
        date: local.date_naive(),
        time: NaiveTime::from_hms_opt(local.hour(), local.minute(), 0)?,
    })
}

/// Validates a separate API date (`YYYY-MM-DD`) and time (`HH:MM[:SS]`).
/// Both must parse or neither is used.
pub fn parse_structured(date: Option<&str>, time: Option<&str>) -> Option<EventDateTime> {
    let date = NaiveDate::parse_from_str(date?.trim(), "%Y-%m-%d").ok()?;
    let time = time?.trim();
    let time = NaiveTime::parse_from_str(time, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M"))
        .ok()?;
    Some(EventDateTime {
        date,
        time: NaiveTime::from_hms_opt(time.hour(), time.minute(), 0)?,
    })
}

pub fn month_number(name: &str) -> Option<u32> {
    let month = match name {
        "January" | "Jan" => 1,
        "February" | "Feb" => 2,
        "March" | "Mar" => 3,
        "April" | "Apr" => 4,
        "May" => 5,
        "June" | "Jun" => 6,
        "July" | "Jul" => 7,
        "August" | "Aug" => 8,
        "September" | "Sep" => 9,
        "October" | "Oct" => 10,
        "November" | "Nov" => 11,
        "December" | "Dec" => 12,
        _ => return None,
    };
    Some(month)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Period {
    Am,
    Pm,
}

fn to_24_hour(hour: u32, period: Period) -> u32 {
    match period {
        Period::Pm if hour != 12 => hour + 12,
        Period::Am if hour == 12 => 0,
        _ => hour,
    }
}

/// Earliest occurrence of the month and day that is no more than the grace
/// window before `reference`. Looks back one year so a late-December date
/// read in early January stays in December.
fn infer_date(month: u32, day: u32, reference: NaiveDate) -> Option<NaiveDate> {
    let earliest = reference - Duration::days(ROLLOVER_GRACE_DAYS);
    let year = reference.year();
    (year - 1..=year + 1)
        .filter_map(|candidate| NaiveDate::from_ymd_opt(candidate, month, day))
        .find(|date| *date >= earliest)
}

fn into_match(parsed: Option<EventDateTime>) -> ShapeMatch {
    match parsed {
        Some(value) => ShapeMatch::Parsed(value),
        None => ShapeMatch::Invalid,
    }
}

fn number(caps: &Captures<'_>, index: usize) -> Option<u32> {
    caps.get(index)?.as_str().parse().ok()
}

fn optional_minute(caps: &Captures<'_>, index: usize) -> Option<u32> {
    match caps.get(index) {
        Some(m) => m.as_str().parse().ok(),
        None => Some(0),
    }
}

fn period(caps: &Captures<'_>, index: usize) -> Option<Period> {
    caps.get(index)
        .map(|m| match m.as_str().to_ascii_lowercase().as_str() {
            "pm" => Period::Pm,
            _ => Period::Am,
        })
}
