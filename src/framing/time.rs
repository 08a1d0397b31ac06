//! Timestamp parsing with a fixed ladder of layouts.
//!
//! Order: RFC 3339, a bare 4-digit year, the caller's layout, then every combination of the
//! common date layouts, separators and time layouts, then year-month layouts. The first layout
//! that parses wins. Layouts without an offset are read as UTC.
//!
//! Caller layouts containing `%` are `chrono` strftime formats. Anything else is read as a Go
//! reference-time layout (`2006-01-02 15:04:05`) and translated.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;

const DATE_LAYOUTS: [&str; 6] = [
    "2006-01-02",
    "2006-1-2",
    "2006/01/02",
    "2006/1/2",
    "01/02/2006",
    "1/2/2006",
];
const SEPARATORS: [&str; 2] = ["T", " "];
const TIME_LAYOUTS: [&str; 6] = [
    "",
    "15:04",
    "15:04:05.999999",
    "15:04:05.999999Z",
    "15:04:05.999999 -07:00",
    "15:04:05 MST",
];
const YEAR_MONTH_LAYOUTS: [&str; 4] = ["2006-01", "2006/01", "01-2006", "01/2006"];

static BUILTIN_LAYOUTS: Lazy<Vec<String>> = Lazy::new(|| {
    let mut layouts: Vec<String> = Vec::new();
    let mut push = |layout: String| {
        if !layouts.contains(&layout) {
            layouts.push(layout);
        }
    };
    for date in DATE_LAYOUTS {
        for time in TIME_LAYOUTS {
            if time.is_empty() {
                push(go_layout_to_strftime(date));
                continue;
            }
            for sep in SEPARATORS {
                push(go_layout_to_strftime(&format!("{date}{sep}{time}")));
            }
        }
    }
    for layout in YEAR_MONTH_LAYOUTS {
        push(go_layout_to_strftime(layout));
    }
    layouts
});

/// Parse a date/time string; `None` when no layout matches.
///
/// `time_format` of `None`, `""` or `"auto"` means no caller layout.
pub fn parse_timestamp(input: &str, time_format: Option<&str>) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(input) {
        return Some(t.with_timezone(&Utc));
    }
    if let Some(t) = parse_year(input) {
        return Some(t);
    }
    if let Some(custom) = time_format.filter(|f| !f.is_empty() && *f != "auto") {
        let fmt = if custom.contains('%') {
            custom.to_string()
        } else {
            go_layout_to_strftime(custom)
        };
        if let Some(t) = parse_with(input, &fmt) {
            return Some(t);
        }
    }
    BUILTIN_LAYOUTS.iter().find_map(|fmt| parse_with(input, fmt))
}

/// January 1st, midnight UTC, of a 4-digit year.
pub fn year_start(year: i32) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn parse_year(input: &str) -> Option<DateTime<Utc>> {
    if input.len() != 4 || !input.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    year_start(input.parse().ok()?)
}

fn parse_with(input: &str, fmt: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_str(input, fmt) {
        return Some(t.with_timezone(&Utc));
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(input, fmt) {
        return Some(t.and_utc());
    }
    let midnight = |d: NaiveDate| d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    if let Ok(d) = NaiveDate::parse_from_str(input, fmt) {
        return midnight(d);
    }
    // Year-month layouts carry no day.
    NaiveDate::parse_from_str(&format!("{input}|1"), &format!("{fmt}|%d"))
        .ok()
        .and_then(midnight)
}

// Longest tokens first so `2006` is not read as `2` + `006`.
const GO_TOKENS: [(&str, &str); 26] = [
    ("January", "%B"),
    ("Monday", "%A"),
    ("Z07:00", "%:z"),
    ("-07:00", "%:z"),
    ("Z0700", "%z"),
    ("-0700", "%z"),
    ("2006", "%Y"),
    ("Jan", "%b"),
    ("Mon", "%a"),
    ("MST", "%Z"),
    ("002", "%j"),
    ("_2", "%e"),
    ("15", "%H"),
    ("01", "%m"),
    ("02", "%d"),
    ("03", "%I"),
    ("04", "%M"),
    ("05", "%S"),
    ("06", "%y"),
    ("PM", "%p"),
    ("pm", "%P"),
    ("1", "%m"),
    ("2", "%d"),
    ("3", "%I"),
    ("4", "%M"),
    ("5", "%S"),
];

/// Translate a Go reference-time layout into a `chrono` strftime format.
///
/// Fractional seconds (`.000`, `.999999`) become the optional `%.f`.
pub fn go_layout_to_strftime(layout: &str) -> String {
    let mut out = String::with_capacity(layout.len() * 2);
    let mut rest = layout;
    'outer: while let Some(c) = rest.chars().next() {
        if (c == '.' || c == ',')
            && rest[1..].starts_with(['0', '9'])
            && rest[1..]
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .all(|d| d == '0' || d == '9')
        {
            let digits = rest[1..].chars().take_while(|c| *c == '0' || *c == '9').count();
            out.push_str("%.f");
            rest = &rest[1 + digits..];
            continue;
        }
        for (token, fmt) in GO_TOKENS {
            if let Some(after) = rest.strip_prefix(token) {
                out.push_str(fmt);
                rest = after;
                continue 'outer;
            }
        }
        if c == '%' {
            out.push_str("%%");
        } else {
            out.push(c);
        }
        rest = &rest[c.len_utf8()..];
    }
    out
}
