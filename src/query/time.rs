//! Year, range and month extraction from question text.
//!
//! All extracted years are validated against the domain's year bounds;
//! out-of-range years are ignored rather than clamped, so a question about
//! 1850 simply carries no time filter. Range language always wins over a
//! bare year appearing elsewhere in the question.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::Domain;

use super::types::TimeFilter;

// Range connectors: "between 2010 and 2015", "from 2010 to 2015",
// "2010 to 2015", "2010-2015", "2010–2015".
static RANGE_BETWEEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)between\s+(\d{4})\s+and\s+(\d{4})").expect("Invalid regex")
});
static RANGE_FROM_TO_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:from\s+)?(\d{4})\s+(?:to|through|until)\s+(\d{4})").expect("Invalid regex")
});
static RANGE_DASH_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})\s*[-–]\s*(\d{4})").expect("Invalid regex"));

// Directional phrases become bounded ranges against the domain's limits.
static SINCE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)since\s+(\d{4})").expect("Invalid regex"));
static AFTER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)after\s+(\d{4})").expect("Invalid regex"));
static BEFORE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)before\s+(\d{4})").expect("Invalid regex"));
static UNTIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:until|up\s+to)\s+(\d{4})").expect("Invalid regex"));

static BARE_YEAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})\b").expect("Invalid regex"));

const MONTHS: [(&str, u8); 12] = [
    ("january", 1),
    ("february", 2),
    ("march", 3),
    ("april", 4),
    ("may", 5),
    ("june", 6),
    ("july", 7),
    ("august", 8),
    ("september", 9),
    ("october", 10),
    ("november", 11),
    ("december", 12),
];

/// Extract the time filter from a question, bounded by the domain's years.
pub fn extract_time(question: &str, domain: Domain) -> Option<TimeFilter> {
    let (min, max) = domain.year_bounds();
    let in_bounds = |y: u16| (min..=max).contains(&y);

    for pattern in [&RANGE_BETWEEN_PATTERN, &RANGE_FROM_TO_PATTERN, &RANGE_DASH_PATTERN] {
        if let Some(caps) = pattern.captures(question) {
            let a: u16 = caps[1].parse().ok()?;
            let b: u16 = caps[2].parse().ok()?;
            let (start, end) = if a <= b { (a, b) } else { (b, a) };
            if in_bounds(start) && in_bounds(end) {
                return Some(TimeFilter::range(start, end));
            }
            return None;
        }
    }

    if let Some(caps) = SINCE_PATTERN.captures(question) {
        let y: u16 = caps[1].parse().ok()?;
        return in_bounds(y).then(|| TimeFilter::range(y, max));
    }
    if let Some(caps) = AFTER_PATTERN.captures(question) {
        let y: u16 = caps[1].parse().ok()?;
        return (in_bounds(y) && y < max).then(|| TimeFilter::range(y + 1, max));
    }
    if let Some(caps) = BEFORE_PATTERN.captures(question) {
        let y: u16 = caps[1].parse().ok()?;
        return (in_bounds(y) && y > min).then(|| TimeFilter::range(min, y - 1));
    }
    if let Some(caps) = UNTIL_PATTERN.captures(question) {
        let y: u16 = caps[1].parse().ok()?;
        return in_bounds(y).then(|| TimeFilter::range(min, y));
    }

    // First in-bounds bare year wins; later out-of-bounds digits are noise.
    let year = BARE_YEAR_PATTERN
        .captures_iter(question)
        .filter_map(|caps| caps[1].parse::<u16>().ok())
        .find(|y| in_bounds(*y))?;

    Some(TimeFilter::Point {
        year,
        month: extract_month(question, year),
    })
}

/// Month named right next to the year ("March 1998", "March of 1998",
/// "1998 March"). Month words elsewhere in the question are not time
/// language ("what may the temperature be").
fn extract_month(question: &str, year: u16) -> Option<u8> {
    let year_text = year.to_string();
    let words: Vec<String> = question
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();
    let pos = words.iter().position(|w| *w == year_text)?;

    let before = pos.checked_sub(1).map(|i| {
        if words[i] == "of" && i > 0 {
            words[i - 1].as_str()
        } else {
            words[i].as_str()
        }
    });
    let after = words.get(pos + 1).map(String::as_str);
    before
        .and_then(month_number)
        .or_else(|| after.and_then(month_number))
}

fn month_number(word: &str) -> Option<u8> {
    MONTHS
        .iter()
        .find(|(name, _)| word == *name || (word.len() >= 3 && name.starts_with(word)))
        .map(|(_, number)| *number)
}
