///! Small formatting helpers used when presenting products

use chrono::{DateTime, NaiveDate};

/// One of the five rating positions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StarFill {
    Full,
    Half,
    Empty,
}

impl StarFill {
    pub fn symbol(&self) -> char {
        match self {
            StarFill::Full => '★',
            StarFill::Half => '⯪',
            StarFill::Empty => '☆',
        }
    }
}

/// Breaks a 0-5 rating into five star positions.
pub fn star_breakdown(rating: f64) -> [StarFill; 5] {
    let rating = if rating.is_finite() { rating } else { 0.0 };
    std::array::from_fn(|idx| {
        let position = (idx + 1) as f64;
        if position <= rating {
            StarFill::Full
        } else if position - 0.5 <= rating {
            StarFill::Half
        } else {
            StarFill::Empty
        }
    })
}

pub fn truncate_title(title: Option<&str>, max_chars: usize) -> String {
    let title = match title {
        Some(t) if !t.trim().is_empty() => t,
        _ => return "Unknown Product".to_string(),
    };

    if title.chars().count() > max_chars {
        let head: String = title.chars().take(max_chars).collect();
        format!("{}...", head)
    } else {
        title.to_string()
    }
}

/// Formats review dates as "Mar 5, 2024".
///
/// Amazon sends dates like "Reviewed in the United States on March 5, 2024";
/// anything unparseable is returned unchanged.
pub fn format_review_date(date: Option<&str>) -> String {
    let raw = match date.map(str::trim) {
        Some(d) if !d.is_empty() => d,
        _ => return "N/A".to_string(),
    };

    let candidate = raw.rsplit_once(" on ").map(|(_, tail)| tail).unwrap_or(raw);
    match parse_date(candidate) {
        Some(parsed) => parsed.format("%b %-d, %Y").to_string(),
        None => raw.to_string(),
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    ["%Y-%m-%d", "%B %d, %Y", "%b %d, %Y", "%d %B %Y", "%m/%d/%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Percentage saved going from `original` to `current`, both price strings.
pub fn discount_percent(original: &str, current: &str) -> Option<u32> {
    let original = parse_price(original)?;
    let current = parse_price(current)?;
    if original <= 0.0 || current >= original {
        return None;
    }
    Some((((original - current) / original) * 100.0).round() as u32)
}

fn parse_price(s: &str) -> Option<f64> {
    let digits: String = s.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
    digits.parse().ok()
}
