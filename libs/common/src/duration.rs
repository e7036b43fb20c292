//! Duration strings such as `15m` or `7d`, as used in configuration.

const MS: f64 = 1.0;
const SECOND: f64 = 1000.0 * MS;
const MINUTE: f64 = 60.0 * SECOND;
const HOUR: f64 = 60.0 * MINUTE;
const DAY: f64 = 24.0 * HOUR;
const WEEK: f64 = 7.0 * DAY;
const YEAR: f64 = 365.0 * DAY;

/// Parse a duration string into milliseconds.
///
/// A bare integer is taken as milliseconds. Otherwise the input must be a
/// number followed by one of `ms`, `s`, `m`, `h`, `d`, `w` or `y`
/// (whitespace between them is allowed). Anything else yields `fallback_ms`.
pub fn parse_duration_ms(input: Option<&str>, fallback_ms: i64) -> i64 {
    let Some(input) = input else {
        return fallback_ms;
    };
    let s = input.trim().to_ascii_lowercase();

    if let Ok(ms) = s.parse::<i64>() {
        return ms;
    }

    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split);

    if number.is_empty() || number.ends_with('.') || number.matches('.').count() > 1 {
        return fallback_ms;
    }
    let Ok(value) = number.parse::<f64>() else {
        return fallback_ms;
    };

    let multiplier = match unit.trim_start() {
        "ms" => MS,
        "s" => SECOND,
        "m" => MINUTE,
        "h" => HOUR,
        "d" => DAY,
        "w" => WEEK,
        "y" => YEAR,
        _ => return fallback_ms,
    };

    (value * multiplier).round() as i64
}

/// Read a duration from an environment variable, in milliseconds.
pub fn duration_ms_from_env(name: &str, fallback_ms: i64) -> i64 {
    parse_duration_ms(std::env::var(name).ok().as_deref(), fallback_ms)
}
