//! Scalar parsing shared by the instance readers and the `-D` parameters.
//!
//! Integers accept an optional sign and a `0x` (hex) or `0b` (binary)
//! prefix. Floats accept a trailing `f`/`F`.

fn split_radix(s: &str) -> (bool, u32, &str) {
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    if let Some(hex) = rest.strip_prefix("0x") {
        (negative, 16, hex)
    } else if let Some(bin) = rest.strip_prefix("0b") {
        (negative, 2, bin)
    } else {
        (negative, 10, rest)
    }
}

/// Parses a 32-bit signed integer.
///
/// ```
/// use u_cptp::parser::parse_i32;
///
/// assert_eq!(parse_i32("-0x10"), Some(-16));
/// assert_eq!(parse_i32("0b101"), Some(5));
/// assert_eq!(parse_i32("12a"), None);
/// ```
pub fn parse_i32(s: &str) -> Option<i32> {
    let (negative, radix, digits) = split_radix(s.trim());
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }
    let magnitude = i64::from_str_radix(digits, radix).ok()?;
    let value = if negative { -magnitude } else { magnitude };
    i32::try_from(value).ok()
}

/// Parses an unsigned size. Negative values are rejected.
pub fn parse_usize(s: &str) -> Option<usize> {
    let (negative, radix, digits) = split_radix(s.trim());
    if negative || digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }
    usize::from_str_radix(digits, radix).ok()
}

/// Parses a double, tolerating a trailing `f`/`F`.
pub fn parse_f64(s: &str) -> Option<f64> {
    let s = s.trim();
    let body = s.strip_suffix(['f', 'F']).unwrap_or(s);
    if body.is_empty() {
        return None;
    }
    body.parse::<f64>().ok()
}

/// Parses a single-precision float, tolerating a trailing `f`/`F`.
pub fn parse_f32(s: &str) -> Option<f32> {
    let s = s.trim();
    let body = s.strip_suffix(['f', 'F']).unwrap_or(s);
    if body.is_empty() {
        return None;
    }
    body.parse::<f32>().ok()
}

/// Parses `true/false/1/0/yes/no/on/off`, case-insensitively.
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
