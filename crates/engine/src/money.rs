//! Monetary amounts are integer cents throughout the engine. Report files
//! carry free-form decimal strings (currency symbols, thousands separators,
//! decimal commas), which are cleaned here before parsing.

/// Strip currency symbols and whitespace, then resolve `,` / `.` into a
/// single `.` decimal separator.
///
/// When both characters occur, whichever appears later in the string is the
/// decimal separator and the other is dropped as a thousands separator.
/// A lone comma is treated as the decimal separator.
fn clean_numeric(raw: &str) -> String {
    let stripped: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '€' | '$' | '£' | '¥'))
        .collect();

    let last_comma = stripped.rfind(',');
    let last_dot = stripped.rfind('.');

    match (last_comma, last_dot) {
        (Some(comma), Some(dot)) => {
            if comma > dot {
                // 1.234,56: comma is decimal
                stripped.replace('.', "").replace(',', ".")
            } else {
                // 1,234.56: dot is decimal
                stripped.replace(',', "")
            }
        }
        (Some(_), None) => stripped.replace(',', "."),
        _ => stripped,
    }
}

fn split_signed(cleaned: &str) -> Option<(bool, &str, &str)> {
    let (negative, body) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.strip_prefix('+').unwrap_or(cleaned)),
    };
    let (int_part, frac_part) = match body.split_once('.') {
        Some((i, f)) => (i, f),
        None => (body, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }
    Some((negative, int_part, frac_part))
}

/// Parse a monetary string into cents, rounding half-up on the third
/// fractional digit. Returns `None` for anything non-numeric.
pub fn parse_cents(raw: &str) -> Option<i64> {
    let cleaned = clean_numeric(raw);
    let (negative, int_part, frac_part) = split_signed(&cleaned)?;

    let whole: i64 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().ok()?
    };

    // split_signed guarantees ASCII digits here.
    let digits: Vec<i64> = frac_part
        .chars()
        .filter_map(|c| c.to_digit(10).map(i64::from))
        .collect();
    let hundredths = digits.first().copied().unwrap_or(0) * 10 + digits.get(1).copied().unwrap_or(0);
    let round_up = digits.get(2).is_some_and(|&d| d >= 5);

    let mut cents = whole * 100 + hundredths + i64::from(round_up);
    if negative {
        cents = -cents;
    }
    Some(cents)
}

/// Parse a quantity string into a whole number, truncating any fractional
/// part (reports occasionally carry "5.0").
pub fn parse_quantity(raw: &str) -> Option<i64> {
    let cleaned = clean_numeric(raw);
    let (negative, int_part, _frac) = split_signed(&cleaned)?;
    let whole: i64 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().ok()?
    };
    Some(if negative { -whole } else { whole })
}

/// Integer division rounded half-up. Operands must be non-negative.
pub fn div_round_half_up(numerator: i64, denominator: i64) -> i64 {
    debug_assert!(numerator >= 0 && denominator > 0);
    (numerator + denominator / 2) / denominator
}

/// Render cents as a plain "123.45" decimal string.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}
