//! Number formats and user-input recognition
//!
//! Supported formats: `general`, `$#,##0`, `$#,##0.00`, `#,##0`,
//! `#,##0.00`, `0%`, `0.00%`. Anything else renders as `general`.

/// The default format
pub const GENERAL: &str = "general";

/// Currency, whole units
pub const CURRENCY: &str = "$#,##0";

/// Currency, two decimals
pub const CURRENCY_CENTS: &str = "$#,##0.00";

/// Grouped integer
pub const GROUPED: &str = "#,##0";

/// Grouped, two decimals
pub const GROUPED_DECIMAL: &str = "#,##0.00";

/// Percent, whole
pub const PERCENT: &str = "0%";

/// Percent, two decimals
pub const PERCENT_DECIMAL: &str = "0.00%";

/// Render a number in `general` format
///
/// Integers print without a fraction; everything else uses the shortest
/// representation that round-trips.
#[must_use]
pub fn format_general(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Render a number with the given format
#[must_use]
pub fn format_number(n: f64, format: &str) -> String {
    match format {
        CURRENCY => currency(n, 0),
        CURRENCY_CENTS => currency(n, 2),
        GROUPED => signed(n, grouped(n.abs(), 0)),
        GROUPED_DECIMAL => signed(n, grouped(n.abs(), 2)),
        PERCENT => format!("{:.0}%", n * 100.0),
        PERCENT_DECIMAL => format!("{:.2}%", n * 100.0),
        _ => format_general(n),
    }
}

fn currency(n: f64, decimals: usize) -> String {
    signed(n, format!("${}", grouped(n.abs(), decimals)))
}

fn signed(n: f64, body: String) -> String {
    if n < 0.0 && body.bytes().any(|b| (b'1'..=b'9').contains(&b)) {
        format!("-{body}")
    } else {
        body
    }
}

fn grouped(n: f64, decimals: usize) -> String {
    let fixed = format!("{n:.decimals$}");
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut out = String::with_capacity(fixed.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Parse a plain decimal number: optional sign, digits, optional fraction
/// and exponent. Rejects `inf`, `NaN` and anything else `f64::from_str`
/// would accept beyond plain notation.
#[must_use]
pub fn parse_plain_number(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        digits += i - frac_start;
    }
    if digits == 0 {
        return None;
    }
    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return None;
        }
    }
    if i != bytes.len() {
        return None;
    }
    text.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Parse a number that may use `,` thousands separators
fn parse_grouped_number(text: &str) -> Option<(f64, bool)> {
    if !text.contains(',') {
        return parse_plain_number(text).map(|n| (n, false));
    }
    let unsigned = text.trim_start_matches(['+', '-']);
    let int_part = unsigned.split('.').next().unwrap_or_default();
    let groups: Vec<&str> = int_part.split(',').collect();
    let well_formed = groups.first().is_some_and(|g| (1..=3).contains(&g.len()))
        && groups[1..].iter().all(|g| g.len() == 3);
    if !well_formed {
        return None;
    }
    parse_plain_number(&text.replace(',', "")).map(|n| (n, true))
}

fn decimals_of(text: &str) -> usize {
    text.split_once('.').map_or(0, |(_, frac)| frac.len())
}

/// What a piece of user input turned out to be
#[derive(Debug, Clone, PartialEq)]
pub enum RecognizedInput {
    /// Nothing; the cell should be cleared
    Empty,
    /// Formula text including the leading `=`
    Formula(String),
    /// Number with the format implied by how it was typed, if any
    Number(f64, Option<&'static str>),
    /// Boolean
    Boolean(bool),
    /// Plain text
    Text(String),
}

/// Recognize typed user input the way a spreadsheet cell editor does
///
/// - `=...` is a formula
/// - `TRUE`/`FALSE` (any case) are booleans
/// - `1234.5`, `1,234` are numbers
/// - `$1,234.50` is currency, `12.5%` is a percentage
/// - everything else is text
#[must_use]
pub fn recognize_input(input: &str) -> RecognizedInput {
    if input.is_empty() {
        return RecognizedInput::Empty;
    }
    if input.len() > 1 && input.starts_with('=') {
        return RecognizedInput::Formula(input.to_string());
    }
    if input.eq_ignore_ascii_case("TRUE") {
        return RecognizedInput::Boolean(true);
    }
    if input.eq_ignore_ascii_case("FALSE") {
        return RecognizedInput::Boolean(false);
    }

    let trimmed = input.trim();
    if let Some((n, grouped)) = parse_grouped_number(trimmed) {
        let format = match (grouped, decimals_of(trimmed)) {
            (false, _) => None,
            (true, 0) => Some(GROUPED),
            (true, _) => Some(GROUPED_DECIMAL),
        };
        return RecognizedInput::Number(n, format);
    }

    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    if let Some(amount) = unsigned.strip_prefix('$') {
        if let Some((n, _)) = parse_grouped_number(amount).filter(|_| !amount.starts_with(['+', '-'])) {
            let format = if decimals_of(amount) == 0 { CURRENCY } else { CURRENCY_CENTS };
            return RecognizedInput::Number(if negative { -n } else { n }, Some(format));
        }
    }
    if let Some(percent) = trimmed.strip_suffix('%') {
        if let Some(n) = parse_plain_number(percent) {
            let format = if decimals_of(percent) == 0 { PERCENT } else { PERCENT_DECIMAL };
            return RecognizedInput::Number(n / 100.0, Some(format));
        }
    }

    RecognizedInput::Text(input.to_string())
}
