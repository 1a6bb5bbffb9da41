//! Typed value parsing and formatting.
//!
//! Every metric declares one [`ValueKind`] up front; the kind selects the
//! parser deterministically. Numeric values use exact decimals so that
//! accumulated totals round-trip precisely.

use crate::error::{Error, Result};
use bigdecimal::{BigDecimal, ToPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of value a metric stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Integer,
    Decimal,
    Duration,
    Text,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Integer => "integer",
            ValueKind::Decimal => "decimal",
            ValueKind::Duration => "duration",
            ValueKind::Text => "text",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "integer" => Some(ValueKind::Integer),
            "decimal" => Some(ValueKind::Decimal),
            "duration" => Some(ValueKind::Duration),
            "text" => Some(ValueKind::Text),
            _ => None,
        }
    }

    /// Resolve a `metric_type` token from a project definition file.
    /// Accepts the aliases the declarative format allows, case-insensitively.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_lowercase().as_str() {
            "int" | "integer" => Some(ValueKind::Integer),
            "number" | "decimal" | "float" => Some(ValueKind::Decimal),
            "duration" | "time" => Some(ValueKind::Duration),
            "string" | "str" | "text" => Some(ValueKind::Text),
            _ => None,
        }
    }

    /// Human-facing name for listings.
    pub fn display_name(&self) -> &'static str {
        match self {
            ValueKind::Integer => "Integer",
            ValueKind::Decimal => "Decimal",
            ValueKind::Duration => "Duration",
            ValueKind::Text => "Text",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A parsed metric value, tagged with its kind.
///
/// Durations are held as an exact number of seconds.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Decimal(BigDecimal),
    Duration(BigDecimal),
    Text(String),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Integer(_) => ValueKind::Integer,
            Value::Decimal(_) => ValueKind::Decimal,
            Value::Duration(_) => ValueKind::Duration,
            Value::Text(_) => ValueKind::Text,
        }
    }

    /// Storage form: a plain string that `from_canonical` reads back
    /// exactly. Durations store their second count, not the user's
    /// original expression.
    pub fn canonical_text(&self) -> String {
        match self {
            Value::Integer(n) => n.to_string(),
            Value::Decimal(d) => d.to_string(),
            Value::Duration(d) => d.to_string(),
            Value::Text(s) => s.clone(),
        }
    }

    /// Rebuild a value from its storage form.
    pub fn from_canonical(kind: ValueKind, text: &str) -> Result<Self> {
        match kind {
            ValueKind::Integer => Ok(Value::Integer(
                text.parse()
                    .map_err(|_| Error::parsing("integer", text))?,
            )),
            ValueKind::Decimal => Ok(Value::Decimal(
                BigDecimal::from_str(text).map_err(|_| Error::parsing("decimal", text))?,
            )),
            ValueKind::Duration => Ok(Value::Duration(
                BigDecimal::from_str(text).map_err(|_| Error::parsing("duration", text))?,
            )),
            ValueKind::Text => Ok(Value::Text(text.to_string())),
        }
    }

    /// Exact sum of two values of the same numeric kind.
    /// Returns `None` for text values and mismatched kinds; integer
    /// overflow is an error rather than a wrap.
    pub fn checked_add(&self, other: &Value) -> Option<Result<Value>> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Some(
                a.checked_add(*b)
                    .map(Value::Integer)
                    .ok_or_else(|| Error::model(format!("integer overflow adding {} to {}", b, a))),
            ),
            (Value::Decimal(a), Value::Decimal(b)) => Some(Ok(Value::Decimal(a + b))),
            (Value::Duration(a), Value::Duration(b)) => Some(Ok(Value::Duration(a + b))),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Duration(d) => write!(f, "{}", format_duration(d)),
            other => write!(f, "{}", other.canonical_text()),
        }
    }
}

/// Parse text into a value of the given kind.
pub fn parse_value(kind: ValueKind, text: &str) -> Result<Value> {
    match kind {
        ValueKind::Integer => parse_integer(text).map(Value::Integer),
        ValueKind::Decimal => parse_decimal(text).map(Value::Decimal),
        ValueKind::Duration => parse_duration(text).map(Value::Duration),
        ValueKind::Text => Ok(Value::Text(text.to_string())),
    }
}

/// Strict base-10 integer. `"500.5"` is not an integer.
pub fn parse_integer(text: &str) -> Result<i64> {
    text.trim()
        .parse()
        .map_err(|_| Error::parsing("integer", text))
}

/// Exact decimal, no binary floating point anywhere.
pub fn parse_decimal(text: &str) -> Result<BigDecimal> {
    BigDecimal::from_str(text.trim()).map_err(|_| Error::parsing("decimal", text))
}

/// Synonym sets for compound duration expressions, with their multiplier
/// in seconds.
const DURATION_UNITS: &[(&[&str], i64)] = &[
    (&["days", "day", "d"], 86_400),
    (&["hours", "hour", "hrs", "hr", "h"], 3_600),
    (&["minutes", "minute", "mins", "min", "m"], 60),
    (&["seconds", "second", "secs", "sec", "s"], 1),
];

/// Parse a duration expression into an exact number of seconds.
///
/// Clock format (`H:MM:SS` / `H:MM`) is tried first and is exclusive with
/// the compound form. Compound expressions are one or more
/// `<unit><number>` or `<number><unit>` tokens in either order, separated
/// by whitespace or commas: `"2 hrs, 5 mins"`, `"hrs 2, 5 mins"`,
/// `"4.5 hours"`, `"525s"`. An expression yielding no tokens at all is a
/// parsing error, not zero.
pub fn parse_duration(text: &str) -> Result<BigDecimal> {
    if let Some(seconds) = parse_clock(text) {
        return Ok(BigDecimal::from(seconds));
    }

    let expr = regex_lite::Regex::new(
        r"(?:(?P<unit>[A-Za-z]+)\s*(?P<num>[0-9]+\.?[0-9]*))|(?:(?P<num2>[0-9]+\.?[0-9]*)\s*(?P<unit2>[A-Za-z]+))",
    )
    .expect("duration expression pattern is valid");

    let mut total = BigDecimal::from(0);
    let mut matched = false;

    for caps in expr.captures_iter(text) {
        let num = caps
            .name("num")
            .or_else(|| caps.name("num2"))
            .map(|m| m.as_str())
            .unwrap_or_default();
        let unit = caps
            .name("unit")
            .or_else(|| caps.name("unit2"))
            .map(|m| m.as_str())
            .unwrap_or_default();

        let unit_lower = unit.to_lowercase();
        let multiplier = DURATION_UNITS
            .iter()
            .find(|(names, _)| names.contains(&unit_lower.as_str()))
            .map(|(_, m)| *m)
            .ok_or_else(|| {
                Error::parsing("duration", caps.get(0).map(|m| m.as_str()).unwrap_or(text))
            })?;

        let amount =
            BigDecimal::from_str(num).map_err(|_| Error::parsing("duration", num))?;
        total = total + amount * BigDecimal::from(multiplier);
        matched = true;
    }

    if !matched {
        return Err(Error::parsing("duration", text));
    }

    Ok(total)
}

/// Strict clock-format parse: `H:MM:SS` or `H:MM`, hours 0-23.
fn parse_clock(text: &str) -> Option<i64> {
    let parts: Vec<&str> = text.trim().split(':').collect();
    if parts.len() != 2 && parts.len() != 3 {
        return None;
    }

    let mut fields = Vec::with_capacity(3);
    for part in &parts {
        if part.is_empty() || part.len() > 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        fields.push(part.parse::<i64>().ok()?);
    }

    let hours = fields[0];
    let minutes = fields[1];
    let seconds = if fields.len() == 3 { fields[2] } else { 0 };

    if hours > 23 || minutes > 59 || seconds > 59 {
        return None;
    }

    Some(hours * 3600 + minutes * 60 + seconds)
}

/// Render a duration (in seconds) as a human string, e.g. `"1 day, 0:01:40"`.
/// Display only; not required to round-trip through `parse_duration`.
pub fn format_duration(seconds: &BigDecimal) -> String {
    let total = seconds.round(0).to_i64().unwrap_or(0).max(0);

    let days = total / 86_400;
    let rest = total % 86_400;
    let hours = rest / 3_600;
    let minutes = (rest % 3_600) / 60;
    let secs = rest % 60;

    if days == 1 {
        format!("1 day, {}:{:02}:{:02}", hours, minutes, secs)
    } else if days > 1 {
        format!("{} days, {}:{:02}:{:02}", days, hours, minutes, secs)
    } else {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn integer_parses_plain_numbers() {
        assert_eq!(parse_integer("500").unwrap(), 500);
        assert_eq!(parse_integer("-3").unwrap(), -3);
    }

    #[test]
    fn integer_rejects_fractions_and_garbage() {
        assert!(matches!(
            parse_integer("500.5"),
            Err(Error::Parsing { kind: "integer", .. })
        ));
        assert!(parse_integer("abc").is_err());
    }

    #[test]
    fn decimal_is_exact() {
        assert_eq!(parse_decimal("500.5").unwrap(), dec("500.5"));
        assert_eq!(parse_decimal("0.1").unwrap() + parse_decimal("0.2").unwrap(), dec("0.3"));
    }

    #[test]
    fn decimal_rejects_garbage() {
        assert!(matches!(
            parse_decimal("5a"),
            Err(Error::Parsing { kind: "decimal", .. })
        ));
    }

    #[test]
    fn duration_clock_format() {
        assert_eq!(parse_duration("10:05:01").unwrap(), dec("36301"));
        assert_eq!(parse_duration("10:05").unwrap(), dec("36300"));
        assert_eq!(parse_duration("0:00").unwrap(), dec("0"));
    }

    #[test]
    fn duration_clock_rejects_out_of_range_fields() {
        // Not clock format, and "61" carries no unit, so the compound
        // parser rejects the leftover too.
        assert!(parse_duration("25:61").is_err());
    }

    #[test]
    fn duration_compound_expressions() {
        assert_eq!(parse_duration("4 hours").unwrap(), dec("14400"));
        assert_eq!(parse_duration("4.5 hours").unwrap(), dec("16200"));
        assert_eq!(parse_duration("525s").unwrap(), dec("525"));
        assert_eq!(parse_duration("2 days").unwrap(), dec("172800"));
        assert_eq!(parse_duration("4.5 mins").unwrap(), dec("270"));
    }

    #[test]
    fn duration_tokens_are_order_independent() {
        let a = parse_duration("2 hrs, 5 mins").unwrap();
        let b = parse_duration("hrs 2, 5 mins").unwrap();
        let c = parse_duration("5 mins, 2 hrs").unwrap();
        assert_eq!(a, dec("7500"));
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn duration_units_are_case_insensitive() {
        assert_eq!(parse_duration("2 HRS").unwrap(), dec("7200"));
        assert_eq!(parse_duration("1 Day").unwrap(), dec("86400"));
    }

    #[test]
    fn duration_rejects_unknown_units() {
        let err = parse_duration("5 parsecs").unwrap_err();
        match err {
            Error::Parsing { kind, text } => {
                assert_eq!(kind, "duration");
                assert!(text.contains("parsecs"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn duration_rejects_empty_and_unitless_input() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("nonsense").is_err());
        assert!(parse_duration("42").is_err());
    }

    #[test]
    fn format_duration_renders_days_and_clock() {
        assert_eq!(format_duration(&dec("86500")), "1 day, 0:01:40");
        assert_eq!(format_duration(&dec("172900")), "2 days, 0:01:40");
        assert_eq!(format_duration(&dec("7500")), "2:05:00");
        assert_eq!(format_duration(&dec("0")), "0:00:00");
    }

    #[test]
    fn kind_tokens_resolve_aliases() {
        assert_eq!(ValueKind::from_token("Integer"), Some(ValueKind::Integer));
        assert_eq!(ValueKind::from_token("int"), Some(ValueKind::Integer));
        assert_eq!(ValueKind::from_token("Number"), Some(ValueKind::Decimal));
        assert_eq!(ValueKind::from_token("float"), Some(ValueKind::Decimal));
        assert_eq!(ValueKind::from_token("Duration"), Some(ValueKind::Duration));
        assert_eq!(ValueKind::from_token("String"), Some(ValueKind::Text));
        assert_eq!(ValueKind::from_token("widget"), None);
    }

    #[test]
    fn canonical_round_trip() {
        let v = parse_value(ValueKind::Decimal, "8.25").unwrap();
        let back = Value::from_canonical(ValueKind::Decimal, &v.canonical_text()).unwrap();
        assert_eq!(v, back);

        let d = parse_value(ValueKind::Duration, "2 hrs").unwrap();
        let back = Value::from_canonical(ValueKind::Duration, &d.canonical_text()).unwrap();
        assert_eq!(d, back);
    }

    #[test]
    fn checked_add_accumulates_numerics_only() {
        let sum = Value::Integer(5).checked_add(&Value::Integer(10)).unwrap().unwrap();
        assert_eq!(sum, Value::Integer(15));

        assert!(Value::Integer(i64::MAX)
            .checked_add(&Value::Integer(1))
            .unwrap()
            .is_err());

        assert!(Value::Text("a".into())
            .checked_add(&Value::Text("b".into()))
            .is_none());
        assert!(Value::Integer(1).checked_add(&Value::Text("b".into())).is_none());
    }
}
