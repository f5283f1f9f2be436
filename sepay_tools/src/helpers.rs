use serde::{Deserialize, Deserializer};

use crate::SepayApiError;

/// SePay reports amounts as decimal strings (e.g. `"150000.00"`). The shop currency has no sub-unit in use, so the
/// whole part is the amount in minor units and the fractional part is rounded half-up.
pub fn parse_sepay_amount(amount: &str) -> Result<i64, SepayApiError> {
    let amount = amount.trim();
    let invalid = |e: String| SepayApiError::InvalidAmount(format!("Invalid amount value: {amount}. {e}"));
    let mut parts = amount.split('.');
    let whole = parts.next().filter(|s| !s.is_empty()).ok_or_else(|| invalid("Empty amount".into()))?;
    if !whole.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("Amounts must be unsigned decimal numbers".into()));
    }
    let whole = whole.parse::<i64>().map_err(|e| invalid(e.to_string()))?;
    let round_up = match parts.next() {
        None => false,
        Some(frac) if frac.chars().all(|c| c.is_ascii_digit()) => frac.chars().next().is_some_and(|c| c >= '5'),
        Some(_) => return Err(invalid("Invalid fractional part".into())),
    };
    if parts.next().is_some() {
        return Err(invalid("Too many decimal points".into()));
    }
    Ok(if round_up { whole + 1 } else { whole })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Integer(i64),
    Float(f64),
}

/// SePay is inconsistent about whether ids are sent as JSON numbers or strings. Accept both.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where D: Deserializer<'de> {
    let value = StringOrNumber::deserialize(deserializer)?;
    Ok(match value {
        StringOrNumber::String(s) => s,
        StringOrNumber::Integer(i) => i.to_string(),
        StringOrNumber::Float(f) => f.to_string(),
    })
}

/// Deserializes an amount that may be a JSON number or a decimal string into minor units.
pub fn amount_from_string_or_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where D: Deserializer<'de> {
    let value = StringOrNumber::deserialize(deserializer)?;
    match value {
        StringOrNumber::Integer(i) if i >= 0 => Ok(i),
        StringOrNumber::Integer(i) => Err(serde::de::Error::custom(format!("Negative amount: {i}"))),
        StringOrNumber::Float(f) => parse_sepay_amount(&f.to_string()).map_err(serde::de::Error::custom),
        StringOrNumber::String(s) => parse_sepay_amount(&s).map_err(serde::de::Error::custom),
    }
}
