use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Amounts are carried as integer minor units (qəpik, cents, kuruş).
/// 1 unit = 100 minor units, so 12.50 ₼ = 1250.
pub type Cents = i64;

/// Format minor units as a plain decimal string.
/// Example: 1593 -> "15.93", -5 -> "-0.05"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Parse a decimal string ("15.93", "12.5", "3", ".50") into minor units.
/// Digits past the second decimal place are dropped.
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim();
    let (negative, digits) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };

    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(ParseCentsError::InvalidFormat);
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(ParseCentsError::InvalidFormat);
    }

    let units: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| ParseCentsError::InvalidFormat)?
    };

    let minor: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().map_err(|_| ParseCentsError::InvalidFormat)? * 10,
        _ => fraction[..2]
            .parse()
            .map_err(|_| ParseCentsError::InvalidFormat)?,
    };

    let cents = units
        .checked_mul(100)
        .and_then(|c| c.checked_add(minor))
        .ok_or(ParseCentsError::Overflow)?;
    Ok(if negative { -cents } else { cents })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCentsError {
    InvalidFormat,
    Overflow,
}

impl fmt::Display for ParseCentsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCentsError::InvalidFormat => write!(f, "invalid money format"),
            ParseCentsError::Overflow => write!(f, "amount out of range"),
        }
    }
}

impl std::error::Error for ParseCentsError {}

/// Currencies a restaurant can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Azn,
    Usd,
    Eur,
    Try,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Azn => "AZN",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Try => "TRY",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Azn => "₼",
            Currency::Usd => "$",
            Currency::Eur => "€",
            Currency::Try => "₺",
        }
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AZN" => Ok(Currency::Azn),
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "TRY" => Ok(Currency::Try),
            other => Err(format!("unknown currency code: {other}")),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

pub const DEFAULT_CURRENCY: &str = "AZN";

/// Render an amount with the symbol of `currency_code`, e.g. "15.93 ₼".
/// Unknown codes are printed verbatim in place of the symbol.
pub fn format_currency(cents: Cents, currency_code: &str) -> String {
    let suffix = match currency_code.parse::<Currency>() {
        Ok(currency) => currency.symbol(),
        Err(_) => currency_code,
    };
    format!("{} {}", format_cents(cents), suffix)
}

/// Serde adapter storing amounts as decimal strings ("15.93").
///
/// Deserialization is lenient: the store hands numeric columns back either
/// as JSON numbers in currency units or as decimal strings.
pub mod amount {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    use super::{Cents, format_cents, parse_cents};

    pub fn serialize<S: Serializer>(cents: &Cents, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_cents(*cents))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Cents, D::Error> {
        let value = Value::deserialize(deserializer)?;
        from_value(&value).ok_or_else(|| D::Error::custom(format!("invalid amount: {value}")))
    }

    /// Convert a loosely typed JSON value into minor units.
    pub fn from_value(value: &Value) -> Option<Cents> {
        match value {
            Value::Number(n) => match n.as_i64() {
                Some(units) => units.checked_mul(100),
                None => n
                    .as_f64()
                    .filter(|f| f.is_finite())
                    .map(|f| (f * 100.0).round() as Cents),
            },
            Value::String(s) => parse_cents(s).ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(1593), "15.93");
        assert_eq!(format_cents(350), "3.50");
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(-5), "-0.05");
    }

    #[test]
    fn test_parse_cents() {
        assert_eq!(parse_cents("15.93"), Ok(1593));
        assert_eq!(parse_cents("12.5"), Ok(1250));
        assert_eq!(parse_cents("3"), Ok(300));
        assert_eq!(parse_cents(".50"), Ok(50));
        assert_eq!(parse_cents("-2.00"), Ok(-200));
        assert_eq!(parse_cents("9.999"), Ok(999));
    }

    #[test]
    fn test_parse_cents_invalid() {
        assert!(parse_cents("abc").is_err());
        assert!(parse_cents("1.2.3").is_err());
        assert!(parse_cents("").is_err());
        assert!(parse_cents("1e5").is_err());
    }

    #[test]
    fn test_format_currency_known_codes() {
        assert_eq!(format_currency(1593, "AZN"), "15.93 ₼");
        assert_eq!(format_currency(200, "USD"), "2.00 $");
        assert_eq!(format_currency(1000, "EUR"), "10.00 €");
        assert_eq!(format_currency(99, "TRY"), "0.99 ₺");
    }

    #[test]
    fn test_format_currency_unknown_code_falls_back() {
        assert_eq!(format_currency(500, "GBP"), "5.00 GBP");
    }

    #[test]
    fn test_amount_from_value() {
        assert_eq!(amount::from_value(&json!(15.93)), Some(1593));
        assert_eq!(amount::from_value(&json!(3)), Some(300));
        assert_eq!(amount::from_value(&json!("20.06")), Some(2006));
        assert_eq!(amount::from_value(&json!(null)), None);
        assert_eq!(amount::from_value(&json!("n/a")), None);
    }
}
