//! Money amounts as they appear in extracted document data.
//!
//! Extraction output is loosely typed: the same field may arrive as a JSON number
//! (`1234.5`) or as formatted text (`"$1,234.50"`). `Amount` accepts both and
//! rejects anything else so malformed documents fail closed.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Amount(pub Decimal);

impl Amount {
    pub fn value(self) -> Decimal {
        self.0
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount(value)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parse a formatted amount such as `"$1,234.50"`, `"-20"` or `"1e3"`.
pub fn parse_amount(text: &str) -> Result<Decimal, String> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();

    if cleaned.is_empty() {
        return Err(format!("empty amount: {:?}", text));
    }

    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .map_err(|_| format!("invalid amount: {:?}", text))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Number(serde_json::Number),
    Text(String),
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawAmount::deserialize(deserializer).map_err(|_| {
            serde::de::Error::custom("amount must be a number or a numeric string")
        })?;
        let text = match raw {
            RawAmount::Number(n) => n.to_string(),
            RawAmount::Text(s) => s,
        };
        parse_amount(&text)
            .map(Amount)
            .map_err(serde::de::Error::custom)
    }
}
