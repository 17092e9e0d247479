//! Currency code value object.
//!
//! The engine never converts between currencies (multi-currency conversion
//! is out of scope); the code is carried on lines and ledger events so that
//! a WAC is always scoped to one currency.

use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::CostingError;

/// ISO-4217-style alphabetic currency code ("USD", "EUR", ...).
///
/// Compared by value. Construction validates shape only (three ASCII
/// uppercase letters), not membership in the ISO table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode([u8; 3]);

impl CurrencyCode {
    pub fn new(code: &str) -> Result<Self, CostingError> {
        let bytes = code.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(|b| b.is_ascii_uppercase()) {
            return Err(CostingError::validation(format!(
                "currency code must be three ASCII uppercase letters, got '{code}'"
            )));
        }
        Ok(Self([bytes[0], bytes[1], bytes[2]]))
    }

    pub fn as_str(&self) -> &str {
        // Validated at construction to be ASCII.
        core::str::from_utf8(&self.0).unwrap_or("???")
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CurrencyCode {
    type Err = CostingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = CostingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(value: CurrencyCode) -> Self {
        value.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_uppercase_triples() {
        assert_eq!(CurrencyCode::new("USD").unwrap().as_str(), "USD");
        assert_eq!(CurrencyCode::new("EUR").unwrap().to_string(), "EUR");
    }

    #[test]
    fn rejects_malformed_codes() {
        assert!(CurrencyCode::new("usd").is_err());
        assert!(CurrencyCode::new("US").is_err());
        assert!(CurrencyCode::new("DOLLARS").is_err());
        assert!(CurrencyCode::new("U5D").is_err());
    }

    #[test]
    fn serde_round_trips_as_string() {
        let code = CurrencyCode::new("GBP").unwrap();
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "\"GBP\"");
        let back: CurrencyCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, code);
    }
}
