//! Security identity: tagged identifier variants and the declared security.

use crate::error::PcsError;
use pcs_money::Currency;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A security identifier. Every identifier classifies into exactly one
/// variant; ambiguous inputs are rejected at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SecurityId {
    /// Market-specific identifier `<ISIN>.<MIC>`.
    Mssi { isin: String, mic: String },
    /// An FX pair such as `EURUSD`: price quoted as units of `quote`
    /// per one unit of `base`.
    CurrencyPair { base: Currency, quote: Currency },
    /// A bare ISIN (12 alphanumerics).
    Isin(String),
    /// A user-defined identifier for unlisted assets.
    Private(String),
}

fn is_isin(s: &str) -> bool {
    s.len() == 12 && s.chars().all(|c| c.is_ascii_alphanumeric())
}

fn is_mic(s: &str) -> bool {
    s.len() == 4 && s.chars().all(|c| c.is_ascii_uppercase())
}

impl SecurityId {
    /// The pair currencies, for FX identifiers.
    pub fn currency_pair(&self) -> Option<(Currency, Currency)> {
        match self {
            SecurityId::CurrencyPair { base, quote } => Some((*base, *quote)),
            _ => None,
        }
    }

    pub fn is_currency_pair(&self) -> bool {
        matches!(self, SecurityId::CurrencyPair { .. })
    }
}

impl FromStr for SecurityId {
    type Err = PcsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| PcsError::InvalidId(s.to_string(), reason.to_string());

        if let Some((isin, mic)) = s.split_once('.') {
            if !is_isin(isin) {
                return Err(invalid("MSSI must start with a 12-character ISIN"));
            }
            if !is_mic(mic) {
                return Err(invalid("MIC must be 4 uppercase letters"));
            }
            return Ok(SecurityId::Mssi {
                isin: isin.to_string(),
                mic: mic.to_string(),
            });
        }

        if s.len() == 6 && s.chars().all(|c| c.is_ascii_uppercase()) {
            let base = Currency::from_code(&s[0..3])
                .ok_or_else(|| invalid("unknown base currency code"))?;
            let quote = Currency::from_code(&s[3..6])
                .ok_or_else(|| invalid("unknown quote currency code"))?;
            return Ok(SecurityId::CurrencyPair { base, quote });
        }

        if is_isin(s) {
            return Ok(SecurityId::Isin(s.to_string()));
        }

        if s.len() >= 7 {
            return Ok(SecurityId::Private(s.to_string()));
        }

        Err(invalid(
            "expected <ISIN>.<MIC>, a currency pair, an ISIN, or a private id of 7+ characters",
        ))
    }
}

impl std::fmt::Display for SecurityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecurityId::Mssi { isin, mic } => write!(f, "{isin}.{mic}"),
            SecurityId::CurrencyPair { base, quote } => {
                write!(f, "{}{}", base.code(), quote.code())
            }
            SecurityId::Isin(isin) => f.write_str(isin),
            SecurityId::Private(id) => f.write_str(id),
        }
    }
}

impl Serialize for SecurityId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SecurityId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl JsonSchema for SecurityId {
    fn schema_name() -> String {
        "SecurityId".to_owned()
    }

    fn json_schema(generator: &mut schemars::r#gen::SchemaGenerator) -> schemars::schema::Schema {
        let mut schema = generator.subschema_for::<String>().into_object();
        schema.metadata().description = Some(
            "Security identifier: '<ISIN>.<MIC>', a 6-letter currency pair, \
             a bare ISIN, or a private id of 7+ characters"
                .to_owned(),
        );
        schema.into()
    }
}

/// A security declared in a ledger. Ticker and id are each unique within
/// their ledger.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct Security {
    pub ticker: String,
    pub id: SecurityId,
    pub currency: pcs_money::CurrencyCode,
}

impl Security {
    pub fn new(ticker: impl Into<String>, id: SecurityId, currency: Currency) -> Self {
        Self {
            ticker: ticker.into(),
            id,
            currency: currency.into(),
        }
    }

    pub fn currency(&self) -> Currency {
        self.currency.0
    }
}
