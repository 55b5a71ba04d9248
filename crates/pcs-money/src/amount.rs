//! Monetary amount type tagged with an ISO 4217 currency.

use iso_currency::Currency;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error from currency-checked arithmetic.
///
/// Mixing two distinct non-empty currencies is a programming error at the
/// call site; the operations surface it as a `Result` so callers propagate
/// it with a diagnostic instead of silently producing nonsense.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: String, right: String },
}

/// A monetary amount with currency information.
///
/// The currency is optional: a `Money` without a currency is the neutral
/// zero, so `Money::zero().try_add(&m)` preserves `m`'s currency. Every
/// amount read from a ledger or market file carries a concrete currency;
/// the empty currency only arises as the identity for summation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Money {
    /// Exact decimal amount.
    pub amount: Decimal,
    currency: Option<Currency>,
}

impl Money {
    /// Create an amount in a concrete currency.
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self {
            amount,
            currency: Some(currency),
        }
    }

    /// The neutral zero: no amount, no currency.
    pub fn zero() -> Self {
        Self {
            amount: Decimal::ZERO,
            currency: None,
        }
    }

    /// Zero in a concrete currency.
    pub fn zero_in(currency: Currency) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    pub fn currency(&self) -> Option<Currency> {
        self.currency
    }

    /// ISO code, or the empty string for the neutral currency.
    pub fn code(&self) -> &'static str {
        self.currency.map(|c| c.code()).unwrap_or("")
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// True when this value carries no currency tag.
    pub fn is_neutral(&self) -> bool {
        self.currency.is_none()
    }

    /// The currency's minor units (decimal places for display).
    pub fn minor_units(&self) -> u32 {
        self.currency
            .and_then(|c| c.exponent())
            .map(u32::from)
            .unwrap_or(2)
    }

    /// Add, requiring compatible currencies. The empty currency is the
    /// identity: adding it preserves the other operand's currency.
    pub fn try_add(&self, other: &Money) -> Result<Money, MoneyError> {
        match (self.currency, other.currency) {
            (None, _) => Ok(Money {
                amount: self.amount + other.amount,
                currency: other.currency,
            }),
            (_, None) => Ok(Money {
                amount: self.amount + other.amount,
                currency: self.currency,
            }),
            (Some(a), Some(b)) if a == b => Ok(Money {
                amount: self.amount + other.amount,
                currency: Some(a),
            }),
            (Some(a), Some(b)) => Err(MoneyError::CurrencyMismatch {
                left: a.code().to_string(),
                right: b.code().to_string(),
            }),
        }
    }

    /// Subtract, with the same currency rules as [`Money::try_add`].
    pub fn try_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        self.try_add(&other.negated())
    }

    /// The amount with its sign flipped.
    pub fn negated(&self) -> Money {
        Money {
            amount: -self.amount,
            currency: self.currency,
        }
    }

    /// Scale by a dimensionless factor (e.g. price per share × quantity).
    pub fn scaled(&self, factor: Decimal) -> Money {
        Money {
            amount: self.amount * factor,
            currency: self.currency,
        }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.currency {
            Some(c) => write!(f, "{} {}", self.amount, c.code()),
            None => write!(f, "{}", self.amount),
        }
    }
}

// Always serialize as an object for wire-format stability.
impl Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("Money", 2)?;
        state.serialize_field("currency", self.code())?;
        state.serialize_field("amount", &self.amount)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{MapAccess, Visitor};

        struct MoneyVisitor;

        impl<'de> Visitor<'de> for MoneyVisitor {
            type Value = Money;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("an object with 'amount' and 'currency'")
            }

            fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut amount: Option<Decimal> = None;
                let mut currency: Option<String> = None;

                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "amount" => amount = Some(map.next_value()?),
                        "currency" => currency = Some(map.next_value()?),
                        _ => {
                            let _: serde::de::IgnoredAny = map.next_value()?;
                        }
                    }
                }

                let amount = amount.ok_or_else(|| serde::de::Error::missing_field("amount"))?;
                match currency.as_deref() {
                    None | Some("") => Ok(Money {
                        amount,
                        currency: None,
                    }),
                    Some(code) => {
                        let currency = Currency::from_code(code).ok_or_else(|| {
                            serde::de::Error::custom(format!("invalid currency code: '{code}'"))
                        })?;
                        Ok(Money::new(amount, currency))
                    }
                }
            }
        }

        deserializer.deserialize_map(MoneyVisitor)
    }
}

impl JsonSchema for Money {
    fn schema_name() -> String {
        "Money".to_owned()
    }

    fn json_schema(generator: &mut schemars::r#gen::SchemaGenerator) -> schemars::schema::Schema {
        use schemars::schema::{
            InstanceType, Metadata, ObjectValidation, Schema, SchemaObject, SingleOrVec,
        };

        Schema::Object(SchemaObject {
            instance_type: Some(SingleOrVec::Single(Box::new(InstanceType::Object))),
            object: Some(Box::new(ObjectValidation {
                properties: [
                    ("amount".to_string(), generator.subschema_for::<Decimal>()),
                    ("currency".to_string(), generator.subschema_for::<String>()),
                ]
                .into_iter()
                .collect(),
                required: ["amount".to_string(), "currency".to_string()]
                    .into_iter()
                    .collect(),
                ..Default::default()
            })),
            metadata: Some(Box::new(Metadata {
                description: Some(
                    "A monetary amount with its ISO 4217 currency code".to_owned(),
                ),
                ..Default::default()
            })),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_neutral_zero_preserves_currency() {
        let eur = Money::new(dec!(10), Currency::EUR);
        let sum = Money::zero().try_add(&eur).expect("neutral add");
        assert_eq!(sum, eur);

        let sum = eur.try_add(&Money::zero()).expect("neutral add");
        assert_eq!(sum, eur);
    }

    #[test]
    fn test_mismatched_currencies_rejected() {
        let eur = Money::new(dec!(10), Currency::EUR);
        let usd = Money::new(dec!(10), Currency::USD);
        let err = eur.try_add(&usd).expect_err("mismatch");
        assert_eq!(
            err,
            MoneyError::CurrencyMismatch {
                left: "EUR".to_string(),
                right: "USD".to_string(),
            }
        );
    }

    #[test]
    fn test_sub_and_scale() {
        let a = Money::new(dec!(10.50), Currency::USD);
        let b = Money::new(dec!(4.25), Currency::USD);
        let diff = a.try_sub(&b).expect("same currency");
        assert_eq!(diff.amount, dec!(6.25));
        assert_eq!(a.scaled(dec!(2)).amount, dec!(21.00));
    }

    #[test]
    fn test_serde_object_form() {
        let m = Money::new(dec!(123.45), Currency::EUR);
        let json = serde_json::to_string(&m).expect("serialize");
        assert_eq!(json, r#"{"currency":"EUR","amount":"123.45"}"#);
        let back: Money = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, m);
    }

    #[test]
    fn test_deserialize_rejects_unknown_currency() {
        let result: Result<Money, _> =
            serde_json::from_str(r#"{"currency":"XXQ","amount":"1"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::new(dec!(5.5), Currency::USD).to_string(), "5.5 USD");
        assert_eq!(Money::zero().to_string(), "0");
    }
}
