use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One of the two currencies a group books transactions in.
///
/// `Primary` is the reference currency: every balance and settlement is
/// expressed in it. `Secondary` is the foreign currency, converted into
/// the reference currency through an [`ExchangeRate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Currency {
    Primary,
    Secondary,
}

impl Currency {
    /// Whether amounts in this currency need no conversion.
    pub fn is_reference(self) -> bool {
        matches!(self, Currency::Primary)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Primary => write!(f, "PRIMARY"),
            Currency::Secondary => write!(f, "SECONDARY"),
        }
    }
}

/// Errors arising from currency resolution and exchange rates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FxError {
    #[error("exchange rate must be positive, got {rate}")]
    NonPositiveRate { rate: Decimal },
    #[error("unknown currency code '{code}' (expected {primary} or {secondary})")]
    UnknownCurrency {
        code: String,
        primary: String,
        secondary: String,
    },
}

/// Display codes for the two currencies of a group.
///
/// Resolves the codes found in input documents (e.g. `"SGD"`, `"jpy"`)
/// to a [`Currency`]. The defaults are SGD as the reference currency and
/// JPY as the foreign one.
///
/// # Examples
///
/// ```
/// use settlement_engine::core::currency::{Currency, CurrencyPair};
///
/// let pair = CurrencyPair::default();
/// assert_eq!(pair.resolve("jpy").unwrap(), Currency::Secondary);
/// assert_eq!(pair.code(Currency::Primary), "SGD");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyPair {
    pub primary: String,
    pub secondary: String,
}

impl CurrencyPair {
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
        }
    }

    /// Map a currency code to its [`Currency`], ignoring ASCII case.
    ///
    /// The symbolic names `PRIMARY` and `SECONDARY` are accepted as well.
    pub fn resolve(&self, code: &str) -> Result<Currency, FxError> {
        let code = code.trim();
        if code.eq_ignore_ascii_case(&self.primary) || code.eq_ignore_ascii_case("PRIMARY") {
            Ok(Currency::Primary)
        } else if code.eq_ignore_ascii_case(&self.secondary)
            || code.eq_ignore_ascii_case("SECONDARY")
        {
            Ok(Currency::Secondary)
        } else {
            Err(FxError::UnknownCurrency {
                code: code.to_string(),
                primary: self.primary.clone(),
                secondary: self.secondary.clone(),
            })
        }
    }

    /// Display code for `currency`.
    pub fn code(&self, currency: Currency) -> &str {
        match currency {
            Currency::Primary => &self.primary,
            Currency::Secondary => &self.secondary,
        }
    }
}

impl Default for CurrencyPair {
    fn default() -> Self {
        Self::new("SGD", "JPY")
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.secondary, self.primary)
    }
}

/// Units of the secondary currency worth one unit of the reference currency.
///
/// A rate of `100` means 100 SECONDARY = 1 PRIMARY. Always strictly
/// positive: non-positive rates are rejected on construction, so
/// conversion can never divide by zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct ExchangeRate(Decimal);

impl ExchangeRate {
    pub fn new(rate: Decimal) -> Result<Self, FxError> {
        if rate <= Decimal::ZERO {
            return Err(FxError::NonPositiveRate { rate });
        }
        Ok(Self(rate))
    }

    pub fn value(self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for ExchangeRate {
    type Error = FxError;

    fn try_from(rate: Decimal) -> Result<Self, Self::Error> {
        Self::new(rate)
    }
}

impl From<ExchangeRate> for Decimal {
    fn from(rate: ExchangeRate) -> Self {
        rate.0
    }
}

impl fmt::Display for ExchangeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The rate a transaction is converted at: its own snapshot when it
/// carries one, the ambient rate otherwise.
pub fn effective_rate(ambient: ExchangeRate, snapshot: Option<ExchangeRate>) -> ExchangeRate {
    snapshot.unwrap_or(ambient)
}

/// Convert `amount` into the reference currency.
///
/// Reference-currency amounts are returned unchanged; secondary amounts
/// are divided by the effective rate.
///
/// # Panics
///
/// Panics if the quotient does not fit in a [`Decimal`], which takes a
/// huge amount and a rate far below one. [`checked_convert`] reports
/// that case instead.
///
/// # Examples
///
/// ```
/// use settlement_engine::core::currency::{convert, Currency, ExchangeRate};
/// use rust_decimal_macros::dec;
///
/// let ambient = ExchangeRate::new(dec!(100)).unwrap();
/// assert_eq!(convert(dec!(1000), Currency::Secondary, ambient, None), dec!(10));
/// assert_eq!(convert(dec!(1000), Currency::Primary, ambient, None), dec!(1000));
/// ```
pub fn convert(
    amount: Decimal,
    currency: Currency,
    ambient: ExchangeRate,
    snapshot: Option<ExchangeRate>,
) -> Decimal {
    if currency.is_reference() {
        return amount;
    }
    amount / effective_rate(ambient, snapshot).value()
}

/// Like [`convert`], returning `None` when the result overflows.
pub fn checked_convert(
    amount: Decimal,
    currency: Currency,
    ambient: ExchangeRate,
    snapshot: Option<ExchangeRate>,
) -> Option<Decimal> {
    if currency.is_reference() {
        return Some(amount);
    }
    amount.checked_div(effective_rate(ambient, snapshot).value())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rate(value: Decimal) -> ExchangeRate {
        ExchangeRate::new(value).unwrap()
    }

    #[test]
    fn test_reference_amount_unchanged() {
        let converted = convert(dec!(42.50), Currency::Primary, rate(dec!(115)), Some(rate(dec!(3))));
        assert_eq!(converted, dec!(42.50));
    }

    #[test]
    fn test_secondary_uses_ambient_rate() {
        let converted = convert(dec!(1000), Currency::Secondary, rate(dec!(100)), None);
        assert_eq!(converted, dec!(10));
    }

    #[test]
    fn test_snapshot_overrides_ambient() {
        let converted = convert(
            dec!(1000),
            Currency::Secondary,
            rate(dec!(100)),
            Some(rate(dec!(125))),
        );
        assert_eq!(converted, dec!(8));
    }

    #[test]
    fn test_checked_convert_reports_overflow() {
        let tiny = rate(dec!(0.001));
        assert_eq!(
            checked_convert(dec!(1000), Currency::Secondary, rate(dec!(100)), Some(tiny)),
            Some(dec!(1000000))
        );
        assert_eq!(
            checked_convert(Decimal::MAX, Currency::Secondary, tiny, None),
            None
        );
        assert_eq!(
            checked_convert(Decimal::MAX, Currency::Primary, tiny, None),
            Some(Decimal::MAX)
        );
    }

    #[test]
    fn test_non_positive_rate_rejected() {
        assert_eq!(
            ExchangeRate::new(Decimal::ZERO),
            Err(FxError::NonPositiveRate { rate: Decimal::ZERO })
        );
        assert!(ExchangeRate::new(dec!(-1)).is_err());
    }

    #[test]
    fn test_rate_deserialization_validates() {
        let ok: ExchangeRate = serde_json::from_str("\"115.5\"").unwrap();
        assert_eq!(ok.value(), dec!(115.5));
        assert!(serde_json::from_str::<ExchangeRate>("\"0\"").is_err());
    }

    #[test]
    fn test_currency_pair_resolution() {
        let pair = CurrencyPair::new("SGD", "JPY");
        assert_eq!(pair.resolve("SGD").unwrap(), Currency::Primary);
        assert_eq!(pair.resolve(" jpy ").unwrap(), Currency::Secondary);
        assert_eq!(pair.resolve("secondary").unwrap(), Currency::Secondary);
        assert!(matches!(
            pair.resolve("USD"),
            Err(FxError::UnknownCurrency { .. })
        ));
    }
}
