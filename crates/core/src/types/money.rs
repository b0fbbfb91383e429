//! Monetary amounts using decimal arithmetic.
//!
//! The shop trades in a single currency, so `Money` is a non-negative
//! decimal with two fractional digits, matching the `NUMERIC(9, 2)`
//! columns it is stored in.

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing [`Money`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The input is not a decimal number.
    #[error("not a valid amount: {0}")]
    Invalid(String),
    /// The amount is below zero.
    #[error("amount cannot be negative")]
    Negative,
    /// The amount does not fit `NUMERIC(9, 2)`.
    #[error("amount must be below {max}")]
    TooLarge {
        /// Exclusive upper bound.
        max: Decimal,
    },
}

/// A non-negative amount of money with two decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Exclusive upper bound imposed by `NUMERIC(9, 2)`.
    pub const LIMIT: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 2);

    /// Zero.
    #[must_use]
    pub const fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Create an amount, rounding to cents.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Negative` for amounts below zero and
    /// `MoneyError::TooLarge` for amounts that overflow the column.
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative);
        }
        let amount = amount.round_dp(2);
        if amount >= Self::LIMIT {
            return Err(MoneyError::TooLarge { max: Self::LIMIT });
        }
        Ok(Self(amount))
    }

    /// Create an amount from a whole number of cents.
    #[must_use]
    pub fn from_cents(cents: u32) -> Self {
        Self(Decimal::new(i64::from(cents), 2))
    }

    /// The underlying decimal.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// The price of `qty` units at this unit price.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::TooLarge` if the result does not fit the column.
    pub fn checked_times(self, qty: u32) -> Result<Self, MoneyError> {
        let amount = self
            .0
            .checked_mul(Decimal::from(qty))
            .ok_or(MoneyError::TooLarge { max: Self::LIMIT })?;
        Self::new(amount)
    }

    /// Sum of amounts.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::TooLarge` if the total does not fit the column.
    pub fn checked_sum<I>(amounts: I) -> Result<Self, MoneyError>
    where
        I: IntoIterator<Item = Self>,
    {
        amounts.into_iter().try_fold(Self::zero(), |total, amount| {
            let sum = total
                .0
                .checked_add(amount.0)
                .ok_or(MoneyError::TooLarge { max: Self::LIMIT })?;
            Self::new(sum)
        })
    }

    /// Whether the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount =
            Decimal::from_str(s.trim()).map_err(|_| MoneyError::Invalid(s.to_owned()))?;
        Self::new(amount)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Money {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Money {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Money {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_two_decimals() {
        assert_eq!(Money::from_cents(5_000_000).to_string(), "50000.00");
        assert_eq!(Money::zero().to_string(), "0.00");
        assert_eq!("19.9".parse::<Money>().unwrap().to_string(), "19.90");
    }

    #[test]
    fn test_checked_times() {
        let price: Money = "1299.99".parse().unwrap();
        assert_eq!(price.checked_times(3).unwrap().to_string(), "3899.97");
        assert!(price.checked_times(0).unwrap().is_zero());
        assert!(Money::zero().checked_times(u32::MAX).unwrap().is_zero());
    }

    #[test]
    fn test_checked_times_stays_below_limit() {
        let price: Money = "1299.00".parse().unwrap();
        assert_eq!(
            price.checked_times(1_000_000),
            Err(MoneyError::TooLarge { max: Money::LIMIT })
        );
        assert_eq!(
            price.checked_times(7_698).unwrap().to_string(),
            "9999702.00"
        );
        assert!(price.checked_times(7_699).is_err());
    }

    #[test]
    fn test_checked_sum() {
        let lines = [Money::from_cents(150), Money::from_cents(250)];
        assert_eq!(Money::checked_sum(lines).unwrap(), Money::from_cents(400));
        assert_eq!(Money::checked_sum(Vec::new()).unwrap(), Money::zero());
    }

    #[test]
    fn test_checked_sum_stays_below_limit() {
        let near_limit: Money = "6000000.00".parse().unwrap();
        assert_eq!(
            Money::checked_sum([near_limit, near_limit]),
            Err(MoneyError::TooLarge { max: Money::LIMIT })
        );
    }

    #[test]
    fn test_rejects_negative_and_overflow() {
        assert_eq!("-1".parse::<Money>(), Err(MoneyError::Negative));
        assert!(matches!(
            "10000000.00".parse::<Money>(),
            Err(MoneyError::TooLarge { .. })
        ));
        assert!(matches!("abc".parse::<Money>(), Err(MoneyError::Invalid(_))));
        assert!("9999999.99".parse::<Money>().is_ok());
    }
}
