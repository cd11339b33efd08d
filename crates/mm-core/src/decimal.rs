//! Precision-safe decimal types for trading.
//!
//! Uses `rust_decimal` for exact decimal arithmetic, avoiding
//! floating-point rounding errors critical in financial calculations.

use crate::error::CoreError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};
use std::str::FromStr;

/// Price with exact decimal precision.
///
/// Wraps `Decimal` to provide type safety and prevent mixing
/// prices with quantities in calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Truncate toward zero to `scale` decimal places.
    ///
    /// Exchanges reject over-precise prices; truncation (never rounding)
    /// guarantees the submitted price is not more aggressive than intended.
    #[inline]
    pub fn trunc_to_scale(&self, scale: u32) -> Self {
        Self(self.0.trunc_with_scale(scale))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = CoreError;

    /// Parses a non-negative decimal price.
    fn from_str(s: &str) -> crate::error::Result<Self> {
        let value: Decimal = s.parse()?;
        if value.is_sign_negative() {
            return Err(CoreError::InvalidPrice(s.to_string()));
        }
        Ok(Self(value))
    }
}

impl From<Decimal> for Price {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Price {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<Decimal> for Price {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Div<Decimal> for Price {
    type Output = Self;

    fn div(self, rhs: Decimal) -> Self::Output {
        Self(self.0 / rhs)
    }
}

/// Quantity with exact decimal precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Size(pub Decimal);

impl Size {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Truncate toward zero to `scale` decimal places.
    #[inline]
    pub fn trunc_to_scale(&self, scale: u32) -> Self {
        Self(self.0.trunc_with_scale(scale))
    }

    /// Notional value: quantity * price.
    #[inline]
    pub fn notional(&self, price: Price) -> Decimal {
        self.0 * price.0
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Size {
    type Err = CoreError;

    /// Parses a non-negative decimal quantity.
    fn from_str(s: &str) -> crate::error::Result<Self> {
        let value: Decimal = s.parse()?;
        if value.is_sign_negative() {
            return Err(CoreError::InvalidQuantity(s.to_string()));
        }
        Ok(Self(value))
    }
}

impl From<Decimal> for Size {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl Add for Size {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Size {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<Decimal> for Size {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Div<Decimal> for Size {
    type Output = Self;

    fn div(self, rhs: Decimal) -> Self::Output {
        Self(self.0 / rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_price_trunc_to_scale() {
        let price = Price::new(dec!(0.00012389));
        assert_eq!(price.trunc_to_scale(6).inner(), dec!(0.000123));
    }

    #[test]
    fn test_trunc_never_rounds_up() {
        let price = Price::new(dec!(1.999));
        assert_eq!(price.trunc_to_scale(2).inner(), dec!(1.99));
    }

    #[test]
    fn test_trunc_idempotent_at_scale() {
        let qty = Size::new(dec!(1234.56));
        assert_eq!(qty.trunc_to_scale(2), qty);
    }

    #[test]
    fn test_notional_calculation() {
        let qty = Size::new(dec!(1000));
        let price = Price::new(dec!(0.0002));
        assert_eq!(qty.notional(price), dec!(0.2000));
    }

    #[test]
    fn test_parse_rejects_negative_values() {
        assert!(matches!(
            "-1.5".parse::<Price>(),
            Err(CoreError::InvalidPrice(_))
        ));
        assert!(matches!(
            "-10".parse::<Size>(),
            Err(CoreError::InvalidQuantity(_))
        ));
        assert_eq!("1.5".parse::<Price>().unwrap(), Price::new(dec!(1.5)));
        assert_eq!("0".parse::<Size>().unwrap(), Size::ZERO);
    }

    #[test]
    fn test_parse_propagates_decimal_errors() {
        assert!(matches!(
            "not-a-number".parse::<Price>(),
            Err(CoreError::DecimalParse(_))
        ));
    }

    #[test]
    fn test_price_mid_arithmetic() {
        let bid = Price::new(dec!(99));
        let ask = Price::new(dec!(101));
        let mid = (bid + ask) / dec!(2);
        assert_eq!(mid.inner(), dec!(100));
    }
}
