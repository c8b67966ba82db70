//! Fixed-point price type
//!
//! Prices use rust_decimal for deterministic arithmetic (no floating-point
//! drift in level keys or trade values). Quantities in this simulator are
//! whole share counts and stay plain `u64`; positions are `i64`; cash and
//! trade values are `Decimal`.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Price per share with fixed-point decimal representation.
///
/// Always strictly positive. Ordered, so it can key a price-level map.
/// Serialized as a string to prevent JSON number precision loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(Decimal);

impl Price {
    /// Create a new Price from a Decimal.
    ///
    /// # Panics
    /// Panics if the price is zero or negative. Use [`Price::try_new`] for
    /// untrusted input.
    pub fn new(value: Decimal) -> Self {
        assert!(value > Decimal::ZERO, "Price must be positive");
        Self(value)
    }

    /// Try to create a Price, returning None if not strictly positive.
    pub fn try_new(value: Decimal) -> Option<Self> {
        if value > Decimal::ZERO {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Create from an integer (tests and fixtures).
    pub fn from_u64(value: u64) -> Self {
        Self::new(Decimal::from(value))
    }

    /// Create from an f64, rounded to two decimal places.
    ///
    /// Returns None for non-finite, zero, or negative values. This is the
    /// entry point for agent-generated prices, which are drawn in f64 space.
    pub fn from_f64_cents(value: f64) -> Option<Self> {
        let d = Decimal::from_f64(value)?;
        Self::try_new(d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Parse from a string.
    pub fn from_str(s: &str) -> Result<Self, rust_decimal::Error> {
        let decimal = Decimal::from_str(s)?;
        Ok(Self::new(decimal))
    }

    /// Get the inner decimal value.
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Value of `quantity` shares at this price.
    pub fn value_of(&self, quantity: u64) -> Decimal {
        self.0 * Decimal::from(quantity)
    }

    /// Round to the given number of decimal places (half away from zero).
    pub fn round_dp(&self, dp: u32) -> Self {
        Self(self.0.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero))
    }
}

// Custom serialization to preserve precision.
impl Serialize for Price {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let decimal = Decimal::from_str(&s).map_err(serde::de::Error::custom)?;
        Self::try_new(decimal).ok_or_else(|| serde::de::Error::custom("Price must be positive"))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
