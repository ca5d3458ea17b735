//! Ledger amounts and fee rates.
//!
//! Amounts are integer satoshi to avoid floating-point errors. The node's JSON
//! interface speaks decimal BTC; conversion happens only at that boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

use crate::error::TypesError;

/// Satoshi per BTC.
pub const SAT_PER_BTC: u64 = 100_000_000;

/// An amount of the ledger currency, in satoshi.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Self = Self(0);

    pub const fn from_sat(sat: u64) -> Self {
        Self(sat)
    }

    pub fn to_sat(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Convert a decimal BTC value as reported by the node, rounding to the
    /// nearest satoshi.
    pub fn from_btc(btc: f64) -> Result<Self, TypesError> {
        if !btc.is_finite() || btc < 0.0 {
            return Err(TypesError::InvalidAmount(btc.to_string()));
        }
        let sat = (btc * SAT_PER_BTC as f64).round();
        if sat > u64::MAX as f64 {
            return Err(TypesError::InvalidAmount(btc.to_string()));
        }
        Ok(Self(sat as u64))
    }

    pub fn to_btc(&self) -> f64 {
        self.0 as f64 / SAT_PER_BTC as f64
    }

    /// Exact decimal BTC string with eight fractional digits, e.g. `0.00001111`.
    pub fn to_btc_string(&self) -> String {
        format!("{}.{:08}", self.0 / SAT_PER_BTC, self.0 % SAT_PER_BTC)
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl Add for Amount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Amount {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, a| acc + a)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} sat", self.0)
    }
}

/// Fee rate in satoshi per 1000 virtual bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeeRate(u64);

impl FeeRate {
    pub const fn from_sat_per_kvb(rate: u64) -> Self {
        Self(rate)
    }

    /// Convert `estimatesmartfee`'s BTC/kvB figure.
    pub fn from_btc_per_kvb(btc: f64) -> Result<Self, TypesError> {
        Amount::from_btc(btc).map(|a| Self(a.to_sat()))
    }

    pub fn to_sat_per_kvb(&self) -> u64 {
        self.0
    }

    /// Absolute fee for a transaction of `vsize` virtual bytes, rounded up.
    pub fn fee_for_vsize(&self, vsize: u64) -> Amount {
        let scaled = u128::from(self.0) * u128::from(vsize);
        let fee = scaled.div_ceil(1000);
        Amount(u64::try_from(fee).unwrap_or(u64::MAX))
    }
}

impl fmt::Display for FeeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} sat/kvB", self.0)
    }
}

/// Serde adapter for fields the node reports as decimal BTC.
///
/// Use as `#[serde(with = "notary_types::amount::btc")]`.
pub mod btc {
    use super::Amount;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(amount: &Amount, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(amount.to_btc())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Amount, D::Error> {
        let btc = f64::deserialize(d)?;
        Amount::from_btc(btc).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn btc_conversion_rounds_to_nearest_sat() {
        assert_eq!(Amount::from_btc(0.00001111).unwrap(), Amount::from_sat(1111));
        assert_eq!(Amount::from_btc(1.0).unwrap(), Amount::from_sat(SAT_PER_BTC));
        assert_eq!(Amount::from_btc(0.1 + 0.2).unwrap(), Amount::from_sat(30_000_000));
    }

    #[test]
    fn negative_and_nan_rejected() {
        assert!(Amount::from_btc(-0.1).is_err());
        assert!(Amount::from_btc(f64::NAN).is_err());
    }

    #[test]
    fn btc_string_is_exact() {
        assert_eq!(Amount::from_sat(1111).to_btc_string(), "0.00001111");
        assert_eq!(Amount::from_sat(150_000_000).to_btc_string(), "1.50000000");
        assert_eq!(Amount::ZERO.to_btc_string(), "0.00000000");
    }

    #[test]
    fn fee_for_vsize_rounds_up() {
        let rate = FeeRate::from_sat_per_kvb(1000);
        assert_eq!(rate.fee_for_vsize(255), Amount::from_sat(255));
        let rate = FeeRate::from_sat_per_kvb(1001);
        assert_eq!(rate.fee_for_vsize(255), Amount::from_sat(256)); // 255.255 -> 256
        assert_eq!(FeeRate::from_sat_per_kvb(0).fee_for_vsize(255), Amount::ZERO);
    }

    #[test]
    fn fee_rate_from_btc_per_kvb() {
        let rate = FeeRate::from_btc_per_kvb(0.00012).unwrap();
        assert_eq!(rate.to_sat_per_kvb(), 12_000);
        assert_eq!(rate.fee_for_vsize(255), Amount::from_sat(3060));
    }

    #[test]
    fn sum_of_amounts() {
        let total: Amount = [1, 2, 3].into_iter().map(Amount::from_sat).sum();
        assert_eq!(total, Amount::from_sat(6));
    }
}
