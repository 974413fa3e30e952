//! Strong type definitions for Ledgerlink.
//!
//! Account identities and coin amounts are newtypes so that addresses,
//! denominations and raw bytes cannot be confused at compile time.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Length of an account address in bytes.
pub const ADDRESS_LEN: usize = 20;

/// A 20-byte account identity.
///
/// Rendered as lowercase hex in text and JSON form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccAddress(pub [u8; ADDRESS_LEN]);

impl AccAddress {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let bytes = hex::decode(s).map_err(|e| CoreError::InvalidAddress(format!("{s}: {e}")))?;
        let arr: [u8; ADDRESS_LEN] = bytes.as_slice().try_into().map_err(|_| {
            CoreError::InvalidAddress(format!(
                "{s}: expected {ADDRESS_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for AccAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccAddress({})", self.to_hex())
    }
}

impl fmt::Display for AccAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for AccAddress {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl AsRef<[u8]> for AccAddress {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; ADDRESS_LEN]> for AccAddress {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

impl Serialize for AccAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for AccAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A single coin amount of one denomination.
///
/// Amounts are signed so that malformed (negative) fees can be represented
/// and rejected by validation instead of failing to decode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    #[serde(with = "as_string")]
    pub amount: i128,
}

impl Coin {
    /// Create a new coin.
    pub fn new(amount: i128, denom: impl Into<String>) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    /// Check if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.amount < 0
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// An ordered list of coins.
///
/// Serializes as a JSON array; an empty set is `[]`, never `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Coins(pub Vec<Coin>);

impl Coins {
    /// Create from a list of coins.
    pub fn new(coins: Vec<Coin>) -> Self {
        Self(coins)
    }

    /// An empty coin set.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Coin> {
        self.0.iter()
    }

    /// Check if any component is negative.
    pub fn is_any_negative(&self) -> bool {
        self.0.iter().any(Coin::is_negative)
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, coin) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{coin}")?;
        }
        Ok(())
    }
}

impl From<Vec<Coin>> for Coins {
    fn from(coins: Vec<Coin>) -> Self {
        Self(coins)
    }
}

impl FromIterator<Coin> for Coins {
    fn from_iter<I: IntoIterator<Item = Coin>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Serde adapter rendering integers as JSON strings.
///
/// The ledger's JSON encoding represents 64-bit and wider integers as
/// strings; sign bytes must follow the same convention.
pub mod as_string {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::fmt;
    use std::str::FromStr;

    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: fmt::Display,
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr,
        T::Err: fmt::Display,
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Serde adapter rendering byte strings as base64.
pub mod as_base64 {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        BASE64.decode(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_hex_roundtrip() {
        let addr = AccAddress::from_bytes([0x42; ADDRESS_LEN]);
        let recovered = AccAddress::from_hex(&addr.to_hex()).unwrap();
        assert_eq!(addr, recovered);
    }

    #[test]
    fn test_address_wrong_length() {
        let result = AccAddress::from_hex("abcd");
        assert!(matches!(result, Err(CoreError::InvalidAddress(_))));
    }

    #[test]
    fn test_address_json_is_hex_string() {
        let addr = AccAddress::from_bytes([0xab; ADDRESS_LEN]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(ADDRESS_LEN)));
    }

    #[test]
    fn test_coin_amount_is_string() {
        let coin = Coin::new(-5, "stake");
        let json = serde_json::to_string(&coin).unwrap();
        assert_eq!(json, r#"{"denom":"stake","amount":"-5"}"#);

        let decoded: Coin = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, coin);
    }

    #[test]
    fn test_coins_negative_and_display() {
        let coins = Coins::new(vec![Coin::new(10, "stake"), Coin::new(-3, "atom")]);
        assert!(coins.is_any_negative());
        assert_eq!(coins.to_string(), "10stake,-3atom");
        assert!(!Coins::new(vec![Coin::new(0, "stake")]).is_any_negative());
    }

    #[test]
    fn test_empty_coins_serialize_as_array() {
        assert_eq!(serde_json::to_string(&Coins::empty()).unwrap(), "[]");
    }
}
