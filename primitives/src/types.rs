// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{ADDRESS_LENGTH, PrimitivesError};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;
use std::str::FromStr;

/// `Address` identifies a signer or a vote target: the last 20 bytes of the
/// keccak hash of an uncompressed secp256k1 public key.
///
/// Ordering is bytewise, which is the order every outward-facing signer
/// listing uses.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub [u8; ADDRESS_LENGTH]);

impl Address {
    pub const fn zero() -> Self {
        Address([0u8; ADDRESS_LENGTH])
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let raw: [u8; ADDRESS_LENGTH] =
            bytes
                .try_into()
                .map_err(|_| PrimitivesError::InvalidLength {
                    expected: ADDRESS_LENGTH,
                    actual: bytes.len(),
                })?;
        Ok(Address(raw))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Address {
    type Err = PrimitivesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes =
            hex::decode(stripped).map_err(|e| PrimitivesError::InvalidHex(e.to_string()))?;
        Address::from_slice(&bytes)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// `BlockNonce` is the 64-bit nonce field of a header.
///
/// The proof-of-authority engine reads it as a vote direction, the LDPC engine
/// as the search counter that produced the seal.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BlockNonce(pub [u8; 8]);

impl BlockNonce {
    /// Magic nonce number to vote on adding a new signer.
    pub const AUTH: BlockNonce = BlockNonce([0xff; 8]);
    /// Magic nonce number to vote on removing a signer.
    pub const DROP: BlockNonce = BlockNonce([0x00; 8]);

    pub fn from_u64(n: u64) -> Self {
        BlockNonce(n.to_be_bytes())
    }

    pub fn as_u64(&self) -> u64 {
        u64::from_be_bytes(self.0)
    }
}

impl fmt::Debug for BlockNonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Hex (de)serialization of an `H256` for use with `#[serde(with = "serde_h256")]`.
pub mod serde_h256 {
    use keccak_hash::H256;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(hash: &H256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(hash.as_bytes())))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<H256, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(de::Error::custom)?;
        if bytes.len() != 32 {
            return Err(de::Error::invalid_length(bytes.len(), &"32 bytes"));
        }
        Ok(H256::from_slice(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_roundtrip_through_string() {
        let addr = Address([0xab; ADDRESS_LENGTH]);
        let encoded = addr.to_string();
        assert_eq!(encoded, format!("0x{}", "ab".repeat(ADDRESS_LENGTH)));
        assert_eq!(encoded.parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn test_address_rejects_wrong_length() {
        let err = "0x0102".parse::<Address>().unwrap_err();
        assert_eq!(
            err,
            PrimitivesError::InvalidLength {
                expected: ADDRESS_LENGTH,
                actual: 2
            }
        );
    }

    #[test]
    fn test_address_ordering_is_bytewise() {
        let mut low = [0u8; ADDRESS_LENGTH];
        low[19] = 0xff;
        let mut high = [0u8; ADDRESS_LENGTH];
        high[0] = 0x01;
        assert!(Address(low) < Address(high));
    }

    #[test]
    fn test_block_nonce_vote_magics() {
        assert_eq!(BlockNonce::AUTH.as_u64(), u64::MAX);
        assert_eq!(BlockNonce::DROP.as_u64(), 0);
        assert_eq!(BlockNonce::from_u64(0x0102).0, [0, 0, 0, 0, 0, 0, 1, 2]);
    }
}
