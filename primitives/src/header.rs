// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{Address, BlockNonce};
use keccak_hash::{H256, keccak};
use num_bigint::BigUint;

/// Canonical hash of an empty uncle list, `keccak256(rlp([]))`.
pub const EMPTY_UNCLE_HASH: H256 = H256([
    0x1d, 0xcc, 0x4d, 0xe8, 0xde, 0xc7, 0x5d, 0x7a, 0xab, 0x85, 0xb5, 0x67, 0xb6, 0xcc, 0xd4, 0x1a,
    0xd3, 0x12, 0x45, 0x1b, 0x94, 0x8a, 0x74, 0x13, 0xf0, 0xa1, 0x42, 0xfd, 0x40, 0xd4, 0x93, 0x47,
]);

/// Block header as supplied by the chain driver.
///
/// Engines never own headers; they read them to validate, and fill in the
/// consensus fields when preparing or sealing a candidate.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Header {
    /// Hash of the parent header
    pub parent_hash: H256,
    /// Hash of the uncle list
    pub uncle_hash: H256,
    /// Beneficiary; the vote target in the proof-of-authority engine
    pub coinbase: Address,
    /// State root, opaque to the engines
    pub root: H256,
    pub number: u64,
    pub gas_limit: u64,
    pub gas_used: u64,
    /// Unix timestamp in seconds
    pub time: u64,
    pub difficulty: BigUint,
    /// Vanity prefix, optional checkpoint signer list and trailing seal
    pub extra: Vec<u8>,
    /// Zero in proof-of-authority, the 40-byte seed pre-image in LDPC
    pub mix_digest: Vec<u8>,
    pub nonce: BlockNonce,
    /// Packed LDPC codeword, MSB first
    pub codeword: Vec<u8>,
    /// Number of meaningful bits in `codeword`
    pub code_length: u64,
}

impl Header {
    /// Hash of the complete header, seal included.
    pub fn hash(&self) -> H256 {
        keccak(self.encode(&self.extra, true))
    }

    /// Hash of the header without the proof-of-work seal fields
    /// (mix digest, nonce and codeword).
    pub fn hash_no_nonce(&self) -> H256 {
        keccak(self.encode(&self.extra, false))
    }

    /// Serializes the header with `extra` standing in for the extra-data field.
    ///
    /// Fixed-width fields are written big-endian, variable-width fields are
    /// prefixed with their length as a big-endian `u32`. When `with_seal` is
    /// false the mix digest, nonce and codeword are left out.
    pub fn encode(&self, extra: &[u8], with_seal: bool) -> Vec<u8> {
        let difficulty = self.difficulty.to_bytes_be();
        let mut buf = Vec::with_capacity(
            32 * 3 + 20 + 8 * 5 + 4 * 4 + difficulty.len() + extra.len() + self.mix_digest.len()
                + self.codeword.len(),
        );

        buf.extend_from_slice(self.parent_hash.as_bytes());
        buf.extend_from_slice(self.uncle_hash.as_bytes());
        buf.extend_from_slice(self.coinbase.as_bytes());
        buf.extend_from_slice(self.root.as_bytes());
        buf.extend_from_slice(&self.number.to_be_bytes());
        buf.extend_from_slice(&self.gas_limit.to_be_bytes());
        buf.extend_from_slice(&self.gas_used.to_be_bytes());
        buf.extend_from_slice(&self.time.to_be_bytes());
        put_var(&mut buf, &difficulty);
        put_var(&mut buf, extra);
        buf.extend_from_slice(&self.code_length.to_be_bytes());
        if with_seal {
            put_var(&mut buf, &self.mix_digest);
            buf.extend_from_slice(&self.nonce.0);
            put_var(&mut buf, &self.codeword);
        }
        buf
    }
}

fn put_var(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    buf.extend_from_slice(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Header {
        Header {
            number: 7,
            time: 1_700_000_000,
            difficulty: BigUint::from(2u32),
            extra: vec![0u8; 97],
            uncle_hash: EMPTY_UNCLE_HASH,
            ..Default::default()
        }
    }

    #[test]
    fn test_hash_covers_nonce() {
        let header = sample();
        let mut voted = header.clone();
        voted.nonce = BlockNonce::AUTH;
        assert_ne!(header.hash(), voted.hash());
        assert_eq!(header.hash_no_nonce(), voted.hash_no_nonce());
    }

    #[test]
    fn test_encode_substitutes_extra() {
        let header = sample();
        let full = header.encode(&header.extra, true);
        let trimmed = header.encode(&header.extra[..32], true);
        assert_eq!(full.len() - trimmed.len(), 65);
    }

    #[test]
    fn test_empty_uncle_hash_constant() {
        assert_eq!(
            hex::encode(EMPTY_UNCLE_HASH.as_bytes()),
            "1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347"
        );
    }
}
