// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Header seal signatures for the proof-of-authority engine.
//!
//! A sealed header carries a recoverable secp256k1 signature in the last
//! [`EXTRA_SEAL`] bytes of its extra-data. The signature covers the seal hash:
//! every header field except those trailing signature bytes, behind a domain
//! separation tag. Recovering the signer from it is the expensive step of
//! replaying a header chain, so [`SignatureCache`] keeps recent results keyed
//! by header hash.

mod cache;
mod signer;

pub use cache::SignatureCache;
pub use signer::SecpSigner;

use consensus_suite_primitives::{Address, EXTRA_SEAL, H256, Header, keccak};
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, SECP256K1};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SealError {
    #[error("extra-data {EXTRA_SEAL} byte signature suffix missing")]
    MissingSignature,
    #[error("invalid signature length: expected {EXTRA_SEAL} bytes, got {0}")]
    InvalidSignatureLength(usize),
    #[error("signature recovery failed: {0}")]
    Recovery(secp256k1::Error),
    #[error("invalid secret key: {0}")]
    InvalidSecretKey(secp256k1::Error),
}

/// Domain separation tag prepended to the encoded header before hashing.
const SEAL_DOMAIN: &[u8] = b"CLIQUE:";

/// Returns the hash a signer signs to seal `header`.
///
/// The trailing [`EXTRA_SEAL`] bytes of the extra-data are excluded, every
/// other field (vote nonce included) is covered.
pub fn seal_hash(header: &Header) -> Result<H256, SealError> {
    let end = header
        .extra
        .len()
        .checked_sub(EXTRA_SEAL)
        .ok_or(SealError::MissingSignature)?;
    let encoded = header.encode(&header.extra[..end], true);

    let mut buf = Vec::with_capacity(SEAL_DOMAIN.len() + encoded.len());
    buf.extend_from_slice(SEAL_DOMAIN);
    buf.extend_from_slice(&encoded);
    Ok(keccak(buf))
}

/// Recovers the address that produced `signature` over `digest`.
pub fn recover_address(digest: &H256, signature: &[u8]) -> Result<Address, SealError> {
    if signature.len() != EXTRA_SEAL {
        return Err(SealError::InvalidSignatureLength(signature.len()));
    }
    let recovery_id =
        RecoveryId::from_i32(i32::from(signature[64])).map_err(SealError::Recovery)?;
    let signature = RecoverableSignature::from_compact(&signature[..64], recovery_id)
        .map_err(SealError::Recovery)?;

    let message = Message::from_digest(digest.0);
    let public_key = SECP256K1
        .recover_ecdsa(&message, &signature)
        .map_err(SealError::Recovery)?;
    Ok(public_key_to_address(&public_key))
}

/// Derives the address of a secp256k1 public key.
pub fn public_key_to_address(public_key: &PublicKey) -> Address {
    let uncompressed = public_key.serialize_uncompressed();
    let hash = keccak(&uncompressed[1..]);
    let mut address = Address::zero();
    address.0.copy_from_slice(&hash.as_bytes()[12..]);
    address
}
