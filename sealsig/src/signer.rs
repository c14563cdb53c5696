// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{SealError, public_key_to_address};
use anyhow::bail;
use consensus_suite_primitives::{Address, H256, Signer};
use secp256k1::{Message, PublicKey, SECP256K1, SecretKey};

/// [`Signer`] backed by a single in-process secp256k1 secret key.
pub struct SecpSigner {
    secret_key: SecretKey,
    address: Address,
}

impl SecpSigner {
    pub fn new(secret_key: SecretKey) -> Self {
        let address = public_key_to_address(&PublicKey::from_secret_key_global(&secret_key));
        Self {
            secret_key,
            address,
        }
    }

    pub fn from_slice(secret: &[u8]) -> Result<Self, SealError> {
        let secret_key = SecretKey::from_slice(secret).map_err(SealError::InvalidSecretKey)?;
        Ok(Self::new(secret_key))
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Signs `digest` and returns the 65 byte `r || s || v` seal.
    pub fn sign_digest(&self, digest: &H256) -> Vec<u8> {
        let message = Message::from_digest(digest.0);
        let (recovery_id, compact) = SECP256K1
            .sign_ecdsa_recoverable(&message, &self.secret_key)
            .serialize_compact();

        let mut seal = Vec::with_capacity(65);
        seal.extend_from_slice(&compact);
        seal.push(recovery_id.to_i32() as u8);
        seal
    }
}

impl Signer for SecpSigner {
    fn sign(&self, account: &Address, digest: &H256) -> anyhow::Result<Vec<u8>> {
        if *account != self.address {
            bail!("unknown account {account}, signer holds {}", self.address);
        }
        Ok(self.sign_digest(digest))
    }
}
