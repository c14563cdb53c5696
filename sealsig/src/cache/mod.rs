// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{SealError, recover_address, seal_hash};
use consensus_suite_primitives::{Address, EXTRA_SEAL, H256, Header};
use hashlink::LruCache;
use parking_lot::Mutex;
use tracing::trace;


/// Number of recent block signatures to keep in memory
pub const DEFAULT_SIGNATURE_CACHE_SIZE: usize = 4096;

/// Recovers header signers, remembering the result per header hash.
///
/// Replaying the same headers during a reorg or a batch import would otherwise
/// repeat the elliptic curve recovery for every snapshot rebuilt.
pub struct SignatureCache {
    signers: Mutex<LruCache<H256, Address>>,
}

impl Default for SignatureCache {
    fn default() -> Self {
        Self::new(DEFAULT_SIGNATURE_CACHE_SIZE)
    }
}

impl SignatureCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            signers: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Extracts the address of the account that sealed `header`.
    pub fn recover(&self, header: &Header) -> Result<Address, SealError> {
        let hash = header.hash();
        if let Some(signer) = self.signers.lock().get(&hash) {
            return Ok(*signer);
        }

        if header.extra.len() < EXTRA_SEAL {
            return Err(SealError::MissingSignature);
        }
        let signature = &header.extra[header.extra.len() - EXTRA_SEAL..];
        let signer = recover_address(&seal_hash(header)?, signature)?;
        trace!(number = header.number, %signer, "recovered header signer");

        self.signers.lock().insert(hash, signer);
        Ok(signer)
    }

    pub fn len(&self) -> usize {
        self.signers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
