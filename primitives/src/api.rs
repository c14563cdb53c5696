// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{Address, ChainConfig, H256, Header};

/// Read access to the local header chain.
///
/// Engines only ever look headers up; insertion, reorgs and fork choice stay
/// with the chain driver. Implementations must be safe for concurrent use,
/// batch verification calls into the reader from several worker threads.
pub trait ChainReader: Send + Sync {
    /// Chain configuration, including the engine parameters
    fn config(&self) -> &ChainConfig;

    /// Head of the local canonical chain
    fn current_header(&self) -> Option<Header>;

    /// Retrieves a header by hash and number
    fn get_header(&self, hash: &H256, number: u64) -> Option<Header>;

    /// Retrieves a header by hash alone
    fn get_header_by_hash(&self, hash: &H256) -> Option<Header>;

    /// Retrieves a canonical header by number
    fn get_header_by_number(&self, number: u64) -> Option<Header>;
}

/// Signing backend holding the local sealing identity.
///
/// This method must be safe for concurrent use.
pub trait Signer: Send + Sync {
    /// Signs `digest` with the key behind `account`
    ///
    /// # Returns
    /// The 65 byte recoverable signature: 64 byte compact form followed by the
    /// recovery id
    fn sign(&self, account: &Address, digest: &H256) -> anyhow::Result<Vec<u8>>;
}
