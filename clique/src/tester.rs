// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Deterministic named accounts for engine tests.

use ahash::HashMap;
use consensus_suite_primitives::test_utils::MemoryChain;
use consensus_suite_primitives::{
    Address, BigUint, ChainConfig, CliqueConfig, EMPTY_UNCLE_HASH, EXTRA_SEAL, EXTRA_VANITY,
    Header, keccak,
};
use consensus_suite_sealsig::{SecpSigner, seal_hash};
use std::sync::Arc;

/// Pool of accounts keyed by a human readable name, so scenarios can be
/// written as "A votes to add B".
#[derive(Default)]
pub struct TesterAccountPool {
    accounts: HashMap<String, Arc<SecpSigner>>,
}

impl TesterAccountPool {
    /// Signer for `name`, created on first use from `keccak(name)`.
    pub fn signer(&mut self, name: &str) -> Arc<SecpSigner> {
        self.accounts
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(SecpSigner::from_slice(keccak(name.as_bytes()).as_bytes()).unwrap())
            })
            .clone()
    }

    /// Address of `name`; the empty name maps to the zero address.
    pub fn address(&mut self, name: &str) -> Address {
        if name.is_empty() {
            return Address::zero();
        }
        self.signer(name).address()
    }

    /// Seals `header` in place with the key of `name`.
    pub fn sign(&mut self, header: &mut Header, name: &str) {
        let signer = self.signer(name);
        let seal = signer.sign_digest(&seal_hash(header).unwrap());
        let len = header.extra.len();
        header.extra[len - EXTRA_SEAL..].copy_from_slice(&seal);
    }

    /// Sealed, vote-free child of `parent` one second later.
    pub fn block(&mut self, parent: &Header, signer: &str, difficulty: u64) -> Header {
        let mut header = Header {
            parent_hash: parent.hash(),
            uncle_hash: EMPTY_UNCLE_HASH,
            number: parent.number + 1,
            time: parent.time + 1,
            difficulty: BigUint::from(difficulty),
            extra: vec![0u8; EXTRA_VANITY + EXTRA_SEAL],
            ..Default::default()
        };
        self.sign(&mut header, signer);
        header
    }

    /// Names sorted by their address, i.e. in signer turn order.
    pub fn turn_order<'a>(&mut self, names: &[&'a str]) -> Vec<&'a str> {
        let mut sorted = names.to_vec();
        sorted.sort_by_key(|name| self.address(name));
        sorted
    }

    /// Genesis header embedding `names` as the initial signer list, sorted by
    /// address.
    pub fn genesis(&mut self, names: &[&str]) -> Header {
        let mut signers: Vec<Address> = names.iter().map(|name| self.address(name)).collect();
        signers.sort();
        let mut extra = vec![0u8; EXTRA_VANITY];
        for signer in &signers {
            extra.extend_from_slice(signer.as_bytes());
        }
        extra.extend_from_slice(&[0u8; EXTRA_SEAL]);
        Header {
            number: 0,
            uncle_hash: EMPTY_UNCLE_HASH,
            difficulty: BigUint::from(1u32),
            extra,
            ..Default::default()
        }
    }
}

/// Chain config with the given proof-of-authority parameters.
pub fn chain_config(period: u64, epoch: u64) -> ChainConfig {
    ChainConfig {
        chain_id: 1337,
        clique: Some(CliqueConfig { period, epoch }),
        ldpc: None,
    }
}

/// In-memory chain holding only `genesis`.
pub fn chain_with_genesis(config: ChainConfig, genesis: Header) -> MemoryChain {
    let chain = MemoryChain::new(config);
    chain.insert(genesis);
    chain
}
