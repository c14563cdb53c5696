// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{ChainConfig, ChainReader, H256, Header};
use ahash::HashMap;
use parking_lot::RwLock;

/// In-memory header chain for tests.
///
/// Every inserted header becomes the canonical header at its height and the
/// new head of the chain.
#[derive(Default)]
pub struct MemoryChain {
    config: ChainConfig,
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    by_hash: HashMap<H256, Header>,
    canonical: HashMap<u64, H256>,
    head: Option<H256>,
}

impl MemoryChain {
    pub fn new(config: ChainConfig) -> Self {
        Self {
            config,
            inner: RwLock::default(),
        }
    }

    pub fn insert(&self, header: Header) {
        let hash = header.hash();
        let mut inner = self.inner.write();
        inner.canonical.insert(header.number, hash);
        inner.by_hash.insert(hash, header);
        inner.head = Some(hash);
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ChainReader for MemoryChain {
    fn config(&self) -> &ChainConfig {
        &self.config
    }

    fn current_header(&self) -> Option<Header> {
        let inner = self.inner.read();
        inner.head.and_then(|hash| inner.by_hash.get(&hash).cloned())
    }

    fn get_header(&self, hash: &H256, number: u64) -> Option<Header> {
        self.inner
            .read()
            .by_hash
            .get(hash)
            .filter(|h| h.number == number)
            .cloned()
    }

    fn get_header_by_hash(&self, hash: &H256) -> Option<Header> {
        self.inner.read().by_hash.get(hash).cloned()
    }

    fn get_header_by_number(&self, number: u64) -> Option<Header> {
        let inner = self.inner.read();
        inner
            .canonical
            .get(&number)
            .and_then(|hash| inner.by_hash.get(hash).cloned())
    }
}
