// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{Clique, CliqueError, DIFF_IN_TURN, Result, Snapshot};
use ahash::HashMap;
use consensus_suite_primitives::{Address, BigUint, ChainReader, H256, Header};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Number of most recent blocks covered by [`CliqueApi::status`].
const STATUS_WINDOW: u64 = 64;

/// Block selector for the query methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockRef {
    /// Head of the local chain
    Latest,
    Number(u64),
    Hash(H256),
}

/// Sealing activity over the most recent blocks.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Status {
    /// Percentage of blocks sealed in turn
    pub inturn_percent: f64,
    /// Blocks sealed per signer, zero for idle signers
    pub signing_status: BTreeMap<Address, u64>,
    pub num_blocks: u64,
}

/// User-facing surface of the proof-of-authority engine: signer queries and
/// local proposal management.
pub struct CliqueApi {
    chain: Arc<dyn ChainReader>,
    clique: Arc<Clique>,
}

impl CliqueApi {
    pub fn new(chain: Arc<dyn ChainReader>, clique: Arc<Clique>) -> Self {
        Self { chain, clique }
    }

    fn resolve(&self, block: BlockRef) -> Result<Header> {
        let header = match block {
            BlockRef::Latest => self.chain.current_header(),
            BlockRef::Number(number) => self.chain.get_header_by_number(number),
            BlockRef::Hash(hash) => self.chain.get_header_by_hash(&hash),
        };
        header.ok_or(CliqueError::UnknownBlock)
    }

    /// Retrieves the state snapshot at a given block.
    pub fn get_snapshot(&self, block: BlockRef) -> Result<Arc<Snapshot>> {
        let header = self.resolve(block)?;
        self.clique
            .snapshot(self.chain.as_ref(), header.number, header.hash(), &[])
    }

    /// Retrieves the list of authorized signers at the specified block, in
    /// ascending order.
    pub fn get_signers(&self, block: BlockRef) -> Result<Vec<Address>> {
        Ok(self.get_snapshot(block)?.signers())
    }

    /// Returns the current proposals the node tries to uphold and vote on.
    pub fn proposals(&self) -> HashMap<Address, bool> {
        self.clique.proposals()
    }

    /// Injects a new authorization proposal that the signer will attempt to
    /// push through.
    pub fn propose(&self, address: Address, authorize: bool) {
        self.clique.propose(address, authorize);
    }

    /// Drops a currently running proposal.
    pub fn discard(&self, address: &Address) {
        self.clique.discard(address);
    }

    /// Reports sealing activity over the last blocks of the local chain.
    pub fn status(&self) -> Result<Status> {
        let head = self.chain.current_header().ok_or(CliqueError::UnknownBlock)?;
        let snap = self
            .clique
            .snapshot(self.chain.as_ref(), head.number, head.hash(), &[])?;

        let num_blocks = STATUS_WINDOW.min(head.number);
        let mut signing_status: BTreeMap<Address, u64> =
            snap.signers.iter().map(|signer| (*signer, 0)).collect();
        let in_turn = BigUint::from(DIFF_IN_TURN);
        let mut optimals = 0u64;
        for number in head.number - num_blocks + 1..=head.number {
            let header = self
                .chain
                .get_header_by_number(number)
                .ok_or(CliqueError::MissingBlock(number))?;
            let signer = self.clique.author(&header)?;
            if header.difficulty == in_turn {
                optimals += 1;
            }
            *signing_status.entry(signer).or_default() += 1;
        }

        let inturn_percent = if num_blocks == 0 {
            0.0
        } else {
            optimals as f64 * 100.0 / num_blocks as f64
        };
        Ok(Status {
            inturn_percent,
            signing_status,
            num_blocks,
        })
    }
}
