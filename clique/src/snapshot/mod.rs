// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{CliqueError, Result};
use consensus_suite_primitives::{Address, BlockNonce, H256, Header, serde_h256};
use consensus_suite_sealsig::SignatureCache;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;


/// A single vote that an authorized signer made to modify the list of
/// authorizations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    /// Authorized signer that cast this vote
    pub signer: Address,
    /// Block number the vote was cast in (expire old votes)
    pub block: u64,
    /// Account being voted on to change its authorization
    pub address: Address,
    /// Whether to authorize or deauthorize the voted account
    pub authorize: bool,
}

/// Running tally of the pending votes on one account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    /// Whether the vote is about authorizing or kicking someone
    pub authorize: bool,
    /// Number of votes until now wanting to pass the proposal
    pub votes: usize,
}

/// State of the authorization voting as of a given block.
///
/// Snapshots are values: [`Snapshot::apply`] returns a new snapshot and never
/// touches the one it was called on, so readers holding an older snapshot are
/// unaffected by later headers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Block number where the snapshot was created
    pub number: u64,
    /// Block hash where the snapshot was created
    #[serde(with = "serde_h256")]
    pub hash: H256,
    /// Set of authorized signers at this moment
    pub signers: BTreeSet<Address>,
    /// Set of recent signers for spam protections
    pub recents: BTreeMap<u64, Address>,
    /// List of votes cast in chronological order
    pub votes: Vec<Vote>,
    /// Current vote tally to avoid recalculating
    pub tally: BTreeMap<Address, Tally>,
}

impl Snapshot {
    /// Creates a snapshot with the given startup signers. Only the genesis
    /// block seeds a snapshot this way.
    pub fn new(number: u64, hash: H256, signers: impl IntoIterator<Item = Address>) -> Self {
        Snapshot {
            number,
            hash,
            signers: signers.into_iter().collect(),
            recents: BTreeMap::new(),
            votes: Vec::new(),
            tally: BTreeMap::new(),
        }
    }

    /// Authorized signers in ascending order.
    pub fn signers(&self) -> Vec<Address> {
        self.signers.iter().copied().collect()
    }

    /// Number of consecutive blocks a signer has to wait before signing again.
    pub fn signer_limit(&self) -> u64 {
        self.signers.len() as u64 / 2 + 1
    }

    /// Returns whether `signer` is the in-turn signer of block `number`.
    pub fn inturn(&self, number: u64, signer: &Address) -> bool {
        let len = self.signers.len() as u64;
        if len == 0 {
            return false;
        }
        match self.signers.iter().position(|s| s == signer) {
            Some(offset) => number % len == offset as u64,
            None => false,
        }
    }

    /// Returns whether `signer` sealed a block too recently to seal `number`.
    pub fn recently_signed(&self, number: u64, signer: &Address) -> bool {
        let limit = self.signer_limit();
        self.recents
            .iter()
            .any(|(seen, recent)| recent == signer && seen + limit > number)
    }

    /// A vote is only meaningful if it would change the target's membership.
    pub fn valid_vote(&self, address: &Address, authorize: bool) -> bool {
        self.signers.contains(address) != authorize
    }

    /// Adds a new vote into the tally.
    fn cast(&mut self, address: Address, authorize: bool) -> bool {
        if !self.valid_vote(&address, authorize) {
            return false;
        }
        self.tally
            .entry(address)
            .and_modify(|tally| tally.votes += 1)
            .or_insert(Tally {
                authorize,
                votes: 1,
            });
        true
    }

    /// Removes a previously cast vote from the tally.
    fn uncast(&mut self, address: &Address, authorize: bool) -> bool {
        let Some(tally) = self.tally.get_mut(address) else {
            return false;
        };
        // Ensure we only revert counted votes
        if tally.authorize != authorize {
            return false;
        }
        if tally.votes > 1 {
            tally.votes -= 1;
        } else {
            self.tally.remove(address);
        }
        true
    }

    /// Creates a new snapshot by replaying `headers` on top of this one.
    ///
    /// The headers must directly follow the snapshot's block, in ascending
    /// order. The threshold is re-checked after every single vote, so a
    /// deauthorization that shrinks the signer set can push a pending vote
    /// over the line as soon as its target is touched again.
    pub fn apply(
        &self,
        headers: &[Header],
        epoch: u64,
        signatures: &SignatureCache,
    ) -> Result<Snapshot> {
        let Some(last) = headers.last() else {
            return Ok(self.clone());
        };
        if headers
            .windows(2)
            .any(|pair| pair[1].number != pair[0].number + 1)
        {
            return Err(CliqueError::InvalidVotingChain);
        }
        if headers[0].number != self.number + 1 {
            return Err(CliqueError::InvalidVotingChain);
        }

        let mut snap = self.clone();
        for header in headers {
            let number = header.number;
            // Votes never cross an epoch boundary
            if number.checked_rem(epoch) == Some(0) {
                snap.votes.clear();
                snap.tally.clear();
            }
            // Delete the oldest signer from the recent list to allow it signing again
            let limit = snap.signer_limit();
            if number >= limit {
                snap.recents.remove(&(number - limit));
            }

            let signer = signatures.recover(header)?;
            if !snap.signers.contains(&signer) {
                return Err(CliqueError::UnauthorizedSigner(signer));
            }
            if snap.recents.values().any(|recent| *recent == signer) {
                return Err(CliqueError::RecentlySigned(signer));
            }
            snap.recents.insert(number, signer);

            // Header authorized, discard any previous vote from the signer on this target
            let target = header.coinbase;
            if let Some(pos) = snap
                .votes
                .iter()
                .position(|vote| vote.signer == signer && vote.address == target)
            {
                let vote = snap.votes.remove(pos);
                snap.uncast(&vote.address, vote.authorize);
            }

            let authorize = if header.nonce == BlockNonce::AUTH {
                true
            } else if header.nonce == BlockNonce::DROP {
                false
            } else {
                return Err(CliqueError::InvalidVote);
            };
            if target.is_zero() {
                continue;
            }
            if snap.cast(target, authorize) {
                snap.votes.push(Vote {
                    signer,
                    block: number,
                    address: target,
                    authorize,
                });
            }

            // If the vote passed, update the list of signers
            let Some(tally) = snap.tally.get(&target).copied() else {
                continue;
            };
            if tally.votes <= snap.signers.len() / 2 {
                continue;
            }
            if tally.authorize {
                snap.signers.insert(target);
                debug!(number, %target, "signer authorized");
            } else {
                snap.signers.remove(&target);
                debug!(number, %target, "signer deauthorized");

                // Signer list shrunk, delete any leftover recent caches
                let limit = snap.signer_limit();
                if number >= limit {
                    snap.recents.remove(&(number - limit));
                }
                // Discard any previous votes the deauthorized signer cast
                let (stale, kept): (Vec<Vote>, Vec<Vote>) = std::mem::take(&mut snap.votes)
                    .into_iter()
                    .partition(|vote| vote.signer == target);
                snap.votes = kept;
                for vote in stale {
                    snap.uncast(&vote.address, vote.authorize);
                }
            }
            // Discard any previous votes around the just changed account
            snap.votes.retain(|vote| vote.address != target);
            snap.tally.remove(&target);
        }

        snap.number += headers.len() as u64;
        snap.hash = last.hash();
        Ok(snap)
    }

    /// Encodes the snapshot into the blob persisted at checkpoints.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| CliqueError::Serialization(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Snapshot> {
        serde_json::from_slice(bytes).map_err(|e| CliqueError::Serialization(e.to_string()))
    }
}
