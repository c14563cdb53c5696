// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{Clique, CliqueError, DIFF_IN_TURN, DIFF_NO_TURN, Result, Snapshot};
use consensus_suite_primitives::{
    ADDRESS_LENGTH, Address, BigUint, BlockNonce, ChainReader, EMPTY_UNCLE_HASH, EXTRA_SEAL,
    EXTRA_VANITY, Header,
};
use std::time::{SystemTime, UNIX_EPOCH};
use strum_macros::Display;
use tracing::trace;

/// Progress of a header through validation.
#[derive(Display, Debug, PartialEq)]
pub enum HeaderState {
    Unchecked,
    /// Extra-data layout, vote fields and parent linkage are well formed
    ShapeValid,
    /// Sealed by an authorized signer at an allowed slot
    ConsensusValid,
    Rejected(CliqueError),
}

/// Extracts the signer list embedded in checkpoint extra-data.
pub fn checkpoint_signers(extra: &[u8]) -> Result<Vec<Address>> {
    if extra.len() < EXTRA_VANITY {
        return Err(CliqueError::MissingVanity);
    }
    if extra.len() < EXTRA_VANITY + EXTRA_SEAL {
        return Err(CliqueError::MissingSignature);
    }
    let list = &extra[EXTRA_VANITY..extra.len() - EXTRA_SEAL];
    if list.len() % ADDRESS_LENGTH != 0 {
        return Err(CliqueError::InvalidCheckpointSigners);
    }
    Ok(list
        .chunks_exact(ADDRESS_LENGTH)
        .map(|chunk| {
            let mut address = Address::zero();
            address.0.copy_from_slice(chunk);
            address
        })
        .collect())
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

impl Clique {
    /// Checks whether `header` conforms to the consensus rules.
    pub fn verify_header(&self, chain: &dyn ChainReader, header: &Header) -> Result<()> {
        self.verify_header_with_parents(chain, header, &[])
    }

    /// Checks `header` using `parents` (ascending, not yet in the chain) as
    /// its most recent ancestors.
    pub fn verify_header_with_parents(
        &self,
        chain: &dyn ChainReader,
        header: &Header,
        parents: &[Header],
    ) -> Result<()> {
        match self.validate(chain, header, parents) {
            HeaderState::Rejected(err) => Err(err),
            _ => Ok(()),
        }
    }

    /// Drives `header` through the validation states until it is either
    /// consensus-valid or rejected. Nothing is persisted on rejection.
    pub fn validate(
        &self,
        chain: &dyn ChainReader,
        header: &Header,
        parents: &[Header],
    ) -> HeaderState {
        let mut state = HeaderState::Unchecked;
        loop {
            state = match state {
                HeaderState::Unchecked => match self.verify_shape(chain, header, parents) {
                    Ok(()) => HeaderState::ShapeValid,
                    Err(err) => HeaderState::Rejected(err),
                },
                HeaderState::ShapeValid => {
                    match self.verify_cascading_fields(chain, header, parents) {
                        Ok(()) => HeaderState::ConsensusValid,
                        Err(err) => HeaderState::Rejected(err),
                    }
                }
                done => return done,
            };
            trace!(number = header.number, %state, "header validation step");
        }
    }

    /// Checks the fields that need no snapshot: extra-data layout, vote
    /// encoding, zeroed proof-of-work fields, and linkage to a known parent.
    fn verify_shape(
        &self,
        chain: &dyn ChainReader,
        header: &Header,
        parents: &[Header],
    ) -> Result<()> {
        let number = header.number;

        let now = unix_now();
        if header.time > now {
            return Err(CliqueError::FutureBlock {
                time: header.time,
                now,
            });
        }
        // Checkpoint blocks need to enforce zero beneficiary
        let checkpoint = number % self.config.epoch == 0;
        if checkpoint && !header.coinbase.is_zero() {
            return Err(CliqueError::InvalidCheckpointBeneficiary);
        }
        if header.nonce != BlockNonce::AUTH && header.nonce != BlockNonce::DROP {
            return Err(CliqueError::InvalidVote);
        }
        if checkpoint && header.nonce != BlockNonce::DROP {
            return Err(CliqueError::InvalidCheckpointVote);
        }

        if header.extra.len() < EXTRA_VANITY {
            return Err(CliqueError::MissingVanity);
        }
        if header.extra.len() < EXTRA_VANITY + EXTRA_SEAL {
            return Err(CliqueError::MissingSignature);
        }
        // Signer list only on checkpoints, and in whole addresses
        let signers_bytes = header.extra.len() - EXTRA_VANITY - EXTRA_SEAL;
        if !checkpoint && signers_bytes != 0 {
            return Err(CliqueError::ExtraSigners);
        }
        if checkpoint && signers_bytes % ADDRESS_LENGTH != 0 {
            return Err(CliqueError::InvalidCheckpointSigners);
        }

        if header.mix_digest.iter().any(|b| *b != 0) {
            return Err(CliqueError::InvalidMixDigest);
        }
        if header.uncle_hash != EMPTY_UNCLE_HASH {
            return Err(CliqueError::InvalidUncleHash);
        }
        if number > 0
            && header.difficulty != BigUint::from(DIFF_IN_TURN)
            && header.difficulty != BigUint::from(DIFF_NO_TURN)
        {
            return Err(CliqueError::InvalidDifficulty);
        }

        // The genesis block is always valid dead-end
        if number == 0 {
            return Ok(());
        }
        let parent = match parents.last() {
            Some(parent) => Some(parent.clone()),
            None => chain.get_header(&header.parent_hash, number - 1),
        };
        let parent = parent
            .filter(|parent| parent.number == number - 1 && parent.hash() == header.parent_hash)
            .ok_or(CliqueError::UnknownAncestor {
                number: number - 1,
                hash: header.parent_hash,
            })?;
        match parent.time.checked_add(self.config.period) {
            Some(earliest) if earliest <= header.time => {}
            _ => return Err(CliqueError::InvalidTimestamp),
        }
        Ok(())
    }

    /// Checks the fields that depend on the voting snapshot of the parent.
    fn verify_cascading_fields(
        &self,
        chain: &dyn ChainReader,
        header: &Header,
        parents: &[Header],
    ) -> Result<()> {
        let number = header.number;
        if number == 0 {
            return Ok(());
        }
        let snap = self.snapshot(chain, number - 1, header.parent_hash, parents)?;

        // If the block is a checkpoint block, verify the signer list
        if number % self.config.epoch == 0 && checkpoint_signers(&header.extra)? != snap.signers()
        {
            return Err(CliqueError::MismatchingCheckpointSigners);
        }
        self.verify_seal_with(&snap, header)
    }

    /// Checks that the seal of `header` was produced by an authorized signer
    /// whose turn it could be.
    pub fn verify_seal(&self, chain: &dyn ChainReader, header: &Header) -> Result<()> {
        let number = header.number;
        if number == 0 {
            return Err(CliqueError::UnknownBlock);
        }
        let snap = self.snapshot(chain, number - 1, header.parent_hash, &[])?;
        self.verify_seal_with(&snap, header)
    }

    fn verify_seal_with(&self, snap: &Snapshot, header: &Header) -> Result<()> {
        let signer = self.signatures.recover(header)?;
        if !snap.signers.contains(&signer) {
            return Err(CliqueError::UnauthorizedSigner(signer));
        }
        if snap.recently_signed(header.number, &signer) {
            return Err(CliqueError::RecentlySigned(signer));
        }

        let expected = if snap.inturn(header.number, &signer) {
            DIFF_IN_TURN
        } else {
            DIFF_NO_TURN
        };
        if header.difficulty != BigUint::from(expected) {
            return Err(CliqueError::WrongDifficulty { expected });
        }
        Ok(())
    }
}
