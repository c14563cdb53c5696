// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::borrow::Cow;

use consensus_suite_primitives::{Address, H256};
use consensus_suite_sealsig::SealError;
use strum_macros::Display;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliqueError>;

/// Coarse classification of [`CliqueError`] variants.
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum ErrorKind {
    /// Malformed header, fatal to the header and never retried
    Shape,
    /// Header breaks the signer schedule or the voting rules
    Consensus,
    /// Missing parent; the chain layer may fetch it and retry
    Ancestry,
    /// The seal signature itself is corrupt
    Crypto,
    /// Operation not available on this engine instance
    Unsupported,
    /// Snapshot persistence failed
    Storage,
    /// The check never completed
    Interrupted,
}

#[derive(Error, Debug, PartialEq)]
pub enum CliqueError {
    /// The list of signers was requested for a block that is not part of the local chain.
    #[error("unknown block")]
    UnknownBlock,

    /// Parent header or an ancestor needed to rebuild the snapshot is not known.
    #[error("unknown ancestor {number} ({hash:?})")]
    UnknownAncestor { number: u64, hash: H256 },

    #[error("block in the future: timestamp {time} > now {now}")]
    FutureBlock { time: u64, now: u64 },

    /// A checkpoint block has a beneficiary set to non-zeroes.
    #[error("beneficiary in checkpoint block non-zero")]
    InvalidCheckpointBeneficiary,

    /// The vote nonce is neither the authorize nor the drop magic.
    #[error("vote nonce not 0x00..0 or 0xff..f")]
    InvalidVote,

    /// A checkpoint block carries a vote nonce other than the drop magic.
    #[error("vote nonce in checkpoint block non-zero")]
    InvalidCheckpointVote,

    #[error("extra-data 32 byte vanity prefix missing")]
    MissingVanity,

    #[error("extra-data 65 byte signature suffix missing")]
    MissingSignature,

    #[error("non-checkpoint block contains extra signer list")]
    ExtraSigners,

    /// The checkpoint signer region is not a whole number of addresses.
    #[error("invalid signer list on checkpoint block")]
    InvalidCheckpointSigners,

    /// The checkpoint signer list differs from the one computed locally.
    #[error("mismatching signer list on checkpoint block")]
    MismatchingCheckpointSigners,

    #[error("non-zero mix digest")]
    InvalidMixDigest,

    #[error("non empty uncle hash")]
    InvalidUncleHash,

    /// Difficulty is neither 1 nor 2.
    #[error("invalid difficulty")]
    InvalidDifficulty,

    #[error("wrong difficulty: expected {expected} for the signer's turn")]
    WrongDifficulty { expected: u64 },

    /// Timestamp is lower than the parent's timestamp plus the block period.
    #[error("invalid timestamp")]
    InvalidTimestamp,

    /// Votes were applied from out-of-range or non-contiguous headers.
    #[error("invalid voting chain")]
    InvalidVotingChain,

    #[error("unauthorized signer {0}")]
    UnauthorizedSigner(Address),

    #[error("signer {0} recently signed")]
    RecentlySigned(Address),

    #[error("seal signature: {0}")]
    Signature(#[from] SealError),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("unsupported operation: {0}")]
    Unsupported(Cow<'static, str>),

    #[error("missing block {0}")]
    MissingBlock(u64),

    #[error("snapshot serialization: {0}")]
    Serialization(String),

    /// A batch verification worker exited before checking the header.
    #[error("header verification interrupted")]
    VerificationInterrupted,
}

impl CliqueError {
    pub fn kind(&self) -> ErrorKind {
        use CliqueError::*;
        match self {
            FutureBlock { .. }
            | InvalidCheckpointBeneficiary
            | InvalidVote
            | InvalidCheckpointVote
            | MissingVanity
            | MissingSignature
            | ExtraSigners
            | InvalidCheckpointSigners
            | InvalidMixDigest
            | InvalidUncleHash
            | InvalidDifficulty
            | InvalidVotingChain
            | Signature(SealError::MissingSignature) => ErrorKind::Shape,
            MismatchingCheckpointSigners
            | WrongDifficulty { .. }
            | InvalidTimestamp
            | UnauthorizedSigner(_)
            | RecentlySigned(_)
            | UnknownBlock => ErrorKind::Consensus,
            UnknownAncestor { .. } | MissingBlock(_) => ErrorKind::Ancestry,
            Signature(_) | Signing(_) => ErrorKind::Crypto,
            Unsupported(_) => ErrorKind::Unsupported,
            Serialization(_) => ErrorKind::Storage,
            VerificationInterrupted => ErrorKind::Interrupted,
        }
    }

    /// Only a missing ancestor is worth retrying once the chain layer has
    /// fetched the missing headers.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Ancestry
    }
}
