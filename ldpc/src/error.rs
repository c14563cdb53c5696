// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::Decision;
use consensus_suite_primitives::{BigUint, H256};
use std::borrow::Cow;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LdpcError {
    #[error("invalid level table: {0}")]
    InvalidTable(Cow<'static, str>),

    #[error("unknown ancestor {number} ({hash:?})")]
    UnknownAncestor { number: u64, hash: H256 },

    #[error("the genesis block has no seal")]
    Genesis,

    #[error("extra-data too long: {0} > 32")]
    ExtraTooLong(usize),

    #[error("block in the future: timestamp {time} > {limit}")]
    FutureBlock { time: u64, limit: u64 },

    /// Timestamp not strictly after the parent's.
    #[error("timestamp older than parent")]
    OlderBlockTime,

    #[error("invalid block number: expected {expected}, got {actual}")]
    InvalidNumber { expected: u64, actual: u64 },

    #[error("invalid difficulty: expected {expected}, got {actual}")]
    InvalidDifficulty { expected: BigUint, actual: BigUint },

    /// The declared pre-image does not match the header hash and nonce.
    #[error("invalid mix digest")]
    InvalidMixDigest,

    #[error("invalid code length: expected {expected}, got {actual}")]
    InvalidCodeLength { expected: u64, actual: u64 },

    /// The declared codeword differs from the decoder output.
    #[error("invalid codeword")]
    InvalidCodeword,

    #[error("invalid proof-of-work: {0:?}")]
    InvalidPoW(Decision),
}

pub type Result<T> = std::result::Result<T, LdpcError>;
