// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Shared primitives for the consensus engine suite.
//!
//! This crate provides the types every engine consumes without owning them:
//! - [`Header`]: the block header handed in by the chain driver, with its hashing rules
//! - [`Address`] and [`BlockNonce`]: fixed-width identifiers with hex encodings
//! - [`ChainReader`] and [`Signer`]: the seams towards chain storage and key management
//! - Engine configuration structs deserializable from JSON
//!
//! The extra-data layout constants live here as well, since both the signature
//! recovery crate and the proof-of-authority engine slice headers with them.

pub mod api;
pub mod config;
mod error;
mod header;
mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use api::{ChainReader, Signer};
pub use config::{ChainConfig, CliqueConfig, LdpcConfig};
pub use error::PrimitivesError;
pub use header::{EMPTY_UNCLE_HASH, Header};
pub use types::{Address, BlockNonce, serde_h256};

// re-exports
pub use keccak_hash::{H256, keccak};
pub use num_bigint::BigUint;

/// Fixed number of extra-data prefix bytes reserved for signer vanity.
pub const EXTRA_VANITY: usize = 32;

/// Fixed number of extra-data suffix bytes reserved for the signer seal
/// (a 64 byte compact secp256k1 signature followed by the recovery id).
pub const EXTRA_SEAL: usize = 65;

/// Length in bytes of an [`Address`].
pub const ADDRESS_LENGTH: usize = 20;
